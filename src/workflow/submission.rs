use super::controller::VerificationWorkflow;
use super::types::{Step, StepFailure, SubmitOutcome};
use crate::artifact::{ArtifactKind, CaptureArtifact};
use crate::error::{ErrorKind, WorkflowError};
use crate::events::WorkflowEvent;
use tracing::info;

impl VerificationWorkflow {
    /// Select the identity document, replacing any previous selection
    pub fn select_document(&self, artifact: CaptureArtifact) -> Result<(), WorkflowError> {
        self.select(ArtifactKind::Document, artifact)
    }

    /// Select the selfie, replacing any previous selection
    pub fn select_selfie(&self, artifact: CaptureArtifact) -> Result<(), WorkflowError> {
        self.select(ArtifactKind::Selfie, artifact)
    }

    pub(super) fn select(
        &self,
        kind: ArtifactKind,
        artifact: CaptureArtifact,
    ) -> Result<(), WorkflowError> {
        let mut state = self.state.lock();
        let step = state.session.step;
        if step.is_terminal() {
            return Err(Self::terminal(step));
        }
        if step != step_for(kind) {
            return Err(WorkflowError::InvalidStep {
                step: step.to_string(),
            });
        }

        self.event_bus.publish(WorkflowEvent::ArtifactSelected {
            kind,
            provenance: artifact.provenance(),
            size: artifact.len(),
        });

        let slot = match kind {
            ArtifactKind::Document => &mut state.document,
            ArtifactKind::Selfie => &mut state.selfie,
        };
        *slot = Some(artifact);
        Ok(())
    }

    /// Submit the selected document for the current session
    pub async fn submit_document(&self) -> Result<SubmitOutcome, WorkflowError> {
        let (session_id, artifact) = match self.prepare_submission(ArtifactKind::Document)? {
            Some(prepared) => prepared,
            None => return Ok(SubmitOutcome::Ignored),
        };

        info!(workflow = %self.id, session = %session_id, "Submitting document");
        let result = self.backend.submit_document(&session_id, &artifact).await;

        let mut state = self.state.lock();
        state.pending = false;

        match result {
            Ok(receipt) if receipt.accepted => {
                state.document = None;
                self.transition(&mut state, Step::AwaitingSelfie);
                Ok(SubmitOutcome::Advanced(Step::AwaitingSelfie))
            }
            Ok(_) => {
                let failure = StepFailure::new(ErrorKind::Validation, "Document rejected");
                self.surface(&mut state, failure.clone());
                Ok(SubmitOutcome::Rejected(failure))
            }
            Err(e) => {
                let failure = StepFailure::from(&e);
                self.surface(&mut state, failure.clone());
                Ok(SubmitOutcome::Rejected(failure))
            }
        }
    }

    /// Submit the selected selfie; on success store the credential and redirect
    pub async fn submit_selfie(&self) -> Result<SubmitOutcome, WorkflowError> {
        let (session_id, artifact) = match self.prepare_submission(ArtifactKind::Selfie)? {
            Some(prepared) => prepared,
            None => return Ok(SubmitOutcome::Ignored),
        };

        info!(workflow = %self.id, session = %session_id, "Submitting selfie");
        let result = self.backend.submit_selfie(&session_id, &artifact).await;

        let redirect_url = {
            let mut state = self.state.lock();
            state.pending = false;

            match result {
                Ok(verified) => {
                    info!(workflow = %self.id, session = %session_id, "Verification completed");
                    state.selfie = None;
                    state.credential = Some(verified.credential);
                    state.redirect_url = Some(verified.redirect_url.clone());
                    self.transition(&mut state, Step::Completed);
                    self.event_bus.publish(WorkflowEvent::Redirecting {
                        url: verified.redirect_url.clone(),
                    });
                    verified.redirect_url
                }
                Err(e) => {
                    let failure = StepFailure::from(&e);
                    self.surface(&mut state, failure.clone());
                    return Ok(SubmitOutcome::Rejected(failure));
                }
            }
        };

        self.release_camera();
        self.navigator.navigate(&redirect_url);
        Ok(SubmitOutcome::Advanced(Step::Completed))
    }

    /// Check the guards for a submit trigger and mark the step pending.
    ///
    /// Returns `None` when a call for this step is already in flight.
    fn prepare_submission(
        &self,
        kind: ArtifactKind,
    ) -> Result<Option<(String, CaptureArtifact)>, WorkflowError> {
        let mut state = self.state.lock();
        let step = state.session.step;

        if step.is_terminal() {
            return Err(Self::terminal(step));
        }
        if step == Step::AwaitingSession || state.session.session_id.is_none() {
            return Err(WorkflowError::NoSession);
        }
        if step != step_for(kind) {
            return Err(WorkflowError::InvalidStep {
                step: step.to_string(),
            });
        }
        if state.pending {
            info!(workflow = %self.id, "Ignoring duplicate {} submission while pending", kind);
            return Ok(None);
        }

        let artifact = match kind {
            ArtifactKind::Document => state.document.clone(),
            ArtifactKind::Selfie => state.selfie.clone(),
        }
        .ok_or(WorkflowError::MissingArtifact {
            kind: kind.as_str(),
        })?;

        let session_id = state
            .session
            .session_id
            .clone()
            .ok_or(WorkflowError::NoSession)?;

        self.begin_submission(&mut state);
        Ok(Some((session_id, artifact)))
    }
}

fn step_for(kind: ArtifactKind) -> Step {
    match kind {
        ArtifactKind::Document => Step::AwaitingDocument,
        ArtifactKind::Selfie => Step::AwaitingSelfie,
    }
}
