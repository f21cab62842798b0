use super::navigator::Navigator;
use super::types::{
    CameraStatus, Step, StepFailure, SubmitOutcome, VerificationResult, VerificationSession,
    WorkflowSnapshot,
};
use crate::artifact::CaptureArtifact;
use crate::camera::{CameraCapture, CameraHandle};
use crate::client::{Credential, VerificationBackend};
use crate::config::AltidConfig;
use crate::error::{AltidError, ErrorKind, Result, WorkflowError};
use crate::events::{EventBus, WorkflowEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Target that receives the failure audit log
pub const FAILURE_LOG_TARGET: &str = "altid::failures";

/// Session workflow controller.
///
/// Owns the session, the in-flight artifacts and the user-facing error, and
/// sequences start -> document -> selfie -> redirect. All methods take
/// `&self` so one instance can be shared between the UI and network tasks;
/// the state lock is never held across an `.await`.
pub struct VerificationWorkflow {
    pub(super) id: Uuid,
    pub(super) backend: Arc<dyn VerificationBackend>,
    pub(super) navigator: Arc<dyn Navigator>,
    pub(super) camera: Option<CameraCapture>,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) log_failures: bool,
    pub(super) state: Mutex<WorkflowState>,
    pub(super) camera_handle: Mutex<Option<CameraHandle>>,
    /// Serializes device requests so a reopen waits for a cancelled one
    pub(super) acquire_gate: tokio::sync::Mutex<()>,
}

pub(super) struct WorkflowState {
    pub(super) session: VerificationSession,
    pub(super) pending: bool,
    pub(super) document: Option<CaptureArtifact>,
    pub(super) selfie: Option<CaptureArtifact>,
    pub(super) error: Option<StepFailure>,
    pub(super) camera: CameraStatus,
    /// Incremented by every `open_camera`; stale requests release their handle
    pub(super) camera_request: u64,
    pub(super) credential: Option<Credential>,
    pub(super) redirect_url: Option<String>,
}

impl VerificationWorkflow {
    pub fn builder() -> VerificationWorkflowBuilder {
        VerificationWorkflowBuilder::new()
    }

    /// Identifier of this workflow instance, used to correlate logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> Step {
        self.state.lock().session.step
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    /// Subscribe to workflow change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.event_bus.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.lock();
        WorkflowSnapshot {
            session: state.session.clone(),
            pending: state.pending,
            document: state.document.clone(),
            selfie: state.selfie.clone(),
            error: state.error.clone(),
            camera: state.camera,
            credential: state.credential.clone(),
            redirect_url: state.redirect_url.clone(),
        }
    }

    /// Final outcome, once the workflow reached a terminal step
    pub fn result(&self) -> Option<VerificationResult> {
        let state = self.state.lock();
        match state.session.step {
            Step::Completed => match (&state.credential, &state.redirect_url) {
                (Some(credential), Some(redirect_url)) => Some(VerificationResult::Success {
                    credential: credential.clone(),
                    redirect_url: redirect_url.clone(),
                }),
                _ => None,
            },
            Step::Failed => Some(VerificationResult::Failure {
                reason: state
                    .error
                    .as_ref()
                    .map(|failure| failure.message.clone())
                    .unwrap_or_else(|| "Verification failed".to_string()),
            }),
            _ => None,
        }
    }

    /// Start the backend session. Only the first call issues a request.
    pub async fn start(&self) -> std::result::Result<SubmitOutcome, WorkflowError> {
        let callback_url = {
            let mut state = self.state.lock();
            match state.session.step {
                Step::AwaitingSession if state.pending => return Ok(SubmitOutcome::Ignored),
                Step::AwaitingSession => {}
                Step::Failed if state.session.callback_url.is_none() => {
                    return Err(WorkflowError::MissingCallback)
                }
                step if step.is_terminal() => return Err(Self::terminal(step)),
                step => {
                    debug!("Session already started (step {})", step);
                    return Ok(SubmitOutcome::Ignored);
                }
            }

            let callback_url = state
                .session
                .callback_url
                .clone()
                .ok_or(WorkflowError::MissingCallback)?;
            self.begin_submission(&mut state);
            callback_url
        };

        info!(workflow = %self.id, "Starting verification session");
        let result = self.backend.start_session(&callback_url).await;

        let mut state = self.state.lock();
        state.pending = false;

        match result {
            Ok(started) => {
                info!(
                    workflow = %self.id,
                    session = %started.session_id,
                    "Verification session started"
                );
                state.session.session_id = Some(started.session_id);
                self.transition(&mut state, Step::AwaitingDocument);
                Ok(SubmitOutcome::Advanced(Step::AwaitingDocument))
            }
            Err(e) => {
                let failure = StepFailure::from(&e);
                self.surface(&mut state, failure.clone());
                self.transition(&mut state, Step::Failed);
                Ok(SubmitOutcome::Rejected(failure))
            }
        }
    }

    /// Release any live camera handle and stop observing the workflow
    pub fn shutdown(&self) {
        self.release_camera();
        info!(workflow = %self.id, "Verification workflow shut down");
    }

    pub(super) fn terminal(step: Step) -> WorkflowError {
        WorkflowError::Terminal {
            step: step.to_string(),
        }
    }

    /// Mark a network call as in flight and clear the previous error
    pub(super) fn begin_submission(&self, state: &mut WorkflowState) {
        state.pending = true;
        state.error = None;
        self.event_bus.publish(WorkflowEvent::SubmissionStarted {
            step: state.session.step,
            timestamp: SystemTime::now(),
        });
    }

    pub(super) fn transition(&self, state: &mut WorkflowState, to: Step) {
        let from = state.session.step;
        if !from.can_advance_to(to) {
            warn!(workflow = %self.id, "Ignoring invalid transition {} -> {}", from, to);
            return;
        }

        state.session.step = to;
        self.event_bus.publish(WorkflowEvent::StepChanged {
            from,
            to,
            timestamp: SystemTime::now(),
        });

        if to.is_terminal() && state.camera != CameraStatus::Off {
            // The live handle itself is released by the caller once the state lock is dropped
            self.set_camera_status(state, CameraStatus::Off);
        }
    }

    /// Record a user-visible failure and audit it
    pub(super) fn surface(&self, state: &mut WorkflowState, failure: StepFailure) {
        let step = state.session.step;

        if self.log_failures {
            warn!(
                target: FAILURE_LOG_TARGET,
                workflow = %self.id,
                session = state.session.session_id.as_deref().unwrap_or("-"),
                step = %step,
                kind = %failure.kind,
                "Failure: {}",
                failure.message
            );
        }

        self.event_bus.publish(WorkflowEvent::ErrorSurfaced {
            step,
            kind: failure.kind,
            message: failure.message.clone(),
        });
        state.error = Some(failure);
    }

    pub(super) fn set_camera_status(&self, state: &mut WorkflowState, status: CameraStatus) {
        if state.camera == status {
            return;
        }
        state.camera = status;
        self.event_bus.publish(WorkflowEvent::CameraStatusChanged {
            status,
            timestamp: SystemTime::now(),
        });
    }

    /// Release the live camera handle, if any
    pub(super) fn release_camera(&self) {
        let handle = self.camera_handle.lock().take();
        if let Some(mut handle) = handle {
            if let Some(camera) = &self.camera {
                camera.release(&mut handle);
            }
        }

        let mut state = self.state.lock();
        self.set_camera_status(&mut state, CameraStatus::Off);
    }
}

/// Builder for [`VerificationWorkflow`]
pub struct VerificationWorkflowBuilder {
    callback_url: Option<String>,
    backend: Option<Arc<dyn VerificationBackend>>,
    navigator: Option<Arc<dyn Navigator>>,
    camera: Option<CameraCapture>,
    event_bus: Option<Arc<EventBus>>,
    log_failures: bool,
}

impl VerificationWorkflowBuilder {
    pub fn new() -> Self {
        Self {
            callback_url: None,
            backend: None,
            navigator: None,
            camera: None,
            event_bus: None,
            log_failures: true,
        }
    }

    /// Apply workflow and logging settings
    pub fn config(mut self, config: &AltidConfig) -> Self {
        self.event_bus = Some(Arc::new(if config.workflow.debug_events {
            EventBus::with_debug_logging(config.workflow.event_bus_capacity)
        } else {
            EventBus::new(config.workflow.event_bus_capacity)
        }));
        self.log_failures = config.logging.log_failed_attempts;
        self
    }

    /// Callback URL supplied by the host; `None` or blank fails the workflow
    pub fn callback_url<S: Into<String>>(mut self, callback_url: Option<S>) -> Self {
        self.callback_url = callback_url.map(Into::into);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn VerificationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn camera(mut self, camera: CameraCapture) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn log_failures(mut self, enabled: bool) -> Self {
        self.log_failures = enabled;
        self
    }

    pub fn build(self) -> Result<VerificationWorkflow> {
        let backend = self
            .backend
            .ok_or_else(|| AltidError::system("Verification backend must be specified"))?;
        let navigator = self
            .navigator
            .ok_or_else(|| AltidError::system("Navigator must be specified"))?;

        let callback_url = self
            .callback_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let step = if callback_url.is_some() {
            Step::AwaitingSession
        } else {
            Step::Failed
        };

        let workflow = VerificationWorkflow {
            id: Uuid::new_v4(),
            backend,
            navigator,
            camera: self.camera,
            event_bus: self.event_bus.unwrap_or_default(),
            log_failures: self.log_failures,
            state: Mutex::new(WorkflowState {
                session: VerificationSession {
                    session_id: None,
                    callback_url,
                    step,
                },
                pending: false,
                document: None,
                selfie: None,
                error: None,
                camera: CameraStatus::Off,
                camera_request: 0,
                credential: None,
                redirect_url: None,
            }),
            camera_handle: Mutex::new(None),
            acquire_gate: tokio::sync::Mutex::new(()),
        };

        if step == Step::Failed {
            let mut state = workflow.state.lock();
            workflow.surface(
                &mut state,
                StepFailure::new(
                    ErrorKind::Configuration,
                    WorkflowError::MissingCallback.to_string(),
                ),
            );
            drop(state);
        }

        info!(workflow = %workflow.id, "Verification workflow created in step {}", step);
        Ok(workflow)
    }
}

impl Default for VerificationWorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}
