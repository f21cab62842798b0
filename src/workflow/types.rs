use crate::artifact::CaptureArtifact;
use crate::client::Credential;
use crate::error::{CameraError, ErrorKind, VerificationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verification session steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    AwaitingSession,
    AwaitingDocument,
    AwaitingSelfie,
    Completed,
    Failed,
}

impl Step {
    /// `Completed` and `Failed` accept no further calls
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Completed | Step::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::AwaitingSession => "awaiting-session",
            Step::AwaitingDocument => "awaiting-document",
            Step::AwaitingSelfie => "awaiting-selfie",
            Step::Completed => "completed",
            Step::Failed => "failed",
        }
    }

    /// Whether the session may move from `self` to `to`
    pub fn can_advance_to(&self, to: Step) -> bool {
        match (self, to) {
            (from, _) if from.is_terminal() => false,
            (_, Step::Failed) => true,
            (Step::AwaitingSession, Step::AwaitingDocument)
            | (Step::AwaitingDocument, Step::AwaitingSelfie)
            | (Step::AwaitingSelfie, Step::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live camera state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraStatus {
    Off,
    /// Waiting for the permission prompt / device
    Requesting,
    Active,
}

impl CameraStatus {
    /// Whether the camera view should be shown
    pub fn is_shown(&self) -> bool {
        !matches!(self, CameraStatus::Off)
    }
}

impl fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraStatus::Off => f.write_str("off"),
            CameraStatus::Requesting => f.write_str("requesting"),
            CameraStatus::Active => f.write_str("active"),
        }
    }
}

/// Server-tracked verification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSession {
    pub session_id: Option<String>,
    pub callback_url: Option<String>,
    pub step: Step,
}

/// A user-visible error surfaced at a step boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepFailure {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&VerificationError> for StepFailure {
    fn from(error: &VerificationError) -> Self {
        Self::new(error.kind(), error.user_message())
    }
}

impl From<&CameraError> for StepFailure {
    fn from(error: &CameraError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of a submit trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend accepted the step and the session moved on
    Advanced(Step),
    /// The backend call failed; the failure has been surfaced
    Rejected(StepFailure),
    /// A call for this step was already in flight
    Ignored,
}

/// Result of a live selfie capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A selfie artifact was captured and selected
    Captured { size: usize },
    /// The frame could not be captured; the camera has been released
    Failed(StepFailure),
}

/// Final outcome of a verification workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Success {
        credential: Credential,
        redirect_url: String,
    },
    Failure {
        reason: String,
    },
}

/// Point-in-time copy of the workflow state for rendering layers
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub session: VerificationSession,
    pub pending: bool,
    pub document: Option<CaptureArtifact>,
    pub selfie: Option<CaptureArtifact>,
    pub error: Option<StepFailure>,
    pub camera: CameraStatus,
    pub credential: Option<Credential>,
    pub redirect_url: Option<String>,
}

impl WorkflowSnapshot {
    pub fn step(&self) -> Step {
        self.session.step
    }

    pub fn show_camera(&self) -> bool {
        self.camera.is_shown()
    }
}
