//! Session workflow controller: the verification state machine.

mod controller;
mod live_capture;
mod navigator;
mod submission;
mod types;

#[cfg(test)]
mod tests;

pub use controller::{VerificationWorkflow, VerificationWorkflowBuilder, FAILURE_LOG_TARGET};
pub use navigator::{Navigator, RecordingNavigator};
pub use types::{
    CameraStatus, CaptureOutcome, Step, StepFailure, SubmitOutcome, VerificationResult,
    VerificationSession, WorkflowSnapshot,
};
