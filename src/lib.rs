pub mod artifact;
pub mod camera;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod keyboard_input;
pub mod workflow;

pub use artifact::{ArtifactKind, CaptureArtifact, Provenance};
pub use camera::{CameraCapture, CameraDevice, CameraHandle, MockCamera, UnavailableCamera};
pub use client::{Credential, HttpVerificationClient, VerificationBackend};
pub use config::AltidConfig;
pub use error::{AltidError, CameraError, ErrorKind, Result, VerificationError, WorkflowError};
pub use events::{EventBus, WorkflowEvent};
pub use frame::{FrameData, FrameFormat};
pub use keyboard_input::{CameraCommand, KeyboardInputHandler};
pub use workflow::{
    CameraStatus, CaptureOutcome, Navigator, Step, StepFailure, SubmitOutcome,
    VerificationResult, VerificationWorkflow, VerificationWorkflowBuilder, WorkflowSnapshot,
    FAILURE_LOG_TARGET,
};

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use camera::GStreamerCamera;
