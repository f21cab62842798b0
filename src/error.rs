use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AltidError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("System error: {message}")]
    System { message: String },
}

impl AltidError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Errors raised by the camera capture module and its device backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera unavailable: {details}")]
    DeviceUnavailable { details: String },

    #[error("A camera handle is already active")]
    AlreadyActive,

    #[error("Camera handle has been released")]
    HandleReleased,

    #[error("Frame capture failed: {details}")]
    CaptureFailed { details: String },

    #[error("Frame encoding failed: {details}")]
    Encode { details: String },
}

/// Errors returned by the verification backend client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
    #[error("Callback rejected by backend: {reason}")]
    InvalidCallback { reason: String },

    #[error("Document rejected: {reason}")]
    DocumentRejected { reason: String },

    #[error("Selfie rejected: {reason}")]
    SelfieRejected { reason: String },

    #[error("Network error: {details}")]
    Network { details: String },

    #[error("Unexpected server response: {details}")]
    ServerError { details: String },
}

impl VerificationError {
    pub fn network<S: Into<String>>(details: S) -> Self {
        Self::Network {
            details: details.into(),
        }
    }

    pub fn server<S: Into<String>>(details: S) -> Self {
        Self::ServerError {
            details: details.into(),
        }
    }
}

/// Local precondition violations detected by the workflow controller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Missing callback URL")]
    MissingCallback,

    #[error("No {kind} has been selected")]
    MissingArtifact { kind: &'static str },

    #[error("No verification session has been started")]
    NoSession,

    #[error("Operation not allowed in step {step}")]
    InvalidStep { step: String },

    #[error("Workflow has already finished ({step})")]
    Terminal { step: String },

    #[error("Camera is not active")]
    CameraInactive,
}

/// User-facing error taxonomy used when surfacing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Missing or unusable host configuration; ends the workflow
    Configuration,
    /// Camera denied or unavailable
    Permission,
    /// Backend rejected the submitted content
    Validation,
    /// Backend could not be reached
    Transport,
    /// Backend answered with an unexpected shape
    Server,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Permission => "permission",
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::Server => "server",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::InvalidCallback { .. } => ErrorKind::Configuration,
            VerificationError::DocumentRejected { .. }
            | VerificationError::SelfieRejected { .. } => ErrorKind::Validation,
            VerificationError::Network { .. } => ErrorKind::Transport,
            VerificationError::ServerError { .. } => ErrorKind::Server,
        }
    }

    /// Message shown to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            VerificationError::InvalidCallback { reason }
            | VerificationError::DocumentRejected { reason }
            | VerificationError::SelfieRejected { reason } => reason.clone(),
            VerificationError::Network { .. } => "Network error".to_string(),
            VerificationError::ServerError { .. } => "Verification failed".to_string(),
        }
    }
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Permission
    }
}

pub type Result<T> = std::result::Result<T, AltidError>;
