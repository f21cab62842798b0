use crate::artifact::CaptureArtifact;
use crate::error::VerificationError;
use async_trait::async_trait;
use std::fmt;

/// Opaque bearer token issued by the backend after a successful selfie check
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are forwarded, never logged
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes redacted>)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStarted {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentReceipt {
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub credential: Credential,
    pub redirect_url: String,
}

/// The three calls of the remote verification service.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn start_session(&self, callback_url: &str) -> Result<SessionStarted, VerificationError>;

    async fn submit_document(
        &self,
        session_id: &str,
        artifact: &CaptureArtifact,
    ) -> Result<DocumentReceipt, VerificationError>;

    async fn submit_selfie(
        &self,
        session_id: &str,
        artifact: &CaptureArtifact,
    ) -> Result<VerifiedCredential, VerificationError>;
}
