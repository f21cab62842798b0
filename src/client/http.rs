use super::backend::{
    Credential, DocumentReceipt, SessionStarted, VerificationBackend, VerifiedCredential,
};
use super::response::Reply;
use crate::artifact::{ArtifactKind, CaptureArtifact};
use crate::config::BackendConfig;
use crate::error::{AltidError, Result, VerificationError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};
use url::Url;

/// HTTP client for the verification backend.
///
/// Endpoints: `GET /start`, `POST /upload-doc`, `POST /upload-selfie` and
/// `GET /public-key`, all relative to the configured base URL.
pub struct HttpVerificationClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpVerificationClient {
    /// Create a client from the backend configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            AltidError::system(format!("Invalid backend URL '{}': {}", config.base_url, e))
        })?;

        // Keep any path prefix when joining endpoint names
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| AltidError::system(format!("Failed to build HTTP client: {}", e)))?;

        info!("Verification backend at {}", base_url);

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> std::result::Result<Url, VerificationError> {
        self.base_url
            .join(name)
            .map_err(|e| VerificationError::network(format!("invalid endpoint {}: {}", name, e)))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Reply, VerificationError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!("Backend replied with HTTP {} ({} bytes)", status, body.len());
        Ok(Reply::parse(status, &body))
    }

    async fn upload(
        &self,
        endpoint: &str,
        session_id: &str,
        kind: ArtifactKind,
        field: &'static str,
        artifact: &CaptureArtifact,
    ) -> std::result::Result<Reply, VerificationError> {
        let part = file_part(
            artifact.data().clone(),
            artifact.upload_name(kind),
            artifact.media_type(),
        )?;

        let form = Form::new()
            .text("session_id", session_id.to_string())
            .part(field, part);

        debug!(
            "Uploading {} for session {} ({} bytes, {}, {} {})",
            kind,
            session_id,
            artifact.len(),
            artifact.media_type(),
            artifact.provenance(),
            artifact.acquired_at().to_rfc3339()
        );

        let url = self.endpoint(endpoint)?;
        self.send(self.http_client.post(url).multipart(form)).await
    }

    /// Fetch the PEM public key the backend signs credentials with
    pub async fn fetch_public_key(&self) -> std::result::Result<String, VerificationError> {
        let url = self.endpoint("public-key")?;
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let reply = Reply::parse(status.as_u16(), body.as_bytes());
            return Err(VerificationError::server(match reply.error_reason() {
                Some(reason) => reason,
                None => format!("HTTP status {}", status),
            }));
        }

        if !body.contains("BEGIN PUBLIC KEY") {
            return Err(VerificationError::server("public key response is not PEM"));
        }

        Ok(body)
    }
}

#[async_trait]
impl VerificationBackend for HttpVerificationClient {
    async fn start_session(
        &self,
        callback_url: &str,
    ) -> std::result::Result<SessionStarted, VerificationError> {
        let url = self.endpoint("start")?;
        debug!("Starting verification session for callback {}", callback_url);

        let reply = self
            .send(self.http_client.get(url).query(&[("callback", callback_url)]))
            .await?;

        reply.interpret(
            |reason| VerificationError::InvalidCallback { reason },
            |r| r.string("session_id").map(|session_id| SessionStarted { session_id }),
            "session_id",
        )
    }

    async fn submit_document(
        &self,
        session_id: &str,
        artifact: &CaptureArtifact,
    ) -> std::result::Result<DocumentReceipt, VerificationError> {
        let reply = self
            .upload("upload-doc", session_id, ArtifactKind::Document, "doc", artifact)
            .await?;

        reply.interpret(
            |reason| VerificationError::DocumentRejected { reason },
            |r| r.boolean("success").map(|accepted| DocumentReceipt { accepted }),
            "success",
        )
    }

    async fn submit_selfie(
        &self,
        session_id: &str,
        artifact: &CaptureArtifact,
    ) -> std::result::Result<VerifiedCredential, VerificationError> {
        let reply = self
            .upload("upload-selfie", session_id, ArtifactKind::Selfie, "selfie", artifact)
            .await?;

        reply.interpret(
            |reason| VerificationError::SelfieRejected { reason },
            |r| {
                Some(VerifiedCredential {
                    credential: Credential::new(r.string("token")?),
                    redirect_url: r.string("redirect_url")?,
                })
            },
            "token or redirect_url",
        )
    }
}

fn transport_error(e: reqwest::Error) -> VerificationError {
    if e.is_timeout() {
        VerificationError::network(format!("request timed out: {e}"))
    } else if e.is_connect() {
        VerificationError::network(format!("connection failed: {e}"))
    } else if e.is_decode() || e.is_body() {
        VerificationError::network(format!("failed to read response: {e}"))
    } else {
        VerificationError::network(e.to_string())
    }
}

/// Build a multipart file part without copying the payload
pub(super) fn file_part(
    data: Bytes,
    file_name: String,
    media_type: &str,
) -> std::result::Result<Part, VerificationError> {
    Part::stream(data)
        .file_name(file_name)
        .mime_str(media_type)
        .map_err(|e| VerificationError::server(format!("invalid media type '{media_type}': {e}")))
}
