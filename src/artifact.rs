use crate::error::{CameraError, Result};
use crate::frame::FrameData;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Where an artifact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Selected by the user from a file
    Uploaded,
    /// Captured from the live camera stream
    CapturedLive,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Uploaded => f.write_str("uploaded"),
            Provenance::CapturedLive => f.write_str("captured-live"),
        }
    }
}

/// The role an artifact plays in a verification session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Document,
    Selfie,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Document => "document",
            ArtifactKind::Selfie => "selfie",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary image payload collected from the user
#[derive(Clone, PartialEq)]
pub struct CaptureArtifact {
    data: Bytes,
    media_type: String,
    provenance: Provenance,
    file_name: Option<String>,
    acquired_at: DateTime<Utc>,
}

impl CaptureArtifact {
    /// Wrap an uploaded payload, sniffing its media type from the content
    pub fn uploaded(data: impl Into<Bytes>, file_name: Option<String>) -> Self {
        let data = data.into();
        let media_type = sniff_media_type(&data).to_string();
        Self {
            data,
            media_type,
            provenance: Provenance::Uploaded,
            file_name,
            acquired_at: Utc::now(),
        }
    }

    /// Read an uploaded artifact from disk
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let artifact = Self::uploaded(data, file_name);
        debug!(
            "Loaded {} ({} bytes, {}) from {}",
            artifact.file_name().unwrap_or("artifact"),
            artifact.len(),
            artifact.media_type(),
            path.display()
        );
        Ok(artifact)
    }

    /// Rasterize a live frame into a JPEG artifact
    pub fn from_frame(
        frame: &FrameData,
        jpeg_quality: u8,
    ) -> std::result::Result<Self, CameraError> {
        let jpeg = frame.to_jpeg(jpeg_quality)?;
        Ok(Self {
            data: Bytes::from(jpeg),
            media_type: "image/jpeg".to_string(),
            provenance: Provenance::CapturedLive,
            file_name: Some(format!("capture-{}.jpg", frame.id)),
            acquired_at: Utc::now(),
        })
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File name sent in multipart uploads
    pub fn upload_name(&self, kind: ArtifactKind) -> String {
        match &self.file_name {
            Some(name) => name.clone(),
            None => format!("{}.{}", kind.as_str(), extension_for(&self.media_type)),
        }
    }
}

impl fmt::Debug for CaptureArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureArtifact")
            .field("len", &self.data.len())
            .field("media_type", &self.media_type)
            .field("provenance", &self.provenance)
            .field("file_name", &self.file_name)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

/// Detect the media type from magic bytes; the backend owns real validation
pub fn sniff_media_type(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "bin",
    }
}
