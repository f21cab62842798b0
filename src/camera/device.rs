use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::FrameData;
use async_trait::async_trait;

/// Platform camera backend
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Request access to the device and start streaming frames.
    ///
    /// Returns `CameraError::DeviceUnavailable` when permission is denied or
    /// no camera exists.
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraStream>, CameraError>;

    /// Short description for logs
    fn name(&self) -> String;
}

/// A live stream opened by a [`CameraDevice`]
pub trait CameraStream: Send {
    /// Read the most recent frame at the stream's native resolution
    fn current_frame(&mut self) -> Result<FrameData, CameraError>;

    /// Stop all underlying media tracks
    fn stop(&mut self);
}

/// Receives live frames while a camera handle is active
pub trait PreviewSink: Send + Sync {
    fn attach(&self, _resolution: (u32, u32)) {}

    fn present(&self, frame: &FrameData);

    fn detach(&self) {}
}

/// Backend used when no camera support is available on this platform
pub struct UnavailableCamera {
    reason: String,
}

impl UnavailableCamera {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CameraDevice for UnavailableCamera {
    async fn open(&self, _config: &CameraConfig) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(CameraError::DeviceUnavailable {
            details: self.reason.clone(),
        })
    }

    fn name(&self) -> String {
        "unavailable".to_string()
    }
}
