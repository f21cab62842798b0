mod capture;
mod device;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod v4l2;
mod mock;

pub use capture::{CameraCapture, CameraHandle};
pub use device::{CameraDevice, CameraStream, PreviewSink, UnavailableCamera};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use v4l2::GStreamerCamera;
pub use mock::MockCamera;

use crate::config::CameraConfig;
use std::sync::Arc;

/// Pick the platform camera backend compiled into this build
pub fn default_device(_config: &CameraConfig) -> Arc<dyn CameraDevice> {
    #[cfg(all(feature = "camera", target_os = "linux"))]
    {
        Arc::new(GStreamerCamera::new())
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    {
        Arc::new(UnavailableCamera::new(
            "no camera backend compiled in (enable the `camera` feature on Linux)",
        ))
    }
}
