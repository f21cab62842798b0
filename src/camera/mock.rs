use super::device::{CameraDevice, CameraStream};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

/// Mock camera backend for testing without real hardware.
///
/// Clones share counters, so a test can keep one clone and hand another to
/// the code under test.
#[derive(Clone)]
pub struct MockCamera {
    state: Arc<MockCameraState>,
}

struct MockCameraState {
    deny_permission: AtomicBool,
    fail_frames: AtomicBool,
    format: FrameFormat,
    open_delay: Duration,
    opens: AtomicUsize,
    stops: AtomicUsize,
    frames_served: AtomicU64,
}

impl MockCamera {
    /// Camera that grants permission and streams synthetic MJPEG frames
    pub fn new() -> Self {
        Self::build(FrameFormat::Mjpeg, Duration::ZERO, false)
    }

    /// Camera whose permission prompt is always denied
    pub fn denied() -> Self {
        Self::build(FrameFormat::Mjpeg, Duration::ZERO, true)
    }

    /// Camera streaming frames in the given format
    pub fn with_format(format: FrameFormat) -> Self {
        Self::build(format, Duration::ZERO, false)
    }

    /// Camera that takes `delay` to answer the permission prompt
    pub fn with_open_delay(delay: Duration) -> Self {
        Self::build(FrameFormat::Mjpeg, delay, false)
    }

    fn build(format: FrameFormat, open_delay: Duration, deny_permission: bool) -> Self {
        Self {
            state: Arc::new(MockCameraState {
                deny_permission: AtomicBool::new(deny_permission),
                fail_frames: AtomicBool::new(false),
                format,
                open_delay,
                opens: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                frames_served: AtomicU64::new(0),
            }),
        }
    }

    pub fn set_permission_denied(&self, denied: bool) {
        self.state.deny_permission.store(denied, Ordering::SeqCst);
    }

    /// Make every subsequent frame read fail
    pub fn set_frames_failing(&self, failing: bool) {
        self.state.fail_frames.store(failing, Ordering::SeqCst);
    }

    /// Number of streams successfully opened
    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Number of stop calls received across all streams
    pub fn stop_count(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }

    /// Whether any opened stream has not been stopped yet
    pub fn is_streaming(&self) -> bool {
        self.open_count() > self.stop_count()
    }

    pub fn frames_served(&self) -> u64 {
        self.state.frames_served.load(Ordering::SeqCst)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraDevice for MockCamera {
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraStream>, CameraError> {
        if !self.state.open_delay.is_zero() {
            tokio::time::sleep(self.state.open_delay).await;
        }

        if self.state.deny_permission.load(Ordering::SeqCst) {
            debug!("Mock camera permission denied");
            return Err(CameraError::DeviceUnavailable {
                details: "permission denied".to_string(),
            });
        }

        self.state.opens.fetch_add(1, Ordering::SeqCst);
        debug!("Mock camera stream opened");

        Ok(Box::new(MockStream {
            state: Arc::clone(&self.state),
            resolution: config.resolution,
            stopped: false,
        }))
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}

struct MockStream {
    state: Arc<MockCameraState>,
    resolution: (u32, u32),
    stopped: bool,
}

impl CameraStream for MockStream {
    fn current_frame(&mut self) -> Result<FrameData, CameraError> {
        if self.stopped {
            return Err(CameraError::CaptureFailed {
                details: "stream stopped".to_string(),
            });
        }
        if self.state.fail_frames.load(Ordering::SeqCst) {
            return Err(CameraError::CaptureFailed {
                details: "mock frame failure".to_string(),
            });
        }

        let frame_id = self.state.frames_served.fetch_add(1, Ordering::SeqCst);
        let (width, height) = self.resolution;

        let data = match self.state.format {
            FrameFormat::Mjpeg => {
                let mut data = vec![
                    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01,
                    0x01, 0x00, 0x48, 0x00, 0x48, 0x00, 0x00,
                ];
                data.extend(vec![(frame_id % 256) as u8; 256]);
                data.extend_from_slice(&[0xFF, 0xD9]);
                data
            }
            format => vec![0x80; width as usize * height as usize * format.bytes_per_pixel()],
        };

        trace!("Generated mock frame {} ({}x{})", frame_id, width, height);

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            data,
            width,
            height,
            self.state.format,
        ))
    }

    // Counts every call so double releases show up in tests
    fn stop(&mut self) {
        self.stopped = true;
        self.state.stops.fetch_add(1, Ordering::SeqCst);
    }
}
