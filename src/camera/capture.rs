use super::device::{CameraDevice, CameraStream, PreviewSink};
use crate::artifact::CaptureArtifact;
use crate::config::CameraConfig;
use crate::error::CameraError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Camera capture module: acquires handles, captures stills, releases devices
pub struct CameraCapture {
    device: Arc<dyn CameraDevice>,
    preview: Option<Arc<dyn PreviewSink>>,
    config: CameraConfig,
    active: Arc<AtomicBool>,
    handle_counter: AtomicU64,
}

/// Ownership of a live camera stream.
///
/// Released explicitly through [`CameraCapture::release`] or implicitly when
/// dropped; releasing more than once is a no-op.
pub struct CameraHandle {
    id: u64,
    stream: Arc<Mutex<Box<dyn CameraStream>>>,
    sink: Option<Arc<dyn PreviewSink>>,
    cancel: CancellationToken,
    preview_task: Option<JoinHandle<()>>,
    active: Arc<AtomicBool>,
    jpeg_quality: u8,
    released: bool,
}

/// Clears the single-handle slot if acquisition does not complete
struct SlotGuard {
    active: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.armed {
            self.active.store(false, Ordering::Release);
        }
    }
}

impl CameraCapture {
    pub fn new(device: Arc<dyn CameraDevice>, config: CameraConfig) -> Self {
        Self {
            device,
            preview: None,
            config,
            active: Arc::new(AtomicBool::new(false)),
            handle_counter: AtomicU64::new(0),
        }
    }

    /// Attach a sink that receives live preview frames
    pub fn with_preview(mut self, sink: Arc<dyn PreviewSink>) -> Self {
        self.preview = Some(sink);
        self
    }

    /// Whether a handle is currently live
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Request the device and start streaming to the preview sink
    pub async fn acquire(&self) -> Result<CameraHandle, CameraError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Camera acquire requested while a handle is still active");
            return Err(CameraError::AlreadyActive);
        }

        let mut guard = SlotGuard {
            active: Arc::clone(&self.active),
            armed: true,
        };

        info!(
            "Requesting camera {} ({}x{} @ {}fps)",
            self.device.name(),
            self.config.resolution.0,
            self.config.resolution.1,
            self.config.fps
        );

        let stream = self.device.open(&self.config).await.map_err(|e| {
            warn!("Camera acquisition failed: {}", e);
            e
        })?;

        let id = self.handle_counter.fetch_add(1, Ordering::Relaxed);
        let stream = Arc::new(Mutex::new(stream));
        let cancel = CancellationToken::new();

        let preview_task = self.preview.as_ref().map(|sink| {
            sink.attach(self.config.resolution);
            spawn_preview(
                Arc::clone(&stream),
                Arc::clone(sink),
                cancel.clone(),
                Duration::from_micros(1_000_000u64 / self.config.preview_fps.max(1) as u64),
            )
        });

        guard.armed = false;
        info!("Camera handle {} acquired", id);

        Ok(CameraHandle {
            id,
            stream,
            sink: self.preview.clone(),
            cancel,
            preview_task,
            active: Arc::clone(&self.active),
            jpeg_quality: self.config.jpeg_quality,
            released: false,
        })
    }

    /// Capture the current frame as a `CapturedLive` JPEG artifact
    pub fn capture_frame(&self, handle: &CameraHandle) -> Result<CaptureArtifact, CameraError> {
        handle.capture()
    }

    /// Stop the stream and detach the preview. Idempotent.
    pub fn release(&self, handle: &mut CameraHandle) {
        handle.release();
    }
}

impl CameraHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn capture(&self) -> Result<CaptureArtifact, CameraError> {
        if self.released {
            return Err(CameraError::HandleReleased);
        }

        let frame = self.stream.lock().current_frame()?;
        debug!(
            "Captured frame {} from handle {} ({}x{}, {:?})",
            frame.id, self.id, frame.width, frame.height, frame.format
        );

        CaptureArtifact::from_frame(&frame, self.jpeg_quality)
    }

    fn release(&mut self) {
        if self.released {
            trace!("Camera handle {} already released", self.id);
            return;
        }
        self.released = true;

        self.cancel.cancel();
        if let Some(task) = self.preview_task.take() {
            task.abort();
        }
        if let Some(sink) = &self.sink {
            sink.detach();
        }

        self.stream.lock().stop();
        self.active.store(false, Ordering::Release);

        info!("Camera handle {} released", self.id);
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.release();
    }
}

fn spawn_preview(
    stream: Arc<Mutex<Box<dyn CameraStream>>>,
    sink: Arc<dyn PreviewSink>,
    cancel: CancellationToken,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let frame = stream.lock().current_frame();
                    match frame {
                        Ok(frame) => sink.present(&frame),
                        Err(e) => trace!("Preview frame unavailable: {}", e),
                    }
                }
            }
        }

        debug!("Camera preview loop stopped");
    })
}
