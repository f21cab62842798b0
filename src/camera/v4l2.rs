use super::device::{CameraDevice, CameraStream};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::{ClockTime, Pipeline};
use gstreamer_app::AppSink;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// How long a frame read waits for the appsink before reusing the last frame
const FRAME_WAIT_MS: u64 = 200;

/// GStreamer-based V4L2 camera backend
pub struct GStreamerCamera;

impl GStreamerCamera {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GStreamerCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraDevice for GStreamerCamera {
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraStream>, CameraError> {
        let config = config.clone();
        let stream = tokio::task::spawn_blocking(move || GStreamerStream::start(&config))
            .await
            .map_err(|e| CameraError::DeviceUnavailable {
                details: format!("camera start task failed: {}", e),
            })??;

        Ok(Box::new(stream))
    }

    fn name(&self) -> String {
        "gstreamer-v4l2".to_string()
    }
}

struct GStreamerStream {
    pipeline: Pipeline,
    appsink: AppSink,
    frame_counter: u64,
    last_frame: Option<FrameData>,
}

impl GStreamerStream {
    fn start(config: &CameraConfig) -> Result<Self, CameraError> {
        let device = format!("/dev/video{}", config.index);
        if !Path::new(&device).exists() {
            return Err(CameraError::DeviceUnavailable {
                details: format!("{} not found", device),
            });
        }

        gstreamer::init().map_err(|e| CameraError::DeviceUnavailable {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let (width, height) = config.resolution;
        let pipeline_desc = format!(
            "v4l2src device={} io-mode=mmap ! \
             image/jpeg,width={},height={},framerate={}/1 ! \
             appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false",
            device, width, height, config.fps
        );

        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::DeviceUnavailable {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::DeviceUnavailable {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| CameraError::DeviceUnavailable {
                details: "Pipeline has no appsink".to_string(),
            })?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::DeviceUnavailable {
                details: format!("Failed to start pipeline: {}", e),
            })?;

        let (result, _, _) = pipeline.state(ClockTime::from_seconds(5));
        if let Err(e) = result {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CameraError::DeviceUnavailable {
                details: format!("Camera did not start streaming: {}", e),
            });
        }

        debug!("GStreamer pipeline playing on {}", device);

        Ok(Self {
            pipeline,
            appsink,
            frame_counter: 0,
            last_frame: None,
        })
    }

    fn sample_to_frame(&mut self, sample: gstreamer::Sample) -> Result<FrameData, CameraError> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureFailed {
            details: "No buffer in sample".to_string(),
        })?;

        let (width, height) = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .and_then(|s| Some((s.get::<i32>("width").ok()?, s.get::<i32>("height").ok()?)))
            .ok_or_else(|| CameraError::CaptureFailed {
                details: "Sample caps carry no resolution".to_string(),
            })?;

        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::CaptureFailed {
                details: format!("Failed to map buffer: {}", e),
            })?;

        let frame_id = self.frame_counter;
        self.frame_counter += 1;

        trace!("Captured MJPEG frame {} ({}x{}, {} bytes)", frame_id, width, height, map.len());

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width as u32,
            height as u32,
            FrameFormat::Mjpeg,
        ))
    }
}

impl CameraStream for GStreamerStream {
    fn current_frame(&mut self) -> Result<FrameData, CameraError> {
        match self
            .appsink
            .try_pull_sample(ClockTime::from_mseconds(FRAME_WAIT_MS))
        {
            Some(sample) => {
                let frame = self.sample_to_frame(sample)?;
                self.last_frame = Some(frame.clone());
                Ok(frame)
            }
            None => self.last_frame.clone().ok_or_else(|| CameraError::CaptureFailed {
                details: "No frame received from camera".to_string(),
            }),
        }
    }

    fn stop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop GStreamer pipeline: {}", e);
        } else {
            info!("GStreamer camera pipeline stopped");
        }
    }
}
