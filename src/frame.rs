use crate::error::CameraError;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Frame format enumeration supporting different video formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Motion JPEG format - compressed JPEG frames
    Mjpeg,
    /// YUV 4:2:2 format - uncompressed YUV data
    Yuyv,
    /// RGB24 format - uncompressed RGB data
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Mjpeg => 0, // Variable size, compressed
            FrameFormat::Yuyv => 2,
            FrameFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// A single frame read from a camera stream
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Frame sequence number within its stream
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared with the preview sink)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => !self.data.is_empty(),
        }
    }

    /// Rasterize the frame into a JPEG image at its native resolution
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, CameraError> {
        if !self.validate_size() {
            return Err(CameraError::Encode {
                details: format!(
                    "frame {} has {} bytes, expected {:?} for {}x{} {:?}",
                    self.id,
                    self.data.len(),
                    self.expected_size(),
                    self.width,
                    self.height,
                    self.format
                ),
            });
        }

        match self.format {
            FrameFormat::Mjpeg => Ok(self.data.as_ref().clone()),
            FrameFormat::Rgb24 => encode_rgb(&self.data, self.width, self.height, quality),
            FrameFormat::Yuyv => {
                let rgb = yuyv_to_rgb(&self.data);
                encode_rgb(&rgb, self.width, self.height, quality)
            }
        }
    }
}

fn encode_rgb(rgb: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, CameraError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode(rgb, width, height, ColorType::Rgb8)
        .map_err(|e| CameraError::Encode {
            details: e.to_string(),
        })?;
    Ok(buffer)
}

/// Convert packed YUYV (4:2:2) pixels to RGB24 using BT.601 coefficients
fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);

    for chunk in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        for y in [y0, y1] {
            let c = y as f32 - 16.0;
            let d = u as f32 - 128.0;
            let e = v as f32 - 128.0;

            let r = 1.164 * c + 1.596 * e;
            let g = 1.164 * c - 0.392 * d - 0.813 * e;
            let b = 1.164 * c + 2.017 * d;

            rgb.push(r.clamp(0.0, 255.0) as u8);
            rgb.push(g.clamp(0.0, 255.0) as u8);
            rgb.push(b.clamp(0.0, 255.0) as u8);
        }
    }

    rgb
}
