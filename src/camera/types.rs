// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the camera backend

use std::fmt;
use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Camera facing preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    /// User-facing camera (selfie orientation)
    #[default]
    Front,
    /// World-facing camera
    Back,
    /// No preference, first enumerated device wins
    Any,
}

/// Pixel layout of decoded frames
///
/// The pipeline converts every source format before the appsink, so
/// consumers only ever see these two layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 bytes per pixel, R G B followed by a padding byte
    Rgbx,
    /// 3 bytes per pixel, packed R G B
    Rgb24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgbx => 4,
            PixelFormat::Rgb24 => 3,
        }
    }

    /// Map a GStreamer format name to a supported layout
    pub fn from_gst_name(name: &str) -> Option<Self> {
        match name {
            "RGBx" | "RGBA" => Some(PixelFormat::Rgbx),
            "RGB" => Some(PixelFormat::Rgb24),
            _ => None,
        }
    }
}

/// One decoded frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Native frame width in pixels
    pub width: u32,
    /// Native frame height in pixels
    pub height: u32,
    /// Bytes per row including padding
    pub stride: usize,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// Shared frame buffer
    pub data: Arc<[u8]>,
}

impl CameraFrame {
    /// Sample one pixel as RGB, None when out of bounds
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * self.format.bytes_per_pixel();
        let px = self.data.get(offset..offset + 3)?;
        Some((px[0], px[1], px[2]))
    }

    /// Copy the frame into a packed RGB raster at native size
    ///
    /// Row padding from the pipeline stride is dropped. Returns None if
    /// the buffer is shorter than the advertised dimensions.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let bpp = self.format.bytes_per_pixel();
        let mut raw = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height as usize {
            let row = self.data.get(y * self.stride..)?;
            for x in 0..self.width as usize {
                let px = row.get(x * bpp..x * bpp + 3)?;
                raw.extend_from_slice(px);
            }
        }
        RgbImage::from_raw(self.width, self.height, raw)
    }
}

/// Media type a camera emits for a given mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum MediaKind {
    /// Raw video, converted in-pipeline
    #[default]
    Raw,
    /// Motion JPEG, decoded in-pipeline
    Mjpeg,
    /// Anything else, routed through decodebin
    Other,
}

impl MediaKind {
    /// Map a caps structure name to a media kind
    pub fn from_caps_name(name: &str) -> Self {
        match name {
            "video/x-raw" => MediaKind::Raw,
            "image/jpeg" => MediaKind::Mjpeg,
            _ => MediaKind::Other,
        }
    }
}

/// One supported camera output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    /// Whole frames per second, None when the device does not say
    pub framerate: Option<u32>,
    /// Wire format of this mode
    pub media: MediaKind,
}

impl fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.framerate {
            Some(fps) => write!(f, "{}x{} @ {} fps", self.width, self.height, fps),
            None => write!(f, "{}x{}", self.width, self.height),
        }
    }
}

/// One enumerated camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    /// Human readable device name
    pub name: String,
    /// PipeWire path or serial used to address the device, empty for auto-select
    pub path: String,
    /// Facing hint from device properties, None when unknown
    pub facing: Option<Facing>,
    /// Supported output modes, may be empty when the device does not enumerate caps
    pub formats: Vec<CameraFormat>,
}

/// Constraints for opening a stream
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Ideal width, the closest supported size is chosen
    pub ideal_width: u32,
    /// Ideal height, the closest supported size is chosen
    pub ideal_height: u32,
    /// Facing preference for device selection
    pub facing: Facing,
    /// Pinned device path, overrides the facing preference
    pub camera_path: Option<String>,
}

/// Channel endpoints for frame delivery
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;
