// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend
//!
//! The [`MediaSource`] trait is the seam between the booth controller
//! and the GStreamer machinery, so the controller can be driven by a
//! synthetic source in tests.

pub mod enumeration;
pub mod pipeline;
pub mod types;

use tracing::{debug, warn};

pub use pipeline::CameraPipeline;
pub use types::{
    CameraDevice, CameraFormat, CameraFrame, Facing, FrameReceiver, PixelFormat, StreamRequest,
};

use crate::errors::CameraError;

/// Control half of an open stream
pub trait StreamControl: Send {
    /// Stop the stream and release the device
    fn stop(&mut self);
}

impl StreamControl for CameraPipeline {
    fn stop(&mut self) {
        CameraPipeline::stop(self);
    }
}

/// An acquired camera stream
pub struct ActiveStream {
    /// Handle used to release the stream
    pub control: Box<dyn StreamControl>,
    /// Decoded frames, freshest-wins
    pub frames: FrameReceiver,
    /// Name of the device backing the stream
    pub device_name: String,
}

/// Acquisition of camera streams
pub trait MediaSource: Send + Sync {
    /// Open a stream honoring the request's preferences
    ///
    /// Fails when no device is usable; preferences (size, facing) are
    /// ideals and never the cause of a failure on their own.
    fn open(&self, request: &StreamRequest) -> Result<ActiveStream, CameraError>;
}

/// Production media source backed by GStreamer/PipeWire
#[derive(Debug, Default)]
pub struct GstCamera;

impl MediaSource for GstCamera {
    fn open(&self, request: &StreamRequest) -> Result<ActiveStream, CameraError> {
        let devices = enumeration::enumerate_cameras()?;
        let device = pick_device(&devices, request).ok_or(CameraError::NoCameraFound)?;
        let format = select_format(&device.formats, request.ideal_width, request.ideal_height);
        debug!(
            device = %device.name,
            format = ?format.as_ref().map(|f| f.to_string()),
            "Selected camera"
        );

        let (pipeline, frames) = CameraPipeline::open(device, format.as_ref())?;
        Ok(ActiveStream {
            control: Box::new(pipeline),
            frames,
            device_name: device.name.clone(),
        })
    }
}

/// Choose the device for a request
///
/// A pinned path wins when it still enumerates. Otherwise the facing
/// preference picks the first matching device, falling back to the
/// first device overall.
fn pick_device<'a>(
    devices: &'a [CameraDevice],
    request: &StreamRequest,
) -> Option<&'a CameraDevice> {
    if let Some(pinned) = &request.camera_path {
        match devices.iter().find(|d| &d.path == pinned) {
            Some(device) => return Some(device),
            None => warn!(path = %pinned, "Pinned camera not found, using preference"),
        }
    }

    if request.facing != Facing::Any
        && let Some(device) = devices.iter().find(|d| d.facing == Some(request.facing))
    {
        return Some(device);
    }

    devices.first()
}

/// Choose the supported mode closest to the ideal size
///
/// Distance is measured in pixel count, so an unsupported exact size
/// degrades to the nearest neighbour instead of failing. Ties prefer
/// cheaper wire formats and rates close to 30 fps.
fn select_format(formats: &[CameraFormat], ideal_width: u32, ideal_height: u32) -> Option<CameraFormat> {
    let target = ideal_width as i64 * ideal_height as i64;
    formats
        .iter()
        .min_by_key(|f| {
            let pixels = f.width as i64 * f.height as i64;
            let fps_distance = f
                .framerate
                .map(|fps| (fps as i64 - 30).abs())
                .unwrap_or(0);
            ((pixels - target).abs(), f.media, fps_distance)
        })
        .copied()
}
