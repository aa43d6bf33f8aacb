// SPDX-License-Identifier: MPL-2.0

//! GStreamer pipeline for camera capture
//!
//! Builds a pipewiresrc pipeline that decodes and converts every source
//! format to RGBx before the appsink, so consumers never deal with raw
//! sensor formats. PipeWire handles device access and negotiation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::{VideoFormat, VideoInfo};
use tracing::{debug, error, info, warn};

use crate::camera::types::{
    CameraDevice, CameraFormat, CameraFrame, FrameReceiver, MediaKind, PixelFormat,
};
use crate::constants::{pipeline, timing};
use crate::errors::CameraError;

/// Handle over a running camera pipeline
///
/// Frames arrive on the receiver returned by [`CameraPipeline::open`].
/// Dropping the handle releases the device.
pub struct CameraPipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

impl CameraPipeline {
    /// Create and start a pipeline for the given device
    ///
    /// `format` constrains the negotiation to the chosen mode; None lets
    /// PipeWire auto-negotiate.
    pub fn open(
        device: &CameraDevice,
        format: Option<&CameraFormat>,
    ) -> Result<(Self, FrameReceiver), CameraError> {
        info!(device = %device.name, format = ?format.map(|f| f.to_string()), "Opening camera pipeline");

        gstreamer::init().map_err(|e| CameraError::InitializationFailed(e.to_string()))?;

        gstreamer::ElementFactory::find("pipewiresrc").ok_or_else(|| {
            CameraError::InitializationFailed("pipewiresrc not available".to_string())
        })?;

        let path_prop = pipewire_path(&device.path);
        let caps_filter = format.map(caps_filter).unwrap_or_default();
        let pipeline_str =
            build_pipeline_string(&path_prop, &caps_filter, format.map(|f| f.media));

        let pipeline = launch_with_retries(&pipeline_str)?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| CameraError::InitializationFailed("Failed to cast appsink".to_string()))?;

        appsink.set_property("emit-signals", true);
        appsink.set_property("sync", false); // Disable sync for lowest latency
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true); // Drop old frames if the consumer is slow
        appsink.set_property("enable-last-sample", false);

        let (frame_sender, frame_receiver) =
            futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY);

        let frame_counter = AtomicU64::new(0);
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|e| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to pull sample");
                        }
                        gstreamer::FlowError::Eos
                    })?;

                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            warn!(frame = frame_num, "Buffer marked as corrupted, skipping frame");
                        }
                        return Err(gstreamer::FlowError::Error);
                    }

                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info =
                        VideoInfo::from_caps(caps).map_err(|_| gstreamer::FlowError::Error)?;

                    let pixel_format = match video_info.format() {
                        VideoFormat::Rgbx | VideoFormat::Rgba => PixelFormat::Rgbx,
                        VideoFormat::Rgb => PixelFormat::Rgb24,
                        other => {
                            if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                                warn!(format = ?other, "Unexpected appsink format, skipping frame");
                            }
                            return Err(gstreamer::FlowError::Error);
                        }
                    };

                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        stride: video_info.stride()[0] as usize,
                        format: pixel_format,
                        data: Arc::from(map.as_slice()),
                    };

                    // Non-blocking send, the consumer keeps only the freshest frames
                    let mut sender = frame_sender.clone();
                    if let Err(e) = sender.try_send(frame)
                        && frame_num % timing::FRAME_LOG_INTERVAL == 0
                    {
                        debug!(frame = frame_num, error = ?e, "Frame dropped (channel full)");
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        info!("Camera pipeline running");
        Ok((Self { pipeline, appsink }, frame_receiver))
    }

    /// Stop the pipeline and release the device
    ///
    /// Safe to call more than once.
    pub fn stop(&mut self) {
        debug!("Stopping camera pipeline");

        // Clear appsink callbacks to release the frame sender
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop pipeline");
            return;
        }

        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        match result {
            Ok(_) => info!(state = ?state, "Camera pipeline stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}

/// Map a device path to the pipewiresrc property fragment
///
/// The returned fragment carries its own trailing space so it can be
/// spliced directly after `pipewiresrc `.
fn pipewire_path(device_path: &str) -> String {
    if device_path.is_empty() {
        // Empty path = PipeWire auto-select default camera
        debug!("Using default PipeWire camera (auto-select)");
        String::new()
    } else if device_path.starts_with("v4l2:") {
        format!("path={} ", device_path)
    } else if let Some(serial) = device_path.strip_prefix("pipewire-serial-") {
        format!("target-object={} ", serial)
    } else if let Some(node_id) = device_path.strip_prefix("pipewire-") {
        format!("target-object={} ", node_id)
    } else if device_path.starts_with("/dev/video") {
        // V4L2 device node exposed through PipeWire
        format!("path=v4l2:{} ", device_path)
    } else {
        warn!(device_path, "Unknown device path format, using path property");
        format!("path={} ", device_path)
    }
}

/// Build the caps fragment for a chosen format
fn caps_filter(format: &CameraFormat) -> String {
    match format.framerate {
        Some(fps) => format!(
            "width=(int){},height=(int){},framerate=(fraction){}/1",
            format.width, format.height, fps
        ),
        None => format!("width=(int){},height=(int){}", format.width, format.height),
    }
}

/// Build the full pipeline description
///
/// Every branch ends in videoconvert to RGBx so the appsink always sees
/// one of the two supported layouts.
fn build_pipeline_string(path_prop: &str, caps_filter: &str, media: Option<MediaKind>) -> String {
    let threads = pipeline::videoconvert_threads();

    if caps_filter.is_empty() {
        // No enumerated format, let PipeWire negotiate and decode whatever arrives
        return format!(
            "pipewiresrc {}do-timestamp=true ! decodebin ! \
             videoconvert n-threads={} ! video/x-raw,format={} ! appsink name=sink",
            path_prop,
            threads,
            pipeline::OUTPUT_FORMAT
        );
    }

    match media.unwrap_or_default() {
        MediaKind::Raw => format!(
            "pipewiresrc {}do-timestamp=true ! \
             queue max-size-buffers={} leaky=downstream ! \
             video/x-raw,{} ! \
             videoconvert n-threads={} ! video/x-raw,format={} ! appsink name=sink",
            path_prop,
            pipeline::MAX_BUFFERS,
            caps_filter,
            threads,
            pipeline::OUTPUT_FORMAT
        ),
        MediaKind::Mjpeg => format!(
            "pipewiresrc {}do-timestamp=true ! \
             queue max-size-buffers={} leaky=downstream ! \
             image/jpeg,{} ! jpegparse ! {} ! \
             videoconvert n-threads={} ! video/x-raw,format={} ! appsink name=sink",
            path_prop,
            pipeline::MAX_BUFFERS,
            caps_filter,
            mjpeg_decoder(),
            threads,
            pipeline::OUTPUT_FORMAT
        ),
        MediaKind::Other => format!(
            "pipewiresrc {}do-timestamp=true ! decodebin ! \
             videoconvert n-threads={} ! video/x-raw,format={} ! appsink name=sink",
            path_prop,
            threads,
            pipeline::OUTPUT_FORMAT
        ),
    }
}

/// Pick an available MJPEG decoder element
fn mjpeg_decoder() -> &'static str {
    for name in ["jpegdec", "avdec_mjpeg"] {
        if gstreamer::ElementFactory::find(name).is_some() {
            return name;
        }
    }
    "decodebin"
}

/// Launch with retries to handle PipeWire race conditions
fn launch_with_retries(pipeline_str: &str) -> Result<gstreamer::Pipeline, CameraError> {
    let mut last_error = None;
    for attempt in 1..=pipeline::CREATE_RETRIES {
        debug!(pipeline = %pipeline_str, attempt, "Attempting to launch pipeline");
        match try_launch(pipeline_str) {
            Ok(pipeline) => return Ok(pipeline),
            Err(e) => {
                if attempt < pipeline::CREATE_RETRIES {
                    warn!(
                        attempt,
                        max_attempts = pipeline::CREATE_RETRIES,
                        error = %e,
                        "Pipeline launch failed, retrying"
                    );
                    std::thread::sleep(pipeline::CREATE_RETRY_DELAY);
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| CameraError::InitializationFailed("Pipeline creation failed".into())))
}

/// Parse, start and validate one pipeline attempt
fn try_launch(pipeline_str: &str) -> Result<gstreamer::Pipeline, CameraError> {
    let parsed = gstreamer::parse::launch(pipeline_str)
        .map_err(|e| CameraError::InitializationFailed(format!("parse failed: {}", e)))?;
    let pipeline = parsed
        .dynamic_cast::<gstreamer::Pipeline>()
        .map_err(|_| CameraError::InitializationFailed("Failed to cast to pipeline".to_string()))?;

    if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
        let bus_error = drain_bus_error(&pipeline);
        cleanup(&pipeline);
        return Err(CameraError::InitializationFailed(
            bus_error.unwrap_or_else(|| format!("Failed to set pipeline to PLAYING: {}", e)),
        ));
    }

    let (result, state, pending) = pipeline.state(gstreamer::ClockTime::from_mseconds(
        timing::STATE_CHANGE_TIMEOUT_MS,
    ));
    debug!(?result, ?state, ?pending, "Pipeline state after launch");

    let reached = result.is_ok() && state == gstreamer::State::Playing;
    // Async transition to PLAYING is accepted, frames arrive once the
    // device is ready
    let transitioning = matches!(result, Ok(gstreamer::StateChangeSuccess::Async))
        && pending == gstreamer::State::Playing;

    if reached || transitioning {
        Ok(pipeline)
    } else {
        let bus_error = drain_bus_error(&pipeline);
        cleanup(&pipeline);
        Err(CameraError::InitializationFailed(bus_error.unwrap_or_else(
            || format!("Pipeline failed to start (state: {:?})", state),
        )))
    }
}

/// Pull the first error message off the bus, if any
fn drain_bus_error(pipeline: &gstreamer::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let msg = bus.timed_pop_filtered(
        gstreamer::ClockTime::from_mseconds(100),
        &[gstreamer::MessageType::Error],
    )?;
    match msg.view() {
        gstreamer::MessageView::Error(err) => {
            error!(
                error = %err.error(),
                debug = ?err.debug(),
                source = ?err.src().map(|s| s.name()),
                "GStreamer error during pipeline start"
            );
            Some(err.error().to_string())
        }
        _ => None,
    }
}

/// Return a failed pipeline to NULL so buffers are released
fn cleanup(pipeline: &gstreamer::Pipeline) {
    let _ = pipeline.set_state(gstreamer::State::Null);
    let _ = pipeline.state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
}
