// SPDX-License-Identifier: GPL-3.0-only

//! Camera discovery and format detection
//!
//! Devices are discovered through GStreamer's device monitor, which on
//! modern Linux surfaces PipeWire camera nodes. PipeWire handles access
//! and format negotiation internally.

use gstreamer::prelude::*;
use tracing::{debug, info, warn};

use crate::camera::types::{CameraDevice, CameraFormat, Facing, MediaKind};
use crate::errors::CameraError;

/// Enumerate available cameras
///
/// Returns at least one entry on a working PipeWire host: when the
/// monitor reports nothing, a generic auto-select device is returned so
/// the pipeline can let PipeWire pick the default camera.
pub fn enumerate_cameras() -> Result<Vec<CameraDevice>, CameraError> {
    gstreamer::init().map_err(|e| CameraError::InitializationFailed(e.to_string()))?;

    let mut devices = monitor_devices().unwrap_or_default();

    if devices.is_empty() {
        info!("No cameras enumerated, using PipeWire auto-selection");
        devices.push(CameraDevice {
            name: "Default Camera (PipeWire)".to_string(),
            path: String::new(), // Empty path = PipeWire auto-selects
            facing: None,
            formats: Vec::new(),
        });
    }

    debug!(count = devices.len(), "Enumerated cameras");
    Ok(devices)
}

/// Collect video source devices from the GStreamer device monitor
fn monitor_devices() -> Option<Vec<CameraDevice>> {
    let monitor = gstreamer::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);

    if let Err(err) = monitor.start() {
        warn!(error = %err, "Device monitor failed to start");
        return None;
    }

    let mut devices = Vec::new();
    for device in monitor.devices() {
        let name = device.display_name().to_string();
        let device_class = device.device_class().to_string();

        if !device_class.contains("Video/Source") {
            continue;
        }

        let props = device.properties();
        let path = device_path(props.as_ref());
        let facing = facing_hint(&name, props.as_ref());
        let formats = device
            .caps()
            .map(|caps| formats_from_caps(&caps))
            .unwrap_or_default();

        debug!(name = %name, path = %path, formats = formats.len(), "Found video camera");
        devices.push(CameraDevice {
            name,
            path,
            facing,
            formats,
        });
    }

    monitor.stop();
    Some(devices)
}

/// Derive the addressable path for a device
///
/// Priority: object.serial (addressed via target-object), then the
/// V4L2 device node, then empty for auto-selection.
fn device_path(props: Option<&gstreamer::Structure>) -> String {
    let Some(props) = props else {
        return String::new();
    };

    if let Ok(serial) = props.get::<u64>("object.serial") {
        return format!("pipewire-serial-{}", serial);
    }
    if let Ok(serial) = props.get::<String>("object.serial") {
        return format!("pipewire-serial-{}", serial);
    }
    if let Ok(node) = props.get::<String>("api.v4l2.path") {
        return node;
    }
    if let Ok(node) = props.get::<String>("device.path") {
        return node;
    }

    String::new()
}

/// Guess which way a camera faces from its properties and name
fn facing_hint(name: &str, props: Option<&gstreamer::Structure>) -> Option<Facing> {
    if let Some(props) = props
        && let Ok(location) = props.get::<String>("api.libcamera.location")
    {
        match location.as_str() {
            "front" => return Some(Facing::Front),
            "back" => return Some(Facing::Back),
            _ => {}
        }
    }

    let lowered = name.to_lowercase();
    if ["front", "user", "integrated", "built-in"]
        .iter()
        .any(|hint| lowered.contains(hint))
    {
        return Some(Facing::Front);
    }
    if ["back", "rear", "world"].iter().any(|hint| lowered.contains(hint)) {
        return Some(Facing::Back);
    }

    None
}

/// Parse fixed-size video modes out of device caps
///
/// Structures carrying ranges instead of fixed sizes are skipped; the
/// pipeline negotiates freely for those devices.
fn formats_from_caps(caps: &gstreamer::Caps) -> Vec<CameraFormat> {
    let mut formats = Vec::new();

    for structure in caps.iter() {
        let Ok(width) = structure.get::<i32>("width") else {
            continue;
        };
        let Ok(height) = structure.get::<i32>("height") else {
            continue;
        };
        if width <= 0 || height <= 0 {
            continue;
        }

        let framerate = structure
            .get::<gstreamer::Fraction>("framerate")
            .ok()
            .map(|f| {
                let numer = f.numer() as f64;
                let denom = (f.denom() as f64).max(1.0);
                (numer / denom).round() as u32
            })
            .filter(|fps| *fps > 0);

        formats.push(CameraFormat {
            width: width as u32,
            height: height as u32,
            framerate,
            media: MediaKind::from_caps_name(structure.name()),
        });
    }

    formats.sort_by_key(|f| (f.width, f.height, f.framerate, f.media));
    formats.dedup();
    formats
}
