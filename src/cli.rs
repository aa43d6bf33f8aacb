// SPDX-License-Identifier: GPL-3.0-only

//! Headless CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras and their formats
//! - Capturing a single photo without the interface

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use photobooth::booth::capture::encode_still;
use photobooth::booth::export::export_filename;
use photobooth::camera::enumeration::enumerate_cameras;
use photobooth::camera::{CameraFrame, GstCamera, MediaSource, StreamRequest};
use photobooth::config::BoothConfig;
use photobooth::constants::timing;
use photobooth::storage;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_cameras()?;

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);

        if !camera.formats.is_empty() {
            // Group formats by resolution and keep the best framerate
            let mut resolutions: Vec<(u32, u32, u32)> = Vec::new();
            for format in &camera.formats {
                let fps = format.framerate.unwrap_or(30);
                if let Some(existing) = resolutions
                    .iter_mut()
                    .find(|(w, h, _)| *w == format.width && *h == format.height)
                {
                    if fps > existing.2 {
                        existing.2 = fps;
                    }
                } else {
                    resolutions.push((format.width, format.height, fps));
                }
            }

            // Sort by resolution (highest first)
            resolutions.sort_by(|a, b| (b.0 * b.1).cmp(&(a.0 * a.1)));

            // Show top 3 resolutions
            let display_count = resolutions.len().min(3);
            let res_strs: Vec<String> = resolutions
                .iter()
                .take(display_count)
                .map(|(w, h, fps)| format!("{}x{}@{}fps", w, h, fps))
                .collect();

            println!("      Formats: {}", res_strs.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Capture one photo and write it to disk
///
/// A camera index from `list` pins the device; without one the
/// configured preferences apply. Ctrl+C aborts the warm-up wait.
pub fn snap(
    camera_index: Option<usize>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = BoothConfig::load();

    let mut request = StreamRequest {
        ideal_width: config.ideal_width,
        ideal_height: config.ideal_height,
        facing: config.facing,
        camera_path: config.camera_path.clone(),
    };

    if let Some(index) = camera_index {
        let cameras = enumerate_cameras()?;
        let camera = cameras.get(index).ok_or_else(|| {
            format!(
                "Camera index {} out of range (0-{})",
                index,
                cameras.len().saturating_sub(1)
            )
        })?;
        request.camera_path = Some(camera.path.clone());
    }

    let source = GstCamera;
    let mut stream = source.open(&request)?;
    println!("Using camera: {}", stream.device_name);
    println!("Capturing...");

    // Abort the warm-up wait on Ctrl+C
    let abort = Arc::new(AtomicBool::new(false));
    let abort_flag = abort.clone();
    ctrlc::set_handler(move || {
        abort_flag.store(true, Ordering::SeqCst);
    })?;

    let frame = wait_for_frame(&mut stream.frames, &abort);
    stream.control.stop();
    let frame = frame.ok_or("Failed to capture a frame from the camera")?;

    let runtime = tokio::runtime::Runtime::new()?;
    let still = runtime.block_on(encode_still(frame))?;

    let path = match output {
        Some(path) if !path.is_dir() => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
        Some(dir) => dir.join(export_filename(still.captured_at)),
        None => {
            let dir = config
                .export_dir
                .clone()
                .unwrap_or_else(storage::default_export_dir);
            storage::ensure_dir(&dir)?;
            dir.join(export_filename(still.captured_at))
        }
    };

    std::fs::write(&path, &still.bytes)?;
    println!("Photo saved: {}", path.display());
    Ok(())
}

/// Wait out the camera warm-up and return a stable frame
///
/// Early frames from a cold sensor are often dark or garbage, so
/// frames from the first half second are discarded.
fn wait_for_frame(
    frames: &mut photobooth::camera::FrameReceiver,
    abort: &AtomicBool,
) -> Option<CameraFrame> {
    let start = Instant::now();
    let timeout = Duration::from_secs(timing::WARMUP_TIMEOUT_SECS);
    let warmup = Duration::from_millis(500);
    let mut frame: Option<CameraFrame> = None;

    while start.elapsed() < timeout {
        if abort.load(Ordering::SeqCst) {
            println!();
            println!("Aborted");
            return None;
        }

        match frames.try_next() {
            Ok(Some(f)) => {
                frame = Some(f);
                // After the warm-up period, use the next good frame
                if start.elapsed() > warmup {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => {
                // No frame available yet, wait a bit
                std::thread::sleep(timing::TICK_INTERVAL);
            }
        }
    }

    frame
}
