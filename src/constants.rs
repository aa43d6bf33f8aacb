// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Still capture constants
pub mod capture {
    use super::Duration;

    /// JPEG quality factor for captured stills (0.95 on the 0.0-1.0 scale)
    pub const JPEG_QUALITY: u8 = 95;

    /// Duration of the cosmetic flash cue shown on capture
    ///
    /// The cue is decoupled from encode completion; it fires when the
    /// capture is triggered.
    pub const FLASH_DURATION: Duration = Duration::from_millis(500);
}

/// Export constants
pub mod export {
    use super::Duration;

    /// Delay between successive items of a bulk export
    ///
    /// Item `i` of an export-all job fires no earlier than `i` times
    /// this interval after the job starts.
    pub const STAGGER_INTERVAL: Duration = Duration::from_millis(500);

    /// Filename prefix for exported photos
    pub const FILE_PREFIX: &str = "photobooth-";

    /// Filename extension for exported photos
    pub const FILE_EXTENSION: &str = "jpg";

    /// Subfolder under the pictures directory for exports
    pub const DEFAULT_SAVE_FOLDER: &str = "Photobooth";
}

/// Camera defaults
pub mod camera_defaults {
    /// Preferred capture width (ideal, not required)
    pub const IDEAL_WIDTH: u32 = 640;

    /// Preferred capture height (ideal, not required)
    pub const IDEAL_HEIGHT: u32 = 480;
}

/// GStreamer pipeline constants
pub mod pipeline {
    use super::Duration;

    /// Maximum buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Number of pipeline creation attempts before giving up
    pub const CREATE_RETRIES: u32 = 5;

    /// Delay between pipeline creation attempts
    pub const CREATE_RETRY_DELAY: Duration = Duration::from_millis(500);

    /// Bounded capacity of the frame channel between appsink and consumer
    pub const FRAME_CHANNEL_CAPACITY: usize = 10;

    /// Get number of threads for videoconvert based on available CPU threads
    pub fn videoconvert_threads() -> u32 {
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4)
    }

    /// Output pixel format for appsink
    /// RGBx uses 4 bytes/pixel with a padding byte, cheap to sample
    pub const OUTPUT_FORMAT: &str = "RGBx";
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Frame counter modulo for periodic drop logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// GStreamer state change timeout for validation
    pub const STATE_CHANGE_TIMEOUT_MS: u64 = 50;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Input poll interval for the terminal loop (~60 fps)
    pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

    /// How long a status notice stays visible in the terminal UI
    pub const NOTICE_DURATION: Duration = Duration::from_secs(4);

    /// Warm-up timeout for the first frame in headless capture
    pub const WARMUP_TIMEOUT_SECS: u64 = 5;
}

/// Resolution labels for the status bar
pub fn get_resolution_label(width: u32) -> Option<&'static str> {
    match width {
        w if w >= 3840 => Some("4K"), // 3840x2160
        w if w >= 2560 => Some("2K"), // 2560x1440
        w if w >= 1920 => Some("HD"), // 1920x1080
        w if w >= 1280 => Some("720p"),
        w if w >= 640 => Some("SD"), // 640x480
        _ => None,
    }
}

/// Tail of the stagger schedule for a bulk export of `count` items
///
/// The last item of an export-all job fires at `(count - 1)` stagger
/// intervals after the job starts.
pub fn export_schedule_length(count: usize) -> Duration {
    match count {
        0 => Duration::ZERO,
        n => export::STAGGER_INTERVAL * (n as u32 - 1),
    }
}
