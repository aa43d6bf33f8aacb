// SPDX-License-Identifier: MPL-2.0

//! Still capture encoding
//!
//! Turns the most recent preview frame into a JPEG on the blocking
//! pool. The capture timestamp is taken when encoding completes, the
//! same instant the photo becomes part of the gallery, so gallery
//! order and timestamps always agree.

use std::io::Cursor;

use image::{ExtendedColorType, RgbImage, codecs::jpeg::JpegEncoder};
use tracing::debug;

use crate::camera::CameraFrame;
use crate::constants::capture;
use crate::errors::CaptureError;

/// A finished JPEG still, ready for the gallery
#[derive(Debug, Clone)]
pub struct EncodedStill {
    pub bytes: Vec<u8>,
    /// Milliseconds since the Unix epoch, taken at encode completion
    pub captured_at: i64,
}

/// Encode a camera frame as a JPEG still
///
/// Runs on the blocking pool since encoding is CPU-bound.
pub async fn encode_still(frame: CameraFrame) -> Result<EncodedStill, CaptureError> {
    tokio::task::spawn_blocking(move || {
        let image = frame
            .to_rgb_image()
            .ok_or_else(|| CaptureError::EncodingFailed("frame buffer truncated".to_string()))?;
        let bytes = encode_jpeg(&image)?;
        let captured_at = chrono::Utc::now().timestamp_millis();

        debug!(
            size = bytes.len(),
            width = image.width(),
            height = image.height(),
            "Still encoded"
        );

        Ok(EncodedStill { bytes, captured_at })
    })
    .await
    .map_err(|e| CaptureError::EncodingFailed(format!("encoding task error: {}", e)))?
}

fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, capture::JPEG_QUALITY);

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;

    Ok(buffer)
}
