// SPDX-License-Identifier: GPL-3.0-only

//! Events emitted by the booth controller for the interface layer

use std::path::PathBuf;

use crate::booth::gallery::PhotoId;
use crate::booth::session::SessionState;

/// Transient user-facing message shown in the status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CameraAccessFailed(String),
    CaptureFailed(String),
    NothingToExport,
    NothingToClear,
    ExportBusy,
    ExportFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::CameraAccessFailed(reason) => {
                format!("Could not access the camera: {}", reason)
            }
            Notice::CaptureFailed(reason) => format!("Capture failed: {}", reason),
            Notice::NothingToExport => "No photos to save yet".to_string(),
            Notice::NothingToClear => "The gallery is already empty".to_string(),
            Notice::ExportBusy => "An export is already running".to_string(),
            Notice::ExportFailed(reason) => format!("Export failed: {}", reason),
        }
    }
}

/// State change announcements, drained by the interface each tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoothEvent {
    SessionChanged(SessionState),
    GalleryChanged,
    /// A capture was accepted, show the flash cue
    Flash,
    Notice(Notice),
    PhotoExported { id: PhotoId, path: PathBuf },
    ExportFinished { total: usize, skipped: usize },
    ExportCancelled { remaining: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_messages_are_not_empty() {
        let notices = [
            Notice::CameraAccessFailed("denied".into()),
            Notice::CaptureFailed("encoder".into()),
            Notice::NothingToExport,
            Notice::NothingToClear,
            Notice::ExportBusy,
            Notice::ExportFailed("disk full".into()),
        ];
        for notice in notices {
            assert!(!notice.message().is_empty());
        }
    }
}
