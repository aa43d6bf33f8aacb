// SPDX-License-Identifier: MPL-2.0

//! Staggered gallery export
//!
//! Bulk export fires one save per gallery photo, spaced by a fixed
//! interval so a large gallery does not hammer the disk all at once.
//! Artifact handles are resolved at fire time: a photo removed after
//! scheduling is skipped, never written from stale bytes. Writes run
//! on the blocking pool and report back over the progress channel
//! without holding up the schedule.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc::UnboundedSender, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::booth::artifact::{ArtifactHandle, ArtifactStore};
use crate::booth::gallery::PhotoId;
use crate::constants::export;
use crate::errors::ExportError;

/// Build the on-disk name for a still captured at the given timestamp
pub fn export_filename(captured_at: i64) -> String {
    format!(
        "{}{}.{}",
        export::FILE_PREFIX,
        captured_at,
        export::FILE_EXTENSION
    )
}

/// Snapshot of one gallery photo taken when the export was requested
#[derive(Debug, Clone)]
pub struct ExportItem {
    pub id: PhotoId,
    pub handle: ArtifactHandle,
    pub captured_at: i64,
}

/// Progress reports from export tasks
#[derive(Debug)]
pub enum ExportProgress {
    /// A write finished, successfully or not
    Item {
        id: PhotoId,
        result: Result<PathBuf, ExportError>,
    },
    /// The photo was removed before its slot fired
    Skipped { id: PhotoId },
    /// Every scheduled slot has fired
    Finished { total: usize, skipped: usize },
    /// The schedule was stopped early
    Cancelled { remaining: usize },
}

/// A running bulk export schedule
#[derive(Debug)]
pub struct ExportJob {
    stop: Option<oneshot::Sender<()>>,
    schedule: JoinHandle<()>,
}

impl ExportJob {
    /// Start a schedule over the given snapshot
    ///
    /// The first photo fires immediately, each following photo one
    /// stagger interval after the previous.
    pub fn start(
        items: Vec<ExportItem>,
        store: ArtifactStore,
        dir: PathBuf,
        progress: UnboundedSender<ExportProgress>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let total = items.len();

        let schedule = tokio::spawn(async move {
            let mut skipped = 0usize;

            for (index, item) in items.into_iter().enumerate() {
                if index > 0 {
                    tokio::select! {
                        _ = &mut stop_rx => {
                            debug!(delivered = index, "Export schedule stopped");
                            let _ = progress.send(ExportProgress::Cancelled {
                                remaining: total - index,
                            });
                            return;
                        }
                        _ = tokio::time::sleep(export::STAGGER_INTERVAL) => {}
                    }
                }

                match store.resolve(item.handle) {
                    Some(bytes) => {
                        let path = dir.join(export_filename(item.captured_at));
                        spawn_write(item.id, bytes, path, progress.clone());
                    }
                    None => {
                        skipped += 1;
                        debug!(id = %item.id, "Skipping photo removed before its export slot");
                        let _ = progress.send(ExportProgress::Skipped { id: item.id });
                    }
                }
            }

            let _ = progress.send(ExportProgress::Finished { total, skipped });
        });

        Self {
            stop: Some(stop_tx),
            schedule,
        }
    }

    /// Stop firing further slots; writes already started keep running
    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.schedule.is_finished()
    }
}

/// Write one still to disk without blocking the caller
pub fn spawn_write(
    id: PhotoId,
    bytes: Arc<[u8]>,
    path: PathBuf,
    progress: UnboundedSender<ExportProgress>,
) {
    tokio::spawn(async move {
        let write_path = path.clone();
        let result = tokio::task::spawn_blocking(move || std::fs::write(&write_path, &bytes))
            .await
            .map_err(|e| ExportError::WriteFailed(format!("write task error: {}", e)))
            .and_then(|written| written.map_err(ExportError::from));

        let result = match result {
            Ok(()) => {
                info!(path = %path.display(), "Photo saved");
                Ok(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save photo");
                Err(e)
            }
        };

        let _ = progress.send(ExportProgress::Item { id, result });
    });
}
