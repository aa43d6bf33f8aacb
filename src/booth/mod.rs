// SPDX-License-Identifier: GPL-3.0-only

//! Booth orchestration
//!
//! [`PhotoboothController`] wires user intents to the camera backend,
//! the gallery and the export scheduler. It is single-owner state:
//! background tasks never touch it directly, they report over
//! channels that [`PhotoboothController::pump`] drains on the
//! interface tick, so every mutation happens on the caller's thread.

pub mod artifact;
pub mod capture;
pub mod events;
pub mod export;
pub mod gallery;
pub mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::camera::{ActiveStream, CameraFrame, MediaSource, StreamRequest};
use crate::config::BoothConfig;
use crate::errors::{BoothResult, CameraError, CaptureError, ExportError, GalleryError};
use crate::storage;

pub use events::{BoothEvent, Notice};
pub use gallery::{CapturedPhoto, Gallery, PhotoId};
pub use session::SessionState;

use capture::EncodedStill;
use export::{ExportItem, ExportJob, ExportProgress};
use session::CameraSession;

/// Blocking yes/no decision, answered by the interface layer
pub trait ConfirmationPrompt {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Completions reported by background camera and encode tasks
enum TaskMessage {
    ActivationFinished {
        token: u64,
        result: Result<ActiveStream, CameraError>,
    },
    EncodeFinished(Result<EncodedStill, CaptureError>),
}

pub struct PhotoboothController {
    config: BoothConfig,
    source: Arc<dyn MediaSource>,
    request: StreamRequest,
    session: CameraSession,
    pending_activation: Option<u64>,
    stream: Option<ActiveStream>,
    current_frame: Option<CameraFrame>,
    gallery: Gallery,
    export_dir: PathBuf,
    export_job: Option<ExportJob>,
    tasks_tx: UnboundedSender<TaskMessage>,
    tasks_rx: UnboundedReceiver<TaskMessage>,
    progress_tx: UnboundedSender<ExportProgress>,
    progress_rx: UnboundedReceiver<ExportProgress>,
    events_tx: UnboundedSender<BoothEvent>,
}

impl PhotoboothController {
    /// Build a controller around a camera backend
    ///
    /// Returns the event stream the interface should drain.
    pub fn new(
        source: Arc<dyn MediaSource>,
        config: BoothConfig,
    ) -> (Self, UnboundedReceiver<BoothEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        let export_dir = config
            .export_dir
            .clone()
            .unwrap_or_else(storage::default_export_dir);
        let request = StreamRequest {
            ideal_width: config.ideal_width,
            ideal_height: config.ideal_height,
            facing: config.facing,
            camera_path: config.camera_path.clone(),
        };

        let controller = Self {
            config,
            source,
            request,
            session: CameraSession::new(),
            pending_activation: None,
            stream: None,
            current_frame: None,
            gallery: Gallery::new(),
            export_dir,
            export_job: None,
            tasks_tx,
            tasks_rx,
            progress_tx,
            progress_rx,
            events_tx,
        };

        (controller, events_rx)
    }

    /// Start the camera session
    ///
    /// The backend opens on the blocking pool; completion arrives via
    /// [`pump`](Self::pump). A deactivate issued before then orphans
    /// the attempt and the late stream is stopped on arrival.
    pub fn activate(&mut self) {
        if self.session.is_active() || self.pending_activation.is_some() {
            debug!("Activation requested while camera already starting or active");
            return;
        }

        let token = self.session.begin_activation();
        self.pending_activation = Some(token);
        info!("Starting camera session");

        let source = self.source.clone();
        let request = self.request.clone();
        let tasks = self.tasks_tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || source.open(&request))
                .await
                .unwrap_or_else(|e| {
                    Err(CameraError::InitializationFailed(format!(
                        "activation task error: {}",
                        e
                    )))
                });
            let _ = tasks.send(TaskMessage::ActivationFinished { token, result });
        });
    }

    /// Stop the camera session and release the device
    ///
    /// Safe to call at any time, including while activation is still
    /// in flight or the session is already inactive.
    pub fn deactivate(&mut self) {
        if !self.session.is_active() && self.pending_activation.is_none() && self.stream.is_none()
        {
            return;
        }

        self.session.deactivate();
        self.pending_activation = None;
        self.current_frame = None;
        if let Some(mut stream) = self.stream.take() {
            stream.control.stop();
        }
        info!("Camera session stopped");
        self.emit(BoothEvent::SessionChanged(SessionState::Inactive));
    }

    /// Flip the camera session on or off
    pub fn toggle_session(&mut self) {
        if self.session.is_active() || self.pending_activation.is_some() {
            self.deactivate();
        } else {
            self.activate();
        }
    }

    /// Capture a still from the most recent preview frame
    ///
    /// Ignored while the session is inactive or before the first
    /// frame arrives. Accepted captures flash immediately; the photo
    /// joins the gallery once encoding completes.
    pub fn capture(&mut self) {
        if !self.session.is_active() {
            debug!("Capture ignored, camera inactive");
            return;
        }
        let Some(frame) = self.current_frame.clone() else {
            debug!("Capture ignored, no frame received yet");
            return;
        };

        self.emit(BoothEvent::Flash);

        let tasks = self.tasks_tx.clone();
        tokio::spawn(async move {
            let result = capture::encode_still(frame).await;
            let _ = tasks.send(TaskMessage::EncodeFinished(result));
        });
    }

    /// Remove one photo and revoke its artifact
    pub fn delete_photo(&mut self, id: PhotoId) -> BoothResult<()> {
        let photo = self.gallery.remove(id)?;
        debug!(id = %photo.id, remaining = self.gallery.len(), "Photo deleted");
        self.emit(BoothEvent::GalleryChanged);
        Ok(())
    }

    /// Save one photo to the export directory
    pub fn export_photo(&mut self, id: PhotoId) -> BoothResult<()> {
        let photo = self
            .gallery
            .photo(id)
            .ok_or(GalleryError::PhotoNotFound(id))?;
        let bytes = self
            .gallery
            .resolve(photo.artifact)
            .ok_or(ExportError::ArtifactRevoked)?;

        storage::ensure_dir(&self.export_dir)?;
        let path = self.export_dir.join(export::export_filename(photo.captured_at));
        export::spawn_write(id, bytes, path, self.progress_tx.clone());
        Ok(())
    }

    /// Save every gallery photo on a staggered schedule
    ///
    /// The gallery is snapshotted now; photos deleted before their
    /// slot fires are skipped. Refused while a schedule is running.
    pub fn export_all(&mut self) {
        if let Some(job) = &self.export_job
            && !job.is_finished()
        {
            self.emit(BoothEvent::Notice(Notice::ExportBusy));
            return;
        }
        if self.gallery.is_empty() {
            self.emit(BoothEvent::Notice(Notice::NothingToExport));
            return;
        }
        if let Err(e) = storage::ensure_dir(&self.export_dir) {
            warn!(error = %e, "Could not prepare export directory");
            self.emit(BoothEvent::Notice(Notice::ExportFailed(e.to_string())));
            return;
        }

        let items: Vec<ExportItem> = self
            .gallery
            .photos()
            .iter()
            .map(|p| ExportItem {
                id: p.id,
                handle: p.artifact,
                captured_at: p.captured_at,
            })
            .collect();

        info!(
            count = items.len(),
            dir = %self.export_dir.display(),
            "Starting gallery export"
        );
        self.export_job = Some(ExportJob::start(
            items,
            self.gallery.store(),
            self.export_dir.clone(),
            self.progress_tx.clone(),
        ));
    }

    /// Stop a running export schedule
    pub fn cancel_export(&mut self) {
        if let Some(job) = &mut self.export_job {
            job.cancel();
        }
    }

    /// Remove every photo after the user confirms
    ///
    /// An empty gallery is announced without prompting.
    pub fn clear_gallery(&mut self, prompt: &mut dyn ConfirmationPrompt) {
        if self.gallery.is_empty() {
            self.emit(BoothEvent::Notice(Notice::NothingToClear));
            return;
        }

        let question = format!("Delete all {} photos?", self.gallery.len());
        if !prompt.confirm(&question) {
            debug!("Gallery clear declined");
            return;
        }

        let removed = self.gallery.clear_all();
        info!(removed, "Gallery cleared");
        self.emit(BoothEvent::GalleryChanged);
    }

    /// Flip preview mirroring and persist the choice
    pub fn toggle_mirror(&mut self) {
        self.config.mirror_preview = !self.config.mirror_preview;
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Could not persist configuration");
        }
    }

    /// Open the export directory in the system file manager
    pub fn open_export_dir(&mut self) {
        if let Err(e) = storage::ensure_dir(&self.export_dir) {
            warn!(error = %e, "Could not prepare export directory");
            self.emit(BoothEvent::Notice(Notice::ExportFailed(e.to_string())));
            return;
        }
        info!(path = %self.export_dir.display(), "Opening export directory");
        if let Err(e) = open::that(&self.export_dir) {
            error!(error = %e, path = %self.export_dir.display(), "Failed to open export directory");
        }
    }

    /// Drain frames and task completions
    ///
    /// Call once per interface tick. Gallery appends, session
    /// transitions and export progress all land here, in completion
    /// order.
    pub fn pump(&mut self) {
        self.drain_frames();
        while let Ok(message) = self.tasks_rx.try_recv() {
            self.handle_task(message);
        }
        while let Ok(progress) = self.progress_rx.try_recv() {
            self.handle_export_progress(progress);
        }
    }

    /// Release the camera and stop background work
    pub fn shutdown(&mut self) {
        self.cancel_export();
        self.export_job = None;
        self.deactivate();
        info!("Photobooth shut down");
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    /// Whether an activation attempt is still in flight
    pub fn is_starting(&self) -> bool {
        self.pending_activation.is_some()
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn current_frame(&self) -> Option<&CameraFrame> {
        self.current_frame.as_ref()
    }

    pub fn device_name(&self) -> Option<&str> {
        self.stream.as_ref().map(|s| s.device_name.as_str())
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn export_running(&self) -> bool {
        self.export_job.as_ref().is_some_and(|j| !j.is_finished())
    }

    pub fn mirror_preview(&self) -> bool {
        self.config.mirror_preview
    }

    fn drain_frames(&mut self) {
        let mut ended = false;
        if let Some(stream) = &mut self.stream {
            loop {
                match stream.frames.try_next() {
                    Ok(Some(frame)) => self.current_frame = Some(frame),
                    Ok(None) => {
                        ended = true;
                        break;
                    }
                    Err(_) => break,
                }
            }
        }
        if ended {
            warn!("Camera stream ended unexpectedly");
            self.deactivate();
            self.emit(BoothEvent::Notice(Notice::CameraAccessFailed(
                CameraError::Disconnected.to_string(),
            )));
        }
    }

    fn handle_task(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::ActivationFinished { token, result } => match result {
                Ok(mut stream) => {
                    if self.session.complete_activation(token) {
                        self.pending_activation = None;
                        info!(device = %stream.device_name, "Camera session active");
                        self.stream = Some(stream);
                        self.emit(BoothEvent::SessionChanged(SessionState::Active));
                    } else {
                        warn!(device = %stream.device_name, "Discarding stale camera activation");
                        stream.control.stop();
                    }
                }
                Err(e) => {
                    if self.session.is_current(token) {
                        self.pending_activation = None;
                        warn!(error = %e, "Camera activation failed");
                        self.emit(BoothEvent::Notice(Notice::CameraAccessFailed(e.to_string())));
                    } else {
                        debug!(error = %e, "Stale camera activation failed");
                    }
                }
            },
            TaskMessage::EncodeFinished(result) => match result {
                Ok(still) => {
                    let id = self.gallery.append(still.bytes, still.captured_at);
                    debug!(%id, total = self.gallery.len(), "Photo added to gallery");
                    self.emit(BoothEvent::GalleryChanged);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to encode still");
                    self.emit(BoothEvent::Notice(Notice::CaptureFailed(e.to_string())));
                }
            },
        }
    }

    fn handle_export_progress(&mut self, progress: ExportProgress) {
        match progress {
            ExportProgress::Item { id, result } => match result {
                Ok(path) => self.emit(BoothEvent::PhotoExported { id, path }),
                Err(e) => self.emit(BoothEvent::Notice(Notice::ExportFailed(e.to_string()))),
            },
            ExportProgress::Skipped { id } => {
                debug!(%id, "Export slot skipped");
            }
            ExportProgress::Finished { total, skipped } => {
                info!(total, skipped, "Export schedule finished");
                self.export_job = None;
                self.emit(BoothEvent::ExportFinished { total, skipped });
            }
            ExportProgress::Cancelled { remaining } => {
                info!(remaining, "Export schedule cancelled");
                self.export_job = None;
                self.emit(BoothEvent::ExportCancelled { remaining });
            }
        }
    }

    fn emit(&self, event: BoothEvent) {
        let _ = self.events_tx.send(event);
    }
}
