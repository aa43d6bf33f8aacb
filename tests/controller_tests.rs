// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the booth controller
//!
//! The controller is driven through a synthetic media source, so every
//! test runs without a camera or a GStreamer install.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use photobooth::booth::export::export_filename;
use photobooth::booth::{BoothEvent, ConfirmationPrompt, Notice, PhotoboothController};
use photobooth::camera::types::FrameSender;
use photobooth::camera::{
    ActiveStream, CameraFrame, MediaSource, PixelFormat, StreamControl, StreamRequest,
};
use photobooth::config::BoothConfig;
use photobooth::errors::{BoothError, CameraError};
use tokio::sync::mpsc::UnboundedReceiver;

struct FakeControl {
    stopped: Arc<AtomicBool>,
}

impl StreamControl for FakeControl {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Synthetic camera: grants or denies activation, delivers one frame
struct FakeSource {
    deny: bool,
    /// While set, `open` blocks to simulate slow device startup
    hold: Arc<AtomicBool>,
    /// Set once the most recently opened stream is stopped
    stopped: Arc<AtomicBool>,
    senders: Mutex<Vec<FrameSender>>,
}

impl FakeSource {
    fn granting() -> Self {
        Self {
            deny: false,
            hold: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            senders: Mutex::new(Vec::new()),
        }
    }

    fn denying() -> Self {
        Self {
            deny: true,
            ..Self::granting()
        }
    }
}

impl MediaSource for FakeSource {
    fn open(&self, _request: &StreamRequest) -> Result<ActiveStream, CameraError> {
        while self.hold.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(5));
        }
        if self.deny {
            return Err(CameraError::AccessDenied("permission denied".to_string()));
        }

        let (mut sender, receiver) = futures::channel::mpsc::channel(8);
        let _ = sender.try_send(test_frame());
        // Keep the sender alive so the stream does not appear to end
        self.senders.lock().unwrap().push(sender);

        Ok(ActiveStream {
            control: Box::new(FakeControl {
                stopped: self.stopped.clone(),
            }),
            frames: receiver,
            device_name: "Synthetic Camera".to_string(),
        })
    }
}

fn test_frame() -> CameraFrame {
    let width = 4usize;
    let height = 4usize;
    let mut data = Vec::with_capacity(width * height * 4);
    for _ in 0..width * height {
        data.extend_from_slice(&[180, 90, 30, 255]);
    }
    CameraFrame {
        width: width as u32,
        height: height as u32,
        stride: width * 4,
        format: PixelFormat::Rgbx,
        data: Arc::from(data),
    }
}

fn booth_config(export_dir: &std::path::Path) -> BoothConfig {
    BoothConfig {
        export_dir: Some(export_dir.to_path_buf()),
        ..BoothConfig::default()
    }
}

/// Pump the controller until the predicate holds or a deadline passes
async fn pump_until<F>(controller: &mut PhotoboothController, pred: F) -> bool
where
    F: Fn(&PhotoboothController) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        controller.pump();
        if pred(controller) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn drain_events(events: &mut UnboundedReceiver<BoothEvent>) -> Vec<BoothEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Activate the camera and wait for the first preview frame
async fn activate_and_warm(controller: &mut PhotoboothController) {
    controller.activate();
    assert!(
        pump_until(controller, |c| c.is_active() && c.current_frame().is_some()).await,
        "camera should activate and deliver a frame"
    );
}

/// Capture and wait until the gallery reaches the expected size
async fn capture_and_wait(controller: &mut PhotoboothController, expected: usize) {
    controller.capture();
    assert!(
        pump_until(controller, |c| c.gallery().len() >= expected).await,
        "capture should land in the gallery"
    );
}

struct ScriptedPrompt {
    answer: bool,
    asked: usize,
}

impl ConfirmationPrompt for ScriptedPrompt {
    fn confirm(&mut self, _question: &str) -> bool {
        self.asked += 1;
        self.answer
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_capture_before_activation_is_ignored() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut controller, mut events) = PhotoboothController::new(
        Arc::new(FakeSource::granting()),
        booth_config(tmp.path()),
    );

    controller.capture();
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.pump();

    assert!(controller.gallery().is_empty());
    // No flash cue either: the capture was never accepted
    assert!(
        !drain_events(&mut events)
            .iter()
            .any(|e| matches!(e, BoothEvent::Flash))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_booth_scenario() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let source = Arc::new(FakeSource::granting());
    let stopped = source.stopped.clone();
    let (mut controller, mut events) =
        PhotoboothController::new(source, booth_config(tmp.path()));

    // Capture while inactive is a no-op
    controller.capture();
    controller.pump();
    assert!(controller.gallery().is_empty());

    activate_and_warm(&mut controller).await;
    assert!(drain_events(&mut events).contains(&BoothEvent::SessionChanged(
        photobooth::booth::SessionState::Active
    )));

    // Two rapid captures
    controller.capture();
    controller.capture();
    assert!(pump_until(&mut controller, |c| c.gallery().len() == 2).await);

    let photos = controller.gallery().photos();
    assert!(photos[0].captured_at <= photos[1].captured_at);
    for photo in photos {
        let name = export_filename(photo.captured_at);
        assert!(name.starts_with("photobooth-") && name.ends_with(".jpg"));
    }

    // Deactivation releases the stream but keeps the gallery
    controller.deactivate();
    assert!(!controller.is_active());
    assert!(stopped.load(Ordering::SeqCst));
    assert_eq!(controller.gallery().len(), 2);

    controller.capture();
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.pump();
    assert_eq!(controller.gallery().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_denied_activation_stays_inactive() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut controller, mut events) =
        PhotoboothController::new(Arc::new(FakeSource::denying()), booth_config(tmp.path()));

    controller.activate();
    assert!(pump_until(&mut controller, |c| !c.is_starting()).await);

    assert!(!controller.is_active());
    assert!(drain_events(&mut events).iter().any(|e| matches!(
        e,
        BoothEvent::Notice(Notice::CameraAccessFailed(_))
    )));

    // Capture stays disabled
    controller.capture();
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.pump();
    assert!(controller.gallery().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deactivate_discards_in_flight_activation() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let source = Arc::new(FakeSource::granting());
    let hold = source.hold.clone();
    let stopped = source.stopped.clone();
    let (mut controller, mut events) =
        PhotoboothController::new(source, booth_config(tmp.path()));

    hold.store(true, Ordering::SeqCst);
    controller.activate();
    assert!(controller.is_starting());

    // Deactivate while the backend is still opening
    controller.deactivate();
    assert!(!controller.is_starting());
    hold.store(false, Ordering::SeqCst);

    // The late stream must be stopped, not adopted
    assert!(pump_until(&mut controller, |_| stopped.load(Ordering::SeqCst)).await);
    assert!(!controller.is_active());
    assert!(!drain_events(&mut events).contains(&BoothEvent::SessionChanged(
        photobooth::booth::SessionState::Active
    )));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_preserves_order_and_revokes() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut controller, _events) = PhotoboothController::new(
        Arc::new(FakeSource::granting()),
        booth_config(tmp.path()),
    );

    activate_and_warm(&mut controller).await;
    capture_and_wait(&mut controller, 1).await;
    capture_and_wait(&mut controller, 2).await;
    capture_and_wait(&mut controller, 3).await;

    let ids: Vec<_> = controller.gallery().photos().iter().map(|p| p.id).collect();
    let first_handle = controller.gallery().photos()[0].artifact;

    controller.delete_photo(ids[0]).expect("photo should exist");

    let remaining: Vec<_> = controller.gallery().photos().iter().map(|p| p.id).collect();
    assert_eq!(remaining, vec![ids[1], ids[2]]);
    assert!(controller.gallery().resolve(first_handle).is_none());

    // A stale id fails loudly instead of touching another photo
    let result = controller.delete_photo(ids[0]);
    assert!(matches!(result, Err(BoothError::Gallery(_))));
    assert_eq!(controller.gallery().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clear_requires_confirmation() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut controller, mut events) = PhotoboothController::new(
        Arc::new(FakeSource::granting()),
        booth_config(tmp.path()),
    );

    // Empty gallery: notice, no prompt
    let mut prompt = ScriptedPrompt {
        answer: true,
        asked: 0,
    };
    controller.clear_gallery(&mut prompt);
    assert_eq!(prompt.asked, 0);
    assert!(
        drain_events(&mut events)
            .contains(&BoothEvent::Notice(Notice::NothingToClear))
    );

    activate_and_warm(&mut controller).await;
    capture_and_wait(&mut controller, 1).await;
    capture_and_wait(&mut controller, 2).await;
    let handles: Vec<_> = controller
        .gallery()
        .photos()
        .iter()
        .map(|p| p.artifact)
        .collect();

    // Declined: gallery unchanged
    let mut declined = ScriptedPrompt {
        answer: false,
        asked: 0,
    };
    controller.clear_gallery(&mut declined);
    assert_eq!(declined.asked, 1);
    assert_eq!(controller.gallery().len(), 2);

    // Confirmed: gallery emptied, every handle revoked
    let mut confirmed = ScriptedPrompt {
        answer: true,
        asked: 0,
    };
    controller.clear_gallery(&mut confirmed);
    assert_eq!(confirmed.asked, 1);
    assert!(controller.gallery().is_empty());
    for handle in handles {
        assert!(controller.gallery().resolve(handle).is_none());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_all_on_empty_gallery() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut controller, mut events) = PhotoboothController::new(
        Arc::new(FakeSource::granting()),
        booth_config(tmp.path()),
    );

    controller.export_all();
    assert!(
        drain_events(&mut events)
            .contains(&BoothEvent::Notice(Notice::NothingToExport))
    );
    assert!(!controller.export_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_all_writes_named_files() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut controller, mut events) = PhotoboothController::new(
        Arc::new(FakeSource::granting()),
        booth_config(tmp.path()),
    );

    activate_and_warm(&mut controller).await;
    capture_and_wait(&mut controller, 1).await;
    capture_and_wait(&mut controller, 2).await;
    let expected: Vec<String> = controller
        .gallery()
        .photos()
        .iter()
        .map(|p| export_filename(p.captured_at))
        .collect();

    controller.export_all();
    assert!(controller.export_running());

    // A second request while one schedule runs is refused
    controller.export_all();
    assert!(
        drain_events(&mut events).contains(&BoothEvent::Notice(Notice::ExportBusy))
    );

    assert!(pump_until(&mut controller, |c| !c.export_running()).await);
    for name in expected {
        assert!(tmp.path().join(&name).is_file(), "missing export {}", name);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_one_photo() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut controller, mut events) = PhotoboothController::new(
        Arc::new(FakeSource::granting()),
        booth_config(tmp.path()),
    );

    activate_and_warm(&mut controller).await;
    capture_and_wait(&mut controller, 1).await;
    let photo = controller.gallery().photos()[0].clone();

    controller
        .export_photo(photo.id)
        .expect("export should start");
    assert!(
        pump_until(&mut controller, |_| {
            tmp.path().join(export_filename(photo.captured_at)).is_file()
        })
        .await
    );

    let exported = tmp.path().join(export_filename(photo.captured_at));
    let bytes = std::fs::read(&exported).expect("exported file");
    // JPEG magic
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    assert!(
        drain_events(&mut events)
            .iter()
            .any(|e| matches!(e, BoothEvent::PhotoExported { id, .. } if *id == photo.id))
    );
}
