// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the staggered export scheduler
//!
//! Pacing and cancellation run under paused tokio time, so the 500 ms
//! stagger is verified without wall-clock waits. File-writing tests use
//! real time and a temp directory.

use std::path::PathBuf;

use photobooth::booth::export::{ExportItem, ExportJob, ExportProgress, export_filename};
use photobooth::booth::gallery::Gallery;
use photobooth::constants::export;
use tokio::sync::mpsc;

/// Build a gallery with `count` photos and snapshot them as export items
fn gallery_with(count: usize) -> (Gallery, Vec<ExportItem>) {
    let mut gallery = Gallery::new();
    for i in 0..count {
        gallery.append(vec![0xAB, i as u8], 1_700_000_000_000 + i as i64);
    }
    let items = gallery
        .photos()
        .iter()
        .map(|p| ExportItem {
            id: p.id,
            handle: p.artifact,
            captured_at: p.captured_at,
        })
        .collect();
    (gallery, items)
}

#[tokio::test(start_paused = true)]
async fn test_schedule_paces_items_by_stagger_interval() {
    let (mut gallery, items) = gallery_with(4);
    let store = gallery.store();
    // Revoke everything so each slot is a pure timer tick with no I/O
    gallery.clear_all();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let start = tokio::time::Instant::now();
    let _job = ExportJob::start(items, store, PathBuf::from("unused"), tx);

    for i in 0..4u32 {
        let progress = rx.recv().await.expect("schedule should report each slot");
        assert!(
            matches!(progress, ExportProgress::Skipped { .. }),
            "revoked photo should be skipped"
        );
        // Slot i fires no earlier than i stagger intervals after start
        assert!(start.elapsed() >= export::STAGGER_INTERVAL * i);
    }

    match rx.recv().await.expect("schedule should finish") {
        ExportProgress::Finished { total, skipped } => {
            assert_eq!(total, 4);
            assert_eq!(skipped, 4);
        }
        other => panic!("expected Finished, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_remaining_slots() {
    let (mut gallery, items) = gallery_with(3);
    let store = gallery.store();
    gallery.clear_all();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut job = ExportJob::start(items, store, PathBuf::from("unused"), tx);

    // First slot fires immediately
    let first = rx.recv().await.expect("first slot");
    assert!(matches!(first, ExportProgress::Skipped { .. }));

    job.cancel();
    match rx.recv().await.expect("cancellation report") {
        ExportProgress::Cancelled { remaining } => assert_eq!(remaining, 2),
        other => panic!("expected Cancelled, got {:?}", other),
    }
    assert!(rx.recv().await.is_none() || job.is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_writes_files_with_exact_names() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (gallery, items) = gallery_with(2);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _job = ExportJob::start(items.clone(), gallery.store(), tmp.path().to_path_buf(), tx);

    let mut written = Vec::new();
    loop {
        match rx.recv().await.expect("progress") {
            ExportProgress::Item { result, .. } => {
                written.push(result.expect("write should succeed"));
            }
            ExportProgress::Finished { total, skipped } => {
                assert_eq!(total, 2);
                assert_eq!(skipped, 0);
                break;
            }
            other => panic!("unexpected progress {:?}", other),
        }
    }

    assert_eq!(written.len(), 2);
    for item in &items {
        let path = tmp.path().join(export_filename(item.captured_at));
        assert!(written.contains(&path));
        let bytes = std::fs::read(&path).expect("exported file");
        let expected = gallery.resolve(item.handle).expect("live handle");
        assert_eq!(&bytes[..], &expected[..]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_photo_removed_after_scheduling_is_skipped() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (mut gallery, items) = gallery_with(2);
    // Remove the second photo between scheduling and firing
    let removed = items[1].clone();
    gallery.remove(removed.id).expect("photo should exist");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _job = ExportJob::start(items.clone(), gallery.store(), tmp.path().to_path_buf(), tx);

    let mut saved = 0;
    let mut skipped_ids = Vec::new();
    loop {
        match rx.recv().await.expect("progress") {
            ExportProgress::Item { result, .. } => {
                result.expect("write should succeed");
                saved += 1;
            }
            ExportProgress::Skipped { id } => skipped_ids.push(id),
            ExportProgress::Finished { total, skipped } => {
                assert_eq!(total, 2);
                assert_eq!(skipped, 1);
                break;
            }
            other => panic!("unexpected progress {:?}", other),
        }
    }

    assert_eq!(saved, 1);
    assert_eq!(skipped_ids, vec![removed.id]);
    assert!(tmp.path().join(export_filename(items[0].captured_at)).is_file());
    assert!(!tmp.path().join(export_filename(removed.captured_at)).is_file());
}

#[test]
fn test_export_filename_is_bit_exact() {
    assert_eq!(export_filename(1712345678901), "photobooth-1712345678901.jpg");
}
