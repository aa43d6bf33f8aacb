// SPDX-License-Identifier: GPL-3.0-only

//! Terminal photobooth for Linux webcams
//!
//! This library provides the core functionality for the photobooth:
//! camera acquisition, still capture, the in-memory gallery and the
//! staggered export scheduler, plus the terminal interface on top.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`camera`]: GStreamer/PipeWire camera backend
//! - [`booth`]: Controller, gallery and capture/export logic
//! - [`terminal`]: Interactive terminal interface
//! - [`config`]: User configuration handling
//! - [`storage`]: Export directory handling

pub mod booth;
pub mod camera;
pub mod config;
pub mod constants;
pub mod errors;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use booth::{BoothEvent, Notice, PhotoboothController};
pub use config::BoothConfig;
pub use errors::{BoothError, BoothResult};
