// SPDX-License-Identifier: MPL-2.0

//! Export directory handling

use std::path::{Path, PathBuf};

use crate::constants::export;
use crate::errors::BoothResult;

/// Default directory for exported stills
///
/// Prefers the XDG pictures directory, then the home directory, then
/// the current directory.
pub fn default_export_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(export::DEFAULT_SAVE_FOLDER)
}

/// Make sure the export directory exists
pub fn ensure_dir(dir: &Path) -> BoothResult<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}
