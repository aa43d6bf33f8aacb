// SPDX-License-Identifier: MPL-2.0

//! Revocable handles over encoded photo data
//!
//! A handle is issued when a still enters the gallery and stops
//! resolving once revoked, so releases are observable. The store is
//! cheaply cloneable; export tasks resolve handles at fire time while
//! the gallery keeps sole authority over insert and revoke.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Opaque reference to stored photo bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactHandle(u64);

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    entries: HashMap<u64, Arc<[u8]>>,
}

/// In-memory store of encoded stills
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store encoded bytes and issue a handle for them
    pub fn insert(&self, bytes: Vec<u8>) -> ArtifactHandle {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(id, Arc::from(bytes));
        ArtifactHandle(id)
    }

    /// Resolve a handle to its bytes while it is live
    pub fn resolve(&self, handle: ArtifactHandle) -> Option<Arc<[u8]>> {
        self.lock().entries.get(&handle.0).cloned()
    }

    /// Invalidate a handle, subsequent resolves fail
    ///
    /// Returns whether the handle was still live.
    pub fn revoke(&self, handle: ArtifactHandle) -> bool {
        self.lock().entries.remove(&handle.0).is_some()
    }

    /// Number of live handles
    pub fn live_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
