// SPDX-License-Identifier: MPL-2.0

//! Ordered collection of captured stills
//!
//! Photos are appended in completion order and addressed by stable
//! ids, so removal of one photo never shifts which photo the other
//! ids point at. Removing a photo revokes its artifact handle.

use std::fmt;
use std::sync::Arc;

use crate::booth::artifact::{ArtifactHandle, ArtifactStore};
use crate::errors::GalleryError;

/// Stable identifier for a captured photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One captured still in the gallery
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub id: PhotoId,
    pub artifact: ArtifactHandle,
    /// Capture timestamp in milliseconds since the Unix epoch
    pub captured_at: i64,
}

/// Session gallery, append-only except for explicit removal
#[derive(Debug, Default)]
pub struct Gallery {
    photos: Vec<CapturedPhoto>,
    store: ArtifactStore,
    next_photo_id: u64,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an encoded still, minting its id and artifact handle
    pub fn append(&mut self, bytes: Vec<u8>, captured_at: i64) -> PhotoId {
        let id = PhotoId(self.next_photo_id);
        self.next_photo_id += 1;
        let artifact = self.store.insert(bytes);
        self.photos.push(CapturedPhoto {
            id,
            artifact,
            captured_at,
        });
        id
    }

    /// Remove one photo and revoke its artifact handle
    pub fn remove(&mut self, id: PhotoId) -> Result<CapturedPhoto, GalleryError> {
        let index = self
            .photos
            .iter()
            .position(|p| p.id == id)
            .ok_or(GalleryError::PhotoNotFound(id))?;
        let photo = self.photos.remove(index);
        self.store.revoke(photo.artifact);
        Ok(photo)
    }

    /// Remove every photo, revoking each handle
    ///
    /// Returns how many photos were removed.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.photos.len();
        for photo in self.photos.drain(..) {
            self.store.revoke(photo.artifact);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Photos in capture-completion order
    pub fn photos(&self) -> &[CapturedPhoto] {
        &self.photos
    }

    pub fn photo(&self, id: PhotoId) -> Option<&CapturedPhoto> {
        self.photos.iter().find(|p| p.id == id)
    }

    /// Resolve a live artifact handle to its encoded bytes
    pub fn resolve(&self, handle: ArtifactHandle) -> Option<Arc<[u8]>> {
        self.store.resolve(handle)
    }

    /// Shared view of the artifact store for background export tasks
    pub fn store(&self) -> ArtifactStore {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: usize) -> Gallery {
        let mut gallery = Gallery::new();
        for i in 0..count {
            gallery.append(vec![i as u8], 1_000 + i as i64);
        }
        gallery
    }

    #[test]
    fn test_append_preserves_order() {
        let gallery = filled(3);
        let timestamps: Vec<i64> = gallery.photos().iter().map(|p| p.captured_at).collect();
        assert_eq!(timestamps, vec![1_000, 1_001, 1_002]);
    }

    #[test]
    fn test_ids_stay_stable_across_removal() {
        let mut gallery = filled(3);
        let ids: Vec<PhotoId> = gallery.photos().iter().map(|p| p.id).collect();

        gallery.remove(ids[0]).expect("photo should exist");

        // The surviving photos keep their ids and relative order.
        let remaining: Vec<PhotoId> = gallery.photos().iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec![ids[1], ids[2]]);
        assert!(gallery.photo(ids[0]).is_none());
        assert!(gallery.photo(ids[1]).is_some());
    }

    #[test]
    fn test_remove_revokes_artifact() {
        let mut gallery = filled(1);
        let photo = gallery.photos()[0].clone();
        assert!(gallery.resolve(photo.artifact).is_some());

        gallery.remove(photo.id).expect("photo should exist");
        assert!(gallery.resolve(photo.artifact).is_none());
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut gallery = filled(2);
        let ids: Vec<PhotoId> = gallery.photos().iter().map(|p| p.id).collect();
        gallery.remove(ids[1]).expect("photo should exist");

        let result = gallery.remove(ids[1]);
        assert!(matches!(result, Err(GalleryError::PhotoNotFound(_))));
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn test_clear_all_revokes_everything() {
        let mut gallery = filled(4);
        let handles: Vec<ArtifactHandle> =
            gallery.photos().iter().map(|p| p.artifact).collect();

        assert_eq!(gallery.clear_all(), 4);
        assert!(gallery.is_empty());
        for handle in handles {
            assert!(gallery.resolve(handle).is_none());
        }
        assert_eq!(gallery.clear_all(), 0);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut gallery = filled(2);
        let first = gallery.photos()[0].id;
        gallery.clear_all();

        let fresh = gallery.append(vec![7], 2_000);
        assert_ne!(fresh, first);
    }
}
