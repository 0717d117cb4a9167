//! Filesystem-backed artifact cache.
//!
//! The images directory is the cache: a profile's artifact lives at
//! `<images_dir>/<image_filename>`. Presence of that file means the profile
//! has been generated.

use errors::{PortraitError, PortraitResult};
use portrait_core::ProfileIdentity;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCache;

impl ImageCache {
    pub fn new() -> Self {
        Self
    }

    /// Artifact location, `None` when the identity has no usable filename.
    pub fn path_for(&self, identity: &ProfileIdentity, images_dir: &Path) -> Option<PathBuf> {
        if identity.id.trim().is_empty() || !identity.has_usable_filename() {
            return None;
        }
        Some(images_dir.join(identity.image_filename.trim()))
    }

    pub async fn exists(&self, identity: &ProfileIdentity, images_dir: &Path) -> bool {
        let Some(path) = self.path_for(identity, images_dir) else {
            return false;
        };
        fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Cached bytes, `None` when no artifact exists.
    pub async fn get(&self, identity: &ProfileIdentity, images_dir: &Path) -> PortraitResult<Option<Vec<u8>>> {
        let Some(path) = self.path_for(identity, images_dir) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortraitError::file_op("read_image", &path, e))
        }
    }

    /// Store the artifact, creating the images directory when needed.
    ///
    /// Identities without an id or usable filename and empty payloads are
    /// ignored with a warning.
    pub async fn put(&self, identity: &ProfileIdentity, bytes: &[u8], images_dir: &Path) -> PortraitResult<()> {
        let Some(path) = self.path_for(identity, images_dir) else {
            warn!(
                profile_id = %identity.id,
                filename = %identity.image_filename,
                "Skipping cache write for identity without a usable filename"
            );
            return Ok(());
        };
        if bytes.is_empty() {
            warn!(profile_id = %identity.id, "Skipping cache write of empty image");
            return Ok(());
        }

        fs::create_dir_all(images_dir)
            .await
            .map_err(|e| PortraitError::file_op("create_dir", images_dir, e))?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| PortraitError::file_op("write_image", &path, e))?;

        debug!(profile_id = %identity.id, path = %path.display(), bytes = bytes.len(), "Image cached");
        Ok(())
    }

    /// Remove the artifact. Returns whether a file was deleted.
    pub async fn invalidate(&self, identity: &ProfileIdentity, images_dir: &Path) -> PortraitResult<bool> {
        let Some(path) = self.path_for(identity, images_dir) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(profile_id = %identity.id, path = %path.display(), "Cached image invalidated");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PortraitError::file_op("remove_image", &path, e))
        }
    }
}
