//! Filesystem storage for uploaded photo files.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use time::OffsetDateTime;

use crate::Error;

/// Stores uploaded photo files under a root directory.
///
/// Files are laid out as `{user_id}/{trip_id}/{name}` so that a trip's
/// photos can be found (and cleaned up) together. The store hands out paths
/// relative to the root; the absolute location only matters to the static
/// file service.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    upload_counter: Arc<AtomicU64>,
}

impl MediaStore {
    /// Create a media store rooted at `root`.
    ///
    /// The directory is created on first use, not here, so constructing a
    /// store is infallible.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            upload_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The directory the store keeps its files under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` to a new file and return its path relative to the
    /// store's root.
    ///
    /// The file name combines the upload time with a process-wide counter,
    /// so two uploads in the same millisecond still get distinct names.
    ///
    /// # Errors
    /// Returns an [Error::FileStorageError] if the directory or file cannot
    /// be written.
    pub fn save(
        &self,
        user_id: i64,
        trip_id: i64,
        extension: &str,
        data: &[u8],
    ) -> Result<String, Error> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let serial = self.upload_counter.fetch_add(1, Ordering::Relaxed);
        let relative_path = format!("{user_id}/{trip_id}/{timestamp}-{serial}.{extension}");

        let full_path = self.root.join(&relative_path);
        let parent = full_path
            .parent()
            .ok_or_else(|| Error::FileStorageError("media path has no parent".to_owned()))?;

        fs::create_dir_all(parent)
            .map_err(|error| Error::FileStorageError(error.to_string()))?;
        fs::write(&full_path, data).map_err(|error| Error::FileStorageError(error.to_string()))?;

        tracing::debug!("Stored {} byte photo at {relative_path}", data.len());

        Ok(relative_path)
    }

    /// Remove the file at `relative_path` from the store.
    ///
    /// A file that is already gone is not an error: the database row is the
    /// source of truth and deleting it must not be blocked by a missing
    /// file.
    ///
    /// # Errors
    /// Returns an [Error::FileStorageError] if the file exists but cannot
    /// be removed.
    pub fn remove(&self, relative_path: &str) -> Result<(), Error> {
        let full_path = self.root.join(relative_path);

        match fs::remove_file(&full_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("photo file {relative_path} was already gone");
                Ok(())
            }
            Err(error) => Err(Error::FileStorageError(error.to_string())),
        }
    }
}
