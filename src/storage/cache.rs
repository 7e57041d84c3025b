use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::Builder;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::feed::{Article, NormalizedFeed};
use crate::storage::registry::RegistryEntry;

const TEMP_PREFIX: &str = ".tmp-feed-";

/// Whether `name` can be a snapshot file name: a single plain path component
/// that does not start with a dot (dot names are reserved for temp files).
pub fn is_valid_cache_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
}

/// Flat directory of per-feed JSON snapshots, one file per registry name.
#[derive(Debug, Clone)]
pub struct FeedCache {
    dir: PathBuf,
}

/// Size and age of one cache file.
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl FeedCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                Error::Storage(format!(
                    "Failed to create cache directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a feed name to its file. See [`is_valid_cache_name`].
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if is_valid_cache_name(name) {
            Ok(self.dir.join(name))
        } else {
            Err(Error::NotFound(format!("Feed '{}' not found", name)))
        }
    }

    /// Replaces the snapshot for `entry` atomically: the JSON goes to a
    /// temporary file in the same directory which is then renamed over the
    /// old snapshot.
    pub fn persist(&self, entry: &RegistryEntry, feed: &NormalizedFeed) -> Result<()> {
        let target = self.path_for(&entry.name)
            .map_err(|_| Error::Storage(format!("'{}' is not a valid cache file name", entry.name)))?;
        let json = serde_json::to_vec(feed)?;

        let mut temp = Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| Error::Storage(format!(
                "Failed to create temporary file in '{}': {}",
                self.dir.display(), e
            )))?;

        temp.write_all(&json)?;
        temp.as_file().sync_all()?;

        temp.persist(&target).map_err(|e| Error::Storage(format!(
            "Failed to move snapshot into '{}': {}",
            target.display(), e.error
        )))?;

        tracing::debug!("Persisted {} ({} bytes, {} articles)", target.display(), json.len(), feed.items.len());
        Ok(())
    }

    /// Stored bytes of a snapshot, exactly as written.
    pub fn read_raw(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(format!("Feed '{}' not found", name)),
            _ => Error::Io(e),
        })
    }

    pub fn read_feed(&self, name: &str) -> Result<NormalizedFeed> {
        let bytes = self.read_raw(name)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::CorruptCache {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn article(&self, name: &str, index: usize) -> Result<Article> {
        let mut feed = self.read_feed(name)?;
        let len = feed.items.len();
        if index >= len {
            return Err(Error::IndexOutOfRange {
                name: name.to_string(),
                index,
                len,
            });
        }

        Ok(feed.items.swap_remove(index))
    }

    pub fn metadata(&self, name: &str) -> Result<CachedFile> {
        let path = self.path_for(name)?;
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(format!("Feed '{}' not found", name)),
            _ => Error::Io(e),
        })?;

        Ok(CachedFile {
            name: name.to_string(),
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }

    /// Removes temporary files left behind by writes that were interrupted.
    pub fn cleanup_temp_files(&self) -> usize {
        let mut removed = 0;

        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1).into_iter().flatten() {
            let is_temp = entry.file_type().is_file()
                && entry.file_name().to_str().map_or(false, |n| n.starts_with(TEMP_PREFIX));

            if is_temp {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("Failed to remove {}: {}", entry.path().display(), e),
                }
            }
        }

        if removed > 0 {
            tracing::info!("Removed {} stale temporary files from {}", removed, self.dir.display());
        }
        removed
    }
}
