//! On-disk persistence of serialized search indexes.
//!
//! One postcard blob per corpus namespace, embedding the corpus signature it
//! was built from. Invalidation is signature comparison, not mtimes: a blob
//! built from a different document set is simply a miss.

use crate::error::{DocError, Result};
use crate::search::index::SearchIndex;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Maps a corpus namespace to its serialized index blob.
///
/// Constructed once at server start and passed explicitly; there is no
/// process-global cache state.
#[derive(Debug)]
pub struct CacheManager {
    dir: PathBuf,
}

impl CacheManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Per-user default cache location, overridable with `CAPLDOC_CACHE_DIR`.
    pub fn default_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("CAPLDOC_CACHE_DIR") {
            return PathBuf::from(dir);
        }
        dirs::cache_dir()
            .map(|dir| dir.join("capldoc-mcp"))
            .unwrap_or_else(|| PathBuf::from(".capldoc-cache"))
    }

    /// Path of the blob for a corpus namespace.
    pub fn blob_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.index"))
    }

    /// Loads the cached index for a corpus if present and built from the
    /// given signature. Unreadable or mismatched blobs are a miss, never an
    /// error surfaced to callers.
    pub fn load(&self, namespace: &str, signature: &str) -> Option<SearchIndex> {
        let path = self.blob_path(namespace);
        if !path.exists() {
            return None;
        }
        match Self::try_load(&path, signature) {
            Ok(index) => {
                tracing::debug!("Loaded cached search index from {}", path.display());
                Some(index)
            }
            Err(err) => {
                tracing::warn!("Ignoring cache at {}: {:#}", path.display(), err);
                None
            }
        }
    }

    fn try_load(path: &Path, signature: &str) -> Result<SearchIndex> {
        let bytes = fs::read(path)?;
        let index: SearchIndex =
            postcard::from_bytes(&bytes).map_err(|_| DocError::CacheCorrupt {
                path: path.to_path_buf(),
            })?;
        if index.corpus_signature != signature {
            anyhow::bail!(
                "corpus signature changed ({} != {})",
                index.corpus_signature,
                signature
            );
        }
        Ok(index)
    }

    /// Persists an index, overwriting any stale entry for the namespace.
    ///
    /// The blob is written to a sibling temp file and renamed into place, so
    /// a crash mid-write can never publish a torn cache.
    pub fn store(&self, namespace: &str, index: &SearchIndex) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache directory {}", self.dir.display()))?;

        let path = self.blob_path(namespace);
        let staging = self.dir.join(format!("{namespace}.index.tmp"));
        let bytes = postcard::to_allocvec(index).context("failed to serialize search index")?;
        fs::write(&staging, &bytes)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("failed to publish {}", path.display()))?;

        tracing::debug!(
            "Cached search index to {} ({} bytes)",
            path.display(),
            bytes.len()
        );
        Ok(())
    }

    /// Discards any persisted entry for a corpus.
    pub fn remove(&self, namespace: &str) {
        let path = self.blob_path(namespace);
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove cache at {}: {}", path.display(), err);
            }
        }
    }
}
