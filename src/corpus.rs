//! Corpus discovery, fingerprinting and record loading.
//!
//! Discovery and extraction are separate steps on purpose: computing the
//! corpus signature only needs raw bytes, so a cache hit never pays for
//! markdown parsing.

use crate::error::{DocError, Result};
use crate::extract;
use crate::record::FunctionRecord;
use anyhow::Context;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// One discovered document: its resolved path, a fingerprint of its raw
/// bytes, and the bytes themselves (read once, decoded only on rebuild).
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub fingerprint: u64,
    bytes: Vec<u8>,
}

/// The discovered document set for one corpus-path set.
#[derive(Debug)]
pub struct Corpus {
    /// Files in sorted-path order; the order records inherit.
    pub files: Vec<SourceFile>,
    /// Fingerprint of the `(path, content hash)` pair set. Invariant to
    /// traversal order; any file addition, removal or edit changes it.
    pub signature: String,
    /// Fingerprint of the root path set alone. Names the on-disk cache
    /// artifact, so content changes overwrite the stale blob in place.
    pub namespace: String,
}

/// Recursively discovers markdown documents under the given roots,
/// deduplicating identical resolved paths, and fingerprints each file.
pub fn discover(roots: &[PathBuf]) -> Result<Corpus> {
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    for root in roots {
        let root = root.canonicalize().unwrap_or_else(|_| root.clone());
        if root.is_file() {
            if is_markdown(&root) {
                seen.insert(root);
            }
            continue;
        }
        for entry in WalkBuilder::new(&root).build().filter_map(std::result::Result::ok) {
            let path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_file()) && is_markdown(path) {
                seen.insert(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
            }
        }
    }

    let mut files = Vec::with_capacity(seen.len());
    for path in seen {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let fingerprint = xxh3_64(&bytes);
        files.push(SourceFile {
            path,
            fingerprint,
            bytes,
        });
    }

    let signature = signature_of(&files);
    let namespace = namespace_of(roots);
    tracing::debug!(
        "Discovered corpus {}: {} document(s), signature {}",
        namespace,
        files.len(),
        signature
    );

    Ok(Corpus {
        files,
        signature,
        namespace,
    })
}

/// Parses a single document into a record. Unlike corpus loading this
/// surfaces decode failures directly to the caller.
pub fn parse_single(path: &Path) -> Result<FunctionRecord> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = std::str::from_utf8(&bytes).map_err(|_| DocError::Decode {
        path: path.to_path_buf(),
    })?;
    Ok(extract::extract(text, path))
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Extracts one record per decodable document, in sorted-path order.
    /// Undecodable files are skipped and reported; they never abort the rest
    /// of the load.
    pub fn parse(&self) -> (Vec<FunctionRecord>, Vec<DocError>) {
        let mut records = Vec::with_capacity(self.files.len());
        let mut skipped = Vec::new();
        for file in &self.files {
            match std::str::from_utf8(&file.bytes) {
                Ok(text) => records.push(extract::extract(text, &file.path)),
                Err(_) => {
                    tracing::warn!("Skipping {}: not valid UTF-8", file.path.display());
                    skipped.push(DocError::Decode {
                        path: file.path.clone(),
                    });
                }
            }
        }
        (records, skipped)
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn signature_of(files: &[SourceFile]) -> String {
    // files arrive sorted by path, so the digest is traversal-order invariant
    let mut hasher = Xxh3::new();
    for file in files {
        hasher.update(file.path.to_string_lossy().as_bytes());
        hasher.update(&file.fingerprint.to_le_bytes());
    }
    format!("{:016x}", hasher.digest())
}

fn namespace_of(roots: &[PathBuf]) -> String {
    let mut normalized: Vec<String> = roots
        .iter()
        .map(|root| {
            root.canonicalize()
                .unwrap_or_else(|_| root.clone())
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    normalized.sort();
    normalized.dedup();

    let mut hasher = Xxh3::new();
    for path in &normalized {
        hasher.update(path.as_bytes());
    }
    format!("{:016x}", hasher.digest())
}
