//! Shared, concurrency-safe search state.
//!
//! Published indexes are immutable `Arc` snapshots: queries run lock-free
//! against whichever snapshot they grabbed, and publishing a rebuilt index
//! just replaces the `Arc` in the snapshot cache, so a reader sees either the
//! fully-old or fully-new index, never a partially built one. At most one
//! build runs per corpus signature at a time; concurrent callers await the
//! same shared future.

use crate::cache::CacheManager;
use crate::corpus::{self, Corpus};
use crate::search::index::{self, SearchIndex};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Maximum number of published index snapshots kept in memory.
const SNAPSHOT_CACHE_SIZE: usize = 8;

/// Build futures that multiple callers can await.
type SharedBuildFuture = Shared<BoxFuture<'static, Result<Arc<SearchIndex>, String>>>;

/// Central coordination point for index snapshots, in-flight builds and the
/// disk cache. Constructed at server start, torn down with it.
pub struct SearchState {
    /// Published snapshots keyed by corpus namespace.
    snapshots: RwLock<LruCache<String, Arc<SearchIndex>>>,
    /// In-flight builds keyed by corpus signature.
    in_flight: Mutex<HashMap<String, SharedBuildFuture>>,
    cache: Arc<CacheManager>,
    /// Fresh builds performed by this state; lets tests observe whether a
    /// call was served from cache or from a real rebuild.
    builds: AtomicU64,
}

impl std::fmt::Debug for SearchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchState")
            .field("cache", &self.cache)
            .field("builds", &self.builds.load(Ordering::Relaxed))
            .finish()
    }
}

impl SearchState {
    pub fn new(cache: CacheManager) -> Self {
        Self {
            snapshots: RwLock::new(LruCache::new(
                NonZeroUsize::new(SNAPSHOT_CACHE_SIZE).unwrap(),
            )),
            in_flight: Mutex::new(HashMap::new()),
            cache: Arc::new(cache),
            builds: AtomicU64::new(0),
        }
    }

    /// Number of fresh index builds performed so far.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Returns the index for a corpus, building only when needed.
    ///
    /// The corpus signature is always recomputed from the documents. Unless
    /// `force_rebuild` is set, a matching in-memory snapshot or disk blob is
    /// served without re-parsing anything; otherwise any persisted entry is
    /// discarded first and the index is rebuilt from scratch. Concurrent
    /// queries keep being served from the previous snapshot until the fresh
    /// build publishes.
    pub async fn index_for(
        &self,
        roots: &[PathBuf],
        force_rebuild: bool,
    ) -> Result<Arc<SearchIndex>, String> {
        let owned_roots = roots.to_vec();
        let corpus = tokio::task::spawn_blocking(move || corpus::discover(&owned_roots))
            .await
            .map_err(|err| format!("corpus discovery task panicked: {err}"))?
            .map_err(|err| format!("failed to load corpus: {err:#}"))?;

        let namespace = corpus.namespace.clone();
        let signature = corpus.signature.clone();

        if force_rebuild {
            self.cache.remove(&namespace);
        } else {
            if let Some(snapshot) = self.snapshot(&namespace, &signature).await {
                tracing::debug!("Serving in-memory index for signature {}", signature);
                return Ok(snapshot);
            }

            let cache = self.cache.clone();
            let (ns, sig) = (namespace.clone(), signature.clone());
            let loaded = tokio::task::spawn_blocking(move || cache.load(&ns, &sig))
                .await
                .map_err(|err| format!("cache load task panicked: {err}"))?;
            if let Some(loaded) = loaded {
                let snapshot = Arc::new(loaded);
                self.publish(&namespace, snapshot.clone()).await;
                return Ok(snapshot);
            }
        }

        self.build_and_publish(corpus, force_rebuild).await
    }

    async fn snapshot(&self, namespace: &str, signature: &str) -> Option<Arc<SearchIndex>> {
        let mut snapshots = self.snapshots.write().await;
        snapshots
            .get(namespace)
            .filter(|snapshot| snapshot.corpus_signature == signature)
            .cloned()
    }

    async fn publish(&self, namespace: &str, snapshot: Arc<SearchIndex>) {
        self.snapshots
            .write()
            .await
            .put(namespace.to_string(), snapshot);
    }

    /// Runs (or joins) the build for a corpus and publishes the result.
    async fn build_and_publish(
        &self,
        corpus: Corpus,
        force_rebuild: bool,
    ) -> Result<Arc<SearchIndex>, String> {
        let namespace = corpus.namespace.clone();
        let signature = corpus.signature.clone();

        let (future, created) = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&signature) {
                tracing::debug!("Awaiting in-flight build for signature {}", signature);
                (existing.clone(), false)
            } else {
                // a concurrent caller may have finished and published while
                // we were looking at the disk cache
                if !force_rebuild {
                    if let Some(snapshot) = self.snapshot(&namespace, &signature).await {
                        return Ok(snapshot);
                    }
                }

                let cache = self.cache.clone();
                let build: BoxFuture<'static, Result<Arc<SearchIndex>, String>> = async move {
                    tokio::task::spawn_blocking(move || {
                        let (records, skipped) = corpus.parse();
                        if !skipped.is_empty() {
                            tracing::warn!(
                                "{} document(s) skipped during corpus load",
                                skipped.len()
                            );
                        }
                        let index = index::build(records, corpus.signature.clone());
                        if let Err(err) = cache.store(&corpus.namespace, &index) {
                            tracing::warn!("Failed to persist search index: {:#}", err);
                        }
                        Arc::new(index)
                    })
                    .await
                    .map_err(|err| format!("index build task panicked: {err}"))
                }
                .boxed();

                let shared = build.shared();
                in_flight.insert(signature.clone(), shared.clone());
                (shared, true)
            }
        };

        let result = future.await;

        if created {
            if let Ok(snapshot) = &result {
                // publish before dropping the in-flight entry so late
                // arrivals find either the future or the snapshot
                self.publish(&namespace, snapshot.clone()).await;
                self.builds.fetch_add(1, Ordering::Relaxed);
            }
            self.in_flight.lock().await.remove(&signature);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use tempfile::TempDir;

    fn state_with_dirs() -> (SearchState, TempDir, TempDir) {
        let corpus_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let state = SearchState::new(CacheManager::new(cache_dir.path()));
        (state, corpus_dir, cache_dir)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_corpus_yields_valid_empty_index() {
        let (state, corpus_dir, _cache_dir) = state_with_dirs();
        let roots = vec![corpus_dir.path().to_path_buf()];

        let index = state.index_for(&roots, false).await.unwrap();
        check!(index.records.is_empty());
        check!(index.entries.is_empty());
        check!(state.build_count() == 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unchanged_corpus_is_served_from_memory() {
        let (state, corpus_dir, _cache_dir) = state_with_dirs();
        std::fs::write(corpus_dir.path().join("a.md"), "# CanWrite\n").unwrap();
        let roots = vec![corpus_dir.path().to_path_buf()];

        let first = state.index_for(&roots, false).await.unwrap();
        let second = state.index_for(&roots, false).await.unwrap();
        check!(Arc::ptr_eq(&first, &second));
        check!(state.build_count() == 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn changed_corpus_triggers_full_rebuild() {
        let (state, corpus_dir, _cache_dir) = state_with_dirs();
        let doc = corpus_dir.path().join("a.md");
        std::fs::write(&doc, "# CanWrite\n").unwrap();
        let roots = vec![corpus_dir.path().to_path_buf()];

        let first = state.index_for(&roots, false).await.unwrap();
        std::fs::write(&doc, "# CanRead\n").unwrap();
        let second = state.index_for(&roots, false).await.unwrap();

        check!(first.corpus_signature != second.corpus_signature);
        check!(second.lookup("CanRead").is_some());
        check!(state.build_count() == 2);
    }
}
