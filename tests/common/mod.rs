//! Shared test fixtures and sample documents for integration tests.
//!
//! Each test gets a fresh temporary corpus directory and its own cache
//! directory, so tests run in parallel without cache interference.

use capldoc_mcp::cache::CacheManager;
use capldoc_mcp::state::SearchState;
use rstest::fixture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A reference page exercising every section the extractor knows about.
pub const UDP_SEND_DOC: &str = r"# UdpSend

[Valid for]: CANoe DE • CANoe4SW DE

## Function Syntax

```
long UdpSend(dword socket, byte data[], dword size)
```

## Parameters

- **socket**: The UDP socket handle returned by UdpOpen.
- **data**: Buffer holding the payload bytes to transmit.

## Return Values

- **0**: Transmission was started successfully.
- **WSA_IO_PENDING**: The operation will complete asynchronously.

## Example

```capl
on key 's'
{
  UdpSend(gSocket, gBuffer, elcount(gBuffer));
}
```
";

/// A second page with vocabulary disjoint from [`UDP_SEND_DOC`].
pub const TIMER_START_DOC: &str = r"# TimerStart

## Function Syntax

- `void TimerStart(msTimer t)`

## Description

Arms the given millisecond timer so its handler fires when it elapses.

## Parameters

- **t**: The timer variable to arm.
";

/// An isolated test environment: corpus directory, cache directory, and a
/// [`SearchState`] wired to both.
pub struct TestContext {
    corpus: TempDir,
    cache_dir: TempDir,
    pub state: Arc<SearchState>,
}

#[allow(dead_code)] // helpers used across different integration test crates
impl TestContext {
    pub fn new() -> Self {
        let corpus = TempDir::new().expect("create corpus dir");
        let cache_dir = TempDir::new().expect("create cache dir");
        let state = Arc::new(SearchState::new(CacheManager::new(cache_dir.path())));
        Self {
            corpus,
            cache_dir,
            state,
        }
    }

    /// Writes a document into the corpus, creating parent directories.
    pub fn write_doc(&self, name: &str, content: &str) -> PathBuf {
        self.write_bytes(name, content.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.corpus.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("Failed to create parent of '{}': {}", name, e));
        }
        std::fs::write(&path, content)
            .unwrap_or_else(|e| panic!("Failed to write '{}': {}", name, e));
        path
    }

    pub fn corpus_root(&self) -> &Path {
        self.corpus.path()
    }

    /// Corpus roots in the form `SearchState::index_for` expects.
    pub fn roots(&self) -> Vec<PathBuf> {
        vec![self.corpus.path().to_path_buf()]
    }

    /// Corpus roots in the form the tool handlers expect.
    pub fn root_strings(&self) -> Vec<String> {
        vec![self.corpus.path().to_string_lossy().into_owned()]
    }

    /// A fresh `CacheManager` over the same cache directory.
    pub fn cache(&self) -> CacheManager {
        CacheManager::new(self.cache_dir.path())
    }

    /// A second, independent `SearchState` sharing this context's disk cache;
    /// its in-memory snapshot cache starts cold.
    pub fn fresh_state(&self) -> Arc<SearchState> {
        Arc::new(SearchState::new(self.cache()))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The recommended fixture: a fully isolated corpus + cache + state.
#[fixture]
pub fn context() -> TestContext {
    TestContext::new()
}
