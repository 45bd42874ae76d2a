//! capldoc-mcp: an MCP server that indexes Vector CAPL function reference
//! markdown and answers free-text relevance queries and exact-name lookups.
//!
//! The pipeline: [`corpus`] discovers and fingerprints documents, [`extract`]
//! turns each one into a normalized [`record::FunctionRecord`], [`search`]
//! builds and queries the TF-IDF index, [`cache`] persists it per corpus
//! signature, and [`state`] coordinates snapshots and rebuilds for the
//! [`server`] tools.

pub mod cache;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod record;
pub mod search;
pub mod server;
pub mod state;
pub mod tools;
pub mod tracing;

pub use cache::CacheManager;
pub use error::DocError;
pub use record::{FunctionRecord, Parameter};
pub use search::index::SearchIndex;
pub use server::DocServer;
pub use state::SearchState;
