//! External collaborators for content migrations
//!
//! The block rewriter performs no I/O. This crate supplies the pieces a
//! migration run talks to: a [`DocumentStore`] holding page bodies and skip
//! flags, an [`AssetFetcher`] for referenced media, and a [`RunLog`] that
//! records per-document outcomes. Each comes with an in-memory stand-in for
//! tests and a directory-backed implementation.

pub mod config;
pub mod error;
pub mod fetch;
pub mod io;
pub mod log;
pub mod store;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use fetch::{AssetFetcher, LocalMirrorFetcher, RetryPolicy, RetryingFetcher};
pub use log::{JsonLinesLog, LogEntry, MemoryLog, RunLog, Severity};
pub use store::{DirectoryStore, DocumentStore, MemoryStore, validate_document_id};
