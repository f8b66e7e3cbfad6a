//! Migration orchestration over a document store
//!
//! This crate sits between the block rewriter and the outside world:
//!
//! - **Declarative rules**: [`RuleSpec`] entries from a migration config
//!   compile into `press-blocks` rules
//! - **Runner**: fetch → parse → apply → serialize → write-if-changed for
//!   every document in this worker's [`Partition`], with per-document
//!   failure isolation, skip flags for resumption and a [`ResourceCeiling`]
//!   checked between documents
//! - **Previews**: unified diffs for dry runs
//!
//! ```text
//!                  press-cli
//!                      |
//!                 press-core
//!                 /         \
//!        press-blocks     press-store
//! ```

pub mod ceiling;
pub mod config;
pub mod diff;
pub mod error;
pub mod media;
pub mod partition;
pub mod rules;
pub mod runner;

pub use ceiling::ResourceCeiling;
pub use config::{FetchConfig, MigrationConfig};
pub use error::{Error, Result};
pub use partition::Partition;
pub use rules::{BlockTemplate, RuleRegistry, RuleSpec, compile_rules};
pub use runner::{
    DocumentOutcome, DocumentReport, MigrationResult, RunSummary, Runner, migrate_body,
};
