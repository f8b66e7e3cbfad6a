//! Block-aware content rewriting for stored page bodies.
//!
//! A page body is a sequence of comment-delimited blocks mixed with
//! freeform markup:
//!
//! ```text
//! <!-- wp:heading {"level":2} -->
//! <h2>Title</h2>
//! <!-- /wp:heading -->
//!
//! <!-- wp:image {"id":42} /-->
//! ```
//!
//! [`parse`] turns a body into a [`Document`], rules edit it through a small
//! set of block-level operations, and [`serialize`] renders it back. A
//! document that no rule touched serializes to exactly the bytes it was
//! parsed from; malformed markers degrade to freeform markup instead of
//! failing the parse.
//!
//! The crate performs no I/O. Loading and storing bodies, fetching assets and
//! logging outcomes belong to the caller.

pub mod block;
pub mod document;
pub mod edit;
pub mod error;
pub mod markup;
pub mod matcher;
pub mod parser;
pub mod rules;
pub mod serializer;

pub use block::{Block, FREEFORM_KIND, normalize_kind};
pub use document::{DEFAULT_SEPARATOR, Document};
pub use edit::{Edit, EditKind, EditStatus};
pub use error::{Error, Result};
pub use matcher::{BlockMatcher, Pattern};
pub use parser::{AmbiguityKind, ParseAmbiguity, parse};
pub use rules::{
    ApplyReport, DeleteMatching, FnRule, InsertRelative, Placement, ReplaceMatching,
    RewriteMatching, Rule, RuleOutcome, RuleSet, TruncateFrom,
};
pub use serializer::serialize;
