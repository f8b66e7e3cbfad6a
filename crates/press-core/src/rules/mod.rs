//! Declarative migration rules
//!
//! A migration config lists its rules as [`RuleSpec`] tables. Each compiles
//! into a `press-blocks` rule; `custom` entries name rules registered in code
//! through a [`RuleRegistry`].

mod registry;
mod spec;

pub use registry::{RuleFactory, RuleRegistry};
pub use spec::{BlockTemplate, RuleSpec, compile_rules};
