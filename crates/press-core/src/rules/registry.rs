//! Registry of rules implemented in code

use std::collections::BTreeMap;
use std::fmt;

use press_blocks::Rule;

/// Builds a fresh instance of a code-defined rule.
pub type RuleFactory = Box<dyn Fn() -> Box<dyn Rule> + Send + Sync>;

/// Named rules a migration config can reference with `action = "custom"`.
///
/// Publisher-specific logic that does not fit the declarative actions is
/// written as a [`Rule`] (often a `press_blocks::FnRule`) and registered
/// here under a stable name.
#[derive(Default)]
pub struct RuleRegistry {
    factories: BTreeMap<String, RuleFactory>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule factory. A later registration under the same name
    /// replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Rule> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Register a factory (builder style).
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Rule> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate a registered rule.
    pub fn build(&self, name: &str) -> Option<Box<dyn Rule>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
