//! Migration configuration
//!
//! A migration is described by one file (TOML by convention, JSON and YAML
//! also load):
//!
//! ```toml
//! name = "strip-donations-2024"
//! store = "bodies"
//! log = "logs/strip-donations.jsonl"
//! dry_run = false
//!
//! [partition]
//! index = 0
//! count = 4
//!
//! [ceiling]
//! max_rss_bytes = 1073741824
//!
//! [fetch]
//! mirror = "media-mirror"
//!
//! [[rules]]
//! action = "delete"
//! name = "remove-donation-embeds"
//! match = { kind = "html", inner_contains = "donorbox.org" }
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use press_store::{ConfigStore, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::rules::RuleSpec;
use crate::{Error, Partition, ResourceCeiling, Result};

/// Asset fetching settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Local mirror root; when set, media newly referenced by rewritten
    /// documents must be present before the document is written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror: Option<PathBuf>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub name: String,
    /// Directory of `<id>.html` bodies
    pub store: PathBuf,
    /// JSON Lines run log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<PathBuf>,
    /// Store flag marking processed documents; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_flag: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub partition: Partition,
    #[serde(default)]
    pub ceiling: ResourceCeiling,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl MigrationConfig {
    /// Load, resolve relative paths and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Self = ConfigStore::new().load(path)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        tracing::debug!(name = %config.name, rules = config.rules.len(), "loaded migration config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }

    /// Make relative paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.store);
        if let Some(log) = self.log.as_mut() {
            resolve(log);
        }
        if let Some(mirror) = self.fetch.mirror.as_mut() {
            resolve(mirror);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_config("name must not be empty"));
        }
        if self.skip_flag.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(Error::invalid_config("skip_flag must not be empty"));
        }
        self.partition.validate()?;

        let mut names = BTreeSet::new();
        for rule in &self.rules {
            if !names.insert(rule.name()) {
                return Err(Error::invalid_rule(rule.name(), "duplicate rule name"));
            }
        }
        Ok(())
    }

    /// Flag set on documents this migration has processed.
    pub fn skip_flag(&self) -> &str {
        self.skip_flag.as_deref().unwrap_or(&self.name)
    }
}
