//! Document stores: where page bodies and skip flags live.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{Error, Result, io};

/// Extension of body files in a [`DirectoryStore`].
pub const BODY_EXTENSION: &str = "html";

/// Suffix of the skip-flag sidecar next to each body.
pub const FLAGS_SUFFIX: &str = ".flags.json";

/// Storage for page bodies keyed by document id.
///
/// Writes are last-write-wins per document. Flags are store-level markers a
/// migration sets on documents it has processed, so an interrupted run can
/// resume without redoing work.
pub trait DocumentStore {
    /// All document ids, in a stable order.
    fn ids(&self) -> Result<Vec<String>>;

    fn get_body(&self, id: &str) -> Result<String>;

    fn set_body(&mut self, id: &str, body: &str) -> Result<()>;

    fn has_flag(&self, id: &str, flag: &str) -> Result<bool>;

    fn set_flag(&mut self, id: &str, flag: &str) -> Result<()>;
}

/// Check that a document id is safe to use as a file stem.
///
/// Ids may contain ASCII letters, digits, `-`, `_` and `.`, must not be
/// empty and must not start with a dot.
pub fn validate_document_id(id: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidDocumentId {
            id: id.to_string(),
            reason: reason.to_string(),
        })
    };

    if id.is_empty() {
        return invalid("id is empty");
    }
    if id.starts_with('.') {
        return invalid("id starts with a dot");
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return invalid(&format!("unexpected character {c:?}"));
    }
    Ok(())
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    bodies: BTreeMap<String, String>,
    flags: BTreeMap<String, BTreeSet<String>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document (builder style). Does not count as a write.
    pub fn with_document(mut self, id: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(id.into(), body.into());
        self
    }

    pub fn body(&self, id: &str) -> Option<&str> {
        self.bodies.get(id).map(String::as_str)
    }

    /// Number of `set_body` calls made so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn flags(&self, id: &str) -> Vec<&str> {
        self.flags
            .get(id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    fn ids(&self) -> Result<Vec<String>> {
        Ok(self.bodies.keys().cloned().collect())
    }

    fn get_body(&self, id: &str) -> Result<String> {
        self.bodies
            .get(id)
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound { id: id.to_string() })
    }

    fn set_body(&mut self, id: &str, body: &str) -> Result<()> {
        self.writes += 1;
        self.bodies.insert(id.to_string(), body.to_string());
        Ok(())
    }

    fn has_flag(&self, id: &str, flag: &str) -> Result<bool> {
        Ok(self.flags.get(id).is_some_and(|set| set.contains(flag)))
    }

    fn set_flag(&mut self, id: &str, flag: &str) -> Result<()> {
        if !self.bodies.contains_key(id) {
            return Err(Error::DocumentNotFound { id: id.to_string() });
        }
        self.flags
            .entry(id.to_string())
            .or_default()
            .insert(flag.to_string());
        Ok(())
    }
}

/// Store backed by a directory of `<id>.html` files.
///
/// Flags for a document live in a `<id>.flags.json` sidecar holding a sorted
/// JSON array of flag names. Every write goes through [`io::write_atomic`].
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|e| Error::io(&root, e))?;
        if !metadata.is_dir() {
            return Err(Error::io(
                &root,
                std::io::Error::new(ErrorKind::NotADirectory, "store root is not a directory"),
            ));
        }
        Ok(Self { root })
    }

    /// Open a directory, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn body_path(&self, id: &str) -> Result<PathBuf> {
        validate_document_id(id)?;
        Ok(self.root.join(format!("{id}.{BODY_EXTENSION}")))
    }

    pub fn flags_path(&self, id: &str) -> Result<PathBuf> {
        validate_document_id(id)?;
        Ok(self.root.join(format!("{id}{FLAGS_SUFFIX}")))
    }

    fn read_flags(&self, id: &str) -> Result<BTreeSet<String>> {
        let path = self.flags_path(id)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(Error::io(&path, e)),
        }
    }
}

impl DocumentStore for DirectoryStore {
    fn ids(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| Error::io(&self.root, e))?;
        let mut ids = Vec::new();

        for entry in entries {
            let path = entry.map_err(|e| Error::io(&self.root, e))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(BODY_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && validate_document_id(stem).is_ok()
            {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn get_body(&self, id: &str) -> Result<String> {
        let path = self.body_path(id)?;
        match fs::read_to_string(&path) {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::DocumentNotFound { id: id.to_string() })
            }
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    fn set_body(&mut self, id: &str, body: &str) -> Result<()> {
        let path = self.body_path(id)?;
        io::write_text(&path, body)?;
        tracing::debug!(id, bytes = body.len(), "wrote document body");
        Ok(())
    }

    fn has_flag(&self, id: &str, flag: &str) -> Result<bool> {
        Ok(self.read_flags(id)?.contains(flag))
    }

    fn set_flag(&mut self, id: &str, flag: &str) -> Result<()> {
        if !self.body_path(id)?.is_file() {
            return Err(Error::DocumentNotFound { id: id.to_string() });
        }
        let mut flags = self.read_flags(id)?;
        if !flags.insert(flag.to_string()) {
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&flags)?;
        io::write_text(&self.flags_path(id)?, &content)
    }
}
