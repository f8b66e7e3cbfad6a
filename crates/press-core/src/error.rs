//! Error types for press-core

/// Result type for press-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in press-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rule entry that cannot be compiled
    #[error("Invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    /// Migration config that loads but makes no sense
    #[error("Invalid migration config: {message}")]
    InvalidConfig { message: String },

    /// Partition spec outside `0 <= index < count`
    #[error("Invalid partition {index}/{count}")]
    InvalidPartition { index: u32, count: u32 },

    /// A resource ceiling was breached between documents; the run stops
    #[error("Resource ceiling exceeded: {message}")]
    ResourceCeiling { message: String },

    /// An untouched document did not serialize back to its stored body
    #[error("Round-trip check failed for document {id}: {source}")]
    RoundTrip {
        id: String,
        #[source]
        source: press_blocks::Error,
    },

    // Transparent wrappers for underlying crate errors
    /// Block rewriting error from press-blocks
    #[error(transparent)]
    Blocks(#[from] press_blocks::Error),

    /// Store, fetch or log error from press-store
    #[error(transparent)]
    Store(#[from] press_store::Error),
}

impl Error {
    pub fn invalid_rule(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
