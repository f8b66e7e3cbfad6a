//! Error types for press-blocks

/// Result type for press-blocks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in press-blocks operations.
///
/// Malformed markers are not errors: the parser degrades them to freeform
/// markup and records a [`ParseAmbiguity`](crate::ParseAmbiguity) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serializing an untouched document did not reproduce its body.
    #[error(
        "Round-trip mismatch at byte {offset}: expected {expected_len} bytes, serializer produced {actual_len}"
    )]
    RoundTripMismatch {
        offset: usize,
        expected_len: usize,
        actual_len: usize,
    },

    /// A replacement produced a block its own rule would match again.
    #[error("Rule '{rule}' built a replacement that matches its own matcher")]
    SelfMatchingReplacement { rule: String },

    #[error("Invalid block attributes: {0}")]
    InvalidAttributes(String),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
