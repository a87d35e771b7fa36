//! Error types for the self-extracting launcher

use std::fmt;

/// Main error type for bundle operations
///
/// Every variant is terminal for the current invocation; the pipeline is
/// strictly fail-fast and nothing is retried internally.
#[derive(Debug)]
pub enum SfxError {
    /// Malformed or truncated footer, bad marker, or impossible payload geometry
    Format(String),

    /// Payload bytes did not hash to the digest stored in the footer
    Integrity(String),

    /// Manifest or bundled interpreter absent from the expanded bundle
    MissingResource(String),

    /// Child interpreter process could not be started
    Launch(String),

    /// Bundle assembly failed (builder-side)
    Build(String),

    /// IO error
    Io(std::io::Error),
}

impl fmt::Display for SfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SfxError::Format(msg) => write!(f, "format error: {msg}"),
            SfxError::Integrity(msg) => write!(f, "integrity error: {msg}"),
            SfxError::MissingResource(msg) => write!(f, "missing resource: {msg}"),
            SfxError::Launch(msg) => write!(f, "launch error: {msg}"),
            SfxError::Build(msg) => write!(f, "build error: {msg}"),
            SfxError::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for SfxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SfxError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SfxError {
    fn from(err: std::io::Error) -> Self {
        SfxError::Io(err)
    }
}

/// Result type for bundle operations
pub type Result<T> = std::result::Result<T, SfxError>;
