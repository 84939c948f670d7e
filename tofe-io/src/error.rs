//! Error types for tofe-io.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tofe-io operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O and external-collaborator error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cut file that does not follow the cut format. Never skipped
    /// silently; the path says which file to look at.
    #[error("malformed cut file {}: {reason}", .path.display())]
    MalformedCutFile {
        path: PathBuf,
        reason: String,
    },

    /// An external tool failed to run or produced unusable output.
    #[error("external tool '{tool}' failed: {reason}")]
    ExternalTool {
        tool: String,
        reason: String,
    },

    /// Session store (de)serialization failure.
    #[error("session store: {0}")]
    Session(#[from] serde_json::Error),

    /// Error bubbled up from the core data model.
    #[error(transparent)]
    Core(#[from] tofe_core::Error),
}
