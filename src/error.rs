//! Error types for dockpatrol
//!
//! Uses `thiserror` for library errors. Every external-command failure is
//! converted into one of these variants at the call site; components log and
//! continue rather than letting a single failure abort a cycle.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dockpatrol operations
pub type PatrolResult<T> = Result<T, PatrolError>;

/// Main error type for dockpatrol operations
#[derive(Error, Debug)]
pub enum PatrolError {
    /// Required environment variable is not set
    #[error("missing environment variable '{key}'")]
    MissingEnv { key: &'static str },

    /// Environment variable is set but unusable
    #[error("invalid value for '{key}': {reason}")]
    InvalidEnv { key: &'static str, reason: String },

    /// Git transport failure (fetch, reset, clean, clone)
    #[error("git {op} failed: {detail}")]
    Transport { op: &'static str, detail: String },

    /// Secret decryption failure
    #[error("failed to decrypt {file}: {detail}")]
    Decryption { file: PathBuf, detail: String },

    /// Compose/runtime command exited non-zero
    #[error("engine command '{op}' failed: {detail}")]
    Engine { op: String, detail: String },

    /// Container disappeared or became inaccessible between listing and action
    #[error("container '{id}' could not be acted on: {detail}")]
    ContainerLookup { id: String, detail: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
