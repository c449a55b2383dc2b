//! Unified error types for hbs-cache.

use std::path::PathBuf;
use thiserror::Error;

use crate::compiler::CompileError;

/// All errors that can occur while loading, compiling, caching or rendering templates.
#[derive(Error, Debug)]
pub enum HbsError {
    // --- Configuration ---

    /// The `cache` option is anything other than a non-empty directory path.
    #[error("invalid cache configuration: {0} (cache can only be a directory path string)")]
    Configuration(String),

    /// The configuration file (`hbs-cache.config.json`) was not found.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file exists but contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // --- Templates ---

    /// The template name cannot be turned into a cache key (e.g. it is empty).
    #[error("invalid template name: {0:?}")]
    InvalidTemplateName(String),

    /// The source provider could not produce the template or answer a freshness query.
    #[error("template source unavailable for '{name}': {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// The compiler rejected the template. No artifact was written.
    #[error("failed to compile template '{name}'")]
    Compilation {
        name: String,
        #[source]
        source: CompileError,
    },

    /// A loaded render function failed while producing output.
    #[error("failed to render template '{name}': {reason}")]
    Render { name: String, reason: String },

    // --- Cache ---

    /// No artifact is stored under the key.
    #[error("compiled artifact missing: {0}")]
    ArtifactMissing(String),

    /// The stored artifact could not be decoded or evaluated.
    #[error("compiled artifact corrupt at {key}: {reason}")]
    ArtifactCorrupt { key: String, reason: String },

    // --- Runtime ---

    /// Rendering did not finish within the caller's time budget.
    #[error("rendering '{name}' timed out after {millis} ms")]
    Timeout { name: String, millis: u64 },

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A catch-all for errors raised by custom loaders or compilers.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HbsError {
    /// Whether the error comes from a damaged or absent cache entry, which a
    /// recompile can repair.
    pub fn is_cache_damage(&self) -> bool {
        matches!(self, Self::ArtifactMissing(_) | Self::ArtifactCorrupt { .. })
    }
}

/// Alias for `Result<T, HbsError>`.
pub type Result<T> = std::result::Result<T, HbsError>;
