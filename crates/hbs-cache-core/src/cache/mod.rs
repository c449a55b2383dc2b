//! Compiled-artifact cache.
//!
//! [`ArtifactCache`] is the capability the environment depends on: derive a key
//! from a template name, store compiled code under it, load it back as a
//! [`RenderFunction`], and report when it was last written. Key derivation is
//! separate from storage so backends can be swapped without touching
//! orchestration.
//!
//! - [`FilesystemCache`]: artifacts under a directory, written atomically.
//! - [`MemoryCache`]: in-process map, for tests and embedding.

pub mod filesystem;
pub mod memory;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};

use crate::artifact;
use crate::error::{HbsError, Result};
use crate::render::RenderFunction;

pub use filesystem::FilesystemCache;
pub use memory::MemoryCache;

/// Timestamp reported for keys that were never written.
pub const NEVER_WRITTEN: SystemTime = SystemTime::UNIX_EPOCH;

/// Opaque location of an artifact inside a cache backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(PathBuf);

impl CacheKey {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self(location.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Storage for compiled artifacts.
pub trait ArtifactCache: Send + Sync {
    /// Deterministic key for `name`; `None` if the name is empty.
    fn generate_key(&self, name: &str) -> Option<CacheKey>;

    /// Store `content` under `key`, replacing any previous artifact.
    fn write(&self, key: &CacheKey, content: &str) -> Result<()>;

    /// Read the artifact under `key` and evaluate it.
    fn load(&self, key: &CacheKey) -> Result<RenderFunction>;

    /// Last write time of `key`, or [`NEVER_WRITTEN`].
    fn timestamp(&self, key: &CacheKey) -> SystemTime;

    fn exists(&self, key: &CacheKey) -> bool;
}

/// Hex SHA-256 of a template name.
pub(crate) fn name_digest(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    Some(hex::encode(Sha256::digest(name.as_bytes())))
}

/// Decode artifact text into a render function; every failure is corruption.
pub(crate) fn evaluate(key: &CacheKey, text: &str) -> Result<RenderFunction> {
    let corrupt = |reason: String| HbsError::ArtifactCorrupt {
        key: key.to_string(),
        reason,
    };
    let decoded = artifact::decode(text).map_err(corrupt)?;
    RenderFunction::from_code(decoded.name, decoded.code).map_err(corrupt)
}
