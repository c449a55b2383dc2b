//! Template source providers.
//!
//! A [`TemplateLoader`] hands out template text by name and answers whether a
//! cached artifact written at a given time still reflects the source. Template
//! names are looked up as given; there is no discovery beyond joining the name
//! onto each configured root.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::error::{HbsError, Result};

/// Source of template text.
pub trait TemplateLoader: Send + Sync {
    /// Raw template text for `name`.
    fn source(&self, name: &str) -> Result<String>;

    /// Whether an artifact written at `time` is still current for `name`.
    fn is_fresh(&self, name: &str, time: SystemTime) -> Result<bool>;

    /// Search roots, used as default partial directories for the compiler.
    fn paths(&self) -> Vec<PathBuf>;
}

fn unavailable(name: &str, reason: impl Into<String>) -> HbsError {
    HbsError::SourceUnavailable {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Loads templates from one or more directories, first match wins.
#[derive(Debug, Clone)]
pub struct FilesystemLoader {
    paths: Vec<PathBuf>,
}

impl FilesystemLoader {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Resolve `name` to an existing file under one of the roots.
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        if name.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(unavailable(
                name,
                "template names must be relative paths without '..'",
            ));
        }

        self.paths
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| unavailable(name, format!("not found in {:?}", self.paths)))
    }
}

impl TemplateLoader for FilesystemLoader {
    fn source(&self, name: &str) -> Result<String> {
        let path = self.find(name)?;
        std::fs::read_to_string(&path)
            .map_err(|e| unavailable(name, format!("{}: {e}", path.display())))
    }

    fn is_fresh(&self, name: &str, time: SystemTime) -> Result<bool> {
        let path = self.find(name)?;
        let modified = std::fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .map_err(|e| unavailable(name, format!("{}: {e}", path.display())))?;
        Ok(modified <= time)
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }
}

#[derive(Debug, Clone)]
struct MemoryTemplate {
    source: String,
    modified: SystemTime,
}

/// Templates held in memory, each with its own modification time.
///
/// Clones share storage, so a template can be updated after the loader has
/// been handed to an environment.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: Arc<Mutex<HashMap<String, MemoryTemplate>>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryLoader::set`].
    pub fn with(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.set(name, source);
        self
    }

    /// Insert or replace a template, stamping it with the current time.
    pub fn set(&self, name: impl Into<String>, source: impl Into<String>) {
        self.set_with_time(name, source, SystemTime::now());
    }

    pub fn set_with_time(
        &self,
        name: impl Into<String>,
        source: impl Into<String>,
        modified: SystemTime,
    ) {
        self.lock().insert(
            name.into(),
            MemoryTemplate {
                source: source.into(),
                modified,
            },
        );
    }

    pub fn remove(&self, name: &str) {
        self.lock().remove(name);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemoryTemplate>> {
        self.templates.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, name: &str) -> Result<MemoryTemplate> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| unavailable(name, "no such template"))
    }
}

impl TemplateLoader for MemoryLoader {
    fn source(&self, name: &str) -> Result<String> {
        Ok(self.get(name)?.source)
    }

    fn is_fresh(&self, name: &str, time: SystemTime) -> Result<bool> {
        Ok(self.get(name)?.modified <= time)
    }

    fn paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}
