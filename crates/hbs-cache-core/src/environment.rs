//! The template environment: decides per request whether to reuse a cached
//! artifact or recompile, and brackets rendering with profiler spans.
//!
//! ## Load decision
//!
//! | Cache      | `auto_reload` | Action                                  |
//! |------------|---------------|-----------------------------------------|
//! | absent     | any           | compile, write, load                    |
//! | present    | `false`       | load                                    |
//! | present    | `true`        | load if the loader reports it fresh, otherwise compile, write, load |
//!
//! With `auto_reload`, a fresh artifact compiled with unresolved partials is
//! also rebuilt once any of those partials can be found.
//! Compiled code is never executed straight from the compiler: it is written
//! to the cache and read back, so what runs is exactly what is stored. A
//! compile failure writes nothing. A cached artifact that turns out to be
//! missing or corrupt is rebuilt once.

use std::time::{Instant, SystemTime};

use serde::Serialize;

use crate::artifact;
use crate::cache::{ArtifactCache, CacheKey, FilesystemCache};
use crate::compiler::{self, CompileOptions, HandlebarsCompiler, TemplateCompiler};
use crate::config::EnvironmentOptions;
use crate::error::{HbsError, Result};
use crate::loader::TemplateLoader;
use crate::profiler::{NoopProfiler, Profile, ProfileGuard, Profiler};
use crate::render::RenderFunction;

/// State of a template's cache entry as seen by [`HandlebarsEnvironment::load_template`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No artifact stored.
    Cold,
    /// Artifact stored but older than the source (auto-reload only).
    Stale,
    /// Artifact usable as is.
    Warm,
}

pub struct HandlebarsEnvironment {
    loader: Box<dyn TemplateLoader>,
    compiler: Box<dyn TemplateCompiler>,
    cache: Box<dyn ArtifactCache>,
    profiler: Box<dyn Profiler>,
    options: EnvironmentOptions,
    compile_options: CompileOptions,
    auto_reload: bool,
}

impl HandlebarsEnvironment {
    /// Environment with a [`FilesystemCache`] at `options.cache`, the
    /// [`HandlebarsCompiler`] and no profiling.
    ///
    /// Fails with [`HbsError::Configuration`] unless `options.cache` is a
    /// non-empty path.
    pub fn new(loader: impl TemplateLoader + 'static, options: EnvironmentOptions) -> Result<Self> {
        let cache = FilesystemCache::new(options.cache.directory()?);
        let compile_options = options.compile_options(loader.paths());
        let auto_reload = options.auto_reload();

        tracing::debug!(
            cache = %cache.directory().display(),
            auto_reload,
            debug = options.debug,
            flags = %options.flags,
            "environment configured"
        );

        Ok(Self {
            loader: Box::new(loader),
            compiler: Box::new(HandlebarsCompiler::new()),
            cache: Box::new(cache),
            profiler: Box::new(NoopProfiler),
            options,
            compile_options,
            auto_reload,
        })
    }

    /// Replace the cache backend.
    pub fn with_cache(mut self, cache: impl ArtifactCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    /// Replace the compiler.
    pub fn with_compiler(mut self, compiler: impl TemplateCompiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    /// Replace the profiling sink.
    pub fn with_profiler(mut self, profiler: impl Profiler + 'static) -> Self {
        self.profiler = Box::new(profiler);
        self
    }

    pub fn loader(&self) -> &dyn TemplateLoader {
        self.loader.as_ref()
    }

    pub fn cache(&self) -> &dyn ArtifactCache {
        self.cache.as_ref()
    }

    pub fn options(&self) -> &EnvironmentOptions {
        &self.options
    }

    pub fn compile_options(&self) -> &CompileOptions {
        &self.compile_options
    }

    pub fn is_auto_reload(&self) -> bool {
        self.auto_reload
    }

    pub fn is_debug(&self) -> bool {
        self.options.debug
    }

    /// Cache key for `name`.
    pub fn cache_key(&self, name: &str) -> Result<CacheKey> {
        self.cache
            .generate_key(name)
            .ok_or_else(|| HbsError::InvalidTemplateName(name.to_string()))
    }

    /// Whether an artifact written at `time` still reflects the source of `name`.
    pub fn is_template_fresh(&self, name: &str, time: SystemTime) -> Result<bool> {
        self.loader.is_fresh(name, time).map_err(|e| match e {
            e @ HbsError::SourceUnavailable { .. } => e,
            other => HbsError::SourceUnavailable {
                name: name.to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// Where `name` stands in the load decision.
    ///
    /// Based on timestamps only; unresolved partials are checked when the
    /// artifact is loaded.
    pub fn cache_status(&self, name: &str) -> Result<CacheStatus> {
        let key = self.cache_key(name)?;
        self.status_of(name, &key)
    }

    fn status_of(&self, name: &str, key: &CacheKey) -> Result<CacheStatus> {
        if !self.cache.exists(key) {
            return Ok(CacheStatus::Cold);
        }
        if !self.auto_reload || self.is_template_fresh(name, self.cache.timestamp(key))? {
            return Ok(CacheStatus::Warm);
        }
        Ok(CacheStatus::Stale)
    }

    /// Compile `name` into the cache unconditionally and return the compiled code.
    pub fn compile(&self, name: &str) -> Result<String> {
        let key = self.cache_key(name)?;
        self.compile_into(name, &key)
    }

    fn compile_into(&self, name: &str, key: &CacheKey) -> Result<String> {
        let source = self.loader.source(name)?;
        let started = Instant::now();
        let code = self
            .compiler
            .compile(&source, &self.compile_options)
            .map_err(|source| HbsError::Compilation {
                name: name.to_string(),
                source,
            })?;
        self.cache.write(key, &artifact::encode(name, &code))?;

        tracing::info!(
            template = name,
            key = %key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compiled template"
        );
        Ok(code)
    }

    /// Resolve the render function for `name`, compiling if needed.
    pub fn load_template(&self, name: &str) -> Result<RenderFunction> {
        let key = self.cache_key(name)?;

        match self.status_of(name, &key)? {
            CacheStatus::Warm => match self.cache.load(&key) {
                Ok(render) => match self.newly_resolved_partial(&render) {
                    Some(partial) => {
                        tracing::debug!(template = name, partial, "unresolved partial now available");
                    }
                    None => {
                        tracing::debug!(template = name, "cache hit");
                        return Ok(render);
                    }
                },
                Err(e) if e.is_cache_damage() => {
                    tracing::warn!(template = name, error = %e, "cached artifact unusable, recompiling");
                }
                Err(e) => return Err(e),
            },
            CacheStatus::Stale => tracing::debug!(template = name, "cache stale"),
            CacheStatus::Cold => tracing::debug!(template = name, "cache cold"),
        }

        self.compile_into(name, &key)?;
        self.cache.load(&key)
    }

    /// First partial that was missing at compile time and can now be found.
    fn newly_resolved_partial<'r>(&self, render: &'r RenderFunction) -> Option<&'r str> {
        if !self.auto_reload {
            return None;
        }
        render
            .unresolved_partials()
            .iter()
            .map(String::as_str)
            .find(|partial| compiler::partial_exists(partial, &self.compile_options))
    }

    /// Render `name` with `context`, inside a template profile span.
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        let renderer = self.load_template(name)?;
        let _span = ProfileGuard::new(self.profiler.as_ref(), Profile::template(name));
        renderer.call(context)
    }
}
