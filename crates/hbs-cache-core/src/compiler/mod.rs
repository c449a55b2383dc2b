//! Template compilation.
//!
//! [`TemplateCompiler`] turns template source into compiled code (text). The
//! environment never evaluates what a compiler returns directly: the code is
//! written to the cache first and read back from there, so what runs is always
//! what is stored.
//!
//! [`HandlebarsCompiler`] validates the source with the `handlebars` crate,
//! enforces the syntax gates selected by [`CompileFlags`], resolves partials
//! from `basedir` and emits a [`Program`]. With `RUNTIME_PARTIALS`, partials
//! that cannot be found are listed in [`Program::unresolved`] instead of failing
//! the compile; [`partial_exists`] tells the environment when one shows up.

pub mod flags;
pub mod program;
pub(crate) mod scan;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

pub use flags::CompileFlags;
pub use program::Program;

use scan::Tag;

/// Rejection of a template by a compiler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct CompileError {
    reason: String,
}

impl CompileError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn in_partial(self, name: &str) -> Self {
        Self::new(format!("in partial '{name}': {}", self.reason))
    }
}

/// Options handed to the compiler on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub flags: CompileFlags,
    /// Search roots for partials.
    pub basedir: Vec<PathBuf>,
    /// Extensions tried when a partial name has none, in order.
    pub fileext: Vec<String>,
}

impl CompileOptions {
    pub fn default_fileext() -> Vec<String> {
        vec![".hbs".to_string(), ".handlebars".to_string()]
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            flags: CompileFlags::default(),
            basedir: Vec::new(),
            fileext: Self::default_fileext(),
        }
    }
}

/// Compiles template source into code a cache backend can store and load.
pub trait TemplateCompiler: Send + Sync {
    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> std::result::Result<String, CompileError>;
}

/// Compiler backed by the `handlebars` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandlebarsCompiler;

impl HandlebarsCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile to a [`Program`] without serializing it.
    pub fn compile_program(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> std::result::Result<Program, CompileError> {
        let tags = check_source(source, options.flags)?;
        let mut partials = BTreeMap::new();
        let mut unresolved = BTreeSet::new();
        collect_partials(&tags, options, &mut partials, &mut unresolved)?;
        Ok(Program::with_unresolved(
            options.flags,
            source,
            partials,
            unresolved,
        ))
    }
}

impl TemplateCompiler for HandlebarsCompiler {
    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> std::result::Result<String, CompileError> {
        let program = self.compile_program(source, options)?;
        let pretty = !options.flags.contains(CompileFlags::BEST_PERFORMANCE);
        program
            .to_code(pretty)
            .map_err(|e| CompileError::new(format!("failed to serialize program: {e}")))
    }
}

/// Parse with the Handlebars grammar, then apply the flag gates.
fn check_source(source: &str, flags: CompileFlags) -> std::result::Result<Vec<Tag<'_>>, CompileError> {
    handlebars::Template::compile(source).map_err(|e| CompileError::new(e.to_string()))?;

    let tags = scan::tags(source);
    for tag in &tags {
        let body = match tag {
            Tag::Expression(body) => *body,
            _ => continue,
        };
        if !flags.contains(CompileFlags::NAMED_ARGS) && scan::has_hash_argument(body) {
            return Err(CompileError::new(format!(
                "named arguments are disabled: {{{{{body}}}}}"
            )));
        }
        if !flags.contains(CompileFlags::ADVANCED_VAR_NAMES)
            && (scan::has_segment_literal(body) || scan::has_string_literal(body))
        {
            return Err(CompileError::new(format!(
                "advanced variable names are disabled: {{{{{body}}}}}"
            )));
        }
    }
    Ok(tags)
}

fn collect_partials(
    tags: &[Tag<'_>],
    options: &CompileOptions,
    partials: &mut BTreeMap<String, String>,
    unresolved: &mut BTreeSet<String>,
) -> std::result::Result<(), CompileError> {
    let inline: BTreeSet<&str> = tags
        .iter()
        .filter_map(|tag| match tag {
            Tag::InlinePartial(name) => Some(*name),
            _ => None,
        })
        .collect();

    for tag in tags {
        let (name, block) = match tag {
            Tag::Partial { name, block } => (*name, *block),
            _ => continue,
        };
        if inline.contains(name) || partials.contains_key(name) || unresolved.contains(name) {
            continue;
        }

        match find_partial(name, options)? {
            Some(text) => {
                let nested = check_source(&text, options.flags).map_err(|e| e.in_partial(name))?;
                partials.insert(name.to_string(), text.clone());
                collect_partials(&nested, options, partials, unresolved)
                    .map_err(|e| e.in_partial(name))?;
            }
            // A missing block partial renders its fallback content.
            None if block => {}
            None if options.flags.contains(CompileFlags::RUNTIME_PARTIALS) => {
                tracing::debug!(partial = name, "partial not found, recorded as unresolved");
                unresolved.insert(name.to_string());
            }
            None => {
                return Err(CompileError::new(format!(
                    "partial '{name}' not found in {:?}",
                    options.basedir
                )));
            }
        }
    }
    Ok(())
}

/// Whether `name` now resolves to a partial file under `options.basedir`.
pub fn partial_exists(name: &str, options: &CompileOptions) -> bool {
    matches!(locate_partial(name, options), Ok(Some(_)))
}

fn find_partial(
    name: &str,
    options: &CompileOptions,
) -> std::result::Result<Option<String>, CompileError> {
    let Some(path) = locate_partial(name, options)? else {
        return Ok(None);
    };
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| CompileError::new(format!("failed to read partial {}: {e}", path.display())))
}

/// First `basedir × fileext` candidate for `name` that is a file.
fn locate_partial(
    name: &str,
    options: &CompileOptions,
) -> std::result::Result<Option<PathBuf>, CompileError> {
    let relative = Path::new(name);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(CompileError::new(format!(
            "partial name '{name}' must be a relative path without '..'"
        )));
    }

    let has_ext = options.fileext.iter().any(|ext| name.ends_with(ext.as_str()));
    for dir in &options.basedir {
        let candidates: Vec<PathBuf> = if has_ext {
            vec![dir.join(relative)]
        } else {
            options
                .fileext
                .iter()
                .map(|ext| dir.join(format!("{name}{ext}")))
                .collect()
        };
        if let Some(path) = candidates.into_iter().find(|path| path.is_file()) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
