//! Render functions: compiled programs evaluated into a Handlebars registry.

use std::collections::BTreeSet;

use handlebars::Handlebars;
use serde::Serialize;

use crate::compiler::{CompileFlags, Program};
use crate::error::{HbsError, Result};

/// Registry key of the main template. Partial names starting with `@` are
/// never collected, so this cannot shadow a partial.
const MAIN: &str = "@main";

/// An invokable template, produced by loading an artifact from the cache.
pub struct RenderFunction {
    name: String,
    flags: CompileFlags,
    registry: Handlebars<'static>,
    unresolved: BTreeSet<String>,
}

impl RenderFunction {
    /// Parse, verify and evaluate compiled code.
    pub fn from_code(name: &str, code: &str) -> std::result::Result<Self, String> {
        let program = Program::from_code(code)?;
        Self::from_program(name, &program)
    }

    /// Register the program's template and partials in a fresh registry.
    pub fn from_program(name: &str, program: &Program) -> std::result::Result<Self, String> {
        let flags = program.flags();
        let mut registry = Handlebars::new();
        registry.set_strict_mode(flags.contains(CompileFlags::STRICT));
        registry.set_prevent_indent(!flags.contains(CompileFlags::HANDLEBARS_JS));

        for (partial, body) in &program.partials {
            registry
                .register_partial(partial, body.as_str())
                .map_err(|e| format!("partial '{partial}': {e}"))?;
        }
        registry
            .register_template_string(MAIN, program.template.as_str())
            .map_err(|e| e.to_string())?;

        Ok(Self {
            name: name.to_string(),
            flags,
            registry,
            unresolved: program.unresolved.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> CompileFlags {
        self.flags
    }

    /// Partials that were missing when this program was compiled.
    pub fn unresolved_partials(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    /// Render with `context`.
    ///
    /// Without [`CompileFlags::ERROR_EXCEPTION`] a failure is logged and the
    /// output is empty.
    pub fn call<T: Serialize>(&self, context: &T) -> Result<String> {
        match self.registry.render(MAIN, context) {
            Ok(output) => Ok(output),
            Err(e) if !self.flags.contains(CompileFlags::ERROR_EXCEPTION) => {
                tracing::error!(template = %self.name, error = %e, "render failed, returning empty output");
                Ok(String::new())
            }
            Err(e) => Err(HbsError::Render {
                name: self.name.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for RenderFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderFunction")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("unresolved", &self.unresolved)
            .finish_non_exhaustive()
    }
}
