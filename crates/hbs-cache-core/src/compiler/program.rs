//! The compiled program emitted by [`super::HandlebarsCompiler`].
//!
//! A program is a JSON document holding the validated main template, every
//! partial resolved at compile time, the names of partials that were not found
//! (allowed with `RUNTIME_PARTIALS`), the flag bits it was compiled with and a
//! SHA-256 checksum over all of it. Loading verifies the checksum before the
//! program is handed to the Handlebars runtime.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::CompileFlags;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub format: u32,
    pub flags: u32,
    pub template: String,
    #[serde(default)]
    pub partials: BTreeMap<String, String>,
    /// Partials referenced but not found when compiling.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unresolved: BTreeSet<String>,
    pub checksum: String,
}

impl Program {
    /// Current program format version.
    pub const FORMAT: u32 = 2;

    pub fn new(flags: CompileFlags, template: &str, partials: BTreeMap<String, String>) -> Self {
        Self::with_unresolved(flags, template, partials, BTreeSet::new())
    }

    pub fn with_unresolved(
        flags: CompileFlags,
        template: &str,
        partials: BTreeMap<String, String>,
        unresolved: BTreeSet<String>,
    ) -> Self {
        let checksum = Self::compute_checksum(template, &partials, &unresolved);
        Self {
            format: Self::FORMAT,
            flags: flags.bits(),
            template: template.to_string(),
            partials,
            unresolved,
            checksum,
        }
    }

    pub fn flags(&self) -> CompileFlags {
        CompileFlags::from_bits_truncate(self.flags)
    }

    /// Hex SHA-256 over the template, partials and unresolved names, each
    /// length-prefixed.
    pub fn compute_checksum(
        template: &str,
        partials: &BTreeMap<String, String>,
        unresolved: &BTreeSet<String>,
    ) -> String {
        let mut hasher = Sha256::new();
        let mut feed = |s: &str| {
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        };
        feed(template);
        for (name, body) in partials {
            feed(name);
            feed(body);
        }
        // Separates the partial bodies from the unresolved names.
        hasher.update(u64::MAX.to_le_bytes());
        for name in unresolved {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Serialize to compiled code; `pretty` keeps the artifact readable.
    pub fn to_code(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Parse and verify compiled code.
    pub fn from_code(code: &str) -> std::result::Result<Self, String> {
        let program: Self =
            serde_json::from_str(code).map_err(|e| format!("invalid program: {e}"))?;
        if program.format != Self::FORMAT {
            return Err(format!(
                "unsupported program format {} (expected {})",
                program.format,
                Self::FORMAT
            ));
        }
        let expected =
            Self::compute_checksum(&program.template, &program.partials, &program.unresolved);
        if program.checksum != expected {
            return Err("checksum mismatch".to_string());
        }
        Ok(program)
    }
}
