//! Compiler behaviour flags.
//!
//! Stored as raw bits in compiled programs and as a list of snake_case names in
//! configuration files:
//!
//! ```json
//! { "flags": ["best_performance", "error_exception", "runtime_partials"] }
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Bitset of compiler options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompileFlags: u32 {
        /// Emit compact programs.
        const BEST_PERFORMANCE = 1 << 0;
        /// Surface render-time failures as errors instead of logging them.
        const ERROR_EXCEPTION = 1 << 1;
        /// Allow hash arguments (`{{helper key=value}}`).
        const NAMED_ARGS = 1 << 2;
        /// Allow segment literals (`{{[first name]}}`) and quoted string arguments.
        const ADVANCED_VAR_NAMES = 1 << 3;
        /// Allow partials that cannot be resolved at compile time.
        const RUNTIME_PARTIALS = 1 << 4;
        /// Keep Handlebars.js partial indentation.
        const HANDLEBARS_JS = 1 << 5;
        /// Treat missing variables as render errors.
        const STRICT = 1 << 6;
    }
}

impl CompileFlags {
    /// Config names of the set flags, in declaration order.
    pub fn names(self) -> Vec<String> {
        self.iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect()
    }
}

impl Default for CompileFlags {
    /// Every flag except [`CompileFlags::STRICT`].
    fn default() -> Self {
        Self::all().difference(Self::STRICT)
    }
}

impl FromStr for CompileFlags {
    type Err = String;

    /// A single flag by its config name, e.g. `named_args`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(format!("unknown compiler flag: {s}"));
        }
        Self::from_name(&s.to_ascii_uppercase()).ok_or_else(|| format!("unknown compiler flag: {s}"))
    }
}

impl fmt::Display for CompileFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join("|"))
    }
}

impl Serialize for CompileFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.names().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CompileFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut flags = Self::empty();
        for name in &names {
            flags |= name.parse().map_err(serde::de::Error::custom)?;
        }
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_excludes_strict() {
        let flags = CompileFlags::default();
        assert!(flags.contains(CompileFlags::RUNTIME_PARTIALS));
        assert!(flags.contains(CompileFlags::HANDLEBARS_JS));
        assert!(!flags.contains(CompileFlags::STRICT));
        assert_eq!(flags.bits(), 0x3f);
    }

    #[test]
    fn test_json_uses_names() {
        let flags = CompileFlags::NAMED_ARGS | CompileFlags::STRICT;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#"["named_args","strict"]"#);
        let parsed: CompileFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, flags);
    }

    #[test]
    fn test_unknown_flag_name_rejected() {
        for json in [r#"["turbo"]"#, r#"["NAMED_ARGS"]"#, r#""named_args""#] {
            let result: Result<CompileFlags, _> = serde_json::from_str(json);
            assert!(result.is_err(), "{json}");
        }
    }

    #[test]
    fn test_display_joins_names() {
        let flags = CompileFlags::BEST_PERFORMANCE | CompileFlags::RUNTIME_PARTIALS;
        assert_eq!(flags.to_string(), "best_performance|runtime_partials");
        assert_eq!(CompileFlags::empty().to_string(), "");
    }

    #[test]
    fn test_from_bits_truncate_drops_unknown() {
        let flags = CompileFlags::from_bits_truncate(0xffff_ffff);
        assert_eq!(flags, CompileFlags::all());
        assert_eq!(flags.bits(), 0x7f);
    }
}
