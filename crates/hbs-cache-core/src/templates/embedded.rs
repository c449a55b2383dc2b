//! Compile-time embedded starter files for `hbs-cache init`.
//!
//! Each constant loads a file from `templates/project/` via [`include_str!`]. The
//! paths are relative to this source file
//! (`crates/hbs-cache-core/src/templates/embedded.rs`).
//!
//! Do NOT rename or move the files without updating the paths here; a wrong
//! path fails the build.

/// `templates/greeting.hbs` in a new project.
pub const GREETING: &str = include_str!("../../../../templates/project/greeting.hbs");

/// `templates/header.hbs`, the partial used by the greeting.
pub const HEADER: &str = include_str!("../../../../templates/project/header.hbs");

/// `context.json`, sample render data for the greeting.
pub const CONTEXT_JSON: &str = include_str!("../../../../templates/project/context.json");
