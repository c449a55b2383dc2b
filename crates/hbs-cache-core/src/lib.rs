//! Core library for hbs-cache.
//!
//! Compiles Handlebars templates, stores the compiled artifacts in a cache and
//! serves them back as [`render::RenderFunction`]s until auto-reload finds the
//! source has changed. The pieces are wired together by
//! [`environment::HandlebarsEnvironment`]:
//!
//! - [`loader`] — where template source comes from
//! - [`compiler`] — source to compiled code, via the `handlebars` crate
//! - [`cache`] — key derivation, atomic storage, freshness timestamps
//! - [`profiler`] — enter/leave hooks around each render

pub mod artifact;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod environment;
pub mod error;
pub mod loader;
pub mod profiler;
pub mod project;
pub mod render;
pub mod templates;

pub use environment::HandlebarsEnvironment;
pub use error::{HbsError, Result};
