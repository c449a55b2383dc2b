//! Starter files written by `hbs-cache init`.
//!
//! The files are embedded into the binary at compile time in [`embedded`] and
//! written out by [`crate::project::scaffold`]. They are ordinary Handlebars
//! templates and go through the same compile/cache path as user templates.

pub mod embedded;
