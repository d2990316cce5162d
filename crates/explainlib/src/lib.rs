//! Annotate defconfig files with the prompts, help text and menu structure of a Kconfig tree.
#![warn(clippy::all)]
#![allow(clippy::result_large_err)]
#![warn(missing_docs)]

mod assignment;
mod context;
mod defconfig;
mod error;
mod eval;
mod explainer;
mod format;
mod kconfig;
mod options;
mod render;
mod tree;

pub mod parser;
pub use {
    assignment::*,
    context::*,
    error::*,
    eval::parse_int,
    explainer::*,
    format::{fill, PrintFormat, RenderFlags},
    kconfig::*,
    options::*,
    render::*,
    tree::*,
};
