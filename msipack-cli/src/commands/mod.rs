//! CLI subcommands.

pub mod build;
pub mod common;
pub mod render;
pub mod version;
