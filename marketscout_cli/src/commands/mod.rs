//! CLI subcommand implementations.

pub mod collect;
pub mod extract;
pub mod summarize;
