//! CLI subcommand implementations.

pub mod listen;
pub mod stream;
