//! A backtracking regular-expression engine: pattern parser -> AST,
//! epsilon-NFA compiler, memoized backtracking matcher with capture
//! tracking. See `core::regex::Regex` for the public entry point.

mod cli;
mod core;

pub use crate::core::error::{CompileError, EngineError, Error};
pub use crate::core::regex::{Group, Match, Options, Regex};

/// Runs the command-line front end; used by `main.rs`.
pub fn run_cli() {
    cli::run();
}
