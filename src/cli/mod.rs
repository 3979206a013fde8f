//! Command Line Interface for pepvis
// (c) 2024 Ross Younger

mod args;
mod cli_main;
mod commands;
pub(crate) mod styles;
pub use cli_main::cli;
