// (c) 2024 Ross Younger
//! # Configuration management
//!
//! pepvis obtains run-time configuration from the following sources, in order of increasing priority:
//! 1. Hard-wired defaults
//! 2. The system-wide configuration file (`/etc/pepvis.toml`)
//! 3. The user's configuration file (`~/.pepvis.toml`)
//! 4. A file given with `--config`
//! 5. Command-line options
//!
//! ## File format
//!
//! Configuration files are TOML. Field names are those of [Configuration].
//!
//! ```toml
//! # our qperf runs write .txt files
//! extension = "txt"
//! max_s = 60
//! checkpoints = [5, 10, 30, 60]
//! byte_targets = ["1M", "10M", 50000000]
//! ```
//!
//! On the command line:
//! * `pepvis show-config` outputs every field, its current value, and where that value came from.
//! * `pepvis config-files` outputs the list of configuration files consulted.

mod structure;
pub use structure::{Configuration, ConfigurationOverrides};

mod manager;
pub use manager::{DisplayAdapter, Manager};

pub(crate) const BASE_CONFIG_FILENAME: &str = "pepvis.toml";
