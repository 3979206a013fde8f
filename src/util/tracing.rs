//! Tracing helpers
// (c) 2024 Ross Younger

use std::{
    fs::File,
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Context;
use indicatif::MultiProgress;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

const STANDARD_ENV_VAR: &str = "RUST_LOG";
const LOG_FILE_DETAIL_ENV_VAR: &str = "RUST_LOG_FILE_DETAIL";

/// Result type for `filter_for()`
struct FilterResult {
    filter: EnvFilter,
    used_env: bool, // Did we use the environment variable we were requested to?
}

/// Uses the given environment variable; if it wasn't present, logs only pepvis items at the given level.
fn filter_for(trace_level: &str, key: &str) -> anyhow::Result<FilterResult> {
    EnvFilter::try_from_env(key)
        .map(|filter| FilterResult {
            filter,
            used_env: true,
        })
        .or_else(|e| {
            // The env var was unset or invalid. Which is it?
            if std::env::var(key).is_ok() {
                anyhow::bail!("{key} (set in environment) was invalid: {e}");
            }
            Ok(FilterResult {
                filter: EnvFilter::new(format!("{}={trace_level}", env!("CARGO_CRATE_NAME"))),
                used_env: false,
            })
        })
}

/// Sets up tracing to stderr (via a `MultiProgress`, if given) and optionally to a file.
///
/// By default only pepvis's own events are logged, at the given level.
/// `RUST_LOG` overrides this; `RUST_LOG_FILE_DETAIL` does the same for the log file only.
///
/// **CAUTION:** If this function fails, tracing won't be set up; callers must report the error themselves.
pub fn setup(
    trace_level: &str,
    display: Option<&MultiProgress>,
    filename: Option<&Path>,
) -> anyhow::Result<()> {
    let mut layers = Vec::new();

    let filter = filter_for(trace_level, STANDARD_ENV_VAR)?;
    // Show targets only when the user chose the filter; otherwise everything is ours.
    let format = fmt::layer().compact().with_target(filter.used_env);
    let console = match display {
        None => format
            .with_writer(std::io::stderr)
            .with_filter(filter.filter)
            .boxed(),
        Some(mp) => format
            .with_writer(ProgressWriter::wrap(mp))
            .with_filter(filter.filter)
            .boxed(),
    };
    layers.push(console);

    if let Some(filename) = filename {
        let out_file = Arc::new(
            File::create(filename)
                .with_context(|| format!("Failed to open log file {}", filename.display()))?,
        );
        let filter = if std::env::var(LOG_FILE_DETAIL_ENV_VAR).is_ok() {
            FilterResult {
                filter: EnvFilter::try_from_env(LOG_FILE_DETAIL_ENV_VAR)?,
                used_env: true,
            }
        } else {
            filter_for(trace_level, STANDARD_ENV_VAR)?
        };
        let layer = fmt::layer()
            .with_writer(out_file)
            .with_target(filter.used_env)
            .compact()
            .with_ansi(false)
            .with_filter(filter.filter)
            .boxed();
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("tracing was already set up")?;
    Ok(())
}

/// Routes log lines through a `MultiProgress` so they do not tear its bars
struct ProgressWriter {
    display: MultiProgress,
}

impl ProgressWriter {
    fn wrap(display: &MultiProgress) -> Mutex<Self> {
        Mutex::new(Self {
            display: display.clone(),
        })
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = std::str::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let msg = msg.trim_end_matches('\n');
        if self.display.is_hidden() {
            eprintln!("{msg}");
        } else {
            self.display.println(msg)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
