// Main CLI entrypoint
// (c) 2024 Ross Younger

use std::process::ExitCode;

use super::{
    args::{CliArgs, Command},
    commands,
};

use crate::{
    config::{Configuration, Manager},
    util::setup_tracing,
};
use anyhow::Context as _;
use clap::Parser;
use indicatif::MultiProgress;

/// Main CLI entrypoint
pub fn cli() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    let progress = MultiProgress::new(); // This writes to stderr
    if args.quiet {
        progress.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    setup_tracing(args.trace_level(), Some(&progress), args.log_file.as_deref())
        .inspect_err(|e| eprintln!("{e:?}"))?;

    let mut manager = Manager::new();
    if let Some(file) = &args.config {
        manager.merge_toml_file(file);
    }
    manager.merge_provider(args.overrides.clone());

    match &args.command {
        Command::ShowConfig => {
            anstream::println!(
                "{}",
                manager.to_display_adapter::<Configuration>(true)
            );
            return Ok(ExitCode::SUCCESS);
        }
        Command::ConfigFiles => {
            for file in Manager::config_files() {
                anstream::println!("{file}");
            }
            return Ok(ExitCode::SUCCESS);
        }
        _ => (),
    }

    let config = manager
        .get::<Configuration>()
        .context("invalid configuration")
        .inspect_err(|e| tracing::error!("{e:#}"))?;

    let result = match &args.command {
        Command::Qlog { file } => commands::qlog_summary(file, &config),
        Command::Series {
            file,
            metric,
            extend,
        } => commands::qlog_series(file, *metric, *extend, &config),
        Command::Qperf { dirs } => commands::qperf_summary(dirs, &config, &progress),
        Command::Crossings { dirs } => commands::crossings(dirs, &config, &progress),
        Command::ShowConfig | Command::ConfigFiles => Ok(()),
    };
    Ok(match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    })
}
