// pepvis top-level command-line arguments
// (c) 2024 Ross Younger

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::ConfigurationOverrides;

#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version,
    about,
    before_help = "e.g.   pepvis qperf results/pep results/no-pep",
    infer_long_args(true)
)]
#[command(help_template(
    "\
{name} version {version}
{about-with-newline}
{usage-heading} {usage}
{before-help}
{all-args}{after-help}
"
))]
#[command(styles=super::styles::CLAP_STYLES)]
pub(crate) struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode: reports only errors
    #[arg(short, long, action, global = true, conflicts_with("debug"))]
    pub quiet: bool,

    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=pepvis=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, global = true, help_heading("Debug"))]
    pub debug: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(short('l'), long, global = true, help_heading("Debug"), value_name("FILE"))]
    pub log_file: Option<PathBuf>,

    /// Reads an additional configuration file, which takes precedence over the system and user files
    #[arg(short('c'), long, global = true, value_name("FILE"))]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigurationOverrides,
}

impl CliArgs {
    pub(crate) fn trace_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}

#[derive(Debug, Subcommand, Clone)]
pub(crate) enum Command {
    /// Summarises one qlog trace
    Qlog {
        /// The trace (newline-delimited JSON)
        file: PathBuf,
    },
    /// Prints one derived series of a qlog trace as CSV
    Series {
        /// The trace (newline-delimited JSON)
        file: PathBuf,
        /// The series to print
        metric: SeriesKind,
        /// Repeats the final value at the end of the trace
        #[arg(long, action)]
        extend: bool,
    },
    /// Summarises each directory of repeated qperf runs
    Qperf {
        /// Scenario directories; each holds one report file per run
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
    /// Lists the points where one scenario's bytes received overtakes another's.
    ///
    /// With several directories, each is averaged and every pair is compared.
    /// With one directory, its runs are compared against each other.
    Crossings {
        /// Scenario directories
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
    /// Outputs the configuration, then exits
    ShowConfig,
    /// Outputs the paths to configuration file(s), then exits
    ConfigFiles,
}

/// Derived qlog series available to `pepvis series`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SeriesKind {
    /// Per-stream limit granted by the peer
    RemoteStreamLimit,
    /// Per-stream limit we granted
    LocalStreamLimit,
    /// Sum of the peer's per-stream limits
    StreamLimitSum,
    /// Connection limit granted by the peer
    ConnectionLimit,
    /// Congestion window
    CongestionWindow,
    /// Bytes in flight
    BytesInFlight,
    /// Latest RTT sample (ms)
    Rtt,
    /// Stream progress plus free congestion window
    AvailableCongestionWindow,
    /// Stream data sent
    StreamSent,
    /// Stream data received
    StreamReceived,
    /// Stream data acknowledged
    StreamAcked,
    /// Cumulative bytes of all sent packets
    RawSent,
}

#[cfg(test)]
mod test {
    use clap::{CommandFactory as _, Parser as _};

    use super::{CliArgs, Command, SeriesKind};

    #[test]
    fn verify_cli() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn overrides_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "pepvis",
            "series",
            "trace.qlog",
            "available-congestion-window",
            "--stream-id",
            "4",
            "--shift-ms",
            "-20",
        ])
        .unwrap();
        assert_eq!(args.overrides.stream_id, Some(4));
        assert_eq!(args.overrides.shift_ms, Some(-20.));
        let Command::Series { metric, extend, .. } = args.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(metric, SeriesKind::AvailableCongestionWindow);
        assert!(!extend);
    }

    #[test]
    fn list_options() {
        let args = CliArgs::try_parse_from([
            "pepvis",
            "qperf",
            "a",
            "b",
            "--checkpoints",
            "1,2.5",
            "--byte-targets",
            "1M,500k",
        ])
        .unwrap();
        assert_eq!(args.overrides.checkpoints, Some(vec![1., 2.5]));
        let targets: Vec<u64> = args
            .overrides
            .byte_targets
            .unwrap()
            .into_iter()
            .map(u64::from)
            .collect();
        assert_eq!(targets, vec![1_000_000, 500_000]);
    }

    #[test]
    fn dirs_required() {
        assert!(CliArgs::try_parse_from(["pepvis", "crossings"]).is_err());
        assert!(CliArgs::try_parse_from(["pepvis", "-q", "-d", "show-config"]).is_err());
    }
}
