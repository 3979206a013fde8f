//! Error types
// (c) 2024 Ross Younger

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors while ingesting a trace file.
///
/// Any of these aborts the whole file; no partial connection is produced.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be opened or read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying cause
        source: std::io::Error,
    },

    /// A read error part way through a stream
    #[error("read error at line {line}: {source}")]
    Read {
        /// 1-based line number
        line: usize,
        /// Underlying cause
        source: std::io::Error,
    },

    /// A qlog trace without its leading metadata line
    #[error("qlog trace is empty (missing metadata line)")]
    MissingHeader,

    /// A line of a qlog trace did not decode as JSON
    #[error("malformed qlog record at line {line}: {source}")]
    Json {
        /// 1-based line number
        line: usize,
        /// Underlying cause
        source: serde_json::Error,
    },

    /// A recognised qperf line carried a number we could not parse
    #[error("malformed number {value:?} at line {line}")]
    Number {
        /// 1-based line number
        line: usize,
        /// The offending text
        value: String,
    },

    /// A directory to scan could not be turned into a file pattern
    #[error("bad file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// qperf report lines were present, but no time-to-first-byte line to anchor them
    #[error("qperf output has {0} report line(s) but no time to first byte")]
    MissingTimeToFirstByte(usize),
}

/// Errors combining several connections
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregateError {
    /// An aggregate needs at least one member
    #[error("cannot aggregate an empty group of connections")]
    EmptyGroup,

    /// Parallel reports did not fall on the same whole second
    #[error("report times do not match: {expected}s vs {found}s")]
    TimeMismatch {
        /// Rounded time of the first report
        expected: i64,
        /// Rounded time of the mismatching report
        found: i64,
    },
}
