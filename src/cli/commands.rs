// Subcommand implementations
// (c) 2024 Ross Younger

use std::{
    fmt::Display,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use human_repr::HumanCount as _;
use indicatif::{MultiProgress, ProgressBar, ProgressFinish, ProgressStyle};
use strum::IntoEnumIterator as _;
use tabled::{builder::Builder, settings::style::Style, Table, Tabled};
use tracing::{info, warn};

use super::args::SeriesKind;
use crate::{
    config::Configuration,
    qlog::{metrics, read_qlog, QlogConnection},
    qperf::{load_all_connections, Interception, Metric, ReportSource as _, Source},
    series::{Sample, SeriesExt as _},
    util::stats::{mean, DataRate},
};

const PROGRESS_STYLE: &str = "{msg:.dim} {wide_bar:.cyan} {pos}/{len}";

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn seconds(value: Option<f64>) -> String {
    or_dash(value.map(|s| format!("{s:.3}s")))
}

fn table_of(rows: Vec<[String; 2]>) -> Table {
    let mut builder = Builder::default();
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    let _ = table.with(Style::sharp());
    table
}

// QLOG ///////////////////////////////////////////////////////////////////////////////////////////////////////

pub(crate) fn qlog_summary(file: &Path, config: &Configuration) -> Result<()> {
    let conn = read_qlog(file, config.qlog_options())
        .with_context(|| format!("loading {}", file.display()))?;
    let stream = config.stream_id;
    let ms = |v: Option<f64>| or_dash(v.map(|t| format!("{t:.3}ms")));

    let mut rows = vec![
        ["file".into(), file.display().to_string()],
        ["events".into(), conn.events().len().to_string()],
        ["last event".into(), ms(conn.max_time())],
        [format!("time to first byte (stream {stream})"), ms(conn.time_to_first_byte(stream))],
        ["remote initial_max_data".into(), or_dash(conn.remote_initial_max_data())],
        [
            "remote initial_max_stream_data_bidi_remote".into(),
            or_dash(conn.remote_initial_max_stream_data_bidi_remote()),
        ],
        ["local initial_max_data".into(), or_dash(conn.local_initial_max_data())],
        [
            "local initial_max_stream_data_bidi_local".into(),
            or_dash(conn.local_initial_max_stream_data_bidi_local()),
        ],
        [
            "mean RTT".into(),
            ms(mean(conn.rtt_updates().map(|(_, rtt)| rtt))),
        ],
        [
            format!("receive rate (stream {stream})"),
            metrics::avg_stream_receive_rate(&conn, stream).to_string(),
        ],
    ];
    if let Some(ratio) = metrics::xse_overhead_ratio(&conn, stream) {
        rows.push([
            "XSE payload rate".into(),
            metrics::avg_xse_stream_receive_rate(&conn, stream).to_string(),
        ]);
        rows.push(["XSE overhead".into(), format!("{:.2}%", ratio * 100.)]);
    }
    anstream::println!("{}", table_of(rows));
    Ok(())
}

fn write_series<W, I, V>(out: &mut W, series: I, end: Option<f64>) -> std::io::Result<()>
where
    W: Write,
    I: Iterator<Item = Sample<V>>,
    V: Display + Clone,
{
    fn emit<W: Write, V: Display>(
        out: &mut W,
        series: impl Iterator<Item = Sample<V>>,
    ) -> std::io::Result<()> {
        writeln!(out, "time_ms,value")?;
        for (t, v) in series {
            writeln!(out, "{t},{v}")?;
        }
        Ok(())
    }
    match end {
        Some(end) => emit(out, series.extend_to_end(end)),
        None => emit(out, series),
    }
}

/// Writes the chosen series of `conn` as CSV
pub(crate) fn write_qlog_series<W: Write>(
    out: &mut W,
    conn: &QlogConnection,
    kind: SeriesKind,
    stream: u64,
    extend: bool,
) -> std::io::Result<()> {
    let end = if extend { conn.max_time() } else { None };
    match kind {
        SeriesKind::RemoteStreamLimit => {
            write_series(out, conn.remote_stream_flow_limit_updates(stream), end)
        }
        SeriesKind::LocalStreamLimit => {
            write_series(out, conn.local_stream_flow_limit_updates(stream), end)
        }
        SeriesKind::StreamLimitSum => write_series(out, conn.stream_flow_limit_sum_updates(), end),
        SeriesKind::ConnectionLimit => {
            write_series(out, conn.remote_connection_flow_limit_updates(), end)
        }
        SeriesKind::CongestionWindow => write_series(out, conn.congestion_window_updates(), end),
        SeriesKind::BytesInFlight => write_series(out, conn.bytes_in_flight_updates(), end),
        SeriesKind::Rtt => write_series(out, conn.rtt_updates(), end),
        SeriesKind::AvailableCongestionWindow => {
            write_series(out, metrics::available_congestion_window(conn, stream), end)
        }
        SeriesKind::StreamSent => write_series(out, metrics::stream_data_sent(conn, stream), end),
        SeriesKind::StreamReceived => {
            write_series(out, metrics::stream_data_received(conn, stream), end)
        }
        SeriesKind::StreamAcked => {
            write_series(out, metrics::stream_data_acked(conn, stream), end)
        }
        SeriesKind::RawSent => write_series(out, metrics::raw_data_sent(conn), end),
    }
}

pub(crate) fn qlog_series(
    file: &Path,
    kind: SeriesKind,
    extend: bool,
    config: &Configuration,
) -> Result<()> {
    let conn = read_qlog(file, config.qlog_options())
        .with_context(|| format!("loading {}", file.display()))?;
    let mut out = std::io::stdout().lock();
    write_qlog_series(&mut out, &conn, kind, config.stream_id, extend)?;
    Ok(())
}

// QPERF //////////////////////////////////////////////////////////////////////////////////////////////////////

fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into())
}

/// Loads every scenario directory, one progress step each
fn load_sources(
    dirs: &[PathBuf],
    config: &Configuration,
    display: &MultiProgress,
    aggregate: bool,
) -> Result<Vec<Source>> {
    let progress = display.add(
        ProgressBar::new(dirs.len() as u64)
            .with_style(ProgressStyle::with_template(PROGRESS_STYLE)?)
            .with_message("loading")
            .with_finish(ProgressFinish::AndClear),
    );
    let mut sources = Vec::with_capacity(dirs.len());
    for dir in progress.wrap_iter(dirs.iter()) {
        let label = dir_label(dir);
        progress.set_message(label.clone());
        let runs = load_all_connections(dir, &config.extension, config.qperf_options())
            .with_context(|| format!("loading {}", dir.display()))?;
        let source = if aggregate {
            Source::aggregate(&label, runs)
        } else {
            Source::group(&label, runs)
        }
        .with_context(|| format!("no *.{} files in {}", config.extension, dir.display()))?;
        let source = if config.reduce_steps > 1 {
            source.reduce_steps(config.reduce_steps)
        } else {
            source
        };
        sources.push(source);
    }
    Ok(sources)
}

fn format_metric(metric: Metric, value: Option<f64>) -> String {
    match metric {
        Metric::MeanRate | Metric::MeanRateAfterRampUp => {
            or_dash(value.map(|r| DataRate::from_bits_per_second(r).to_string()))
        }
        _ => seconds(value),
    }
}

/// One column of summary values per scenario
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn qperf_table(sources: &[Source], config: &Configuration) -> Table {
    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once(String::new()).chain(sources.iter().map(|s| s.label().to_string())),
    );
    let mut row = |name: String, cell: &dyn Fn(&Source) -> String| {
        builder.push_record(std::iter::once(name).chain(sources.iter().map(cell)));
    };

    row("runs".into(), &|s| s.runs().to_string());
    row("internal errors".into(), &|s| match s {
        Source::Single(c) => usize::from(c.internal_error().is_some()).to_string(),
        Source::Aggregate(a) | Source::Group(a) => a.internal_error_count().to_string(),
    });
    for metric in Metric::iter() {
        row(metric.to_string(), &|s| format_metric(metric, s.scalar(metric)));
    }
    for &t in &config.checkpoints {
        row(format!("bytes at {t}s"), &|s| {
            (s.total_bytes_at(t).max(0.) as u64).human_count_bytes().to_string()
        });
    }
    for target in &config.byte_targets {
        let target = **target;
        row(format!("time to {}", target.human_count_bytes()), &|s| {
            seconds(s.representative().time_to_received_bytes(target))
        });
    }
    let mut table = builder.build();
    let _ = table.with(Style::sharp());
    table
}

pub(crate) fn qperf_summary(
    dirs: &[PathBuf],
    config: &Configuration,
    display: &MultiProgress,
) -> Result<()> {
    let sources = load_sources(dirs, config, display, true)?;
    for s in &sources {
        if let Source::Aggregate(a) = s {
            let errors = a.internal_error_count();
            if errors > 0 {
                warn!("{}: {errors} of {} runs reported an internal error", a.label(), a.runs());
            }
        }
    }
    anstream::println!("{}", qperf_table(&sources, config));
    Ok(())
}

#[derive(Tabled)]
struct CrossingRow {
    time: String,
    bytes: String,
    ahead: String,
    behind: String,
}

impl From<&Interception> for CrossingRow {
    fn from(i: &Interception) -> Self {
        Self {
            time: format!("{:.3}s", i.time),
            bytes: i.bytes_received.human_count_bytes().to_string(),
            ahead: i.upper.clone(),
            behind: i.lower.clone(),
        }
    }
}

/// Every crossing: between each pair of sources, or within a single group
pub(crate) fn find_crossings(sources: &[Source]) -> Vec<Interception> {
    let mut found: Vec<Interception> = match sources {
        [single] => single.internal_interceptions(),
        _ => sources
            .iter()
            .enumerate()
            .flat_map(|(i, a)| sources[i + 1..].iter().flat_map(move |b| a.interceptions(b)))
            .collect(),
    };
    found.sort_by(|a, b| a.time.total_cmp(&b.time));
    found
}

pub(crate) fn crossings(
    dirs: &[PathBuf],
    config: &Configuration,
    display: &MultiProgress,
) -> Result<()> {
    let sources = load_sources(dirs, config, display, dirs.len() > 1)?;
    let found = find_crossings(&sources);
    if found.is_empty() {
        info!("no crossings");
        return Ok(());
    }
    let rows: Vec<CrossingRow> = found.iter().map(CrossingRow::from).collect();
    anstream::println!("{}", Table::new(rows).with(Style::sharp()));
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{find_crossings, qperf_table, write_qlog_series};
    use crate::{
        cli::args::SeriesKind,
        config::Configuration,
        qlog::{parse_qlog, QlogOptions},
        qperf::{QperfConnection, Report, Source},
    };

    const TRACE: &str = r#"{"qlog_version":"0.3","title":"test"}
{"time":1.0,"name":"recovery:metrics_updated","data":{"congestion_window":12000,"bytes_in_flight":1000}}
{"time":4.0,"name":"recovery:metrics_updated","data":{"bytes_in_flight":3000}}
{"time":9.0,"name":"transport:packet_received","data":{"header":{"packet_type":"1RTT","packet_number":0},"frames":[]}}
"#;

    fn series_csv(kind: SeriesKind, extend: bool) -> String {
        let conn = parse_qlog(TRACE.as_bytes(), QlogOptions::default()).unwrap();
        let mut out = Vec::new();
        write_qlog_series(&mut out, &conn, kind, 0, extend).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn csv_series() {
        assert_eq!(
            series_csv(SeriesKind::BytesInFlight, false),
            "time_ms,value\n1,1000\n4,3000\n"
        );
        assert_eq!(
            series_csv(SeriesKind::CongestionWindow, true),
            "time_ms,value\n1,12000\n9,12000\n"
        );
        assert_eq!(series_csv(SeriesKind::RawSent, true), "time_ms,value\n");
    }

    fn linear(label: &str, start: u64, slope: u64) -> QperfConnection {
        let mut reports = vec![Report::new(0., 0., start, 0)];
        reports.extend((1..=10).map(|t| Report::new(f64::from(t), 8000., slope, 1)));
        QperfConnection::from_reports(label, Some(0.), reports)
    }

    #[test]
    fn summary_table() {
        let sources = vec![
            Source::aggregate("pep", vec![linear("p1", 0, 100), linear("p2", 0, 300)]).unwrap(),
            Source::from(linear("plain", 0, 100)),
        ];
        let config = Configuration {
            checkpoints: vec![5.],
            byte_targets: vec![1000.into()],
            ..Default::default()
        };
        let out = qperf_table(&sources, &config).to_string();
        assert!(out.contains("pep"));
        assert!(out.contains("plain"));
        assert!(out.contains("bytes at 5s"));
        // averaged: 200 bytes per second
        assert!(out.contains("1kB"));
        assert!(out.contains("5.000s"));
    }

    #[test]
    fn crossings_sorted() {
        let sources = vec![
            Source::from(linear("ahead", 55, 10)),
            Source::from(linear("fast", 0, 20)),
            Source::from(linear("faster", 0, 40)),
        ];
        let found = find_crossings(&sources);
        assert!(!found.is_empty());
        assert!(found.windows(2).all(|w| w[0].time <= w[1].time));

        let group = Source::group("g", vec![linear("a", 55, 10), linear("b", 0, 20)]).unwrap();
        assert_eq!(find_crossings(&[group]).len(), 1);
    }
}
