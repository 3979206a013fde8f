//! Configuration structure
// (c) 2024 Ross Younger

use clap::Args;
use figment::{
    value::{Dict, Map, Value},
    Metadata, Profile, Provider,
};
use serde::{Deserialize, Serialize};
use struct_field_names_as_array::FieldNamesAsSlice;

use crate::{qlog::QlogOptions, qperf::QperfOptions, util::humanu64::HumanU64};

/// The set of configurable options supported by pepvis.
///
/// **Note:** The implementation of `default()` for this struct returns pepvis's hard-wired configuration defaults.
///
/// The command line supplies a [`ConfigurationOverrides`], which holds the same fields wrapped in `Option`.
/// Wherever the user does not provide a value, values from lower priority sources obtain.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, FieldNamesAsSlice)]
pub struct Configuration {
    // QLOG ===========================================================================================
    /// Added to every qlog event time (milliseconds)
    pub shift_ms: f64,
    /// qlog events after this time (milliseconds, after shifting) are ignored. 0 means no limit.
    pub max_ms: f64,
    /// The stream whose data, flow control and acknowledgements are analysed
    pub stream_id: u64,

    // QPERF ==========================================================================================
    /// qperf reports after this time (seconds) are ignored. 0 means no limit.
    pub max_s: f64,
    /// Whether to insert an all-zero report at the time to first byte
    pub add_zero_report: bool,
    /// File extension of qperf report files within a scenario directory
    pub extension: String,
    /// Merge every N consecutive qperf reports into one. 1 leaves reports untouched.
    pub reduce_steps: usize,
    /// Times (seconds) at which cumulative bytes received are reported
    pub checkpoints: Vec<f64>,
    /// Byte counts for which the time to receive them is reported
    pub byte_targets: Vec<HumanU64>,
}

fn unbounded_if_zero(limit: f64) -> f64 {
    if limit > 0. {
        limit
    } else {
        f64::INFINITY
    }
}

impl Configuration {
    /// qlog parse options derived from this configuration
    #[must_use]
    pub fn qlog_options(&self) -> QlogOptions {
        QlogOptions {
            shift_ms: self.shift_ms,
            max_ms: unbounded_if_zero(self.max_ms),
        }
    }

    /// qperf parse options derived from this configuration
    #[must_use]
    pub fn qperf_options(&self) -> QperfOptions {
        QperfOptions {
            max_s: unbounded_if_zero(self.max_s),
            add_zero_report: self.add_zero_report,
        }
    }
}

impl Default for Configuration {
    /// **(Unusual!)**
    /// Returns pepvis's hard-wired configuration defaults.
    fn default() -> Self {
        Self {
            shift_ms: 0.,
            max_ms: 0.,
            stream_id: 0,
            max_s: 0.,
            add_zero_report: true,
            extension: "log".into(),
            reduce_steps: 1,
            checkpoints: vec![5., 10., 20., 30., 40.],
            byte_targets: [1_000_000, 2_000_000, 10_000_000, 100_000_000]
                .into_iter()
                .map(HumanU64::new)
                .collect(),
        }
    }
}

/// Command-line overrides for [`Configuration`]. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct ConfigurationOverrides {
    /// Shifts every qlog event time by this many milliseconds [default: 0]
    #[arg(global = true, long, value_name("ms"), allow_negative_numbers(true), help_heading("qlog"))]
    pub shift_ms: Option<f64>,

    /// Ignores qlog events after this time (milliseconds, after shifting). 0 means no limit.
    #[arg(global = true, long, value_name("ms"), help_heading("qlog"))]
    pub max_ms: Option<f64>,

    /// Selects the stream to analyse [default: 0]
    #[arg(global = true, short('s'), long, value_name("id"), help_heading("qlog"))]
    pub stream_id: Option<u64>,

    /// Ignores qperf reports after this time (seconds). 0 means no limit.
    #[arg(global = true, long, value_name("s"), help_heading("qperf"))]
    pub max_s: Option<f64>,

    /// Whether to insert an all-zero report at the time to first byte [default: true]
    #[arg(global = true, long, value_name("bool"), help_heading("qperf"))]
    pub add_zero_report: Option<bool>,

    /// File extension of qperf report files [default: log]
    #[arg(global = true, short('e'), long, value_name("ext"), help_heading("qperf"))]
    pub extension: Option<String>,

    /// Merges every N consecutive qperf reports into one [default: 1]
    #[arg(global = true, short('n'), long, value_name("N"), help_heading("qperf"))]
    pub reduce_steps: Option<usize>,

    /// Times at which to report cumulative bytes, comma separated [default: 5,10,20,30,40]
    #[arg(global = true, long, value_name("s,..."), value_delimiter(','), help_heading("qperf"))]
    pub checkpoints: Option<Vec<f64>>,

    /// Byte counts to report the time to receive, comma separated.
    /// SI suffixes are accepted. [default: 1M,2M,10M,100M]
    #[arg(global = true, long, value_name("bytes,..."), value_delimiter(','), value_parser=clap::value_parser!(HumanU64), help_heading("qperf"))]
    pub byte_targets: Option<Vec<HumanU64>>,
}

/// If the given `arg` is not None, inserts it into `dict` with key `arg_name`.
fn insert_if_some<T>(dict: &mut Dict, arg_name: &str, arg: Option<T>) -> Result<(), figment::Error>
where
    T: Serialize,
{
    if let Some(a) = arg {
        let _ = dict.insert(arg_name.to_string(), Value::serialize(a)?);
    }
    Ok(())
}

impl Provider for ConfigurationOverrides {
    fn metadata(&self) -> Metadata {
        Metadata::named("command-line").interpolater(|_profile, path| {
            let key = path.last().map_or("<unknown>".to_string(), |s| s.replace('_', "-"));
            format!("--{key}")
        })
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let mut dict = Dict::new();
        insert_if_some(&mut dict, "shift_ms", self.shift_ms)?;
        insert_if_some(&mut dict, "max_ms", self.max_ms)?;
        insert_if_some(&mut dict, "stream_id", self.stream_id)?;
        insert_if_some(&mut dict, "max_s", self.max_s)?;
        insert_if_some(&mut dict, "add_zero_report", self.add_zero_report)?;
        insert_if_some(&mut dict, "extension", self.extension.clone())?;
        insert_if_some(&mut dict, "reduce_steps", self.reduce_steps)?;
        insert_if_some(&mut dict, "checkpoints", self.checkpoints.clone())?;
        insert_if_some(&mut dict, "byte_targets", self.byte_targets.clone())?;

        let mut profile_map = Map::new();
        let _ = profile_map.insert(Profile::Global, dict);
        Ok(profile_map)
    }
}

#[cfg(test)]
mod test {
    use figment::Provider as _;
    use struct_field_names_as_array::FieldNamesAsSlice as _;

    use super::{Configuration, ConfigurationOverrides};

    #[test]
    fn unbounded_limits() {
        let c = Configuration::default();
        assert!(c.qlog_options().max_ms.is_infinite());
        assert!(c.qperf_options().max_s.is_infinite());
        let c = Configuration {
            max_ms: 250.,
            max_s: 12.,
            add_zero_report: false,
            ..Default::default()
        };
        assert_eq!(c.qlog_options().max_ms, 250.);
        assert_eq!(c.qperf_options().max_s, 12.);
        assert!(!c.qperf_options().add_zero_report);
    }

    #[test]
    fn overrides_only_what_was_given() {
        let o = ConfigurationOverrides {
            stream_id: Some(4),
            checkpoints: Some(vec![1., 2.]),
            ..Default::default()
        };
        let data = o.data().unwrap();
        let dict = data.values().next().unwrap();
        assert_eq!(dict.len(), 2);
        assert!(dict.contains_key("stream_id"));
        assert!(dict.contains_key("checkpoints"));
    }

    #[test]
    fn field_names_match_serialization() {
        // show-config relies on the field list matching what serde writes
        let json = serde_json::to_value(Configuration::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), Configuration::FIELD_NAMES_AS_SLICE.len());
        assert_eq!(Configuration::FIELD_NAMES_AS_SLICE.len(), 9);
    }
}
