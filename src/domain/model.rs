use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::dbc::SignalCatalog;

/// 解碼後的信號值：整數、浮點數或值表標籤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl SignalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", format_float(*v)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip form, integral values keep a trailing `.0`.
/// Exponents below -4 or from 16 up switch to `1e-05` / `1.5e+20` notation.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        if value.fract() == 0.0 {
            format!("{:.1}", value)
        } else {
            format!("{}", value)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// 同一個採樣時間段內某信號的最後值與樣本數
#[derive(Debug, Clone, PartialEq)]
pub struct SampleCell {
    pub last: SignalValue,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines_read: usize,
    pub frames_matched: usize,
    pub unknown_frames: usize,
    pub decode_errors: usize,
    /// 在 DBC 中有定義的幀數
    pub original_count: usize,
}

/// Bucket index `k` stands for time `k * sample_interval`.
#[derive(Debug, Clone, Default)]
pub struct SampledLog {
    pub sample_interval: f64,
    pub buckets: BTreeMap<i64, HashMap<usize, SampleCell>>,
    pub found_signals: BTreeSet<usize>,
    pub stats: ParseStats,
}

impl SampledLog {
    pub fn new(sample_interval: f64) -> Self {
        Self {
            sample_interval,
            ..Default::default()
        }
    }

    /// (original data points, sampled time points, signals found)
    pub fn statistics(&self) -> (usize, usize, usize) {
        (
            self.stats.original_count,
            self.buckets.len(),
            self.found_signals.len(),
        )
    }
}

/// Output of the extract phase: the decoding catalog and everything sampled with it.
#[derive(Debug, Clone)]
pub struct ExtractedLog {
    pub catalog: SignalCatalog,
    pub sampled: SampledLog,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessedData {
    pub sample_interval: f64,
    pub rows: BTreeMap<i64, HashMap<usize, SignalValue>>,
    pub groups: BTreeMap<String, Vec<usize>>,
    pub sorted_groups: Vec<String>,
}

impl ProcessedData {
    pub fn sorted_timestamps(&self) -> Vec<i64> {
        self.rows.keys().copied().collect()
    }

    pub fn group_statistics(&self) -> Vec<(String, usize)> {
        self.sorted_groups
            .iter()
            .map(|g| (g.clone(), self.groups.get(g).map_or(0, Vec::len)))
            .collect()
    }

    pub fn signal_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub catalog: SignalCatalog,
    pub data: ProcessedData,
    pub stats: ParseStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub groups: Vec<(String, usize)>,
    pub time_points: usize,
    pub stats: ParseStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_float(12.0), "12.0");
        assert_eq!(format_float(3.7), "3.7");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(f64::NAN), "nan");
    }

    #[test]
    fn test_format_float_exponent_notation() {
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(-1.5e-7), "-1.5e-07");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e20), "1.5e+20");
        assert_eq!(format_float(1e100), "1e+100");
        assert_eq!(format_float(-0.0), "-0.0");
    }

    #[test]
    fn test_signal_value_display() {
        assert_eq!(SignalValue::Int(-40).to_string(), "-40");
        assert_eq!(SignalValue::Float(1.5).to_string(), "1.5");
        assert_eq!(SignalValue::Text("Standby".into()).to_string(), "Standby");
    }
}
