use crate::dbc::SignalCatalog;
use crate::domain::model::{ProcessedData, SignalValue};
use crate::utils::error::{ConvertError, Result};
use std::collections::HashMap;
use std::str::FromStr;

pub const SUMMARY_FILE: &str = "Summary.csv";
pub const ALL_SIGNALS_FILE: &str = "All_Signals.csv";
pub const TIME_HEADER: &str = "Time[s]";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const LINE_END: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvEncoding {
    Utf8,
    /// UTF-8 with BOM, so spreadsheet tools detect the encoding.
    Utf8Sig,
}

impl CsvEncoding {
    pub const SUPPORTED: [&'static str; 2] = ["utf-8", "utf-8-sig"];

    pub fn preamble(&self) -> Vec<u8> {
        match self {
            Self::Utf8 => Vec::new(),
            Self::Utf8Sig => UTF8_BOM.to_vec(),
        }
    }
}

impl FromStr for CsvEncoding {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(Self::Utf8Sig),
            other => Err(ConvertError::InvalidConfigValueError {
                field: "csv_encoding".to_string(),
                value: other.to_string(),
                reason: format!("Supported encodings: {}", Self::SUPPORTED.join(", ")),
            }),
        }
    }
}

/// A CSV file rendered in memory, ready to hand to storage.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// 小數位數：至少一位，採樣間隔更細時跟著增加
pub fn time_precision(sample_interval: f64) -> usize {
    for precision in 1..=9 {
        let scaled = sample_interval * 10f64.powi(precision as i32);
        if (scaled - scaled.round()).abs() < 1e-6 {
            return precision;
        }
    }
    9
}

pub struct CsvWriter {
    encoding: CsvEncoding,
    group_size: usize,
}

impl CsvWriter {
    pub fn new(encoding: CsvEncoding, group_size: usize) -> Self {
        Self {
            encoding,
            group_size: group_size.max(1),
        }
    }

    /// 分組檔案、Summary.csv、All_Signals.csv，依此順序
    pub fn render_all(&self, data: &ProcessedData, catalog: &SignalCatalog) -> Result<Vec<RenderedFile>> {
        let mut files = Vec::with_capacity(data.sorted_groups.len() + 2);

        for group in &data.sorted_groups {
            let signals = data.groups.get(group).map(Vec::as_slice).unwrap_or_default();
            files.push(RenderedFile {
                name: format!("{}.csv", group),
                contents: self.render_table(signals, data, catalog, true)?,
            });
        }

        files.push(RenderedFile {
            name: SUMMARY_FILE.to_string(),
            contents: self.render_summary(data)?,
        });

        let mut all_signals: Vec<usize> = data.groups.values().flatten().copied().collect();
        all_signals.sort_by(|a, b| {
            let name = |id: &usize| catalog.signal(*id).map(|s| s.full_name.as_str());
            name(a).cmp(&name(b))
        });
        files.push(RenderedFile {
            name: ALL_SIGNALS_FILE.to_string(),
            contents: self.render_table(&all_signals, data, catalog, false)?,
        });

        Ok(files)
    }

    /// Header plus one row per time slot; with `separate_groups` a blank row
    /// follows every `group_size` data rows.
    pub fn render_table(
        &self,
        signals: &[usize],
        data: &ProcessedData,
        catalog: &SignalCatalog,
        separate_groups: bool,
    ) -> Result<Vec<u8>> {
        let mut out = self.encoding.preamble();
        let precision = time_precision(data.sample_interval);

        let mut header = Vec::with_capacity(signals.len() + 1);
        header.push(TIME_HEADER.to_string());
        header.extend(signals.iter().map(|id| {
            catalog
                .signal(*id)
                .map(|info| info.column_header())
                .unwrap_or_default()
        }));
        write_records(&mut out, std::iter::once(header))?;

        let timestamps = data.sorted_timestamps();
        let chunk_size = if separate_groups {
            self.group_size
        } else {
            timestamps.len().max(1)
        };

        for chunk in timestamps.chunks(chunk_size) {
            let rows = chunk.iter().map(|bucket| {
                let empty = HashMap::new();
                let values = data.rows.get(bucket).unwrap_or(&empty);
                build_row(*bucket, data.sample_interval, precision, signals, values)
            });
            write_records(&mut out, rows)?;

            if separate_groups && chunk.len() == self.group_size {
                out.extend_from_slice(LINE_END);
            }
        }

        Ok(out)
    }

    pub fn render_summary(&self, data: &ProcessedData) -> Result<Vec<u8>> {
        let mut out = self.encoding.preamble();
        let time_points = data.rows.len().to_string();
        let signal_count = data.signal_count().to_string();
        let group_count = data.sorted_groups.len().to_string();
        let interval = format!("{}", data.sample_interval);
        let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut records = vec![
            cells(&["Conversion Summary Report"]),
            vec![],
            cells(&["Grouping rule", "Grouped by BatP + number pattern"]),
            cells(&["Example", "BatP3_BMS_xxx -> BatP3 group"]),
            vec![],
            cells(&["Statistics"]),
            cells(&["Sampled time points", time_points.as_str()]),
            cells(&["Total signals", signal_count.as_str()]),
            cells(&["Groups", group_count.as_str()]),
            cells(&["Sample interval [s]", interval.as_str()]),
            cells(&["Generated at", generated.as_str()]),
            vec![],
            cells(&["Group details"]),
            cells(&["Group", "Signals", "File"]),
        ];
        for (group, count) in data.group_statistics() {
            records.push(vec![group.clone(), count.to_string(), format!("{}.csv", group)]);
        }

        for record in records {
            if record.is_empty() {
                out.extend_from_slice(LINE_END);
            } else {
                write_records(&mut out, std::iter::once(record))?;
            }
        }
        Ok(out)
    }
}

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn build_row(
    bucket: i64,
    sample_interval: f64,
    precision: usize,
    signals: &[usize],
    values: &HashMap<usize, SignalValue>,
) -> Vec<String> {
    let mut row = Vec::with_capacity(signals.len() + 1);
    row.push(format!("{:.*}", precision, bucket as f64 * sample_interval));
    row.extend(
        signals
            .iter()
            .map(|id| values.get(id).map(ToString::to_string).unwrap_or_default()),
    );
    row
}

fn write_records<I>(out: &mut Vec<u8>, records: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(out);
    for record in records {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
