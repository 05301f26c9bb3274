use crate::dbc::SignalCatalog;
use crate::domain::model::{SampleCell, SampledLog};
use crate::utils::error::{ConvertError, Result};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

/// Classic CAN data frame line: `<time> <channel> <id>[x] Rx|Tx d <dlc> <bytes...>`.
/// Trailing statistics written by newer loggers (`Length = ...`) are tolerated.
static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(\d+\.\d+)\s+(\d+)\s+([0-9A-Fa-f]+x?)\s+(Rx|Tx)\s+d\s+(\d+)",
        r"((?:\s+[0-9A-Fa-f]{2})+)",
        r"(?:\s+(?:Length|BitCount|ID)\s*=.*)?$",
    ))
    .expect("ASC frame pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub struct AscFrame {
    pub timestamp: f64,
    pub channel: u32,
    pub frame_id: u32,
    pub is_extended: bool,
    pub direction: Direction,
    pub dlc: usize,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// 解析單行，不是資料幀（註解、事件、錯誤幀等）時回傳 None
pub fn parse_frame_line(line: &str) -> Option<AscFrame> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return None;
    }

    let caps = FRAME_RE.captures(line)?;
    let id_text = &caps[3];
    let is_extended = id_text.ends_with('x');
    let frame_id = u32::from_str_radix(id_text.trim_end_matches('x'), 16).ok()?;

    let data = caps[6]
        .split_whitespace()
        .map(|byte| u8::from_str_radix(byte, 16))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .ok()?;

    Some(AscFrame {
        timestamp: caps[1].parse().ok()?,
        channel: caps[2].parse().ok()?,
        frame_id,
        is_extended,
        direction: if &caps[4] == "Rx" {
            Direction::Rx
        } else {
            Direction::Tx
        },
        dlc: caps[5].parse().ok()?,
        data,
    })
}

/// Sampled time slot of a timestamp, rounding half to even.
pub fn bucket_index(timestamp: f64, sample_interval: f64) -> i64 {
    (timestamp / sample_interval).round_ties_even() as i64
}

/// ASC 檔案解析器：逐行讀取、解碼 DBC 中有定義的幀並依採樣間隔分桶
pub struct AscParser {
    sample_interval: f64,
    debug: bool,
    log: SampledLog,
}

impl AscParser {
    pub fn new(sample_interval: f64, debug: bool) -> Self {
        Self {
            sample_interval,
            debug,
            log: SampledLog::new(sample_interval),
        }
    }

    pub fn parse_file(&mut self, path: &Path, catalog: &SignalCatalog) -> Result<()> {
        let file = File::open(path).map_err(|e| {
            tracing::error!("Failed to open ASC file {}: {}", path.display(), e);
            ConvertError::IoError(e)
        })?;
        self.parse_reader(BufReader::new(file), catalog)
    }

    /// Lines that are not valid UTF-8 are decoded lossily.
    pub fn parse_reader<R: BufRead>(&mut self, mut reader: R, catalog: &SignalCatalog) -> Result<()> {
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            self.parse_line(&line, catalog);
        }
        Ok(())
    }

    pub fn parse_line(&mut self, line: &str, catalog: &SignalCatalog) {
        self.log.stats.lines_read += 1;

        let Some(frame) = parse_frame_line(line) else {
            return;
        };
        self.log.stats.frames_matched += 1;

        let Some(entry) = catalog.message(frame.frame_id) else {
            self.log.stats.unknown_frames += 1;
            return;
        };
        self.log.stats.original_count += 1;

        let decoded = match entry.message.decode(&frame.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.log.stats.decode_errors += 1;
                if self.debug {
                    tracing::debug!("  Decode error at {:.6}s: {}", frame.timestamp, e);
                }
                return;
            }
        };

        // 沒有信號的訊息不產生時間點
        if decoded.is_empty() {
            return;
        }

        let bucket = self
            .log
            .buckets
            .entry(bucket_index(frame.timestamp, self.sample_interval))
            .or_default();

        for (signal_index, value) in decoded {
            let signal_id = entry.signal_ids[signal_index];
            bucket
                .entry(signal_id)
                .and_modify(|cell| {
                    cell.last = value.clone();
                    cell.samples += 1;
                })
                .or_insert_with(|| SampleCell {
                    last: value.clone(),
                    samples: 1,
                });
            self.log.found_signals.insert(signal_id);
        }
    }

    pub fn sampled(&self) -> &SampledLog {
        &self.log
    }

    pub fn into_sampled(self) -> SampledLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::parse_dbc;
    use crate::domain::model::SignalValue;

    const DBC: &str = "BO_ 291 BatP3_Status: 2 BMS\n SG_ Volt : 0|16@1+ (1,0) [0|0] \"V\" X\n";

    fn catalog() -> SignalCatalog {
        let mut catalog = SignalCatalog::new();
        catalog.add_database("bms.dbc", parse_dbc("bms.dbc", DBC).unwrap());
        catalog
    }

    #[test]
    fn test_parse_frame_line() {
        let frame = parse_frame_line("   0.012345 1  123             Rx   d 2 0A 01\n").unwrap();
        assert_eq!(frame.timestamp, 0.012345);
        assert_eq!(frame.channel, 1);
        assert_eq!(frame.frame_id, 0x123);
        assert!(!frame.is_extended);
        assert_eq!(frame.direction, Direction::Rx);
        assert_eq!(frame.dlc, 2);
        assert_eq!(frame.data, vec![0x0A, 0x01]);
    }

    #[test]
    fn test_parse_extended_and_trailing_statistics() {
        let frame = parse_frame_line(
            "1.500000 2 18FF50E5x Tx d 3 01 02 03  Length = 231000 BitCount = 119 ID = 419385573x",
        )
        .unwrap();
        assert!(frame.is_extended);
        assert_eq!(frame.frame_id, 0x18FF50E5);
        assert_eq!(frame.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_non_frame_lines_are_ignored() {
        assert!(parse_frame_line("; comment").is_none());
        assert!(parse_frame_line("date Mon Jan 1 10:00:00 am 2024").is_none());
        assert!(parse_frame_line("base hex  timestamps absolute").is_none());
        assert!(parse_frame_line("0.100000 1 ErrorFrame").is_none());
        assert!(parse_frame_line("0.100000 1 123 Rx r").is_none());
        assert!(parse_frame_line("").is_none());
    }

    #[test]
    fn test_bucket_index_rounds_half_to_even() {
        assert_eq!(bucket_index(0.04, 0.1), 0);
        assert_eq!(bucket_index(0.16, 0.1), 2);
        assert_eq!(bucket_index(2.5, 1.0), 2);
        assert_eq!(bucket_index(3.5, 1.0), 4);
    }

    #[test]
    fn test_parse_keeps_last_value_per_bucket() {
        let catalog = catalog();
        let mut parser = AscParser::new(1.0, false);
        let log = "\
date Mon Jan 1 10:00:00 am 2024
0.100000 1 123 Rx d 2 0A 00
0.200000 1 123 Rx d 2 0B 00
0.300000 1 456 Rx d 2 FF 00
1.100000 1 123 Rx d 1 0C
1.200000 1 123 Rx d 2 0D 00
";
        parser.parse_reader(log.as_bytes(), &catalog).unwrap();
        let sampled = parser.into_sampled();

        assert_eq!(sampled.stats.lines_read, 6);
        assert_eq!(sampled.stats.unknown_frames, 1);
        assert_eq!(sampled.stats.decode_errors, 1);
        assert_eq!(sampled.statistics(), (4, 2, 1));

        let cell = &sampled.buckets[&0][&0];
        assert_eq!(cell.last, SignalValue::Int(11));
        assert_eq!(cell.samples, 2);
        assert_eq!(sampled.buckets[&1][&0].last, SignalValue::Int(13));
    }

    #[test]
    fn test_signal_less_message_adds_no_time_point() {
        let mut catalog = catalog();
        catalog.add_database(
            "bus.dbc",
            parse_dbc("bus.dbc", "BO_ 292 Heartbeat: 0 VCU\n").unwrap(),
        );
        let mut parser = AscParser::new(0.1, false);
        let log = "\
0.000000 1 124 Rx d 1 00
0.500000 1 124 Rx d 1 00
0.900000 1 123 Rx d 2 05 00
";
        parser.parse_reader(log.as_bytes(), &catalog).unwrap();
        let sampled = parser.into_sampled();

        let (_, time_points, found) = sampled.statistics();
        assert_eq!(time_points, 1);
        assert_eq!(found, 1);
        assert!(sampled.buckets.contains_key(&9));
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let catalog = catalog();
        let mut parser = AscParser::new(0.1, true);
        let mut bytes = b"; \xff\xfe header\n".to_vec();
        bytes.extend_from_slice(b"0.000000 1 123 Rx d 2 01 00\n");
        parser.parse_reader(bytes.as_slice(), &catalog).unwrap();
        assert_eq!(parser.sampled().found_signals.len(), 1);
    }
}
