use super::{
    ByteOrder, Database, Message, Multiplex, Signal, ValueType, EXTENDED_ID_FLAG, FRAME_ID_MASK,
};
use crate::utils::error::{ConvertError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const INDEPENDENT_SIGNALS_MESSAGE: &str = "VECTOR__INDEPENDENT_SIG_MSG";

static MESSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^BO_\s+(\d+)\s+(\w+)\s*:\s*(\d+)\s*(\S*)").expect("BO_ pattern is valid")
});

static SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^SG_\s+(\w+)\s*(M|m\d+M?)?\s*:\s*",
        r"(\d+)\|(\d+)@([01])([+-])\s*",
        r"\(\s*([^,\s]+)\s*,\s*([^)\s]+)\s*\)\s*",
        r"\[\s*([^|\s]+)\s*\|\s*([^\]\s]+)\s*\]\s*",
        r#""((?:[^"\\]|\\.)*)""#,
    ))
    .expect("SG_ pattern is valid")
});

static VALUE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^VAL_\s+(\d+)\s+(\w+)\s+(.*?)\s*;\s*$").expect("VAL_ pattern is valid")
});

static VALUE_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(-?\d+)\s+"((?:[^"\\]|\\.)*)""#).expect("value pair pattern is valid")
});

static VALUE_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^SIG_VALTYPE_\s+(\d+)\s+(\w+)\s*:\s*(\d)\s*;").expect("SIG_VALTYPE_ pattern is valid")
});

/// 解析 DBC 文字內容（非嚴格模式：不認識的區段直接略過）
pub fn parse_dbc(file_name: &str, content: &str) -> Result<Database> {
    let mut messages: Vec<Message> = Vec::new();
    // 檔案中的原始 id（含擴展旗標）-> messages 索引
    let mut raw_ids: HashMap<u32, usize> = HashMap::new();
    let mut current: Option<usize> = None;
    let mut skipping_independent = false;
    let mut in_string = false;

    for (index, raw_line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        // 多行字串（通常是 CM_ 註解）內的行不解析
        let quotes = count_unescaped_quotes(line);
        if in_string {
            if quotes % 2 == 1 {
                in_string = false;
            }
            continue;
        }
        if quotes % 2 == 1 {
            in_string = true;
        }

        if line.is_empty() {
            continue;
        }

        if line.starts_with("BO_ ") || line.starts_with("BO_\t") {
            let caps = MESSAGE_RE
                .captures(line)
                .ok_or_else(|| parse_error(file_name, line_no, "malformed BO_ statement"))?;

            let raw_id: u32 = parse_field(file_name, line_no, "message id", &caps[1])?;
            let name = caps[2].to_string();

            if name == INDEPENDENT_SIGNALS_MESSAGE {
                skipping_independent = true;
                current = None;
                continue;
            }
            skipping_independent = false;

            let is_extended = raw_id & EXTENDED_ID_FLAG != 0;
            messages.push(Message {
                frame_id: if is_extended { raw_id & FRAME_ID_MASK } else { raw_id },
                is_extended,
                name,
                length: parse_field(file_name, line_no, "message length", &caps[3])?,
                sender: caps[4].to_string(),
                signals: Vec::new(),
            });
            current = Some(messages.len() - 1);
            raw_ids.insert(raw_id, messages.len() - 1);
        } else if line.starts_with("SG_ ") || line.starts_with("SG_\t") {
            if skipping_independent {
                continue;
            }
            let message_index = current
                .ok_or_else(|| parse_error(file_name, line_no, "SG_ outside of a BO_ block"))?;
            let signal = parse_signal(file_name, line_no, line)?;
            messages[message_index].signals.push(signal);
        } else if line.starts_with("VAL_ ") {
            if let Some(caps) = VALUE_TABLE_RE.captures(line) {
                let raw_id: u32 = parse_field(file_name, line_no, "message id", &caps[1])?;
                if let Some(signal) = find_signal(&mut messages, &raw_ids, raw_id, &caps[2]) {
                    for pair in VALUE_PAIR_RE.captures_iter(&caps[3]) {
                        let value: i64 = parse_field(file_name, line_no, "choice value", &pair[1])?;
                        signal.choices.insert(value, unescape(&pair[2]));
                    }
                } else {
                    tracing::debug!(
                        "{}:{} value table for unknown signal {}.{}",
                        file_name,
                        line_no,
                        &caps[1],
                        &caps[2]
                    );
                }
            }
        } else if line.starts_with("SIG_VALTYPE_ ") {
            let caps = VALUE_TYPE_RE
                .captures(line)
                .ok_or_else(|| parse_error(file_name, line_no, "malformed SIG_VALTYPE_ statement"))?;
            let raw_id: u32 = parse_field(file_name, line_no, "message id", &caps[1])?;
            let value_type = match &caps[3] {
                "1" => ValueType::Float32,
                "2" => ValueType::Float64,
                _ => ValueType::Integer,
            };
            if let Some(signal) = find_signal(&mut messages, &raw_ids, raw_id, &caps[2]) {
                signal.value_type = value_type;
            }
        } else if !line.starts_with("SG_") {
            // 其他區段結束目前的訊息區塊
            current = None;
            skipping_independent = false;
        }
    }

    Ok(Database { messages })
}

fn parse_signal(file_name: &str, line_no: usize, line: &str) -> Result<Signal> {
    let caps = SIGNAL_RE
        .captures(line)
        .ok_or_else(|| parse_error(file_name, line_no, "malformed SG_ statement"))?;

    let multiplex = match caps.get(2).map(|m| m.as_str()) {
        None => Multiplex::None,
        Some("M") => Multiplex::Multiplexor,
        Some(marker) => {
            let id = marker.trim_start_matches('m').trim_end_matches('M');
            Multiplex::Multiplexed(parse_field(file_name, line_no, "multiplexer id", id)?)
        }
    };

    let length: usize = parse_field(file_name, line_no, "signal length", &caps[4])?;
    if length == 0 || length > 64 {
        return Err(parse_error(
            file_name,
            line_no,
            &format!("signal length {} out of range 1..=64", length),
        ));
    }

    let factor: f64 = parse_field(file_name, line_no, "factor", &caps[7])?;
    let offset: f64 = parse_field(file_name, line_no, "offset", &caps[8])?;
    let minimum = parse_field(file_name, line_no, "minimum", &caps[9])?;
    let maximum = parse_field(file_name, line_no, "maximum", &caps[10])?;

    Ok(Signal {
        name: caps[1].to_string(),
        start_bit: parse_field(file_name, line_no, "start bit", &caps[3])?,
        length,
        byte_order: if &caps[5] == "1" {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        },
        is_signed: &caps[6] == "-",
        value_type: ValueType::Integer,
        factor,
        offset,
        integer_scaling: is_whole(factor) && is_whole(offset),
        minimum,
        maximum,
        unit: unescape(&caps[11]),
        multiplex,
        choices: Default::default(),
    })
}

fn find_signal<'a>(
    messages: &'a mut [Message],
    raw_ids: &HashMap<u32, usize>,
    raw_id: u32,
    signal_name: &str,
) -> Option<&'a mut Signal> {
    let index = *raw_ids.get(&raw_id)?;
    messages[index]
        .signals
        .iter_mut()
        .find(|s| s.name == signal_name)
}

/// `1.0` counts as whole, like `1`
fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

fn parse_field<T: std::str::FromStr>(
    file_name: &str,
    line_no: usize,
    what: &str,
    text: &str,
) -> Result<T> {
    text.parse()
        .map_err(|_| parse_error(file_name, line_no, &format!("invalid {} '{}'", what, text)))
}

fn parse_error(file_name: &str, line: usize, message: &str) -> ConvertError {
    ConvertError::DbcParseError {
        file: file_name.to_string(),
        line,
        message: message.to_string(),
    }
}

fn count_unescaped_quotes(line: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in line.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => count += 1,
            _ => escaped = false,
        }
    }
    count
}

fn unescape(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// DBC 檔常見為 cp1252 / latin-1；不是合法 UTF-8 時逐位元組轉換
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"VERSION ""

NS_ :
    CM_

BS_:

BU_: BMS VCU

BO_ 291 BatP3_BMS_Status: 8 BMS
 SG_ P3_PackVolt : 0|16@1+ (0.1,0) [0|1000] "V" VCU
 SG_ P3_PackCurr : 16|16@1- (0.1,-100) [-500|500] "A" VCU
 SG_ P3_State : 32|4@1+ (1,0) [0|15] "" VCU

BO_ 2566848768 BatP4_Ext: 8 BMS
 SG_ Mux M : 0|8@1+ (1,0) [0|255] "" VCU
 SG_ CellA m0 : 8|16@1+ (0.001,0) [0|5] "V" VCU
 SG_ CellB m1 : 8|16@1+ (0.001,0) [0|5] "V" VCU

BO_ 3221225472 VECTOR__INDEPENDENT_SIG_MSG: 0 Vector__XXX
 SG_ Orphan : 0|8@1+ (1,0) [0|0] "" Vector__XXX

CM_ SG_ 291 P3_State "Operating state
BO_ 999 NotAMessage: 8 BMS
spanning lines";
VAL_ 291 P3_State 0 "Standby" 1 "Charging" 2 "Fault \"hard\"" ;
SIG_VALTYPE_ 291 P3_PackVolt : 1;
"#;

    #[test]
    fn test_parse_messages_and_signals() {
        let db = parse_dbc("sample.dbc", SAMPLE).unwrap();
        assert_eq!(db.messages.len(), 2);

        let status = db.message_by_name("BatP3_BMS_Status").unwrap();
        assert_eq!(status.frame_id, 291);
        assert!(!status.is_extended);
        assert_eq!(status.length, 8);
        assert_eq!(status.signals.len(), 3);

        let curr = &status.signals[1];
        assert_eq!(curr.name, "P3_PackCurr");
        assert_eq!(curr.start_bit, 16);
        assert!(curr.is_signed);
        assert_eq!(curr.factor, 0.1);
        assert_eq!(curr.offset, -100.0);
        assert!(!curr.integer_scaling);
        assert_eq!(curr.unit, "A");

        assert!(status.signals[2].integer_scaling);
    }

    #[test]
    fn test_whole_decimal_scaling_stays_integer() {
        let db = parse_dbc(
            "scale.dbc",
            "BO_ 16 Scale: 1 X\n SG_ A : 0|8@1+ (1.0,0) [0|0] \"\" X\n SG_ B : 0|8@1+ (1.0,-40.0) [0|0] \"\" X\n SG_ C : 0|8@1+ (1.5,0) [0|0] \"\" X\n",
        )
        .unwrap();
        let signals = &db.messages[0].signals;
        assert!(signals[0].integer_scaling);
        assert!(signals[1].integer_scaling);
        assert!(!signals[2].integer_scaling);
    }

    #[test]
    fn test_extended_id_and_multiplexing() {
        let db = parse_dbc("sample.dbc", SAMPLE).unwrap();
        let ext = db.message_by_name("BatP4_Ext").unwrap();
        assert!(ext.is_extended);
        assert_eq!(ext.frame_id, 2566848768 & FRAME_ID_MASK);
        assert_eq!(ext.signals[0].multiplex, Multiplex::Multiplexor);
        assert_eq!(ext.signals[2].multiplex, Multiplex::Multiplexed(1));
    }

    #[test]
    fn test_independent_message_and_comments_skipped() {
        let db = parse_dbc("sample.dbc", SAMPLE).unwrap();
        assert!(db.message_by_name(INDEPENDENT_SIGNALS_MESSAGE).is_none());
        assert!(db.message_by_name("NotAMessage").is_none());
    }

    #[test]
    fn test_value_tables_and_value_types() {
        let db = parse_dbc("sample.dbc", SAMPLE).unwrap();
        let status = db.message_by_id(291).unwrap();
        let state = &status.signals[2];
        assert_eq!(state.choices.get(&0).map(String::as_str), Some("Standby"));
        assert_eq!(state.choices.get(&2).map(String::as_str), Some("Fault \"hard\""));
        assert_eq!(status.signals[0].value_type, ValueType::Float32);
    }

    #[test]
    fn test_signal_outside_message_is_an_error() {
        let err = parse_dbc("bad.dbc", " SG_ X : 0|8@1+ (1,0) [0|0] \"\" A\n").unwrap_err();
        match err {
            ConvertError::DbcParseError { file, line, .. } => {
                assert_eq!(file, "bad.dbc");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_signal_reports_line() {
        let content = "BO_ 1 M: 8 X\n SG_ Broken : 0|8@1+ (abc,0) [0|0] \"\" A\n";
        assert!(matches!(
            parse_dbc("bad.dbc", content),
            Err(ConvertError::DbcParseError { line: 2, .. })
        ));
    }

    #[test]
    fn test_decode_text_falls_back_to_latin1() {
        assert_eq!(decode_text(b"\xb0C"), "°C");
        assert_eq!(decode_text("°C".as_bytes()), "°C");
    }
}
