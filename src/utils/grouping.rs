use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

pub const OTHER_GROUP: &str = "Other";

static BATP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BatP\d+").expect("BatP pattern is valid"));

/// 從完整信號名稱中取出 BatP 分組標識
///
/// `800V_BMS.dbc::BatP3_BMS_CellVolt::P3_AvgCellVlt` -> `BatP3`，
/// 沒有匹配時歸入 `Other`。
pub fn extract_batp_group(signal_name: &str) -> String {
    BATP_PATTERN
        .find(signal_name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| OTHER_GROUP.to_string())
}

/// BatP 分組依數字排在前面，其他分組依名稱排序
pub fn compare_groups(a: &str, b: &str) -> Ordering {
    match (batp_number(a), batp_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn batp_number(name: &str) -> Option<u64> {
    name.strip_prefix("BatP")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_batp_group() {
        assert_eq!(
            extract_batp_group("800V_BMS_PCAN_V2.5.3.dbc::BatP3_BMS_CellVoltMaxMin::P3_AvgCellVlt"),
            "BatP3"
        );
        assert_eq!(extract_batp_group("vcu.dbc::VCU_Status::Gear"), "Other");
        assert_eq!(extract_batp_group("a.dbc::BatP12_X::BatP4_Y"), "BatP12");
    }

    #[test]
    fn test_group_ordering() {
        let mut groups = vec!["Other", "BatP10", "Aux", "BatP2", "BatP1"];
        groups.sort_by(|a, b| compare_groups(a, b));
        assert_eq!(groups, vec!["BatP1", "BatP2", "BatP10", "Aux", "Other"]);
    }
}
