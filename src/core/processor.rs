use crate::dbc::SignalCatalog;
use crate::domain::model::{ProcessedData, SampledLog};
use crate::utils::grouping::{compare_groups, extract_batp_group};
use std::collections::BTreeMap;

/// 聚合採樣資料並依 BatP 規則分組
pub struct DataProcessor;

impl DataProcessor {
    pub fn process(sampled: SampledLog, catalog: &SignalCatalog) -> ProcessedData {
        let mut data = ProcessedData {
            sample_interval: sampled.sample_interval,
            ..Default::default()
        };
        Self::classify_signals(&mut data, &sampled, catalog);
        Self::aggregate(&mut data, sampled);
        data
    }

    /// Keeps the last value seen in each time slot.
    pub fn aggregate(data: &mut ProcessedData, sampled: SampledLog) {
        data.rows = sampled
            .buckets
            .into_iter()
            .map(|(bucket, cells)| {
                let row = cells
                    .into_iter()
                    .map(|(signal, cell)| (signal, cell.last))
                    .collect();
                (bucket, row)
            })
            .collect();
    }

    pub fn classify_signals(data: &mut ProcessedData, sampled: &SampledLog, catalog: &SignalCatalog) {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for &signal in &sampled.found_signals {
            let Some(info) = catalog.signal(signal) else {
                tracing::warn!("Signal id {} missing from catalog, skipped", signal);
                continue;
            };
            groups
                .entry(extract_batp_group(&info.full_name))
                .or_default()
                .push(signal);
        }

        for signals in groups.values_mut() {
            signals.sort_by(|a, b| full_name(catalog, *a).cmp(full_name(catalog, *b)));
        }

        let mut sorted_groups: Vec<String> = groups.keys().cloned().collect();
        sorted_groups.sort_by(|a, b| compare_groups(a, b));

        data.groups = groups;
        data.sorted_groups = sorted_groups;
    }
}

fn full_name(catalog: &SignalCatalog, id: usize) -> &str {
    catalog.signal(id).map_or("", |info| info.full_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::parse_dbc;
    use crate::domain::model::{SampleCell, SignalValue};

    const DBC: &str = "\
BO_ 1 BatP10_A: 1 X
 SG_ Zeta : 0|8@1+ (1,0) [0|0] \"\" X
 SG_ Alpha : 0|8@1+ (1,0) [0|0] \"\" X
BO_ 2 BatP2_B: 1 X
 SG_ Beta : 0|8@1+ (1,0) [0|0] \"\" X
BO_ 3 Vcu: 1 X
 SG_ Gear : 0|8@1+ (1,0) [0|0] \"\" X
";

    fn setup() -> (SignalCatalog, SampledLog) {
        let mut catalog = SignalCatalog::new();
        catalog.add_database("car.dbc", parse_dbc("car.dbc", DBC).unwrap());

        let mut sampled = SampledLog::new(0.1);
        for id in 0..catalog.signal_count() {
            sampled.found_signals.insert(id);
            sampled.buckets.entry(3).or_default().insert(
                id,
                SampleCell {
                    last: SignalValue::Int(id as i64),
                    samples: 2,
                },
            );
        }
        (catalog, sampled)
    }

    #[test]
    fn test_groups_are_sorted() {
        let (catalog, sampled) = setup();
        let data = DataProcessor::process(sampled, &catalog);

        assert_eq!(data.sorted_groups, vec!["BatP2", "BatP10", "Other"]);
        let names: Vec<&str> = data.groups["BatP10"]
            .iter()
            .map(|id| catalog.signal(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(
            data.group_statistics(),
            vec![
                ("BatP2".to_string(), 1),
                ("BatP10".to_string(), 2),
                ("Other".to_string(), 1)
            ]
        );
        assert_eq!(data.signal_count(), 4);
    }

    #[test]
    fn test_aggregate_keeps_last_value() {
        let (catalog, sampled) = setup();
        let data = DataProcessor::process(sampled, &catalog);
        assert_eq!(data.sorted_timestamps(), vec![3]);
        assert_eq!(data.rows[&3][&2], SignalValue::Int(2));
    }
}
