/// Row deduplication with aggregation
///
/// Collapses rows that agree on a set of identity fields into the first-seen
/// row, summing one numeric field across the collapsed rows and recording how
/// many rows were merged. The route-delta view uses this to fold repeated
/// `(facility, route, newRoute, changeType, window...)` rows into one line
/// with a combined zip count.
///
/// # Guarantees
///
/// - output order is the first-seen order of each identity key
/// - the summed field's total across the output equals its total across the
///   input (non-numeric cells count as zero)
/// - every output row carries `duplicateCount >= 1`

use crate::key::KeyBuilder;
use crate::record::Record;
use crate::value::{CellValue, NumericTotal};
use std::collections::HashMap;

pub const DUPLICATE_COUNT_FIELD: &str = "duplicateCount";

struct Merged {
    first: Record,
    total: NumericTotal,
    count: usize,
}

/// Collapse rows with equal identity keys.
///
/// Each output row is the first-seen row with `sum_field` replaced by the
/// running total and `duplicateCount` set (appended if the row lacked it).
pub fn dedupe<S: AsRef<str>>(records: &[Record], identity_fields: &[S], sum_field: &str) -> Vec<Record> {
    let keys = KeyBuilder::new(identity_fields.iter().map(|f| f.as_ref().to_string()));
    dedupe_by(records, &keys, sum_field)
}

pub fn dedupe_by(records: &[Record], keys: &KeyBuilder, sum_field: &str) -> Vec<Record> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut merged: Vec<Merged> = Vec::new();

    for record in records {
        let key = keys.key(record);
        match index.get(&key) {
            Some(&slot) => {
                let entry = &mut merged[slot];
                entry.total.add(record.value(sum_field));
                entry.count += 1;
            }
            None => {
                let mut total = NumericTotal::new();
                total.add(record.value(sum_field));
                index.insert(key, merged.len());
                merged.push(Merged {
                    first: record.clone(),
                    total,
                    count: 1,
                });
            }
        }
    }

    merged
        .into_iter()
        .map(|m| {
            let mut row = m.first;
            row.insert(sum_field, m.total.value());
            row.insert(DUPLICATE_COUNT_FIELD, CellValue::Int(m.count as i64));
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dedupe_sums_and_counts() {
        let rows = vec![
            record! { "fc" => "A", "route" => "R1", "zips" => 3 },
            record! { "fc" => "A", "route" => "R1", "zips" => 5 },
            record! { "fc" => "A", "route" => "R2", "zips" => 2 },
        ];
        let deduped = dedupe(&rows, &["fc", "route"], "zips");
        assert_eq!(
            deduped,
            vec![
                record! { "fc" => "A", "route" => "R1", "zips" => 8, "duplicateCount" => 2 },
                record! { "fc" => "A", "route" => "R2", "zips" => 2, "duplicateCount" => 1 },
            ]
        );
    }

    #[test]
    fn test_first_seen_order_and_fields() {
        let rows = vec![
            record! { "fc" => "B", "note" => "first", "zips" => 1 },
            record! { "fc" => "A", "note" => "only", "zips" => 1 },
            record! { "fc" => "B", "note" => "second", "zips" => 1 },
        ];
        let deduped = dedupe(&rows, &["fc"], "zips");
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].display("fc"), "B");
        assert_eq!(deduped[0].display("note"), "first");
        assert_eq!(deduped[1].display("fc"), "A");
    }

    #[test]
    fn test_non_numeric_counts_as_zero() {
        let rows = vec![
            record! { "fc" => "A", "zips" => "n/a" },
            record! { "fc" => "A" },
            record! { "fc" => "A", "zips" => 4 },
        ];
        let deduped = dedupe(&rows, &["fc"], "zips");
        assert_eq!(deduped[0].value("zips"), &CellValue::Int(4));
        assert_eq!(deduped[0].value(DUPLICATE_COUNT_FIELD), &CellValue::Int(3));
    }

    #[test]
    fn test_mass_is_conserved() {
        let rows: Vec<Record> = (0..50)
            .map(|i| record! { "fc" => format!("FC{}", i % 4), "route" => format!("R{}", i % 3), "zips" => i })
            .collect();
        let input_total: i64 = (0..50).sum();
        let deduped = dedupe(&rows, &["fc", "route"], "zips");
        let output_total: i64 = deduped.iter().filter_map(|r| r.value("zips").as_i64()).sum();
        assert_eq!(output_total, input_total);
        let merged: i64 = deduped
            .iter()
            .filter_map(|r| r.value(DUPLICATE_COUNT_FIELD).as_i64())
            .sum();
        assert_eq!(merged, 50);
    }

    #[test]
    fn test_empty_input() {
        let rows: Vec<Record> = Vec::new();
        assert!(dedupe(&rows, &["fc"], "zips").is_empty());
    }
}
