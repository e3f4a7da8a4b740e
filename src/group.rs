/// Two-level grouping
///
/// Partitions rows by an outer field and then an inner field (facility then
/// route, source stack then table group, service then zip) and keeps one
/// numeric aggregate per inner bucket plus a total per outer bucket.
///
/// Rows whose grouping field is absent, null or empty land in the
/// [`UNKNOWN_GROUP`] bucket, so every input row appears in exactly one
/// `(outer, inner)` bucket. Keys iterate in sorted order regardless of the
/// order rows arrived in.

use crate::record::Record;
use std::collections::BTreeMap;

pub const UNKNOWN_GROUP: &str = "Unknown";

/// What each inner bucket accumulates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// Sum of a numeric field (non-numeric cells count as zero)
    Sum(String),
    /// Number of rows in the bucket
    Count,
}

impl Aggregate {
    pub fn sum(field: impl Into<String>) -> Self {
        Aggregate::Sum(field.into())
    }

    fn contribution(&self, record: &Record) -> f64 {
        match self {
            Aggregate::Sum(field) => record.value(field).as_number().unwrap_or(0.0),
            Aggregate::Count => 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InnerGroup {
    pub records: Vec<Record>,
    pub aggregate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OuterGroup {
    pub inner: BTreeMap<String, InnerGroup>,
    /// Sum of the inner aggregates
    pub total_aggregate: f64,
}

impl OuterGroup {
    pub fn record_count(&self) -> usize {
        self.inner.values().map(|g| g.records.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedResult {
    pub groups: BTreeMap<String, OuterGroup>,
}

impl GroupedResult {
    pub fn outer_keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn get(&self, outer: &str) -> Option<&OuterGroup> {
        self.groups.get(outer)
    }

    pub fn get_inner(&self, outer: &str, inner: &str) -> Option<&InnerGroup> {
        self.groups.get(outer).and_then(|g| g.inner.get(inner))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.groups.values().map(OuterGroup::record_count).sum()
    }

    pub fn grand_total(&self) -> f64 {
        self.groups.values().map(|g| g.total_aggregate).sum()
    }
}

/// Bucket key of a record for one grouping field: the display value as-is,
/// or [`UNKNOWN_GROUP`] when blank
pub fn group_key(record: &Record, field: &str) -> String {
    let value = record.display(field);
    if value.trim().is_empty() {
        UNKNOWN_GROUP.to_string()
    } else {
        value.into_owned()
    }
}

pub fn group(records: &[Record], outer_field: &str, inner_field: &str, aggregate: &Aggregate) -> GroupedResult {
    let mut result = GroupedResult::default();

    for record in records {
        let outer = result.groups.entry(group_key(record, outer_field)).or_default();
        let inner = outer.inner.entry(group_key(record, inner_field)).or_default();
        let contribution = aggregate.contribution(record);
        inner.records.push(record.clone());
        inner.aggregate += contribution;
        outer.total_aggregate += contribution;
    }

    result
}
