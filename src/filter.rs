/// Row filtering
///
/// Every filter here is stringify-then-substring: the query is lower-cased,
/// each candidate cell is turned into its display string and lower-cased, and
/// the row matches on plain substring containment. There is no numeric or
/// date-aware comparison.
///
/// Whole-row search matches the query as typed (surrounding spaces count);
/// per-column terms are trimmed first.
///
/// Inactive filters (empty or whitespace-only terms) hand back the input
/// slice untouched as `Cow::Borrowed`, so "no filter" never copies rows.

use crate::record::Record;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// Sentinel for "no exact-match constraint" in dropdown-style filters
pub const MATCH_ALL: &str = "all";

/// Lower-cased search query as typed, `None` when blank
pub fn search_needle(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        None
    } else {
        Some(query.to_lowercase())
    }
}

/// Normalize a column term: trimmed and lower-cased, `None` when blank
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

fn cell_contains(record: &Record, column: &str, needle: &str) -> bool {
    record.display(column).to_lowercase().contains(needle)
}

fn row_contains(record: &Record, columns: Option<&[String]>, needle: &str) -> bool {
    match columns {
        Some(columns) => columns.iter().any(|c| cell_contains(record, c, needle)),
        None => record
            .values()
            .any(|v| v.display().to_lowercase().contains(needle)),
    }
}

/// Whole-row search: keep rows where ANY target column contains `query`.
///
/// Targets are every field of the row, or only `columns` when given. The
/// query is not trimmed; callers that want trimming pass `query.trim()`.
pub fn filter_any_column<'a>(
    records: &'a [Record],
    query: &str,
    columns: Option<&[String]>,
) -> Cow<'a, [Record]> {
    let Some(needle) = search_needle(query) else {
        return Cow::Borrowed(records);
    };

    Cow::Owned(
        records
            .iter()
            .filter(|r| row_contains(r, columns, &needle))
            .cloned()
            .collect(),
    )
}

/// Per-column free-text filters. A blank term means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilters {
    terms: BTreeMap<String, String>,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the term for a column; a blank term removes the constraint
    pub fn set(&mut self, column: impl Into<String>, term: impl Into<String>) {
        let column = column.into();
        let term = term.into();
        if term.trim().is_empty() {
            self.terms.remove(&column);
        } else {
            self.terms.insert(column, term);
        }
    }

    pub fn with(mut self, column: impl Into<String>, term: impl Into<String>) -> Self {
        self.set(column, term);
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.terms.get(column).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    pub fn is_active(&self) -> bool {
        !self.terms.is_empty()
    }

    /// Active `(column, normalized term)` pairs
    pub fn active(&self) -> impl Iterator<Item = (&str, String)> {
        self.terms
            .iter()
            .filter_map(|(c, t)| normalize_query(t).map(|n| (c.as_str(), n)))
    }
}

/// Column-filter search: keep rows where EVERY active column filter matches
pub fn filter_all_columns<'a>(records: &'a [Record], filters: &ColumnFilters) -> Cow<'a, [Record]> {
    let active: Vec<(&str, String)> = filters.active().collect();
    if active.is_empty() {
        return Cow::Borrowed(records);
    }

    Cow::Owned(
        records
            .iter()
            .filter(|r| active.iter().all(|(c, needle)| cell_contains(r, c, needle)))
            .cloned()
            .collect(),
    )
}

/// Dropdown-style exact match on one column.
///
/// `value` of `""` or [`MATCH_ALL`] disables the filter.
pub fn filter_equals<'a>(records: &'a [Record], column: &str, value: &str) -> Cow<'a, [Record]> {
    if value.is_empty() || value == MATCH_ALL {
        return Cow::Borrowed(records);
    }

    Cow::Owned(
        records
            .iter()
            .filter(|r| r.display(column) == value)
            .cloned()
            .collect(),
    )
}

/// Unique non-empty display values of a column, in first-seen order
pub fn distinct_values(records: &[Record], column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for record in records {
        let value = record.display(column);
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.to_string()) {
            values.push(value.into_owned());
        }
    }
    values
}

/// Shorten text for a table cell, appending `…` when cut. Blank text renders as `—`.
pub fn truncate_display(text: Option<&str>, max_chars: usize) -> String {
    match text {
        None => "\u{2014}".to_string(),
        Some(t) if t.is_empty() => "\u{2014}".to_string(),
        Some(t) if t.chars().count() > max_chars => {
            let mut cut: String = t.chars().take(max_chars).collect();
            cut.push('\u{2026}');
            cut
        }
        Some(t) => t.to_string(),
    }
}

/// Table-cell rendering of a possibly missing value: blank becomes `—`
pub fn display_or_dash(record: &Record, column: &str) -> String {
    let value = record.display(column);
    if value.is_empty() {
        "\u{2014}".to_string()
    } else {
        value.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::CellValue;

    fn fruit() -> Vec<Record> {
        vec![
            record! { "a" => "Apple", "b" => "1" },
            record! { "a" => "Banana", "b" => "2" },
        ]
    }

    #[test]
    fn test_empty_query_is_identity() {
        let rows = fruit();
        let filtered = filter_any_column(&rows, "", None);
        assert!(matches!(filtered, Cow::Borrowed(_)));
        assert_eq!(filtered.as_ref(), rows.as_slice());

        let filtered = filter_any_column(&rows, "   ", None);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_case_insensitive_substring() {
        let rows = fruit();
        let filtered = filter_any_column(&rows, "ban", None);
        assert_eq!(filtered.as_ref(), &[record! { "a" => "Banana", "b" => "2" }]);

        let filtered = filter_any_column(&rows, "APP", None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].display("a"), "Apple");
    }

    #[test]
    fn test_search_keeps_surrounding_spaces() {
        let rows = vec![record! { "a" => "Apple" }, record! { "a" => "Apple pie" }];
        let filtered = filter_any_column(&rows, "apple ", None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].display("a"), "Apple pie");

        assert_eq!(filter_any_column(&rows, "apple ".trim(), None).len(), 2);
    }

    #[test]
    fn test_column_terms_are_trimmed() {
        let rows = vec![record! { "a" => "Apple" }, record! { "a" => "Apple pie" }];
        let filters = ColumnFilters::new().with("a", " apple ");
        assert_eq!(filter_all_columns(&rows, &filters).len(), 2);
    }

    #[test]
    fn test_filter_never_grows() {
        let rows = fruit();
        for q in ["a", "1", "zzz", "an"] {
            assert!(filter_any_column(&rows, q, None).len() <= rows.len());
        }
    }

    #[test]
    fn test_null_does_not_match_literal_null() {
        let rows = vec![record! { "a" => CellValue::Null }, record! { "a" => "nullable" }];
        let filtered = filter_any_column(&rows, "null", None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].display("a"), "nullable");
    }

    #[test]
    fn test_any_column_restricted_to_columns() {
        let rows = fruit();
        let only_b = vec!["b".to_string()];
        assert!(filter_any_column(&rows, "apple", Some(only_b.as_slice())).is_empty());
        assert_eq!(filter_any_column(&rows, "2", Some(only_b.as_slice())).len(), 1);
    }

    #[test]
    fn test_numbers_match_as_text() {
        let rows = vec![record! { "zips" => 120 }, record! { "zips" => 45 }];
        assert_eq!(filter_any_column(&rows, "12", None).len(), 1);
    }

    #[test]
    fn test_all_columns_is_and() {
        let rows = vec![
            record! { "fc" => "AVP1", "route" => "UPS-GROUND" },
            record! { "fc" => "AVP1", "route" => "FEDEX" },
            record! { "fc" => "CFC1", "route" => "UPS-AIR" },
        ];
        let filters = ColumnFilters::new().with("fc", "avp").with("route", "ups");
        let filtered = filter_all_columns(&rows, &filters);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].display("route"), "UPS-GROUND");
    }

    #[test]
    fn test_blank_column_filter_is_inactive() {
        let rows = fruit();
        let mut filters = ColumnFilters::new();
        filters.set("a", "  ");
        assert!(!filters.is_active());
        assert!(matches!(filter_all_columns(&rows, &filters), Cow::Borrowed(_)));

        filters.set("a", "ban");
        filters.set("a", "");
        assert!(!filters.is_active());
    }

    #[test]
    fn test_filter_equals() {
        let rows = vec![
            record! { "serverName" => "WMSSQL1" },
            record! { "serverName" => "WMSSQL2" },
        ];
        assert_eq!(filter_equals(&rows, "serverName", MATCH_ALL).len(), 2);
        assert_eq!(filter_equals(&rows, "serverName", "WMSSQL2").len(), 1);
        assert!(filter_equals(&rows, "serverName", "wmssql2").is_empty());
    }

    #[test]
    fn test_distinct_values_first_seen() {
        let rows = vec![
            record! { "m" => "B" },
            record! { "m" => "" },
            record! { "m" => "A" },
            record! { "m" => "B" },
            record! { "x" => 1 },
        ];
        assert_eq!(distinct_values(&rows, "m"), vec!["B", "A"]);
    }

    #[test]
    fn test_truncate_display() {
        assert_eq!(truncate_display(Some("abcdef"), 3), "abc\u{2026}");
        assert_eq!(truncate_display(Some("abc"), 3), "abc");
        assert_eq!(truncate_display(None, 3), "\u{2014}");
    }

    #[test]
    fn test_display_or_dash() {
        let row = record! { "assignee" => "", "team" => "WMS" };
        assert_eq!(display_or_dash(&row, "assignee"), "\u{2014}");
        assert_eq!(display_or_dash(&row, "team"), "WMS");
    }
}
