/// Table views
///
/// A `TableView` is the state one dashboard table owns: the fetched rows,
/// the search box, per-column filters, an optional dropdown filter, the active
/// sort and the fetch lifecycle. Rows are replaced wholesale by each fetch
/// and never mutated in place; what the table shows is always recomputed
/// from them by [`TableView::visible_rows`].
///
/// Issuing a fetch, and applying its outcome, resets filters and sort to the
/// view's defaults so old filter terms never sit on top of a new result
/// shape. A failed fetch clears the rows.
///
/// Expand/collapse state for two-level tables lives in [`Expansion`], kept
/// apart from the filter/sort pipeline and passed into [`display_lines`].

use crate::error::{ApiError, ExportError};
use crate::export::{export_csv, export_expanded_csv, CsvExport, ExpandedLayout, ExpandedRow};
use crate::fetch::{Delivery, FetchState, FetchTicket, FetchTracker};
use crate::filter::{filter_all_columns, filter_any_column, filter_equals, search_needle, ColumnFilters, MATCH_ALL};
use crate::record::Record;
use crate::sort::SortState;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct TableView {
    name: String,
    records: Vec<Record>,
    search: String,
    column_filters: ColumnFilters,
    /// Dropdown filter: `(column, value)`
    exact_filter: Option<(String, String)>,
    sort: SortState,
    default_sort: SortState,
    fetch: FetchTracker,
    /// Non-blocking message for the failed half of a paired fetch
    notice: Option<String>,
}

impl TableView {
    pub fn new(name: impl Into<String>, default_sort: SortState) -> Self {
        TableView {
            name: name.into(),
            records: Vec::new(),
            search: String::new(),
            column_filters: ColumnFilters::new(),
            exact_filter: None,
            sort: default_sort.clone(),
            default_sort,
            fetch: FetchTracker::new(),
            notice: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Everything the last successful fetch returned
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn state(&self) -> &FetchState {
        self.fetch.state()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch.state().is_loading()
    }

    /// Primary error banner
    pub fn error(&self) -> Option<&str> {
        self.fetch.state().error()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn column_filters(&self) -> &ColumnFilters {
        &self.column_filters
    }

    pub fn exact_filter(&self) -> Option<(&str, &str)> {
        self.exact_filter
            .as_ref()
            .map(|(column, value)| (column.as_str(), value.as_str()))
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    // ------------------------------------------------------------------
    // Fetch lifecycle
    // ------------------------------------------------------------------

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.reset_filters_and_sort();
        self.notice = None;
        self.fetch.begin()
    }

    /// Apply a fetch outcome if it is still current.
    ///
    /// Success replaces the rows; failure clears them.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, outcome: Result<Vec<Record>, ApiError>) -> Delivery {
        let delivery = self.fetch.finish(ticket, &outcome);
        if delivery != Delivery::Current {
            return delivery;
        }

        match outcome {
            Ok(rows) => {
                debug!("{}: loaded {} rows", self.name, rows.len());
                self.records = rows;
            }
            Err(_) => self.records.clear(),
        }
        self.reset_filters_and_sort();
        delivery
    }

    /// Apply a data + secondary pair fetched together.
    ///
    /// A failed primary becomes the error banner; a failed secondary becomes
    /// the notice. Whichever half succeeded is still applied, and the
    /// secondary value is handed back only when the pair is current.
    pub fn complete_paired<S>(
        &mut self,
        ticket: FetchTicket,
        primary: Result<Vec<Record>, ApiError>,
        secondary: Result<S, ApiError>,
    ) -> (Delivery, Option<S>) {
        let delivery = self.complete_fetch(ticket, primary);
        if delivery != Delivery::Current {
            return (delivery, None);
        }
        match secondary {
            Ok(value) => (delivery, Some(value)),
            Err(err) => {
                self.notice = Some(err.display_message());
                (delivery, None)
            }
        }
    }

    /// The view went away; every later response is ignored
    pub fn detach(&mut self) {
        self.fetch.detach();
    }

    // ------------------------------------------------------------------
    // Filter and sort
    // ------------------------------------------------------------------

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn set_column_filter(&mut self, column: impl Into<String>, term: impl Into<String>) {
        self.column_filters.set(column, term);
    }

    /// Dropdown filter; `"all"` or an empty value clears it
    pub fn set_exact_filter(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        self.exact_filter = if value.is_empty() || value == MATCH_ALL {
            None
        } else {
            Some((column.into(), value))
        };
    }

    pub fn clear_filters(&mut self) {
        self.search.clear();
        self.column_filters.clear();
        self.exact_filter = None;
    }

    /// Header click
    pub fn toggle_sort(&mut self, field: &str) {
        self.sort.toggle(field);
    }

    /// True when any search or filter term would narrow the rows
    pub fn has_active_filter(&self) -> bool {
        search_needle(&self.search).is_some() || self.column_filters.is_active() || self.exact_filter.is_some()
    }

    /// Dropdown filter, then column filters, then the search box, then sort
    pub fn visible_rows(&self) -> Vec<Record> {
        let exact = match &self.exact_filter {
            Some((column, value)) => filter_equals(&self.records, column, value),
            None => std::borrow::Cow::Borrowed(self.records.as_slice()),
        };
        let by_column = filter_all_columns(&exact, &self.column_filters);
        let searched = filter_any_column(&by_column, &self.search, None);
        self.sort.apply(&searched)
    }

    fn reset_filters_and_sort(&mut self) {
        self.clear_filters();
        self.sort = self.default_sort.clone();
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Export exactly the rows currently shown
    pub fn export_csv<S: AsRef<str>>(
        &self,
        subject: &str,
        headers: &[S],
        at: DateTime<Utc>,
    ) -> Result<CsvExport, ExportError> {
        export_csv(subject, headers, &self.visible_rows(), self.has_active_filter(), at)
    }

    /// Export the rows shown with their detail rows beneath each one.
    ///
    /// Children are matched to parents on `key_field`; every child is
    /// included whether or not its parent is expanded on screen.
    pub fn export_expanded_csv(
        &self,
        subject: &str,
        layout: &ExpandedLayout,
        children: &[Record],
        key_field: &str,
        at: DateTime<Utc>,
    ) -> Result<CsvExport, ExportError> {
        let rows = ExpandedRow::attach(&self.visible_rows(), children, key_field);
        export_expanded_csv(subject, layout, &rows, self.has_active_filter(), at)
    }
}

// ============================================================================
// Expansion
// ============================================================================

/// Which parent rows (or groups) are expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// At most one expanded at a time; opening another closes the first
    Single(Option<String>),
    /// Any number expanded independently
    Multiple(BTreeSet<String>),
}

impl Expansion {
    pub fn single() -> Self {
        Expansion::Single(None)
    }

    pub fn multiple() -> Self {
        Expansion::Multiple(BTreeSet::new())
    }

    pub fn toggle(&mut self, key: &str) {
        match self {
            Expansion::Single(current) => {
                *current = match current.as_deref() {
                    Some(open) if open == key => None,
                    _ => Some(key.to_string()),
                };
            }
            Expansion::Multiple(open) => {
                if !open.remove(key) {
                    open.insert(key.to_string());
                }
            }
        }
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        match self {
            Expansion::Single(current) => current.as_deref() == Some(key),
            Expansion::Multiple(open) => open.contains(key),
        }
    }

    /// Only meaningful for `Multiple`; a single-open view is left as is
    pub fn expand_all<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Expansion::Multiple(open) = self {
            open.extend(keys.into_iter().map(Into::into));
        }
    }

    pub fn collapse_all(&mut self) {
        match self {
            Expansion::Single(current) => *current = None,
            Expansion::Multiple(open) => open.clear(),
        }
    }
}

/// One rendered line of a two-level table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayLine<'a> {
    Parent { record: &'a Record, expanded: bool, child_count: usize },
    Child(&'a Record),
}

/// Lay out parents and, under expanded ones, their children
pub fn display_lines<'a>(rows: &'a [ExpandedRow], key_field: &str, expansion: &Expansion) -> Vec<DisplayLine<'a>> {
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let expanded = expansion.is_expanded(&row.parent.display(key_field));
        lines.push(DisplayLine::Parent {
            record: &row.parent,
            expanded,
            child_count: row.children.len(),
        });
        if expanded {
            lines.extend(row.children.iter().map(DisplayLine::Child));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::sort::SortOrder;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn tickets() -> Vec<Record> {
        vec![
            record! { "key" => "OPS-3", "status" => "Open", "assignee" => "kim" },
            record! { "key" => "OPS-1", "status" => "Closed", "assignee" => "ray" },
            record! { "key" => "OPS-2", "status" => "Open", "assignee" => "ray" },
        ]
    }

    fn loaded_view() -> TableView {
        let mut view = TableView::new("tickets", SortState::ascending("key"));
        let ticket = view.begin_fetch();
        view.complete_fetch(ticket, Ok(tickets()));
        view
    }

    fn keys(rows: &[Record]) -> Vec<String> {
        rows.iter().map(|r| r.display("key").into_owned()).collect()
    }

    #[test]
    fn test_visible_rows_are_sorted() {
        let view = loaded_view();
        assert_eq!(view.state(), &FetchState::Loaded);
        assert_eq!(keys(&view.visible_rows()), vec!["OPS-1", "OPS-2", "OPS-3"]);
    }

    #[test]
    fn test_filters_compose() {
        let mut view = loaded_view();
        view.set_column_filter("status", "open");
        assert_eq!(keys(&view.visible_rows()), vec!["OPS-2", "OPS-3"]);

        view.set_search("RAY");
        assert_eq!(keys(&view.visible_rows()), vec!["OPS-2"]);

        view.clear_filters();
        view.set_exact_filter("assignee", "kim");
        assert_eq!(keys(&view.visible_rows()), vec!["OPS-3"]);

        view.set_exact_filter("assignee", "all");
        assert!(!view.has_active_filter());
        assert_eq!(view.visible_rows().len(), 3);
    }

    #[test]
    fn test_whitespace_search_is_inactive() {
        let mut view = loaded_view();
        view.set_search("   ");
        assert!(!view.has_active_filter());
    }

    #[test]
    fn test_toggle_sort() {
        let mut view = loaded_view();
        view.toggle_sort("key");
        assert_eq!(view.sort().order(), SortOrder::Descending);
        assert_eq!(keys(&view.visible_rows()), vec!["OPS-3", "OPS-2", "OPS-1"]);
    }

    #[test]
    fn test_refetch_resets_filters_and_sort() {
        let mut view = loaded_view();
        view.set_search("ray");
        view.toggle_sort("status");

        let ticket = view.begin_fetch();
        assert_eq!(view.search(), "");
        assert_eq!(view.sort(), &SortState::ascending("key"));

        view.set_search("kim");
        view.complete_fetch(ticket, Ok(tickets()));
        assert!(!view.has_active_filter());
    }

    #[test]
    fn test_error_clears_rows() {
        let mut view = loaded_view();
        let ticket = view.begin_fetch();
        view.complete_fetch(ticket, Err(ApiError::Transport("connection refused".to_string())));
        assert_eq!(view.error(), Some("connection refused"));
        assert!(view.records().is_empty());
        assert!(view.visible_rows().is_empty());

        let ticket = view.begin_fetch();
        view.complete_fetch(ticket, Ok(tickets()));
        assert_eq!(view.error(), None);
        assert_eq!(view.records().len(), 3);
    }

    #[test]
    fn test_stale_response_does_not_overwrite() {
        let mut view = TableView::new("errors", SortState::descending("loggedOn"));
        let slow = view.begin_fetch();
        let fast = view.begin_fetch();

        view.complete_fetch(fast, Ok(vec![record! { "loggedOn" => "new" }]));
        let delivery = view.complete_fetch(slow, Ok(vec![record! { "loggedOn" => "old" }]));

        assert_eq!(delivery, Delivery::Superseded);
        assert_eq!(view.records()[0].display("loggedOn"), "new");
    }

    #[test]
    fn test_detached_view_ignores_responses() {
        let mut view = TableView::new("errors", SortState::ascending("key"));
        let ticket = view.begin_fetch();
        view.detach();
        assert_eq!(view.complete_fetch(ticket, Ok(tickets())), Delivery::Detached);
        assert!(view.records().is_empty());
    }

    #[test]
    fn test_paired_fetch_partial_failure() {
        let mut view = TableView::new("delta", SortState::ascending("key"));
        let ticket = view.begin_fetch();
        let (delivery, summary) = view.complete_paired::<u32>(
            ticket,
            Ok(tickets()),
            Err(ApiError::from_status(500, Some("Internal Server Error"), r#"{"message":"summary failed"}"#)),
        );
        assert_eq!(delivery, Delivery::Current);
        assert_eq!(summary, None);
        assert_eq!(view.records().len(), 3);
        assert_eq!(view.error(), None);
        assert_eq!(view.notice(), Some("summary failed"));

        let ticket = view.begin_fetch();
        assert_eq!(view.notice(), None);
        let (_, summary) = view.complete_paired(
            ticket,
            Err(ApiError::Transport("reset".to_string())),
            Ok(7u32),
        );
        assert_eq!(summary, Some(7));
        assert_eq!(view.error(), Some("reset"));
        assert!(view.records().is_empty());
    }

    #[test]
    fn test_export_uses_visible_rows() {
        let mut view = loaded_view();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();

        let all = view.export_csv("tickets", &["key", "status"], at).unwrap();
        assert_eq!(all.filename, "tickets_2026-10-19T08-30-00.csv");
        assert_eq!(all.row_count, 3);

        view.set_column_filter("status", "open");
        let filtered = view.export_csv("tickets", &["key", "status"], at).unwrap();
        assert_eq!(filtered.filename, "tickets_filtered_2026-10-19T08-30-00.csv");
        assert_eq!(filtered.content, "key,status\nOPS-2,Open\nOPS-3,Open");

        view.set_search("nothing matches");
        assert!(matches!(
            view.export_csv("tickets", &["key"], at),
            Err(ExportError::Empty)
        ));
    }

    #[test]
    fn test_expanded_export() {
        let mut view = loaded_view();
        view.set_exact_filter("key", "OPS-2");
        let links = vec![
            record! { "key" => "OPS-2", "linked" => "DB-9" },
            record! { "key" => "OPS-3", "linked" => "DB-1" },
            record! { "key" => "OPS-2", "linked" => "DB-10" },
        ];
        let layout = ExpandedLayout::new(["key", "status"], ["linked"]);
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let export = view.export_expanded_csv("tickets", &layout, &links, "key", at).unwrap();
        assert_eq!(export.content, "key,status,linked\nOPS-2,Open,\n,,DB-9\n,,DB-10");
        assert_eq!(export.row_count, 3);
        assert!(export.filename.starts_with("tickets_filtered_"));
    }

    #[test]
    fn test_single_expansion() {
        let mut expansion = Expansion::single();
        expansion.toggle("A");
        expansion.toggle("B");
        assert!(!expansion.is_expanded("A"));
        assert!(expansion.is_expanded("B"));
        expansion.toggle("B");
        assert_eq!(expansion, Expansion::Single(None));
    }

    #[test]
    fn test_multiple_expansion() {
        let mut expansion = Expansion::multiple();
        expansion.toggle("A");
        expansion.toggle("B");
        assert!(expansion.is_expanded("A") && expansion.is_expanded("B"));
        expansion.toggle("A");
        assert!(!expansion.is_expanded("A"));
        expansion.expand_all(["C", "D"]);
        assert!(expansion.is_expanded("D"));
        expansion.collapse_all();
        assert!(!expansion.is_expanded("B"));
    }

    #[test]
    fn test_display_lines() {
        let rows = vec![
            ExpandedRow::new(record! { "zip" => "10001" }, vec![record! { "diff" => "a" }, record! { "diff" => "b" }]),
            ExpandedRow::new(record! { "zip" => "10002" }, vec![record! { "diff" => "c" }]),
        ];
        let mut expansion = Expansion::multiple();
        expansion.toggle("10001");

        let lines = display_lines(&rows, "zip", &expansion);
        assert_eq!(lines.len(), 4);
        assert!(matches!(lines[0], DisplayLine::Parent { expanded: true, child_count: 2, .. }));
        assert!(matches!(lines[1], DisplayLine::Child(r) if r.display("diff") == "a"));
        assert!(matches!(lines[3], DisplayLine::Parent { expanded: false, .. }));
    }
}
