/// CSV export
///
/// Serializes exactly the rows a view is showing. Quoting is on demand: a
/// field is wrapped in double quotes (with inner quotes doubled) only when it
/// contains a comma, a double quote, a carriage return or a newline. Rows are
/// joined with `\n` and there is no trailing newline.
///
/// Two-level views (a ticket with its linked-issue rows, a validation summary
/// with its per-postal-code differences) export one parent row followed by
/// its child rows, with the other level's columns left blank.

use crate::error::ExportError;
use crate::record::Record;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

pub const ROW_SEPARATOR: &str = "\n";
pub const CSV_EXTENSION: &str = "csv";
const FILTERED_SUFFIX: &str = "_filtered";

/// Quote a field when it contains `,`, `"`, `\r` or `\n`
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// One CSV line from already-stringified fields
pub fn csv_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_field(field.as_ref()));
    }
    line
}

/// Header row plus one line per record, columns taken from `headers`
pub fn to_csv<S: AsRef<str>>(headers: &[S], records: &[Record]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(csv_line(headers));
    for record in records {
        lines.push(csv_line(headers.iter().map(|h| record.display(h.as_ref()))));
    }
    lines.join(ROW_SEPARATOR)
}

/// A summary row with its detail rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandedRow {
    pub parent: Record,
    pub children: Vec<Record>,
}

impl ExpandedRow {
    pub fn new(parent: Record, children: Vec<Record>) -> Self {
        ExpandedRow { parent, children }
    }

    /// Pair each parent with the children whose `key_field` equals the parent's.
    ///
    /// Parent order is kept; children keep their relative order. Parents
    /// with a blank key get no children.
    pub fn attach(parents: &[Record], children: &[Record], key_field: &str) -> Vec<ExpandedRow> {
        parents
            .iter()
            .map(|parent| {
                let key = parent.display(key_field);
                let kids = if key.is_empty() {
                    Vec::new()
                } else {
                    children
                        .iter()
                        .filter(|c| c.display(key_field) == key)
                        .cloned()
                        .collect()
                };
                ExpandedRow::new(parent.clone(), kids)
            })
            .collect()
    }
}

/// Column layout for a two-level export: parent columns first, then child columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpandedLayout {
    pub parent_columns: Vec<String>,
    pub child_columns: Vec<String>,
}

impl ExpandedLayout {
    pub fn new<P, C, S1, S2>(parent_columns: P, child_columns: C) -> Self
    where
        P: IntoIterator<Item = S1>,
        C: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        ExpandedLayout {
            parent_columns: parent_columns.into_iter().map(Into::into).collect(),
            child_columns: child_columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.parent_columns
            .iter()
            .chain(self.child_columns.iter())
            .map(String::as_str)
    }

    fn parent_line(&self, parent: &Record) -> String {
        csv_line(
            self.parent_columns
                .iter()
                .map(|c| parent.display(c))
                .chain(self.child_columns.iter().map(|_| Cow::Borrowed(""))),
        )
    }

    fn child_line(&self, child: &Record) -> String {
        csv_line(
            self.parent_columns
                .iter()
                .map(|_| Cow::Borrowed(""))
                .chain(self.child_columns.iter().map(|c| child.display(c))),
        )
    }
}

/// Parent rows each followed directly by their child rows
pub fn to_csv_expanded(layout: &ExpandedLayout, rows: &[ExpandedRow]) -> String {
    let mut lines = vec![csv_line(layout.headers())];
    for row in rows {
        lines.push(layout.parent_line(&row.parent));
        for child in &row.children {
            lines.push(layout.child_line(child));
        }
    }
    lines.join(ROW_SEPARATOR)
}

/// `<subject>[_filtered]_<timestamp>.csv`
///
/// The timestamp is ISO-8601 UTC with `:` and `.` turned into `-` and the
/// milliseconds dropped, e.g. `2026-10-19T08-30-00`. Path separators in the
/// subject are replaced so the name always stays a single path component.
pub fn export_filename(subject: &str, filtered: bool, at: DateTime<Utc>) -> String {
    let subject: String = subject
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    let suffix = if filtered { FILTERED_SUFFIX } else { "" };
    format!(
        "{}{}_{}.{}",
        subject,
        suffix,
        at.format("%Y-%m-%dT%H-%M-%S"),
        CSV_EXTENSION
    )
}

/// A finished export, ready to hand to a [`DownloadTarget`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
    /// Data rows, not counting the header
    pub row_count: usize,
}

/// Export flat rows. An empty row set is refused rather than producing a
/// header-only file.
pub fn export_csv<S: AsRef<str>>(
    subject: &str,
    headers: &[S],
    rows: &[Record],
    filtered: bool,
    at: DateTime<Utc>,
) -> Result<CsvExport, ExportError> {
    if rows.is_empty() {
        warn!("{}: no data to export", subject);
        return Err(ExportError::Empty);
    }
    Ok(CsvExport {
        filename: export_filename(subject, filtered, at),
        content: to_csv(headers, rows),
        row_count: rows.len(),
    })
}

/// Export parent rows with their children
pub fn export_expanded_csv(
    subject: &str,
    layout: &ExpandedLayout,
    rows: &[ExpandedRow],
    filtered: bool,
    at: DateTime<Utc>,
) -> Result<CsvExport, ExportError> {
    if rows.is_empty() {
        warn!("{}: no data to export", subject);
        return Err(ExportError::Empty);
    }
    Ok(CsvExport {
        filename: export_filename(subject, filtered, at),
        content: to_csv_expanded(layout, rows),
        row_count: rows.iter().map(|r| 1 + r.children.len()).sum(),
    })
}

/// Where a finished export gets saved
pub trait DownloadTarget {
    /// Persist `content` under `filename`, returning where it went
    fn save(&self, filename: &str, content: &str) -> Result<PathBuf, ExportError>;
}

/// Saves exports into a downloads directory
#[derive(Debug, Clone)]
pub struct Downloads {
    dir: PathBuf,
}

impl Downloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Downloads { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save an export and log it
    pub fn download(&self, export: &CsvExport) -> Result<PathBuf, ExportError> {
        let path = self.save(&export.filename, &export.content)?;
        info!("Exported {} rows to {}", export.row_count, path.display());
        Ok(path)
    }
}

impl DownloadTarget for Downloads {
    fn save(&self, filename: &str, content: &str) -> Result<PathBuf, ExportError> {
        let io_err = |source| ExportError::Io {
            filename: filename.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let path = self.dir.join(filename);
        fs::write(&path, content.as_bytes()).map_err(io_err)?;
        Ok(path)
    }
}
