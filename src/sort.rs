/// Row sorting
///
/// Sorting always compares display strings with [`locale_compare`], so
/// numbers sort as text (`"10" < "9"`), matching what the dashboards show.
/// `sort_records` is stable: rows with equal keys keep their relative order
/// in both directions, because descending negates the comparator instead of
/// reversing the output.

use crate::record::Record;
use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (smallest first)
    #[serde(rename = "asc")]
    Ascending,
    /// Descending order (largest first)
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    /// Apply this order to an ascending comparison result
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// The single active sort of a table plus the view's default direction.
///
/// Views disagree on the default: ticket and error tables start ascending,
/// time-ordered views start descending. The default is carried here so that
/// switching columns resets to the right direction for that view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    field: String,
    order: SortOrder,
    default_order: SortOrder,
}

impl SortState {
    /// Sort by `field` in `default_order`, which is also used when switching columns
    pub fn new(field: impl Into<String>, default_order: SortOrder) -> Self {
        SortState {
            field: field.into(),
            order: default_order,
            default_order,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Descending)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn default_order(&self) -> SortOrder {
        self.default_order
    }

    /// Header click: same field flips direction, a new field starts at the default
    pub fn toggle(&mut self, field: &str) {
        if self.field == field {
            self.order = self.order.flipped();
        } else {
            self.field = field.to_string();
            self.order = self.default_order;
        }
    }

    /// Column header indicator: `▲`/`▼` on the active field, `↕` elsewhere
    pub fn indicator(&self, field: &str) -> &'static str {
        if self.field != field {
            return "\u{2195}";
        }
        match self.order {
            SortOrder::Ascending => "\u{25B2}",
            SortOrder::Descending => "\u{25BC}",
        }
    }

    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        sort_records(records, &self.field, self.order)
    }
}

/// Collation class: punctuation and symbols, then digits, then letters
fn char_class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    }
}

/// Base letters with accents stripped, lower-cased
fn primary_weights(s: &str) -> impl Iterator<Item = (u8, char)> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| (char_class(c), c))
}

/// Combining marks attached to each base character, in order
fn accent_weights(s: &str) -> Vec<Vec<char>> {
    let mut accents: Vec<Vec<char>> = Vec::new();
    for c in s.nfd() {
        match accents.last_mut() {
            Some(marks) if is_combining_mark(c) => marks.push(c),
            _ => accents.push(Vec::new()),
        }
    }
    accents
}

/// Collation in the spirit of a browser's default `localeCompare`.
///
/// - primary: case- and accent-insensitive, with symbols < digits < letters
/// - secondary: at the first accent difference, the unaccented form sorts first
/// - tertiary: at the first case difference, lowercase sorts first
/// - finally raw code points, so only identical strings compare equal
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = primary_weights(a).cmp(primary_weights(b));
    if primary != Ordering::Equal {
        return primary;
    }

    let secondary = accent_weights(a).cmp(&accent_weights(b));
    if secondary != Ordering::Equal {
        return secondary;
    }

    for (ca, cb) in a.nfd().zip(b.nfd()) {
        if ca == cb {
            continue;
        }
        match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => return ca.cmp(&cb),
        }
    }

    a.cmp(b)
}

/// Compare two cells by display string
pub fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    locale_compare(&a.display(), &b.display())
}

/// Stable sort into a new vector; the input is never touched
pub fn sort_records(records: &[Record], field: &str, order: SortOrder) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| order.apply(compare_cells(a.value(field), b.value(field))));
    sorted
}
