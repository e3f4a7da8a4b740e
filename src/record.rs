/// OpsGrid Record
///
/// A `Record` is one row of tabular JSON returned by the backend: an ordered
/// mapping from column name to `CellValue`. Field order is the order the
/// backend sent, which is also the order CSV export and snapshots see.
///
/// Records are treated as immutable snapshots. Every transformation in this
/// crate produces new records; the only mutating helpers (`insert`, `remove`)
/// exist for building derived rows such as dedupe output.

use crate::value::CellValue;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;

static NULL_CELL: CellValue = CellValue::Null;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Record {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Build a record from `(column, value)` pairs. Later duplicates replace
    /// earlier ones in place.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut record = Record::new();
        for (k, v) in pairs {
            record.insert(k, v);
        }
        record
    }

    /// Build a record from a JSON object. Returns `None` for any other shape.
    pub fn from_json(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(map) => Some(Record::from_pairs(
                map.into_iter().map(|(k, v)| (k, CellValue::from_json(v))),
            )),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == column)
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    /// Value of a column, with absent columns reading as `Null`
    pub fn value(&self, column: &str) -> &CellValue {
        self.get(column).unwrap_or(&NULL_CELL)
    }

    /// Display string of a column (`""` when absent or null)
    pub fn display(&self, column: &str) -> Cow<'_, str> {
        self.value(column).display()
    }

    /// Set a column, replacing in place if present and appending otherwise
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Builder-style `insert`
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn remove(&mut self, column: &str) -> Option<CellValue> {
        let pos = self.fields.iter().position(|(k, _)| k == column)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Column names of a record list in first-seen order.
///
/// Backend rows share a column set but any row may omit a field, so the
/// union is taken rather than trusting the first row.
pub fn column_union(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for column in record.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object of column values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, CellValue>()? {
            record.insert(key, value);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Build a `Record` from `column => value` pairs
///
/// ```
/// use opsgrid::record;
///
/// let row = record! { "fc" => "AVP1", "zips" => 3 };
/// assert_eq!(row.display("fc"), "AVP1");
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert($key, $crate::CellValue::from($value)); )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut row = Record::new();
        row.insert("b", 1);
        row.insert("a", 2);
        row.insert("b", 3);

        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["b", "a"]);
        assert_eq!(row.value("b"), &CellValue::Int(3));
    }

    #[test]
    fn test_missing_column_reads_as_null() {
        let row = record! { "a" => "x" };
        assert!(row.value("missing").is_null());
        assert_eq!(row.display("missing"), "");
    }

    #[test]
    fn test_deserialize_keeps_backend_order() {
        let row: Record =
            serde_json::from_str(r#"{"zeta":1,"alpha":"two","mid":null}"#).unwrap();
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["zeta", "alpha", "mid"]);
        assert!(row.value("mid").is_null());
    }

    #[test]
    fn test_serialize_keeps_order() {
        let row = record! { "server" => "S1", "count" => 2, "ok" => false };
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"server":"S1","count":2,"ok":false}"#
        );
    }

    #[test]
    fn test_column_union() {
        let rows = vec![
            record! { "a" => 1, "b" => 2 },
            record! { "a" => 1, "c" => 3 },
        ];
        assert_eq!(column_union(&rows), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(Record::from_json(serde_json::json!([1, 2])).is_none());
        assert!(Record::from_json(serde_json::json!({"a": 1})).is_some());
    }
}
