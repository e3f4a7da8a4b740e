/// Identity keys for dedupe and grouping.
///
/// A key is the display strings of a fixed list of fields joined with a
/// delimiter that does not show up in facility codes, routes or timestamps.

use crate::record::Record;

pub const KEY_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    fields: Vec<String>,
}

impl KeyBuilder {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyBuilder {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Key of a record. Absent and null fields contribute an empty segment.
    pub fn key(&self, record: &Record) -> String {
        let mut key = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                key.push(KEY_DELIMITER);
            }
            key.push_str(&record.display(field));
        }
        key
    }
}
