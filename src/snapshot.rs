/// Page snapshots for the chat/analysis endpoint
///
/// A `PageSnapshot` is a bounded JSON summary of whatever a view currently
/// holds. It is built right before a chat, analyze or summarize call and has
/// to stay small no matter how much data the view has loaded:
///
/// - arrays only get in through [`SnapshotBuilder::list`] /
///   [`SnapshotBuilder::records`], which take an explicit cap
/// - free-text fields go through [`SnapshotBuilder::text`], which truncates
///   with a `…` marker
/// - raw XML payloads and call stacks are simply never projected
/// - a final pass caps anything an extractor slipped in by other means
///
/// `summarize` never fails. An extractor that returns an error or panics
/// still yields a snapshot: whatever was built before the failure, flagged
/// through `extractionError`. The snapshot's `error` field is also set when
/// the view did not already report an error of its own there.

use crate::error::SnapshotError;
use crate::record::Record;
use chrono::{SecondsFormat, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

pub const TRUNCATION_MARKER: char = '\u{2026}';
pub const EXTRACTION_FAILED: &str = "Failed to extract page data";

/// Largest array cap any view uses; the final pass enforces it everywhere
pub const MAX_ARRAY_ITEMS: usize = 50;
/// Longest free-text cap any view uses; the final pass enforces it everywhere
pub const MAX_TEXT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageType {
    SrmDownload,
    DatabaseErrors,
    ClsManagement,
    ReleaseManager,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::SrmDownload => "srm-download",
            PageType::DatabaseErrors => "database-errors",
            PageType::ClsManagement => "cls-management",
            PageType::ReleaseManager => "release-manager",
        }
    }
}

/// Cut `text` to `max_chars` characters, appending the marker when cut
pub fn truncate_text(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => {
            let mut cut = String::with_capacity(byte_idx + TRUNCATION_MARKER.len_utf8());
            cut.push_str(&text[..byte_idx]);
            cut.push(TRUNCATION_MARKER);
            Cow::Owned(cut)
        }
    }
}

/// Which record fields make it into a snapshot, and how long text may be.
///
/// Anything not listed is omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<(String, Option<usize>)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a short field as-is (still subject to the global text cap)
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push((name.into(), None));
        self
    }

    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(names.into_iter().map(|n| (n.into(), None)));
        self
    }

    /// Keep a free-text field truncated to `max_chars`
    pub fn text(mut self, name: impl Into<String>, max_chars: usize) -> Self {
        self.fields.push((name.into(), Some(max_chars)));
        self
    }

    pub fn project(&self, record: &Record) -> JsonValue {
        let mut object = Map::new();
        for (name, limit) in &self.fields {
            let value = record.value(name);
            let json = match (limit, value.as_str()) {
                (Some(max), Some(text)) => JsonValue::String(truncate_text(text, *max).into_owned()),
                _ => value.to_json(),
            };
            object.insert(name.clone(), json);
        }
        JsonValue::Object(object)
    }
}

/// Accumulates the fields of one snapshot
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    fields: Map<String, JsonValue>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scalar (number, bool, short string, null). Nested values are still
    /// bounded by the final pass.
    pub fn scalar(&mut self, key: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Potentially large free text, truncated to `max_chars`
    pub fn text(&mut self, key: &str, value: Option<&str>, max_chars: usize) -> &mut Self {
        let json = match value {
            Some(text) => JsonValue::String(truncate_text(text, max_chars).into_owned()),
            None => JsonValue::Null,
        };
        self.fields.insert(key.to_string(), json);
        self
    }

    /// At most `cap` items, each mapped to JSON
    pub fn list<I, T, F>(&mut self, key: &str, items: I, cap: usize, map: F) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> JsonValue,
    {
        let values: Vec<JsonValue> = items.into_iter().take(cap).map(map).collect();
        self.fields.insert(key.to_string(), JsonValue::Array(values));
        self
    }

    /// At most `cap` records, each reduced to `projection`
    pub fn records(&mut self, key: &str, records: &[Record], cap: usize, projection: &Projection) -> &mut Self {
        self.list(key, records.iter(), cap, |r| projection.project(r))
    }

    /// A single projected record, or null
    pub fn record(&mut self, key: &str, record: Option<&Record>, projection: &Projection) -> &mut Self {
        let json = record.map(|r| projection.project(r)).unwrap_or(JsonValue::Null);
        self.fields.insert(key.to_string(), json);
        self
    }

    /// A nested object built with its own builder
    pub fn object<F>(&mut self, key: &str, build: F) -> Result<&mut Self, SnapshotError>
    where
        F: FnOnce(&mut SnapshotBuilder) -> Result<(), SnapshotError>,
    {
        let mut nested = SnapshotBuilder::new();
        build(&mut nested)?;
        self.fields.insert(key.to_string(), JsonValue::Object(nested.fields));
        Ok(self)
    }

    /// Drop a field that exists in view state but is not worth the tokens
    pub fn omit(&mut self, key: &str) -> &mut Self {
        self.fields.remove(key);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Finish a nested builder used inside a `list` mapping
    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }

    fn into_fields(self) -> Map<String, JsonValue> {
        self.fields
    }
}

/// Cap arrays, objects and strings anywhere in a JSON value
pub fn bound_json(value: JsonValue, max_items: usize, max_chars: usize) -> JsonValue {
    match value {
        JsonValue::String(s) => match truncate_text(&s, max_chars) {
            Cow::Borrowed(_) => JsonValue::String(s),
            Cow::Owned(cut) => JsonValue::String(cut),
        },
        JsonValue::Array(items) => JsonValue::Array(
            items
                .into_iter()
                .take(max_items)
                .map(|v| bound_json(v, max_items, max_chars))
                .collect(),
        ),
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .take(max_items)
                .map(|(k, v)| (k, bound_json(v, max_items, max_chars)))
                .collect(),
        ),
        other => other,
    }
}

/// Bounded summary of one view, sent as `pageData`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub page_type: PageType,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
    pub extracted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

impl PageSnapshot {
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    /// True when extraction failed and this is a best-effort snapshot
    pub fn is_partial(&self) -> bool {
        self.extraction_error.is_some()
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// Implemented by each view that can describe itself to the chat endpoint
pub trait PageDataExtractor {
    fn page_type(&self) -> PageType;

    fn extract(&self, snapshot: &mut SnapshotBuilder) -> Result<(), SnapshotError>;
}

pub fn summarize<E: PageDataExtractor + ?Sized>(extractor: &E) -> PageSnapshot {
    summarize_with(extractor.page_type(), |b| extractor.extract(b))
}

/// Run an extraction closure and always return a bounded snapshot
pub fn summarize_with<F>(page_type: PageType, extract: F) -> PageSnapshot
where
    F: FnOnce(&mut SnapshotBuilder) -> Result<(), SnapshotError>,
{
    let mut builder = SnapshotBuilder::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| extract(&mut builder)));

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(_) => Some("extractor panicked".to_string()),
    };

    let mut fields: Map<String, JsonValue> = builder
        .into_fields()
        .into_iter()
        .map(|(k, v)| (k, bound_json(v, MAX_ARRAY_ITEMS, MAX_TEXT_CHARS)))
        .collect();

    let extraction_error = failure.map(|reason| {
        error!("Error extracting {} page data: {}", page_type.as_str(), reason);
        // A view's own fetch error takes precedence in `error`
        let view_error = fields.get("error").is_some_and(|e| !e.is_null());
        if !view_error {
            fields.insert("error".to_string(), JsonValue::from(EXTRACTION_FAILED));
        }
        EXTRACTION_FAILED.to_string()
    });

    PageSnapshot {
        page_type,
        fields,
        extracted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        extraction_error,
    }
}
