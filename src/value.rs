/// OpsGrid Cell Values
///
/// A `CellValue` is one scalar field of a backend record. Backend JSON only
/// ever gives us strings, numbers, booleans or null; anything nested is kept
/// as its JSON text so that filtering and export still see something.
///
/// # Stringification
///
/// Every transformation in this crate (filter, sort, dedupe keys, grouping,
/// CSV) works on the *display string* of a value, never on its typed form:
///
/// - `Null` becomes the empty string, never `"null"`
/// - integers and floats print the way a browser prints them (`8`, not `8.0`;
///   `1e+21` and `1e-7` past the exponent thresholds; `-0` as `0`)
/// - booleans print as `true` / `false`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;

/// Cell value enum covering the scalar shapes of backend JSON
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Lenient numeric view used for aggregation.
    ///
    /// Numbers are taken as-is and strings are parsed after trimming.
    /// Everything else (null, booleans, unparseable text) is not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    /// Display string of this value, borrowing when the value is already text
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::String(s) => Cow::Borrowed(s.as_str()),
            CellValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            CellValue::Int(v) => Cow::Owned(v.to_string()),
            CellValue::Float(v) => Cow::Owned(format_float(*v)),
        }
    }

    /// True when the display string is empty (null or `""`)
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Convert a backend JSON value into a cell.
    ///
    /// Arrays and objects are not scalars; they are kept as compact JSON text.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => CellValue::Null,
            JsonValue::Bool(b) => CellValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
            },
            JsonValue::String(s) => CellValue::String(s),
            other => CellValue::String(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Null => JsonValue::Null,
            CellValue::Bool(b) => JsonValue::Bool(*b),
            CellValue::Int(v) => JsonValue::from(*v),
            CellValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CellValue::String(s) => JsonValue::String(s.clone()),
        }
    }
}

/// Print a float the way a browser's `String(n)` does.
///
/// Both use the shortest digits that round-trip; only the switch to
/// exponent form (below `1e-6`, from `1e21` up) and its `e+` sign differ
/// from Rust's `Display`.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if v == 0.0 {
        return "0".to_string();
    }

    let abs = v.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let exp = format!("{:e}", v);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
            _ => exp,
        };
    }
    v.to_string()
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Int(v) => serializer.serialize_i64(*v),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(CellValue::from_json)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::String(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::String(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(v as i64)
    }
}

impl From<u32> for CellValue {
    fn from(v: u32) -> Self {
        CellValue::Int(v as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

impl From<JsonValue> for CellValue {
    fn from(v: JsonValue) -> Self {
        CellValue::from_json(v)
    }
}

/// Running numeric total that stays integral until a fractional value shows up.
///
/// Non-numeric inputs contribute zero, so a single bad cell never poisons
/// an aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericTotal {
    int_sum: i64,
    float_sum: f64,
    saw_float: bool,
}

impl NumericTotal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: &CellValue) {
        match value {
            CellValue::Int(v) => self.add_int(*v),
            CellValue::Float(v) if v.is_finite() => self.add_float(*v),
            CellValue::String(_) => match value.as_number() {
                Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => self.add_int(n as i64),
                Some(n) => self.add_float(n),
                None => {}
            },
            _ => {}
        }
    }

    fn add_int(&mut self, v: i64) {
        match self.int_sum.checked_add(v) {
            Some(sum) => self.int_sum = sum,
            None => self.add_float(v as f64),
        }
    }

    fn add_float(&mut self, v: f64) {
        self.float_sum += v;
        self.saw_float = true;
    }

    pub fn as_f64(&self) -> f64 {
        self.int_sum as f64 + self.float_sum
    }

    /// The total as a cell: `Int` while every input was integral
    pub fn value(&self) -> CellValue {
        if self.saw_float {
            CellValue::Float(self.as_f64())
        } else {
            CellValue::Int(self.int_sum)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_strings() {
        assert_eq!(CellValue::Null.display(), "");
        assert_eq!(CellValue::from("abc").display(), "abc");
        assert_eq!(CellValue::Int(42).display(), "42");
        assert_eq!(CellValue::Float(8.0).display(), "8");
        assert_eq!(CellValue::Float(2.5).display(), "2.5");
        assert_eq!(CellValue::Bool(true).display(), "true");
        assert_eq!(CellValue::Float(f64::INFINITY).display(), "Infinity");
        assert_eq!(CellValue::Float(-0.0).display(), "0");
    }

    #[test]
    fn test_float_exponent_thresholds() {
        assert_eq!(CellValue::Float(1e21).display(), "1e+21");
        assert_eq!(CellValue::Float(1.5e22).display(), "1.5e+22");
        assert_eq!(CellValue::Float(1e20).display(), "100000000000000000000");
        assert_eq!(CellValue::Float(1e-7).display(), "1e-7");
        assert_eq!(CellValue::Float(-2.5e-8).display(), "-2.5e-8");
        assert_eq!(CellValue::Float(0.000001).display(), "0.000001");
        assert_eq!(CellValue::Float(0.1).display(), "0.1");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(CellValue::from_json(json!(null)), CellValue::Null);
        assert_eq!(CellValue::from_json(json!(3)), CellValue::Int(3));
        assert_eq!(CellValue::from_json(json!(3.25)), CellValue::Float(3.25));
        assert_eq!(CellValue::from_json(json!("x")), CellValue::from("x"));
        assert_eq!(
            CellValue::from_json(json!(["a", 1])),
            CellValue::from("[\"a\",1]")
        );
    }

    #[test]
    fn test_as_number_is_lenient() {
        assert_eq!(CellValue::Int(4).as_number(), Some(4.0));
        assert_eq!(CellValue::from(" 12 ").as_number(), Some(12.0));
        assert_eq!(CellValue::from("twelve").as_number(), None);
        assert_eq!(CellValue::from("").as_number(), None);
        assert_eq!(CellValue::Bool(true).as_number(), None);
        assert_eq!(CellValue::Null.as_number(), None);
    }

    #[test]
    fn test_numeric_total_stays_integral() {
        let mut total = NumericTotal::new();
        total.add(&CellValue::Int(3));
        total.add(&CellValue::from("5"));
        total.add(&CellValue::Null);
        total.add(&CellValue::from("n/a"));
        assert_eq!(total.value(), CellValue::Int(8));
    }

    #[test]
    fn test_numeric_total_switches_to_float() {
        let mut total = NumericTotal::new();
        total.add(&CellValue::Int(1));
        total.add(&CellValue::Float(0.5));
        assert_eq!(total.value(), CellValue::Float(1.5));
    }

    #[test]
    fn test_serde_round_trip() {
        let cells = vec![
            CellValue::Null,
            CellValue::Bool(false),
            CellValue::Int(-7),
            CellValue::from("text"),
        ];
        let text = serde_json::to_string(&cells).unwrap();
        assert_eq!(text, r#"[null,false,-7,"text"]"#);
        let back: Vec<CellValue> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cells);
    }
}
