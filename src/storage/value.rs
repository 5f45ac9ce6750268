//! Value and result-row types for josedb
//!
//! This module defines how data values are represented in memory and how
//! query results are handed back to callers.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A value in the database
///
/// Serialization is untagged so values round-trip through the persistence
/// file as native JSON scalars. Variant order matters for deserialization:
/// integers must be tried before reals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value (64-bit signed)
    Integer(i64),
    /// Real value (64-bit float)
    Real(f64),
    /// Text value (UTF-8)
    Text(String),
}

// PartialEq is manual to compare Real via bit pattern, so Value can key a
// hash index. Different variants are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Real(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
        }
    }
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// Declared column types
///
/// Declared types are advisory: stored values are not coerced, but the type
/// is recorded, persisted, and exposed through `describe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Real,
    /// UTF-8 string
    Text,
    /// Boolean
    Boolean,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Real => write!(f, "REAL"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

/// A materialized result row: an ordered sequence of (column name, value)
/// pairs
///
/// Single-table results use bare column names; join results use qualified
/// `table.column` names. Pair order preserves projection order, which a
/// plain string-keyed map would lose.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    entries: Vec<(String, Value)>,
}

impl ResultRow {
    /// Create an empty result row
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a result row with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a (column, value) pair
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.entries.push((column.into(), value));
    }

    /// Get the value for a column name, if present
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in projection order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over (column, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResultRow {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// Serialized as a JSON object so embedders can hand rows straight to a
// web client.
impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality_by_variant() {
        assert_eq!(Value::Integer(1), Value::Integer(1));
        assert_ne!(Value::Integer(1), Value::Real(1.0));
        assert_ne!(Value::Text("1".to_string()), Value::Integer(1));
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Integer(0));
    }

    #[test]
    fn test_value_json_round_trip() {
        let values = vec![
            Value::Null,
            Value::Boolean(true),
            Value::Integer(-42),
            Value::Real(2.5),
            Value::Text("hello".to_string()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,true,-42,2.5,"hello"]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_integer_deserializes_before_real() {
        let v: Value = serde_json::from_str("7").unwrap();
        assert_eq!(v, Value::Integer(7));
        let v: Value = serde_json::from_str("7.0").unwrap();
        assert_eq!(v, Value::Real(7.0));
    }

    #[test]
    fn test_data_type_serialization() {
        assert_eq!(
            serde_json::to_string(&DataType::Integer).unwrap(),
            "\"INTEGER\""
        );
        let dt: DataType = serde_json::from_str("\"BOOLEAN\"").unwrap();
        assert_eq!(dt, DataType::Boolean);
    }

    #[test]
    fn test_result_row_preserves_order() {
        let mut row = ResultRow::new();
        row.push("b", Value::Integer(2));
        row.push("a", Value::Integer(1));

        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["b", "a"]);
        assert_eq!(row.get("a"), Some(&Value::Integer(1)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_result_row_serializes_as_object() {
        let mut row = ResultRow::new();
        row.push("id", Value::Integer(1));
        row.push("name", Value::Text("Alice".to_string()));
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"id":1,"name":"Alice"}"#
        );
    }
}
