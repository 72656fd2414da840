use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod keys;

pub const ID: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// A persisted record: an open-ended map of field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Field value rendered as a key, if the field holds a usable one.
    pub fn key_value(&self, field: &str) -> Option<String> {
        self.get(field).and_then(key_text)
    }

    pub fn id(&self) -> Option<String> {
        self.key_value(ID)
    }

    pub fn created_at(&self) -> Option<&str> {
        self.get(CREATED_AT).and_then(Value::as_str)
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.get(UPDATED_AT).and_then(Value::as_str)
    }

    pub fn stamp_created(&mut self, now: &str) {
        self.insert(CREATED_AT, now);
        self.insert(UPDATED_AT, now);
    }

    pub fn stamp_updated(&mut self, now: &str) {
        self.insert(UPDATED_AT, now);
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Anything that is not a JSON object becomes an empty record.
impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::new(),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Keys compare as strings: strings verbatim, numbers and booleans by their
/// JSON text. Null, empty strings and compound values are not keys.
pub fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
