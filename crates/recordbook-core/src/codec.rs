//! On-disk form of a collection: one pretty-printed JSON array of records.

use serde_json::Value;

use crate::{models::Record, storage::StoreError};

/// Decodes a collection file. Empty input is an empty collection; anything
/// other than a JSON array is an error. Array elements that are not objects
/// are skipped.
pub fn decode_collection(bytes: &[u8]) -> Result<Vec<Record>, StoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter(Value::is_object)
            .map(Record::from)
            .collect()),
        other => Err(StoreError::Other(format!("expected a JSON array, found {}", kind(&other)))),
    }
}

pub fn encode_collection(records: &[Record]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(records)?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
