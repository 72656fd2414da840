use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    collection::Collection,
    models::{Record, ID},
    storage::StoreError,
};

/// Declares which field carries the key of each collection.
///
/// Accounts are keyed by their business number, every other collection by
/// `id`. A config file may override individual entries; unlisted collections
/// keep their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct KeyMap {
    fields: BTreeMap<Collection, String>,
}

pub const ACCOUNT_NUMBER: &str = "number";

impl Default for KeyMap {
    fn default() -> Self {
        let fields = Collection::ALL
            .into_iter()
            .map(|c| {
                let field = match c {
                    Collection::Accounts => ACCOUNT_NUMBER,
                    _ => ID,
                };
                (c, field.to_string())
            })
            .collect();
        Self { fields }
    }
}

impl KeyMap {
    pub fn with_field(mut self, collection: Collection, field: impl Into<String>) -> Self {
        self.fields.insert(collection, field.into());
        self
    }

    pub fn key_field(&self, collection: Collection) -> &str {
        self.fields.get(&collection).map(String::as_str).unwrap_or(ID)
    }

    /// Whether a store should generate the key when a new record lacks one.
    /// Business keys are always supplied by the caller.
    pub fn generates_key(&self, collection: Collection) -> bool {
        self.key_field(collection) == ID
    }

    pub fn key_of(&self, collection: Collection, record: &Record) -> Option<String> {
        record.key_value(self.key_field(collection))
    }

    pub fn matches(&self, collection: Collection, record: &Record, key: &str) -> bool {
        self.key_of(collection, record).as_deref() == Some(key)
    }
}

impl TryFrom<BTreeMap<String, String>> for KeyMap {
    type Error = StoreError;

    fn try_from(overrides: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        overrides
            .into_iter()
            .try_fold(KeyMap::default(), |keys, (name, field)| {
                Ok(keys.with_field(name.parse()?, field))
            })
    }
}

impl From<KeyMap> for BTreeMap<String, String> {
    fn from(keys: KeyMap) -> Self {
        keys.fields
            .into_iter()
            .map(|(c, field)| (c.as_str().to_string(), field))
            .collect()
    }
}
