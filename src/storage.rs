use std::{collections::HashMap, path::PathBuf};

use recordbook_core::{
    codec::{decode_collection, encode_collection},
    models::ID,
    timestamp::{now_iso, now_millis},
    Collection, KeyMap, Record, StoreError,
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

/// Outcome of replacing a record by key.
#[derive(Debug, Clone, PartialEq)]
pub enum Replaced {
    Stored(Record),
    NotFound(Record),
}

/// One JSON file per collection under the data directory. Nothing is cached:
/// every operation reads the file fresh and mutations rewrite it in full.
pub struct FileStorage {
    data_dir: PathBuf,
    keys: KeyMap,
    locks: HashMap<Collection, Mutex<()>>,
}

impl FileStorage {
    pub async fn open(data_dir: impl Into<PathBuf>, keys: KeyMap) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        tracing::info!(data_dir = %data_dir.display(), "Record storage opened");
        let locks = Collection::ALL.into_iter().map(|c| (c, Mutex::new(()))).collect();
        Ok(Self { data_dir, keys, locks })
    }

    /// Missing, empty or unreadable files read as an empty collection.
    pub async fn read(&self, collection: Collection) -> Vec<Record> {
        let path = self.data_dir.join(collection.file_name());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(%collection, error = %e, "Collection file not readable");
                return Vec::new();
            }
        };
        decode_collection(&bytes).unwrap_or_else(|e| {
            tracing::warn!(%collection, error = %e, "Unreadable collection file, treating as empty");
            Vec::new()
        })
    }

    async fn write(&self, collection: Collection, records: &[Record]) -> Result<(), StoreError> {
        let path = self.data_dir.join(collection.file_name());
        tokio::fs::write(&path, encode_collection(records)?).await?;
        Ok(())
    }

    fn lock(&self, collection: Collection) -> &Mutex<()> {
        // every collection is registered in open
        &self.locks[&collection]
    }

    /// Appends a record, assigning a timestamp-derived `id` when the caller
    /// supplied none.
    pub async fn create(&self, collection: Collection, mut record: Record) -> Result<Record, StoreError> {
        let _guard = self.lock(collection).lock().await;
        let mut records = self.read(collection).await;

        if record.id().is_none() {
            record.insert(ID, unique_id(&records));
        }
        if let Some(key) = self.keys.key_of(collection, &record) {
            if records.iter().any(|r| self.keys.matches(collection, r, &key)) {
                return Err(StoreError::DuplicateKey { collection, key });
            }
        }
        record.stamp_created(&now_iso()?);
        records.push(record.clone());
        self.write(collection, &records).await?;

        tracing::debug!(%collection, key = ?self.keys.key_of(collection, &record), "Record created");
        Ok(record)
    }

    /// Replaces the record stored under `key`. The stored record keeps its
    /// `id` and key field whatever the incoming body says.
    pub async fn replace(&self, collection: Collection, key: &str, mut record: Record) -> Result<Replaced, StoreError> {
        let _guard = self.lock(collection).lock().await;
        let mut records = self.read(collection).await;

        let Some(idx) = records.iter().position(|r| self.keys.matches(collection, r, key)) else {
            return Ok(Replaced::NotFound(record));
        };
        let key_field = self.keys.key_field(collection);
        for field in [ID, key_field] {
            match records[idx].get(field) {
                Some(value) => record.insert(field, value.clone()),
                None => record.remove(field),
            };
        }
        record.stamp_updated(&now_iso()?);
        records[idx] = record.clone();
        self.write(collection, &records).await?;

        tracing::debug!(%collection, key, "Record replaced");
        Ok(Replaced::Stored(record))
    }

    /// Returns whether a record was removed.
    pub async fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        let _guard = self.lock(collection).lock().await;
        let mut records = self.read(collection).await;

        let Some(idx) = records.iter().position(|r| self.keys.matches(collection, r, key)) else {
            return Ok(false);
        };
        records.remove(idx);
        self.write(collection, &records).await?;

        tracing::debug!(%collection, key, "Record removed");
        Ok(true)
    }

    /// First user whose email and password both match.
    pub async fn find_user(&self, email: &str, password: &str) -> Option<Record> {
        self.read(Collection::Users).await.into_iter().find(|user| {
            let email_matches = user.get("email").and_then(|v| v.as_str()) == Some(email);
            let password_matches = user
                .get("password")
                .and_then(|v| v.as_str())
                .map(|stored| bool::from(stored.as_bytes().ct_eq(password.as_bytes())))
                .unwrap_or(false);
            email_matches && password_matches
        })
    }
}

// Millisecond timestamp, bumped past any id already present.
fn unique_id(records: &[Record]) -> String {
    let mut candidate = now_millis();
    loop {
        let id = candidate.to_string();
        if !records.iter().any(|r| r.id().as_deref() == Some(id.as_str())) {
            return id;
        }
        candidate += 1;
    }
}
