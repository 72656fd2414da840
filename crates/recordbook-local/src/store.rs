use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use recordbook_core::{
    codec::{decode_collection, encode_collection},
    keygen::generate_key,
    models::ID,
    timestamp::now_iso,
    Collection, KeyMap, Record, RecordStore, StoreError,
};
use tokio::{fs::OpenOptions, sync::Mutex};

use crate::access::DirectoryAccess;

enum Grant {
    Pending,
    Granted(PathBuf),
    Denied,
}

#[derive(Default)]
struct CollectionData {
    records: Vec<Record>,
    file: Option<PathBuf>,
}

/// Keeps every collection in memory and mirrors it to `<collection>.json`
/// inside the granted directory. Without a grant nothing is persisted.
pub struct LocalDirectoryStore {
    access: Box<dyn DirectoryAccess>,
    keys: KeyMap,
    grant: Mutex<Grant>,
    collections: HashMap<Collection, Mutex<CollectionData>>,
}

impl LocalDirectoryStore {
    pub fn new(access: impl DirectoryAccess + 'static) -> Self {
        Self::with_keys(access, KeyMap::default())
    }

    pub fn with_keys(access: impl DirectoryAccess + 'static, keys: KeyMap) -> Self {
        let collections = Collection::ALL
            .into_iter()
            .map(|c| (c, Mutex::new(CollectionData::default())))
            .collect();
        Self {
            access: Box::new(access),
            keys,
            grant: Mutex::new(Grant::Pending),
            collections,
        }
    }

    /// The granted directory, `None` while the store is memory-only.
    pub async fn directory(&self) -> Option<PathBuf> {
        match &*self.grant.lock().await {
            Grant::Granted(dir) => Some(dir.clone()),
            Grant::Pending | Grant::Denied => None,
        }
    }

    /// Rewrites the collection file from memory. Does nothing without a file.
    pub async fn persist(&self, collection: Collection) -> Result<(), StoreError> {
        let data = self.data(collection).lock().await;
        write_collection(collection, &data).await
    }

    fn data(&self, collection: Collection) -> &Mutex<CollectionData> {
        // every collection is registered in with_keys
        &self.collections[&collection]
    }

    // A refusal is final for the lifetime of the store. The flag is set
    // when this call made the request.
    async fn resolve_grant(&self) -> (Option<PathBuf>, bool) {
        let mut grant = self.grant.lock().await;
        let requested = matches!(*grant, Grant::Pending);
        if requested {
            *grant = match self.access.request().await {
                Ok(dir) => {
                    tracing::info!(directory = %dir.display(), "Directory access granted");
                    Grant::Granted(dir)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Directory access not granted, records are kept in memory only");
                    Grant::Denied
                }
            };
        }
        let directory = match &*grant {
            Grant::Granted(dir) => Some(dir.clone()),
            Grant::Pending | Grant::Denied => None,
        };
        (directory, requested)
    }

    async fn ensure_file(&self, collection: Collection, data: &mut CollectionData) {
        if data.file.is_some() {
            return;
        }
        let Some(dir) = self.directory().await else {
            return;
        };
        let path = dir.join(collection.file_name());
        match create_if_missing(&path).await {
            Ok(()) => data.file = Some(path),
            Err(e) => tracing::warn!(%collection, error = %e, "Failed to open collection file"),
        }
    }
}

#[async_trait]
impl RecordStore for LocalDirectoryStore {
    async fn init(&self) -> Result<(), StoreError> {
        let (directory, requested) = self.resolve_grant().await;
        if directory.is_none() && !requested {
            // memory is the only copy left
            return Ok(());
        }
        for collection in Collection::ALL {
            let loaded = match &directory {
                Some(dir) => load_collection(collection, dir.join(collection.file_name())).await,
                None => CollectionData::default(),
            };
            *self.data(collection).lock().await = loaded;
        }
        Ok(())
    }

    async fn add(&self, collection: Collection, mut record: Record) -> Result<Option<String>, StoreError> {
        if self.keys.generates_key(collection) && record.id().is_none() {
            record.insert(ID, generate_key());
        }
        record.stamp_created(&now_iso()?);
        let key = self.keys.key_of(collection, &record);

        let mut data = self.data(collection).lock().await;
        if let Some(key) = &key {
            if data.records.iter().any(|r| self.keys.matches(collection, r, key)) {
                return Err(StoreError::DuplicateKey { collection, key: key.clone() });
            }
        }
        self.ensure_file(collection, &mut data).await;
        data.records.push(record);
        write_collection(collection, &data).await?;

        tracing::debug!(%collection, key = ?key, "Record added");
        Ok(key)
    }

    async fn put(&self, collection: Collection, mut record: Record) -> Result<Option<String>, StoreError> {
        record.stamp_updated(&now_iso()?);
        let key = self.keys.key_of(collection, &record);

        let mut data = self.data(collection).lock().await;
        let position = key
            .as_deref()
            .and_then(|key| data.records.iter().position(|r| self.keys.matches(collection, r, key)));
        match position {
            Some(idx) => data.records[idx] = record,
            None => tracing::debug!(%collection, key = ?key, "No record to replace"),
        }
        write_collection(collection, &data).await?;
        Ok(key)
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Record>, StoreError> {
        let data = self.data(collection).lock().await;
        Ok(data
            .records
            .iter()
            .find(|r| self.keys.matches(collection, r, key))
            .cloned())
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, StoreError> {
        Ok(self.data(collection).lock().await.records.clone())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let mut data = self.data(collection).lock().await;
        if let Some(idx) = data.records.iter().position(|r| self.keys.matches(collection, r, key)) {
            data.records.remove(idx);
            write_collection(collection, &data).await?;
            tracing::debug!(%collection, key, "Record deleted");
        }
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        Ok(self.data(collection).lock().await.records.len())
    }
}

async fn create_if_missing(path: &Path) -> std::io::Result<()> {
    OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(())
}

async fn read_collection_file(path: &Path) -> std::io::Result<Vec<u8>> {
    create_if_missing(path).await?;
    tokio::fs::read(path).await
}

async fn load_collection(collection: Collection, path: PathBuf) -> CollectionData {
    let bytes = match read_collection_file(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(%collection, error = %e, "Failed to open collection file");
            return CollectionData::default();
        }
    };
    let records = decode_collection(&bytes).unwrap_or_else(|e| {
        tracing::error!(%collection, error = %e, "Unreadable collection file, starting empty");
        Vec::new()
    });
    tracing::debug!(%collection, count = records.len(), "Collection loaded");
    CollectionData {
        records,
        file: Some(path),
    }
}

async fn write_collection(collection: Collection, data: &CollectionData) -> Result<(), StoreError> {
    let Some(path) = &data.file else {
        return Ok(());
    };
    let bytes = encode_collection(&data.records)?;
    tokio::fs::write(path, bytes).await.map_err(|e| {
        tracing::error!(%collection, error = %e, "Failed to write collection file");
        StoreError::Io(e)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::access::{DeniedDirectory, GrantedDirectory};

    async fn open_store(dir: &TempDir) -> LocalDirectoryStore {
        let store = LocalDirectoryStore::new(GrantedDirectory::new(dir.path()));
        store.init().await.unwrap();
        store
    }

    fn read_file(dir: &TempDir, collection: Collection) -> serde_json::Value {
        let text = std::fs::read_to_string(dir.path().join(collection.file_name())).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    struct CountingDenial(Arc<AtomicUsize>);

    #[async_trait]
    impl DirectoryAccess for CountingDenial {
        async fn request(&self) -> Result<PathBuf, StoreError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::AccessDenied)
        }
    }

    #[tokio::test]
    async fn test_init_creates_collection_files() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        for collection in Collection::ALL {
            assert!(dir.path().join(collection.file_name()).exists());
            assert_eq!(store.count(collection).await.unwrap(), 0);
        }
        assert_eq!(store.directory().await, Some(dir.path().to_path_buf()));
    }

    #[tokio::test]
    async fn test_add_account_keyed_by_number() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let key = store
            .add(Collection::Accounts, Record::from(json!({"number": "1000", "name": "Cash"})))
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("1000"));

        let account = store.get(Collection::Accounts, "1000").await.unwrap().unwrap();
        assert!(account.created_at().is_some());
        assert_eq!(account.created_at(), account.updated_at());
        assert!(account.get("id").is_none());
    }

    #[tokio::test]
    async fn test_add_generates_id() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let key = store
            .add(Collection::Goods, Record::from(json!({"name": "Screw"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key.len(), 36);
        let item = store.get(Collection::Goods, &key).await.unwrap().unwrap();
        assert_eq!(item.id(), Some(key));
    }

    #[tokio::test]
    async fn test_add_keeps_supplied_id() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let key = store
            .add(Collection::Orders, Record::from(json!({"id": "order-1"})))
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("order-1"));
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_key() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.add(Collection::Accounts, Record::from(json!({"number": "1000"}))).await.unwrap();
        let result = store.add(Collection::Accounts, Record::from(json!({"number": "1000"}))).await;
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
        assert_eq!(store.count(Collection::Accounts).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_replaces_whole_record() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let key = store
            .add(Collection::Goods, Record::from(json!({"name": "Screw", "stock": 10})))
            .await
            .unwrap()
            .unwrap();
        let mut item = store.get(Collection::Goods, &key).await.unwrap().unwrap();
        item.insert("stock", 5);
        item.remove("name");

        let returned = store.put(Collection::Goods, item).await.unwrap();
        assert_eq!(returned.as_deref(), Some(key.as_str()));

        let updated = store.get(Collection::Goods, &key).await.unwrap().unwrap();
        assert_eq!(updated.get("stock"), Some(&json!(5)));
        assert!(updated.get("name").is_none());
        assert!(updated.updated_at().unwrap() >= updated.created_at().unwrap());
        assert_eq!(store.count(Collection::Goods).await.unwrap(), 1);
        assert_eq!(read_file(&dir, Collection::Goods)[0]["stock"], json!(5));
    }

    #[tokio::test]
    async fn test_put_unknown_key_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.add(Collection::Goods, Record::from(json!({"id": "a"}))).await.unwrap();
        let before = store.get_all(Collection::Goods).await.unwrap();

        let key = store
            .put(Collection::Goods, Record::from(json!({"id": "missing", "name": "Ghost"})))
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("missing"));
        assert_eq!(store.get_all(Collection::Goods).await.unwrap(), before);
        assert!(store.get(Collection::Goods, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_is_a_copy() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.add(Collection::Postings, Record::from(json!({"id": "p1"}))).await.unwrap();
        let mut all = store.get_all(Collection::Postings).await.unwrap();
        all.clear();
        all.push(Record::from(json!({"id": "intruder"})));

        let fresh = store.get_all(Collection::Postings).await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id().as_deref(), Some("p1"));
        assert!(store.get(Collection::Postings, "intruder").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.add(Collection::Goods, Record::from(json!({"id": "a"}))).await.unwrap();
        store.add(Collection::Goods, Record::from(json!({"id": "b"}))).await.unwrap();

        store.delete(Collection::Goods, "missing").await.unwrap();
        assert_eq!(store.count(Collection::Goods).await.unwrap(), 2);

        store.delete(Collection::Goods, "a").await.unwrap();
        assert_eq!(store.count(Collection::Goods).await.unwrap(), 1);
        assert!(store.get(Collection::Goods, "a").await.unwrap().is_none());
        assert_eq!(read_file(&dir, Collection::Goods).as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let before = {
            let store = open_store(&dir).await;
            store
                .add(Collection::Accounts, Record::from(json!({"number": "1000", "name": "Cash"})))
                .await
                .unwrap();
            store
                .add(Collection::Accounts, Record::from(json!({"number": 1200, "tags": ["bank"]})))
                .await
                .unwrap();
            store.get_all(Collection::Accounts).await.unwrap()
        };

        let reopened = open_store(&dir).await;
        assert_eq!(reopened.get_all(Collection::Accounts).await.unwrap(), before);
        assert!(reopened.get(Collection::Accounts, "1200").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreadable_files_start_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("waren.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("konten.json"), "{\"number\": \"1000\"}").unwrap();
        std::fs::write(dir.path().join("users.json"), "").unwrap();

        let store = open_store(&dir).await;
        assert_eq!(store.count(Collection::Goods).await.unwrap(), 0);
        assert_eq!(store.count(Collection::Accounts).await.unwrap(), 0);
        assert_eq!(store.count(Collection::Users).await.unwrap(), 0);

        store.add(Collection::Goods, Record::from(json!({"id": "a"}))).await.unwrap();
        assert_eq!(read_file(&dir, Collection::Goods).as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_denied_access_keeps_records_in_memory() {
        let dir = TempDir::new().unwrap();
        let store = LocalDirectoryStore::new(DeniedDirectory);
        store.init().await.unwrap();

        store.add(Collection::Users, Record::from(json!({"email": "a@x.com"}))).await.unwrap();
        assert_eq!(store.count(Collection::Users).await.unwrap(), 1);
        store.persist(Collection::Users).await.unwrap();
        assert_eq!(store.directory().await, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_denied_access_is_not_retried() {
        let requests = Arc::new(AtomicUsize::new(0));
        let store = LocalDirectoryStore::new(CountingDenial(requests.clone()));
        store.init().await.unwrap();
        store.init().await.unwrap();
        store.add(Collection::Goods, Record::new()).await.unwrap();
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_reinit_keeps_records() {
        let requests = Arc::new(AtomicUsize::new(0));
        let store = LocalDirectoryStore::new(CountingDenial(requests.clone()));
        store.init().await.unwrap();
        store.add(Collection::Goods, Record::from(json!({"name": "Schraube"}))).await.unwrap();
        store.init().await.unwrap();

        assert_eq!(store.count(Collection::Goods).await.unwrap(), 1);
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_granted_reinit_reloads_from_disk() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.add(Collection::Goods, Record::new()).await.unwrap();
        std::fs::write(dir.path().join(Collection::Goods.file_name()), "[]").unwrap();
        store.init().await.unwrap();

        assert_eq!(store.count(Collection::Goods).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_are_all_persisted() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&dir).await);

        let tasks: Vec<_> = (0..50)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.add(Collection::Goods, Record::from(json!({"n": n}))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.count(Collection::Goods).await.unwrap(), 50);
        assert_eq!(read_file(&dir, Collection::Goods).as_array().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_write_failure_is_returned() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let path = dir.path().join(Collection::Goods.file_name());
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = store.add(Collection::Goods, Record::new()).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_keys_stay_unique() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let mut keys = Vec::new();
        for n in 0..20 {
            let key = store
                .add(Collection::InventoryMovements, Record::from(json!({"qty": n})))
                .await
                .unwrap()
                .unwrap();
            keys.push(key);
        }
        store.delete(Collection::InventoryMovements, &keys[3]).await.unwrap();
        let mut moved = store.get(Collection::InventoryMovements, &keys[4]).await.unwrap().unwrap();
        moved.insert("qty", 99);
        store.put(Collection::InventoryMovements, moved).await.unwrap();

        let all = store.get_all(Collection::InventoryMovements).await.unwrap();
        let mut seen: Vec<String> = all.iter().filter_map(Record::id).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), all.len());
        assert_eq!(all.len(), 19);
    }
}
