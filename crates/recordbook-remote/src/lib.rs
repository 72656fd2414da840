//! Storage backend that forwards every operation to a record server over
//! HTTP. Nothing is cached locally and transport failures are returned to the
//! caller unchanged.

use async_trait::async_trait;
use recordbook_core::{Collection, KeyMap, Record, RecordStore, StoreError};
use reqwest::{Client, Response, Url};

pub struct RemoteHttpStore {
    client: Client,
    base_url: Url,
    keys: KeyMap,
}

impl RemoteHttpStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url).map_err(|e| StoreError::Other(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Other(format!("invalid base URL: {}", base_url)));
        }
        Ok(Self {
            client,
            base_url,
            keys: KeyMap::default(),
        })
    }

    pub fn with_keys(mut self, keys: KeyMap) -> Self {
        self.keys = keys;
        self
    }

    fn endpoint(&self, collection: Collection, key: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // checked in with_client
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("api").push(collection.as_str());
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), %url, "Record server rejected request");
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RecordStore for RemoteHttpStore {
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn add(&self, collection: Collection, record: Record) -> Result<Option<String>, StoreError> {
        let response = self
            .client
            .post(self.endpoint(collection, None))
            .json(&record)
            .send()
            .await
            .map_err(transport)?;
        let stored: Record = check(response).await?.json().await.map_err(transport)?;
        let key = self.keys.key_of(collection, &stored);
        tracing::debug!(%collection, key = ?key, "Record added remotely");
        Ok(key)
    }

    async fn put(&self, collection: Collection, record: Record) -> Result<Option<String>, StoreError> {
        let Some(key) = self.keys.key_of(collection, &record) else {
            tracing::debug!(%collection, "Record without key, nothing to replace");
            return Ok(None);
        };
        let response = self
            .client
            .put(self.endpoint(collection, Some(&key)))
            .json(&record)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(Some(key))
    }

    // Point lookups fetch the whole collection.
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self
            .get_all(collection)
            .await?
            .into_iter()
            .find(|r| self.keys.matches(collection, r, key)))
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, StoreError> {
        let response = self
            .client
            .get(self.endpoint(collection, None))
            .send()
            .await
            .map_err(transport)?;
        check(response).await?.json().await.map_err(transport)
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.endpoint(collection, Some(key)))
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        Ok(self.get_all(collection).await?.len())
    }
}
