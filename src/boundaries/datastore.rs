//! DataStore boundary: handle-based storage for binary payloads.
//!
//! Media values travel either inline (`inlineData`) or as an opaque handle
//! into a blob store (`storedData`). Stores may be shared read-only across
//! concurrent runs.

use async_trait::async_trait;
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A media payload carried inline in a value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload, kept as text so values stay plain JSON.
    pub data: String,
}

/// A media payload stored behind an opaque handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredData {
    pub handle: String,
    pub mime_type: String,
}

/// Either form of a media payload, externally tagged the way documents
/// carry it: `{"inlineData": ...}` or `{"storedData": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataPart {
    #[serde(rename = "inlineData")]
    Inline(InlineData),
    #[serde(rename = "storedData")]
    Stored(StoredData),
}

#[derive(Debug, Error, Diagnostic)]
pub enum DataStoreError {
    #[error("no stored data for handle: {handle}")]
    #[diagnostic(code(wireboard::datastore::not_found))]
    NotFound { handle: String },

    #[error("data store backend failed: {message}")]
    #[diagnostic(code(wireboard::datastore::backend))]
    Backend { message: String },
}

/// Opaque handle-based blob storage.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn store(&self, data: InlineData) -> Result<StoredData, DataStoreError>;

    async fn retrieve(&self, handle: &str) -> Result<InlineData, DataStoreError>;
}

/// Volatile store for tests and single-process runs.
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    entries: Mutex<FxHashMap<String, InlineData>>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn store(&self, data: InlineData) -> Result<StoredData, DataStoreError> {
        let handle = Uuid::new_v4().to_string();
        let stored = StoredData {
            handle: handle.clone(),
            mime_type: data.mime_type.clone(),
        };
        self.entries.lock().insert(handle, data);
        Ok(stored)
    }

    async fn retrieve(&self, handle: &str) -> Result<InlineData, DataStoreError> {
        self.entries
            .lock()
            .get(handle)
            .cloned()
            .ok_or_else(|| DataStoreError::NotFound {
                handle: handle.to_string(),
            })
    }
}
