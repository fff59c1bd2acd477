//! Collaborator contracts: document database, authentication and object storage.
//!
//! The feed and the services only talk to these traits. `memory` provides in-process
//! implementations, `redis_store` a document store on top of RedisJSON.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{errors::StoreError, types::CurrentUser};

pub use memory::{MemoryAuth, MemoryObjectStorage, MemoryStore};
pub use redis_store::RedisStore;

/// Field map of a single document.
pub type Document = Map<String, Value>;

/// A document returned from a collection read, with its id (last path segment).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// Document database collaborator.
///
/// Paths come from [`crate::keys`]. Reads of a collection only return its direct children,
/// never documents of nested subcollections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Every document directly inside `collection`, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;

    /// Replaces the document at `path`, creating it when absent.
    async fn set(&self, path: &str, document: Document) -> Result<(), StoreError>;

    /// Merges `fields` into the document at `path`, creating it when absent.
    async fn merge(&self, path: &str, fields: Document) -> Result<(), StoreError>;

    /// Merges `fields` into an existing document; fails with [`StoreError::Missing`] otherwise.
    async fn update(&self, path: &str, fields: Document) -> Result<(), StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.get(path).await?.is_some())
    }

    /// Documents in `collection` whose `field` equals `value`.
    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<StoredDocument>, StoreError> {
        let documents = self.list(collection).await?;
        Ok(documents
            .into_iter()
            .filter(|document| document.data.get(field) == Some(value))
            .collect())
    }
}

/// Authentication collaborator.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in viewer, if any.
    fn current_user(&self) -> Option<CurrentUser>;

    async fn sign_in(&self, email: &str, password: &str) -> crate::Result<CurrentUser>;

    async fn create_account(&self, email: &str, password: &str) -> crate::Result<CurrentUser>;

    async fn sign_out(&self) -> crate::Result<()>;

    /// Deletes the signed-in account and ends the session.
    async fn delete_account(&self) -> crate::Result<()>;

    async fn send_password_reset(&self, email: &str) -> crate::Result<()>;
}

/// Object storage collaborator for uploaded media.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL of the object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StoreError>;
}

/// Serializes a model into a document.
pub fn encode<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::unavailable(format!(
            "expected an object document, got {}",
            kind_of(&other)
        ))),
    }
}

/// Deserializes a document into a model.
pub fn decode<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Builds a document from literal field pairs.
pub fn fields<I, K>(pairs: I) -> Document
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(key, value)| (key.into(), value)).collect()
}

/// Marker document for existence records (likes, blocks, follows).
pub fn marker() -> Document {
    Document::new()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
