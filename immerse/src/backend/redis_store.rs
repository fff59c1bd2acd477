use async_trait::async_trait;
use redis::{aio::ConnectionManager, cmd};
use serde_json::Value;

use super::{Document, DocumentStore, StoredDocument};
use crate::errors::StoreError;
use crate::keys::KeyContext;

const SCAN_COUNT: usize = 1000;

/// Document store on top of RedisJSON.
///
/// Every document lives at its own key, `{prefix}:{path}` with `/` replaced by `:`.
/// Collections are not materialized; listing one scans for its direct children.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    /// Opens a managed connection to `url`.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, prefix))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    async fn read_key(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = cmd("JSON.GET").arg(key).query_async(&mut conn).await?;
        match raw {
            Some(json) => match serde_json::from_str::<Value>(&json)? {
                Value::Object(document) => Ok(Some(document)),
                _ => Err(StoreError::unavailable(format!("{key} does not hold a JSON object"))),
            },
            None => Ok(None),
        }
    }

    async fn write_root(&self, command: &str, key: &str, document: &Document) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(document)?;
        let _: () = cmd(command)
            .arg(key)
            .arg("$")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Removes every key under this store's prefix. Intended for test cleanup.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:*", self.prefix);
        let mut cursor: u64 = 0;
        let mut total_deleted: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let deleted: u64 = cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                total_deleted += deleted;
            }
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(total_deleted)
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        self.read_key(&self.keys().document(path)).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let keys = self.keys();
        let pattern = keys.collection_pattern(collection);
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut children: Vec<(String, String)> = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            // Subcollection documents share the pattern; keep direct children only.
            children.extend(batch.iter().filter_map(|key| {
                keys.direct_child(collection, key)
                    .map(|id| (id.to_string(), key.clone()))
            }));
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        children.sort();
        children.dedup();

        let mut documents = Vec::with_capacity(children.len());
        for (id, key) in children {
            // A key can vanish between SCAN and JSON.GET.
            if let Some(data) = self.read_key(&key).await? {
                documents.push(StoredDocument { id, data });
            }
        }
        Ok(documents)
    }

    async fn set(&self, path: &str, document: Document) -> Result<(), StoreError> {
        self.write_root("JSON.SET", &self.keys().document(path), &document).await
    }

    async fn merge(&self, path: &str, fields: Document) -> Result<(), StoreError> {
        self.write_root("JSON.MERGE", &self.keys().document(path), &fields).await
    }

    async fn update(&self, path: &str, fields: Document) -> Result<(), StoreError> {
        let key = self.keys().document(path);
        let mut conn = self.conn.clone();
        let exists: bool = cmd("EXISTS").arg(&key).query_async(&mut conn).await?;
        if !exists {
            return Err(StoreError::Missing {
                path: path.to_string(),
            });
        }
        self.write_root("JSON.MERGE", &key, &fields).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: u64 = cmd("DEL").arg(self.keys().document(path)).query_async(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = cmd("EXISTS")
            .arg(self.keys().document(path))
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }
}
