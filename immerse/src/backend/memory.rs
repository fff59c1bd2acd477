//! In-process collaborators used by tests, demos and offline runs.
//!
//! Each one can be told to fail requests whose path contains a given fragment, which is how
//! the rollback and fail-open paths are exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuthProvider, Document, DocumentStore, ObjectStorage, StoredDocument};
use crate::errors::{ImmerseError, StoreError};
use crate::types::CurrentUser;

#[derive(Debug, Default)]
struct Faults {
    reads: Vec<String>,
    lists: Vec<String>,
    writes: Vec<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Document store backed by an ordered map of path → document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Document>>,
    faults: Mutex<Faults>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every read whose path contains `fragment`.
    pub fn fail_reads(&self, fragment: impl Into<String>) {
        lock(&self.faults).reads.push(fragment.into());
    }

    /// Fails collection listings whose path contains `fragment`; single-document reads still succeed.
    pub fn fail_lists(&self, fragment: impl Into<String>) {
        lock(&self.faults).lists.push(fragment.into());
    }

    /// Fails every write whose path contains `fragment`.
    pub fn fail_writes(&self, fragment: impl Into<String>) {
        lock(&self.faults).writes.push(fragment.into());
    }

    pub fn clear_faults(&self) {
        let mut faults = lock(&self.faults);
        faults.reads.clear();
        faults.lists.clear();
        faults.writes.clear();
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every stored path, in order. Useful for asserting on mirror records.
    pub async fn paths(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }

    fn check_read(&self, path: &str) -> Result<(), StoreError> {
        if lock(&self.faults).reads.iter().any(|fragment| path.contains(fragment.as_str())) {
            return Err(StoreError::unavailable(format!("injected read failure at {path}")));
        }
        Ok(())
    }

    fn check_write(&self, path: &str) -> Result<(), StoreError> {
        if lock(&self.faults).writes.iter().any(|fragment| path.contains(fragment.as_str())) {
            return Err(StoreError::unavailable(format!("injected write failure at {path}")));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        self.check_read(path)?;
        Ok(self.documents.read().await.get(path).cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        self.check_read(collection)?;
        if lock(&self.faults).lists.iter().any(|fragment| collection.contains(fragment.as_str())) {
            return Err(StoreError::unavailable(format!("injected list failure at {collection}")));
        }
        let prefix = format!("{collection}/");
        let documents = self.documents.read().await;
        Ok(documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, data)| {
                let id = &path[prefix.len()..];
                (!id.is_empty() && !id.contains('/')).then(|| StoredDocument {
                    id: id.to_string(),
                    data: data.clone(),
                })
            })
            .collect())
    }

    async fn set(&self, path: &str, document: Document) -> Result<(), StoreError> {
        self.check_write(path)?;
        self.documents.write().await.insert(path.to_string(), document);
        self.record_write();
        Ok(())
    }

    async fn merge(&self, path: &str, fields: Document) -> Result<(), StoreError> {
        self.check_write(path)?;
        self.documents
            .write()
            .await
            .entry(path.to_string())
            .or_default()
            .extend(fields);
        self.record_write();
        Ok(())
    }

    async fn update(&self, path: &str, fields: Document) -> Result<(), StoreError> {
        self.check_write(path)?;
        let mut documents = self.documents.write().await;
        let document = documents.get_mut(path).ok_or_else(|| StoreError::Missing {
            path: path.to_string(),
        })?;
        document.extend(fields);
        self.record_write();
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.check_write(path)?;
        self.documents.write().await.remove(path);
        self.record_write();
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password: String,
}

#[derive(Debug, Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    current: Option<CurrentUser>,
    reset_requests: Vec<String>,
    next_uid: usize,
}

/// Email/password accounts held in memory.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    state: Mutex<AuthState>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that already reports `uid` as the signed-in viewer.
    pub fn signed_in(uid: impl Into<String>) -> Self {
        let auth = Self::new();
        lock(&auth.state).current = Some(CurrentUser::new(uid));
        auth
    }

    /// Switches the signed-in viewer without going through credentials.
    pub fn set_current(&self, viewer: Option<CurrentUser>) {
        lock(&self.state).current = viewer;
    }

    /// Emails that asked for a password reset.
    pub fn reset_requests(&self) -> Vec<String> {
        lock(&self.state).reset_requests.clone()
    }
}

fn auth_error(message: &'static str) -> ImmerseError {
    ImmerseError::Auth {
        message: message.into(),
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<CurrentUser> {
        lock(&self.state).current.clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> crate::Result<CurrentUser> {
        let mut state = lock(&self.state);
        let account = state
            .accounts
            .get(&email.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| auth_error("user not found"))?;
        if account.password != password {
            return Err(auth_error("wrong password"));
        }
        let viewer = CurrentUser {
            id: account.uid,
            email: Some(email.to_string()),
        };
        state.current = Some(viewer.clone());
        Ok(viewer)
    }

    async fn create_account(&self, email: &str, password: &str) -> crate::Result<CurrentUser> {
        let mut state = lock(&self.state);
        let key = email.to_ascii_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(auth_error("email already in use"));
        }
        state.next_uid += 1;
        let uid = format!("uid{:04}", state.next_uid);
        state.accounts.insert(
            key,
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        let viewer = CurrentUser {
            id: uid,
            email: Some(email.to_string()),
        };
        state.current = Some(viewer.clone());
        Ok(viewer)
    }

    async fn sign_out(&self) -> crate::Result<()> {
        lock(&self.state).current = None;
        Ok(())
    }

    async fn delete_account(&self) -> crate::Result<()> {
        let mut state = lock(&self.state);
        let viewer = state.current.take().ok_or_else(|| auth_error("no signed-in account"))?;
        state.accounts.retain(|_, account| account.uid != viewer.id);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> crate::Result<()> {
        let mut state = lock(&self.state);
        if !state.accounts.contains_key(&email.to_ascii_lowercase()) {
            return Err(auth_error("user not found"));
        }
        state.reset_requests.push(email.to_string());
        Ok(())
    }
}

/// Object storage that keeps blobs in memory and serves them under a base URL.
#[derive(Debug)]
pub struct MemoryObjectStorage {
    base_url: String,
    objects: Mutex<BTreeMap<String, (String, Vec<u8>)>>,
    failing: Mutex<bool>,
}

impl MemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        lock(&self.objects).get(key).map(|(content_type, _)| content_type.clone())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StoreError> {
        if *lock(&self.failing) {
            return Err(StoreError::unavailable(format!("injected upload failure for {key}")));
        }
        lock(&self.objects).insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(format!("{}/{key}", self.base_url))
    }
}
