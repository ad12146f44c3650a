//! Durable key-value session storage
//!
//! Holds the signed-in user and enough of the editing session (template,
//! values, mode) to restore it after an interruption.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::template::FormTemplate;
use crate::types::{EditMode, FieldValues, Result};

pub const USER_KEY: &str = "user";
pub const TEMPLATE_KEY: &str = "prevUploadForm";
pub const VALUES_KEY: &str = "prevUploadFormData";
pub const MODE_KEY: &str = "uploadMode";

/// String key-value storage shared by the session and the uploader
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

// =============================================================================
// Stores
// =============================================================================

/// In-memory store; contents are lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store, starting empty when the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        log::debug!("Opened session store {}", path.display());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Typed Access
// =============================================================================

/// The signed-in user as returned by the login endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserRecord {
    /// Bearer token, if the record carries a usable one
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

pub async fn load_json<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: SessionStore,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: SessionStore,
    T: Serialize + Sync,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await
}

pub async fn load_user<S: SessionStore>(store: &S) -> Result<Option<UserRecord>> {
    load_json(store, USER_KEY).await
}

pub async fn save_user<S: SessionStore>(store: &S, user: &UserRecord) -> Result<()> {
    save_json(store, USER_KEY, user).await
}

pub async fn clear_user<S: SessionStore>(store: &S) -> Result<()> {
    store.remove(USER_KEY).await
}

/// Bearer token of the stored user
pub async fn current_token<S: SessionStore>(store: &S) -> Result<Option<String>> {
    Ok(load_user(store)
        .await?
        .and_then(|user| user.bearer_token().map(str::to_string)))
}

/// Persist the template and values of the editing session
pub async fn save_session<S: SessionStore>(
    store: &S,
    template: &FormTemplate,
    values: &FieldValues,
) -> Result<()> {
    save_json(store, TEMPLATE_KEY, template).await?;
    save_json(store, VALUES_KEY, values).await
}

/// Stored template with its values; values default to empty when missing
pub async fn load_session<S: SessionStore>(
    store: &S,
) -> Result<Option<(FormTemplate, FieldValues)>> {
    let Some(template) = load_json::<_, FormTemplate>(store, TEMPLATE_KEY).await? else {
        return Ok(None);
    };
    let values = load_json::<_, FieldValues>(store, VALUES_KEY)
        .await?
        .unwrap_or_default();
    Ok(Some((template, values)))
}

pub async fn save_mode<S: SessionStore>(store: &S, mode: EditMode) -> Result<()> {
    store.set(MODE_KEY, mode.as_str().to_string()).await
}

pub async fn load_mode<S: SessionStore>(store: &S) -> Result<Option<EditMode>> {
    Ok(store.get(MODE_KEY).await?.and_then(|raw| match raw.as_str() {
        "single" => Some(EditMode::Single),
        "multi" => Some(EditMode::Batch),
        other => {
            log::warn!("Ignoring unknown stored upload mode '{}'", other);
            None
        }
    }))
}
