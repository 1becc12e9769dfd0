//! Storage backend for the snippet vault
//!
//! Everything persists through the [`KvStore`] seam: a synchronous string
//! key-value contract matching the single-origin storage the vault was built
//! for. [`MemoryKvStore`] backs tests, [`JsonFileStore`] persists the whole
//! namespace as one JSON map on disk. [`ContentStore`] is the typed accessor
//! the maintenance engine and the account layer work against.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::constants::{
    CONTENT_KEY_PREFIX, CURRENT_USER_KEY, MAX_CONTENT_LENGTH, MAX_ITEMS_PER_USER, USERS_KEY,
};

/// Synchronous string key-value store
///
/// The whole vault is thin glue over this contract. Implementations must be
/// safe to share across the concurrently running maintenance checks.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory store for tests and ephemeral use
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

/// File-backed store persisting the namespace as a single JSON map
///
/// Reads are served from an in-memory cache; every write rewrites the file.
/// Good enough for a store capped at a thousand short snippets per user.
pub struct JsonFileStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store, loading any existing map from disk
    pub fn open(path: PathBuf) -> Result<Self> {
        let cache = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read store file {path:?}"))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse store file {path:?}"))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    fn persist(&self, cache: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(cache).context("failed to serialize store map")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write store file {:?}", self.path))?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.write();
        cache.insert(key.to_string(), value.to_string());
        self.persist(&cache)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.write();
        cache.remove(key);
        self.persist(&cache)
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.cache.read().keys().cloned().collect())
    }
}

/// One stored user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(rename = "passwordHash")]
    pub password_hash: String,
}

/// One stored snippet
///
/// Serde-untagged so sequences written before timestamps existed (bare JSON
/// strings) still decode. New items are always written timestamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentItem {
    Timestamped {
        content: String,
        timestamp: DateTime<Utc>,
    },
    Text(String),
}

impl ContentItem {
    pub fn text(&self) -> &str {
        match self {
            Self::Timestamped { content, .. } => content,
            Self::Text(content) => content,
        }
    }

    /// Creation time, if the item carries one
    ///
    /// Legacy bare-string items return `None` and are exempt from expiry.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamped { timestamp, .. } => Some(*timestamp),
            Self::Text(_) => None,
        }
    }
}

/// Typed accessor over the key-value store
///
/// Owns the layout of the namespace: the user table, per-user content
/// sequences, the session pointer, and the maintenance scalars.
#[derive(Clone)]
pub struct ContentStore {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl ContentStore {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Raw access to the underlying store (used by the performance sweep
    /// and the usage probe, which operate on whole entries)
    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn content_key(username: &str) -> String {
        format!("{CONTENT_KEY_PREFIX}{username}")
    }

    // ------------------------------------------------------------------
    // User table
    // ------------------------------------------------------------------

    /// Load the full user table (empty when none has been written yet)
    pub fn users(&self) -> Result<HashMap<String, UserRecord>> {
        match self.kv.get(USERS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).context("failed to parse user table"),
            None => Ok(HashMap::new()),
        }
    }

    /// Upsert one user record
    pub fn save_user(&self, username: &str, password_hash: &str) -> Result<()> {
        let mut users = self.users()?;
        users.insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        self.replace_users(&users)
    }

    /// Rewrite the user table wholesale (restore path)
    pub fn replace_users(&self, users: &HashMap<String, UserRecord>) -> Result<()> {
        let raw = serde_json::to_string(users).context("failed to serialize user table")?;
        self.kv.set(USERS_KEY, &raw)
    }

    // ------------------------------------------------------------------
    // Content sequences
    // ------------------------------------------------------------------

    /// Load a user's snippet sequence (empty when none exists)
    ///
    /// Errors when the stored value does not decode to a sequence; the
    /// validity check relies on that.
    pub fn load_content(&self, username: &str) -> Result<Vec<ContentItem>> {
        match self.kv.get(&Self::content_key(username))? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("content for '{username}' is not a snippet sequence")),
            None => Ok(Vec::new()),
        }
    }

    /// Store a new snippet for a user
    ///
    /// Blank input and exact duplicates are skipped (returns `false`).
    /// Content is truncated to [`MAX_CONTENT_LENGTH`] characters, stamped
    /// with the current time, prepended, and the sequence capped at
    /// [`MAX_ITEMS_PER_USER`].
    pub fn append(&self, username: &str, content: &str) -> Result<bool> {
        if content.trim().is_empty() {
            return Ok(false);
        }

        let content: String = if content.chars().count() > MAX_CONTENT_LENGTH {
            content.chars().take(MAX_CONTENT_LENGTH).collect()
        } else {
            content.to_string()
        };

        let mut items = self.load_content(username)?;
        if items.iter().any(|item| item.text() == content) {
            return Ok(false);
        }

        items.insert(
            0,
            ContentItem::Timestamped {
                content,
                timestamp: self.clock.now(),
            },
        );
        items.truncate(MAX_ITEMS_PER_USER);

        self.replace_content(username, &items)?;
        Ok(true)
    }

    /// Rewrite a user's sequence wholesale (maintenance and restore paths)
    pub fn replace_content(&self, username: &str, items: &[ContentItem]) -> Result<()> {
        let raw = serde_json::to_string(items)
            .with_context(|| format!("failed to serialize content for '{username}'"))?;
        self.kv.set(&Self::content_key(username), &raw)
    }

    /// Delete one snippet by position
    pub fn delete_content(&self, username: &str, index: usize) -> Result<()> {
        let mut items = self.load_content(username)?;
        if index >= items.len() {
            return Err(anyhow!(
                "snippet index {index} out of range for '{username}' ({} items)",
                items.len()
            ));
        }
        items.remove(index);
        self.replace_content(username, &items)
    }

    /// Remove a user's entire sequence
    pub fn clear_content(&self, username: &str) -> Result<()> {
        self.kv.remove(&Self::content_key(username))
    }

    /// Usernames that currently have a stored sequence
    pub fn content_usernames(&self) -> Result<Vec<String>> {
        Ok(self
            .kv
            .keys()?
            .into_iter()
            .filter_map(|key| {
                key.strip_prefix(CONTENT_KEY_PREFIX)
                    .map(|name| name.to_string())
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Session pointer
    // ------------------------------------------------------------------

    pub fn current_user(&self) -> Result<Option<UserRecord>> {
        match self.kv.get(CURRENT_USER_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .context("failed to parse current user record")
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn set_current_user(&self, user: Option<&UserRecord>) -> Result<()> {
        match user {
            Some(user) => {
                let raw =
                    serde_json::to_string(user).context("failed to serialize current user")?;
                self.kv.set(CURRENT_USER_KEY, &raw)
            }
            None => self.kv.remove(CURRENT_USER_KEY),
        }
    }

    // ------------------------------------------------------------------
    // Maintenance scalars
    // ------------------------------------------------------------------

    pub fn scalar(&self, key: &str) -> Result<Option<String>> {
        self.kv.get(key)
    }

    pub fn set_scalar(&self, key: &str, value: &str) -> Result<()> {
        self.kv.set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn test_store() -> ContentStore {
        ContentStore::new(
            Arc::new(MemoryKvStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    #[test]
    fn test_content_item_legacy_and_timestamped_decode() {
        let raw = r#"["plain snippet", {"content": "stamped", "timestamp": "2024-01-01T00:00:00Z"}]"#;
        let items: Vec<ContentItem> = serde_json::from_str(raw).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text(), "plain snippet");
        assert!(items[0].timestamp().is_none());
        assert_eq!(items[1].text(), "stamped");
        assert!(items[1].timestamp().is_some());
    }

    #[test]
    fn test_append_prepends_and_stamps() {
        let store = test_store();
        assert!(store.append("alice", "first").unwrap());
        assert!(store.append("alice", "second").unwrap());

        let items = store.load_content("alice").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text(), "second");
        assert_eq!(items[1].text(), "first");
        assert!(items[0].timestamp().is_some());
    }

    #[test]
    fn test_append_skips_blank_and_duplicate() {
        let store = test_store();
        assert!(!store.append("alice", "   \t").unwrap());
        assert!(store.append("alice", "snippet").unwrap());
        assert!(!store.append("alice", "snippet").unwrap());
        assert_eq!(store.load_content("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_append_truncates_long_content() {
        let store = test_store();
        let long = "x".repeat(MAX_CONTENT_LENGTH + 50);
        assert!(store.append("alice", &long).unwrap());

        let items = store.load_content("alice").unwrap();
        assert_eq!(items[0].text().chars().count(), MAX_CONTENT_LENGTH);
    }

    #[test]
    fn test_delete_content_out_of_range() {
        let store = test_store();
        store.append("alice", "only").unwrap();
        assert!(store.delete_content("alice", 1).is_err());
        assert!(store.delete_content("alice", 0).is_ok());
        assert!(store.load_content("alice").unwrap().is_empty());
    }

    #[test]
    fn test_user_table_upsert() {
        let store = test_store();
        store.save_user("alice", "hash-a").unwrap();
        store.save_user("alice", "hash-b").unwrap();

        let users = store.users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users["alice"].password_hash, "hash-b");
    }

    #[test]
    fn test_content_usernames_filters_prefix() {
        let store = test_store();
        store.append("alice", "a").unwrap();
        store.append("bob", "b").unwrap();
        store.save_user("carol", "hash").unwrap(); // no content key

        let mut names = store.content_usernames().unwrap();
        names.sort();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_load_content_rejects_non_sequence() {
        let store = test_store();
        store
            .kv()
            .set(&ContentStore::content_key("alice"), r#"{"not": "a list"}"#)
            .unwrap();
        assert!(store.load_content("alice").is_err());
    }
}
