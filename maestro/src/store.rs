//! Namespaced key-value persistence for memory records.
//!
//! Records live under a `(category, user_id)` namespace. Listing preserves
//! insertion order so the coordinator's prompt is stable across turns.

use crate::error::StoreResult;
use crate::id::RecordKey;
use crate::records::MemoryCategory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Scope of a set of records: which category, for which user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Memory category
    pub kind: MemoryCategory,
    /// Owning user
    pub user_id: String,
}

impl Namespace {
    /// Build a namespace for a category and user
    pub fn for_category(kind: MemoryCategory, user_id: impl Into<String>) -> Self {
        Self {
            kind,
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.kind, self.user_id)
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Key within the namespace
    pub key: RecordKey,
    /// Record body
    pub value: Value,
    /// First write
    pub created_at: DateTime<Utc>,
    /// Most recent write
    pub updated_at: DateTime<Utc>,
}

/// Persistence for memory records
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// All records in the namespace, in insertion order
    async fn search(&self, namespace: &Namespace) -> StoreResult<Vec<Item>>;

    /// A single record
    async fn get(&self, namespace: &Namespace, key: &RecordKey) -> StoreResult<Option<Item>>;

    /// Insert or overwrite a record. Overwrites keep the original position.
    async fn put(&self, namespace: &Namespace, key: &RecordKey, value: Value) -> StoreResult<()>;

    /// Remove a record. Missing keys are ignored.
    async fn delete(&self, namespace: &Namespace, key: &RecordKey) -> StoreResult<()>;
}

/// Process-local store backed by a map of vectors. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    namespaces: Arc<RwLock<HashMap<Namespace, Vec<Item>>>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all namespaces
    pub async fn len(&self) -> usize {
        self.namespaces.read().await.values().map(Vec::len).sum()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(&self, namespace: &Namespace) -> StoreResult<Vec<Item>> {
        let guard = self.namespaces.read().await;
        let items = guard.get(namespace).cloned().unwrap_or_default();
        debug!(%namespace, count = items.len(), "search");
        Ok(items)
    }

    async fn get(&self, namespace: &Namespace, key: &RecordKey) -> StoreResult<Option<Item>> {
        let guard = self.namespaces.read().await;
        Ok(guard
            .get(namespace)
            .and_then(|items| items.iter().find(|item| &item.key == key))
            .cloned())
    }

    async fn put(&self, namespace: &Namespace, key: &RecordKey, value: Value) -> StoreResult<()> {
        let now = Utc::now();
        let mut guard = self.namespaces.write().await;
        let items = guard.entry(namespace.clone()).or_default();
        match items.iter_mut().find(|item| &item.key == key) {
            Some(item) => {
                item.value = value;
                item.updated_at = now;
                info!(%namespace, %key, "updated record");
            }
            None => {
                items.push(Item {
                    key: key.clone(),
                    value,
                    created_at: now,
                    updated_at: now,
                });
                info!(%namespace, %key, "inserted record");
            }
        }
        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, key: &RecordKey) -> StoreResult<()> {
        let mut guard = self.namespaces.write().await;
        if let Some(items) = guard.get_mut(namespace) {
            let before = items.len();
            items.retain(|item| &item.key != key);
            if items.len() < before {
                info!(%namespace, %key, "deleted record");
            }
        }
        Ok(())
    }
}
