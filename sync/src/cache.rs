//! Durable reaction cache.
//!
//! Mirrors the last-known reaction of every entity into a key/value store
//! that survives reloads, so a reaction control can paint before the server
//! answers. Two plain-string entries per entity:
//!
//! - `{prefix}:reaction:{entity}` holds the reaction kind, empty when none
//! - `{prefix}:reaction_count:{entity}` holds the decimal count
//!
//! There is no schema version; values that fail to parse read as a miss.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use memeshare_shared::{EntityRef, ReactionSummary};

use crate::Result;

pub const TRACING_TARGET: &str = "memeshare_sync::cache";

/// Synchronous string key/value capability, e.g. browser `localStorage`.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-process store for tests and hosts without persistent storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Typed view of the reaction entries in a [`KeyValueStore`].
///
/// Writes are best effort: a failing store is logged and otherwise ignored,
/// since the server remains the source of truth.
#[derive(Clone)]
pub struct ReactionCache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl std::fmt::Debug for ReactionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ReactionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn kind_key(&self, entity: EntityRef) -> String {
        format!("{}:reaction:{}", self.prefix, entity)
    }

    fn count_key(&self, entity: EntityRef) -> String {
        format!("{}:reaction_count:{}", self.prefix, entity)
    }

    /// Last-known reaction of `entity`, or `None` when nothing usable is cached.
    pub fn load(&self, entity: EntityRef) -> Option<ReactionSummary> {
        let count = self.store.get_item(&self.count_key(entity))?;
        let Ok(count) = count.trim().parse::<u64>() else {
            tracing::debug!(
                target: TRACING_TARGET,
                entity = %entity,
                value = %count,
                "Ignoring unparsable cached count"
            );
            return None;
        };

        let kind = self
            .store
            .get_item(&self.kind_key(entity))
            .filter(|kind| !kind.is_empty());

        Some(ReactionSummary {
            has_reacted: kind.is_some(),
            reaction_kind: kind,
            count,
        })
    }

    pub fn store(&self, entity: EntityRef, summary: &ReactionSummary) {
        let kind = if summary.has_reacted {
            summary.reaction_kind.as_deref().unwrap_or_default()
        } else {
            ""
        };

        let result = self
            .store
            .set_item(&self.kind_key(entity), kind)
            .and_then(|_| {
                self.store
                    .set_item(&self.count_key(entity), &summary.count.to_string())
            });

        if let Err(error) = result {
            tracing::warn!(
                target: TRACING_TARGET,
                entity = %entity,
                error = %error,
                "Failed to write reaction cache"
            );
        }
    }

    pub fn clear(&self, entity: EntityRef) {
        let result = self
            .store
            .remove_item(&self.kind_key(entity))
            .and_then(|_| self.store.remove_item(&self.count_key(entity)));

        if let Err(error) = result {
            tracing::warn!(
                target: TRACING_TARGET,
                entity = %entity,
                error = %error,
                "Failed to clear reaction cache"
            );
        }
    }
}
