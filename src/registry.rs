//! Secure File Vault - Content Registry
//!
//! Process-lifetime store of ingested content items, shared by every
//! consumer. Append-only from the ingestion path; items are immutable
//! after creation and leave only through explicit deletion.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::classify::Category;

/// Opaque reference to the underlying byte source.
///
/// Owned by the external storage subsystem; the core passes it to the
/// byte-source reader but never interprets or copies the bytes behind it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceHandle(pub String);

impl SourceHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One ingested file's metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique ID
    pub id: Uuid,
    /// Display name, including extension; not unique
    pub name: String,
    /// Byte source reference, absent for sources without one
    pub source: Option<SourceHandle>,
    /// Size in bytes, unknown for sources that do not report it
    pub size_bytes: Option<u64>,
    /// Free-form MIME/extension hint from the picker
    pub hint: Option<String>,
    /// Assigned category (always a member of the closed set)
    pub category: Category,
    /// Ingestion timestamp
    pub ingested_at: DateTime<Utc>,
}

impl ContentItem {
    /// Build an item at ingestion time. Classification is performed here
    /// so an item can never exist without a category.
    pub fn new(
        name: impl Into<String>,
        source: Option<SourceHandle>,
        size_bytes: Option<u64>,
        hint: Option<String>,
    ) -> Self {
        let name = name.into();
        let category = Category::classify(&name);
        Self {
            id: Uuid::new_v4(),
            name,
            source,
            size_bytes,
            hint,
            category,
            ingested_at: Utc::now(),
        }
    }

    /// Relative-time label for list rows ("Just now", "2 hours ago").
    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        let elapsed = now - self.ingested_at;
        let minutes = elapsed.num_minutes();
        if minutes < 1 {
            "Just now".into()
        } else if minutes < 60 {
            format!("{minutes} min ago")
        } else if elapsed.num_hours() < 24 {
            format!("{} hours ago", elapsed.num_hours())
        } else {
            format!("{} days ago", elapsed.num_days())
        }
    }
}

struct RegistryInner {
    /// Newest-first; insertion order defines "recent files" display order
    items: Vec<ContentItem>,
    /// Projection of `items` - kept in lockstep under the same lock
    counts: HashMap<Category, usize>,
}

/// Content Registry - shared, read-mostly store of ingested items.
///
/// One writer path (ingestion), many readers. The category-count
/// projection is updated under the same lock as the item list, so a
/// reader never observes one without the other. Every mutation bumps a
/// revision observable through [`ContentRegistry::subscribe`].
pub struct ContentRegistry {
    inner: RwLock<RegistryInner>,
    revision: watch::Sender<u64>,
}

impl ContentRegistry {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            inner: RwLock::new(RegistryInner {
                items: Vec::new(),
                counts: HashMap::new(),
            }),
            revision,
        })
    }

    /// Insert at the front. Never rejects, never deduplicates by name.
    pub fn append(&self, item: ContentItem) {
        {
            let mut inner = self.inner.write();
            *inner.counts.entry(item.category).or_insert(0) += 1;
            inner.items.insert(0, item);
        }
        self.bump();
    }

    /// Snapshot of all items, most recently ingested first.
    pub fn list(&self) -> Vec<ContentItem> {
        self.inner.read().items.clone()
    }

    /// Snapshot filtered to one category, order preserved.
    pub fn list_by_category(&self, category: Category) -> Vec<ContentItem> {
        self.inner
            .read()
            .items
            .iter()
            .filter(|item| item.category == category)
            .cloned()
            .collect()
    }

    /// Per-category totals. Always equal to a live recount of `list()`.
    pub fn category_counts(&self) -> HashMap<Category, usize> {
        let inner = self.inner.read();
        Category::ALL
            .iter()
            .map(|&cat| (cat, inner.counts.get(&cat).copied().unwrap_or(0)))
            .collect()
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// Look up one item by id.
    pub fn get(&self, id: &Uuid) -> Option<ContentItem> {
        self.inner
            .read()
            .items
            .iter()
            .find(|item| &item.id == id)
            .cloned()
    }

    /// Explicit deletion - the only removal path. Returns the removed
    /// item, or `None` if the id is unknown.
    pub fn remove(&self, id: &Uuid) -> Option<ContentItem> {
        let item = {
            let mut inner = self.inner.write();
            let pos = inner.items.iter().position(|item| &item.id == id)?;
            let item = inner.items.remove(pos);
            if let Some(count) = inner.counts.get_mut(&item.category) {
                *count = count.saturating_sub(1);
            }
            item
        };
        self.bump();
        Some(item)
    }

    /// Subscribe to registry changes. The receiver carries a
    /// monotonically increasing revision; listing screens re-read on
    /// every change notification.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
