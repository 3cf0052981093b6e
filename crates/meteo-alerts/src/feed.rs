//! Bounded, persisted list of recent city notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alert::Severity;
use crate::monitor::{CityNotification, NotificationKind};
use crate::prefs::{load_json, save_json, PreferenceStore, PrefsError, PrefsResult};

pub const DEFAULT_CAPACITY: usize = 10;
pub const FEED_KEY: &str = "weatherNotifications";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    /// Milliseconds since the epoch at insertion, unique within a feed
    pub id: u64,
    pub city_name: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Newest-first notification list.
///
/// A feed opened with [`NotificationFeed::load`] writes itself back to the
/// store after every change.
pub struct NotificationFeed {
    entries: Vec<FeedEntry>,
    capacity: usize,
    store: Option<Arc<dyn PreferenceStore>>,
}

impl std::fmt::Debug for NotificationFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationFeed")
            .field("entries", &self.entries)
            .field("capacity", &self.capacity)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationFeed {
    /// In-memory feed.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            store: None,
        }
    }

    /// Feed backed by `store`. Unreadable stored data starts an empty feed.
    pub fn load(store: Arc<dyn PreferenceStore>, capacity: usize) -> PrefsResult<Self> {
        let mut entries: Vec<FeedEntry> = match load_json(store.as_ref(), FEED_KEY) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(PrefsError::Serde(e)) => {
                tracing::warn!("Discarding unreadable notification feed: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let capacity = capacity.max(1);
        entries.truncate(capacity);
        tracing::debug!("Loaded {} feed entries", entries.len());

        Ok(Self {
            entries,
            capacity,
            store: Some(store),
        })
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, notification: CityNotification) -> PrefsResult<u64> {
        self.push_at(notification, Utc::now())
    }

    /// Insert at the front, dropping the oldest entries beyond capacity.
    pub fn push_at(&mut self, notification: CityNotification, now: DateTime<Utc>) -> PrefsResult<u64> {
        let mut id = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        while self.entries.iter().any(|e| e.id == id) {
            id += 1;
        }

        self.entries.insert(
            0,
            FeedEntry {
                id,
                city_name: notification.city_name,
                kind: notification.kind,
                message: notification.message,
                severity: notification.severity,
                timestamp: now,
            },
        );
        self.entries.truncate(self.capacity);
        self.persist()?;
        Ok(id)
    }

    pub fn remove(&mut self, id: u64) -> PrefsResult<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> PrefsResult<()> {
        self.entries.clear();
        self.persist()
    }

    /// Write the feed to its store. An empty feed removes the stored key.
    pub fn save(&self) -> PrefsResult<()> {
        self.persist()
    }

    fn persist(&self) -> PrefsResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if self.entries.is_empty() {
            store.remove(FEED_KEY)
        } else {
            save_json(store.as_ref(), FEED_KEY, &self.entries)
        }
    }
}

/// Human readable age of a notification.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();
    if minutes < 1 {
        return "только что".to_string();
    }
    if minutes < 60 {
        return format!("{} мин назад", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} ч назад", hours);
    }
    timestamp.format("%-d.%m.%Y").to_string()
}
