//! String-keyed preference storage and the typed settings kept in it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SETTINGS_KEY: &str = "weatherNotificationSettings";
pub const FAVORITES_KEY: &str = "favorites";

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("Preference file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference data is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type PrefsResult<T> = Result<T, PrefsError>;

/// Persistent key/value store for small pieces of user state.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> PrefsResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PrefsResult<()>;

    fn remove(&self, key: &str) -> PrefsResult<()>;
}

/// All preferences in one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> PrefsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened preference store at {:?} ({} keys)", path, entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// `prefs.json` inside the given configuration directory.
    pub fn in_dir<P: AsRef<Path>>(config_dir: P) -> PrefsResult<Self> {
        Self::open(config_dir.as_ref().join("prefs.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> PrefsResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> PrefsResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PrefsResult<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> PrefsResult<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> PrefsResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PrefsResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PrefsResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Read a JSON value stored under `key`.
pub fn load_json<T: serde::de::DeserializeOwned>(
    store: &dyn PreferenceStore,
    key: &str,
) -> PrefsResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(store: &dyn PreferenceStore, key: &str, value: &T) -> PrefsResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Which notification kinds the user wants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub temperature: bool,
    pub wind: bool,
    pub storm: bool,
    pub snow: bool,
    pub rain: bool,
    /// °C, adjustable 1..=10 in the settings dialog
    pub temp_threshold: u8,
    /// km/h, adjustable 5..=30 in the settings dialog
    pub wind_threshold: u8,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature: true,
            wind: true,
            storm: true,
            snow: true,
            rain: true,
            temp_threshold: 5,
            wind_threshold: 15,
        }
    }
}

impl NotificationSettings {
    /// Stored settings, or defaults when none are stored or they fail to parse.
    pub fn load(store: &dyn PreferenceStore) -> PrefsResult<Self> {
        match load_json(store, SETTINGS_KEY) {
            Ok(settings) => Ok(settings.unwrap_or_default()),
            Err(PrefsError::Serde(e)) => {
                tracing::warn!("Ignoring unreadable notification settings: {}", e);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, store: &dyn PreferenceStore) -> PrefsResult<()> {
        save_json(store, SETTINGS_KEY, self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl FavoriteCity {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    /// Identity of a city across polls.
    pub fn key(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }

    pub fn location(&self) -> meteo_weather::Location {
        meteo_weather::Location::named(self.name.clone(), self.lat, self.lon)
    }
}

/// The user's favorite cities, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites(Vec<FavoriteCity>);

impl Favorites {
    pub fn load(store: &dyn PreferenceStore) -> PrefsResult<Self> {
        Ok(load_json(store, FAVORITES_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, store: &dyn PreferenceStore) -> PrefsResult<()> {
        save_json(store, FAVORITES_KEY, self)
    }

    /// Add a city unless one with the same coordinates is already present.
    pub fn add(&mut self, city: FavoriteCity) -> bool {
        if self.0.iter().any(|c| c.key() == city.key()) {
            return false;
        }
        self.0.push(city);
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c.key() != key);
        self.0.len() != before
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FavoriteCity> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
