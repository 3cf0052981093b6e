//! Background checks for the user's favorite cities.
//!
//! Each poll compares a city's fresh snapshot with the one remembered from
//! the previous poll and produces feed notifications. Condition-based
//! notifications (strong wind, storm, snow, rain) fire on every poll while
//! the condition lasts; change-based ones need a previous snapshot.

use chrono::{DateTime, Utc};
use meteo_weather::CurrentWeather;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::alert::Severity;
use crate::metric::format_fixed;
use crate::prefs::{FavoriteCity, Favorites, NotificationSettings};

pub const CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);

const DANGER_WIND: f64 = 25.0;
const LARGE_TEMP_SWING: f64 = 10.0;
const STORM_CODES: i32 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Temperature,
    Wind,
    Rain,
    Snow,
    Storm,
}

impl NotificationKind {
    fn enabled_in(&self, settings: &NotificationSettings) -> bool {
        settings.enabled
            && match self {
                Self::Temperature => settings.temperature,
                Self::Wind => settings.wind,
                Self::Rain => settings.rain,
                Self::Snow => settings.snow,
                Self::Storm => settings.storm,
            }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityNotification {
    pub city_name: String,
    pub kind: NotificationKind,
    pub message: String,
    pub severity: Severity,
}

/// What the monitor remembers about a city between polls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CitySnapshot {
    pub temp: f64,
    pub wind_speed: f64,
    pub weather_code: i32,
    pub humidity: u8,
    pub last_checked: DateTime<Utc>,
}

impl CitySnapshot {
    pub fn from_weather(weather: &CurrentWeather, checked_at: DateTime<Utc>) -> Self {
        Self {
            temp: weather.temperature,
            wind_speed: weather.wind_speed,
            weather_code: weather.weather_code,
            humidity: weather.humidity,
            last_checked: checked_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CityMonitor {
    snapshots: HashMap<String, CitySnapshot>,
}

impl CityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `snapshot` with the last one seen for `city` and remember it.
    pub fn check(
        &mut self,
        city: &FavoriteCity,
        snapshot: CitySnapshot,
        settings: &NotificationSettings,
    ) -> Vec<CityNotification> {
        let key = city.key();
        let previous = self.snapshots.insert(key, snapshot);

        let notifications: Vec<CityNotification> =
            analyze(&city.name, previous.as_ref(), &snapshot, settings)
                .into_iter()
                .filter(|n| n.kind.enabled_in(settings))
                .collect();

        if !notifications.is_empty() {
            tracing::debug!("{}: {} notification(s)", city.name, notifications.len());
        }
        notifications
    }

    pub fn last_snapshot(&self, city: &FavoriteCity) -> Option<&CitySnapshot> {
        self.snapshots.get(&city.key())
    }

    /// Drop memory of cities that are no longer favorites.
    pub fn retain_favorites(&mut self, favorites: &Favorites) {
        self.snapshots
            .retain(|key, _| favorites.iter().any(|city| &city.key() == key));
    }
}

fn analyze(
    city_name: &str,
    previous: Option<&CitySnapshot>,
    current: &CitySnapshot,
    settings: &NotificationSettings,
) -> Vec<CityNotification> {
    let wind_threshold = f64::from(settings.wind_threshold);
    let temp_threshold = f64::from(settings.temp_threshold);
    let note = |kind, message: String, severity| CityNotification {
        city_name: city_name.to_string(),
        kind,
        message,
        severity,
    };

    let mut out = Vec::new();

    if current.wind_speed >= wind_threshold {
        let severity = if current.wind_speed >= DANGER_WIND {
            Severity::Danger
        } else {
            Severity::Warning
        };
        out.push(note(
            NotificationKind::Wind,
            format!("Сильный ветер {} км/ч", current.wind_speed),
            severity,
        ));
    }

    match current.weather_code {
        code if code >= STORM_CODES => out.push(note(
            NotificationKind::Storm,
            "Гроза и молнии в районе".to_string(),
            Severity::Danger,
        )),
        71..=77 => out.push(note(
            NotificationKind::Snow,
            "Снегопад".to_string(),
            Severity::Warning,
        )),
        61..=67 => out.push(note(
            NotificationKind::Rain,
            "Дождь".to_string(),
            Severity::Info,
        )),
        _ => {}
    }

    if let Some(previous) = previous {
        let diff = (current.temp - previous.temp).abs();
        if diff >= temp_threshold {
            let direction = if current.temp > previous.temp {
                "повысилась"
            } else {
                "понизилась"
            };
            let severity = if diff >= LARGE_TEMP_SWING {
                Severity::Warning
            } else {
                Severity::Info
            };
            out.push(note(
                NotificationKind::Temperature,
                format!("Температура {} на {}°C", direction, format_fixed(diff, 1)),
                severity,
            ));
        }

        if previous.wind_speed < wind_threshold && current.wind_speed >= wind_threshold {
            out.push(note(
                NotificationKind::Wind,
                format!("Усиление ветра до {} км/ч", current.wind_speed),
                Severity::Warning,
            ));
        }
    }

    out
}
