//! Transition notifications for the location currently on screen.

use meteo_weather::CurrentWeather;

use crate::metric::format_fixed;
use crate::sink::{NotificationSink, NotifyOptions};

const TEMP_JUMP: f64 = 5.0;
const WIND_JUMP: f64 = 10.0;
const THUNDERSTORM: &str = "гроз";
const SNOW: &str = "снег";

#[derive(Debug, Clone, PartialEq)]
pub struct WatchSnapshot {
    pub temp: f64,
    pub wind_speed: f64,
    pub condition: String,
    pub location: String,
}

impl WatchSnapshot {
    pub fn from_weather(weather: &CurrentWeather, location: impl Into<String>) -> Self {
        Self {
            temp: weather.temperature,
            wind_speed: weather.wind_speed,
            condition: weather.condition.description().to_string(),
            location: location.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionWatcher {
    previous: Option<WatchSnapshot>,
}

impl TransitionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report what changed since the last snapshot. The first call only
    /// sets the baseline.
    pub fn observe(&mut self, current: WatchSnapshot) -> Vec<Transition> {
        let transitions = match &self.previous {
            Some(previous) => diff(previous, &current),
            None => Vec::new(),
        };
        self.previous = Some(current);
        transitions
    }

    pub fn previous(&self) -> Option<&WatchSnapshot> {
        self.previous.as_ref()
    }
}

fn diff(previous: &WatchSnapshot, current: &WatchSnapshot) -> Vec<Transition> {
    let mut out = Vec::new();
    let location = &current.location;

    let temp_diff = (current.temp - previous.temp).abs();
    if temp_diff >= TEMP_JUMP {
        out.push(Transition {
            title: "🌡️ Резкое изменение температуры".to_string(),
            body: format!(
                "Температура изменилась на {}°C в {}. Сейчас {}°C",
                format_fixed(temp_diff, 1),
                location,
                current.temp
            ),
        });
    }

    if (current.wind_speed - previous.wind_speed).abs() >= WIND_JUMP {
        out.push(Transition {
            title: "💨 Сильный ветер".to_string(),
            body: format!(
                "Скорость ветра увеличилась до {} км/ч в {}",
                current.wind_speed, location
            ),
        });
    }

    if began(previous, current, THUNDERSTORM) {
        out.push(Transition {
            title: "⚡ Гроза".to_string(),
            body: format!("Внимание! Началась гроза в {}", location),
        });
    }

    if began(previous, current, SNOW) {
        out.push(Transition {
            title: "❄️ Снегопад".to_string(),
            body: format!("Начался снегопад в {}", location),
        });
    }

    out
}

fn began(previous: &WatchSnapshot, current: &WatchSnapshot, marker: &str) -> bool {
    current.condition.to_lowercase().contains(marker)
        && !previous.condition.to_lowercase().contains(marker)
}

/// Options for transition notifications: one shared tag, not sticky.
pub fn transition_options() -> NotifyOptions {
    NotifyOptions {
        tag: "weather-alert".to_string(),
        require_interaction: false,
        vibrate: Vec::new(),
        icon: Some("/favicon.ico".to_string()),
    }
}

/// Show transitions through `sink` if it grants permission.
pub fn notify(sink: &dyn NotificationSink, transitions: &[Transition]) -> usize {
    if transitions.is_empty() || !sink.request_permission() {
        return 0;
    }
    let options = transition_options();
    for t in transitions {
        sink.show(&t.title, &t.body, &options);
    }
    transitions.len()
}
