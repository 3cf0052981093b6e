//! One polling pass over the user's favorite cities.

use chrono::{DateTime, Utc};
use meteo_alerts::{
    dispatch, informer, watch, ChangeAnalyzer, CityMonitor, CitySnapshot, FavoriteCity, Favorites,
    NotificationFeed, NotificationSettings, NotificationSink, PreferenceStore, TransitionWatcher,
    WatchSnapshot,
};
use meteo_core::{AlertsConfig, AppError};
use meteo_weather::WeatherSource;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Counts from a single [`Poller::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub checked: usize,
    pub failed: usize,
    pub alerts_shown: usize,
    pub feed_added: usize,
}

pub struct Poller {
    source: Arc<dyn WeatherSource>,
    store: Arc<dyn PreferenceStore>,
    sink: Arc<dyn NotificationSink>,
    cooldown: Duration,
    analyzers: HashMap<String, ChangeAnalyzer>,
    monitor: CityMonitor,
    watcher: TransitionWatcher,
    /// Key of the favorite the watcher is following.
    on_screen: Option<String>,
    feed: NotificationFeed,
}

impl Poller {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: Arc<dyn PreferenceStore>,
        sink: Arc<dyn NotificationSink>,
        alerts: &AlertsConfig,
    ) -> Result<Self, AppError> {
        let feed = NotificationFeed::load(store.clone(), alerts.feed_capacity)?;
        Ok(Self {
            source,
            store,
            sink,
            cooldown: alerts.cooldown(),
            analyzers: HashMap::new(),
            monitor: CityMonitor::new(),
            watcher: TransitionWatcher::new(),
            on_screen: None,
            feed,
        })
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    /// Fetch every favorite once and route what changed.
    ///
    /// Settings and favorites are re-read from the store on every tick. The
    /// first favorite is the location shown on screen and also feeds the
    /// transition watcher, which starts over whenever that city changes.
    /// While notifications are disabled readings only move the analyzer
    /// baselines.
    pub async fn tick(&mut self) -> Result<TickSummary, AppError> {
        let settings = NotificationSettings::load(self.store.as_ref())?;
        let favorites = Favorites::load(self.store.as_ref())?;
        self.forget_removed(&favorites);

        let first = favorites.iter().next().map(FavoriteCity::key);
        if first != self.on_screen {
            tracing::debug!("On-screen city changed to {:?}", first);
            self.watcher = TransitionWatcher::new();
            self.on_screen = first;
        }

        let mut summary = TickSummary::default();
        if favorites.is_empty() {
            tracing::info!("No favorite cities to check");
            return Ok(summary);
        }

        for (index, city) in favorites.iter().enumerate() {
            match self.check_city(city, &settings, index == 0, Utc::now()).await {
                Ok((shown, added)) => {
                    summary.checked += 1;
                    summary.alerts_shown += shown;
                    summary.feed_added += added;
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!("Failed to check weather for {}: {} ({})", city.name, e.user_message(), e);
                }
            }
        }

        tracing::info!(
            "Checked {} cities ({} failed): {} alerts shown, {} feed entries added",
            summary.checked,
            summary.failed,
            summary.alerts_shown,
            summary.feed_added
        );
        Ok(summary)
    }

    async fn check_city(
        &mut self,
        city: &FavoriteCity,
        settings: &NotificationSettings,
        on_screen: bool,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize), AppError> {
        let weather = self.source.current(&city.location()).await?;

        let cooldown = self.cooldown;
        let analyzer = self
            .analyzers
            .entry(city.key())
            .or_insert_with(|| ChangeAnalyzer::with_cooldown(cooldown));

        let mut alerts = Vec::new();
        for reading in informer::readings(&weather) {
            if settings.enabled {
                alerts.extend(analyzer.record_as(
                    reading.category,
                    reading.label,
                    &reading.display_value,
                    &reading.description,
                    now,
                ));
            } else {
                analyzer.rebaseline(reading.label, &reading.display_value);
            }
        }

        let transitions = if on_screen {
            self.watcher
                .observe(WatchSnapshot::from_weather(&weather, city.name.clone()))
        } else {
            Vec::new()
        };

        let mut shown = 0;
        if settings.enabled {
            shown += dispatch(self.sink.as_ref(), &alerts);
            shown += watch::notify(self.sink.as_ref(), &transitions);
        } else if !transitions.is_empty() {
            tracing::debug!("Notifications disabled, dropping transitions for {}", city.name);
        }

        let notes = self
            .monitor
            .check(city, CitySnapshot::from_weather(&weather, now), settings);
        let added = notes.len();
        for note in notes {
            self.feed.push_at(note, now)?;
        }

        Ok((shown, added))
    }

    fn forget_removed(&mut self, favorites: &Favorites) {
        self.analyzers
            .retain(|key, _| favorites.iter().any(|city| &city.key() == key));
        self.monitor.retain_favorites(favorites);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use meteo_alerts::{MemorySink, MemoryStore};
    use meteo_weather::{CurrentWeather, Location, WeatherCondition, WeatherError};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Serves queued snapshots in order, then fails.
    struct ScriptedSource {
        queue: Mutex<VecDeque<CurrentWeather>>,
    }

    impl ScriptedSource {
        fn new(items: Vec<CurrentWeather>) -> Self {
            Self {
                queue: Mutex::new(items.into()),
            }
        }
    }

    #[async_trait]
    impl WeatherSource for ScriptedSource {
        async fn current(&self, _location: &Location) -> Result<CurrentWeather, WeatherError> {
            self.queue.lock().pop_front().ok_or_else(|| WeatherError::Status {
                status: 503,
                message: "no more data".to_string(),
            })
        }
    }

    fn weather(temp: f64, wind: f64, code: i32) -> CurrentWeather {
        CurrentWeather {
            temperature: temp,
            feels_like: temp,
            humidity: 55,
            wind_speed: wind,
            pressure_hpa: 1000.0,
            precipitation_mm: 0.0,
            weather_code: code,
            condition: WeatherCondition::from_wmo_code(code),
            updated_at: Utc::now(),
        }
    }

    fn setup(items: Vec<CurrentWeather>) -> (Poller, Arc<MemorySink>, Arc<dyn PreferenceStore>) {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
        let mut favorites = Favorites::default();
        favorites.add(FavoriteCity::new("Москва", 55.75, 37.62));
        favorites.save(store.as_ref()).unwrap();

        let sink = Arc::new(MemorySink::default());
        let poller = Poller::new(
            Arc::new(ScriptedSource::new(items)),
            store.clone(),
            sink.clone(),
            &AlertsConfig::default(),
        )
        .unwrap();
        (poller, sink, store)
    }

    #[tokio::test]
    async fn first_tick_is_baseline_then_changes_alert() {
        let (mut poller, sink, _store) = setup(vec![weather(10.0, 5.0, 0), weather(2.0, 5.0, 0)]);

        let first = poller.tick().await.unwrap();
        assert_eq!(first.checked, 1);
        assert_eq!(first.alerts_shown, 0);
        assert!(sink.shown().is_empty());

        let second = poller.tick().await.unwrap();
        let titles: Vec<String> = sink.shown().into_iter().map(|n| n.title).collect();
        assert!(titles.contains(&"🥶 Резкое похолодание!".to_string()));
        assert!(titles.contains(&"🌡️ Резкое изменение температуры".to_string()));
        assert_eq!(second.alerts_shown, titles.len());

        assert_eq!(second.feed_added, 1);
        assert_eq!(poller.feed().entries()[0].message, "Температура понизилась на 8.0°C");
    }

    #[tokio::test]
    async fn disabled_settings_suppress_everything_shown() {
        let (mut poller, sink, store) = setup(vec![weather(10.0, 5.0, 0), weather(2.0, 30.0, 95)]);
        NotificationSettings {
            enabled: false,
            ..NotificationSettings::default()
        }
        .save(store.as_ref())
        .unwrap();

        poller.tick().await.unwrap();
        let summary = poller.tick().await.unwrap();
        assert_eq!(summary.alerts_shown, 0);
        assert_eq!(summary.feed_added, 0);
        assert!(sink.shown().is_empty());
    }

    #[tokio::test]
    async fn re_enabling_alerts_from_latest_baseline() {
        let (mut poller, sink, store) = setup(vec![
            weather(10.0, 5.0, 0),
            weather(2.0, 5.0, 0),
            weather(-6.0, 5.0, 0),
        ]);
        NotificationSettings {
            enabled: false,
            ..NotificationSettings::default()
        }
        .save(store.as_ref())
        .unwrap();
        poller.tick().await.unwrap();
        poller.tick().await.unwrap();
        assert!(sink.shown().is_empty());

        NotificationSettings::default().save(store.as_ref()).unwrap();
        let summary = poller.tick().await.unwrap();
        assert!(summary.alerts_shown > 0);
        let shown = sink.shown();
        assert!(shown.iter().any(|n| n.title == "🥶 Резкое похолодание!"
            && n.body == "Температура упала на 8.0°C. Сейчас: -6°C"));
    }

    #[tokio::test]
    async fn watcher_follows_new_first_favorite() {
        let (mut poller, sink, store) = setup(vec![
            weather(-10.0, 5.0, 0),
            weather(20.0, 5.0, 95),
            weather(26.0, 5.0, 95),
        ]);
        poller.tick().await.unwrap();

        let mut favorites = Favorites::load(store.as_ref()).unwrap();
        let moscow = favorites.iter().next().map(FavoriteCity::key).unwrap();
        favorites.add(FavoriteCity::new("Сочи", 43.5855, 39.7231));
        favorites.remove(&moscow);
        favorites.save(store.as_ref()).unwrap();

        // Сочи is a fresh baseline, not a jump from Москва's reading.
        let summary = poller.tick().await.unwrap();
        assert_eq!(summary.alerts_shown, 0);
        assert!(sink.shown().is_empty());

        poller.tick().await.unwrap();
        let shown = sink.shown();
        assert!(shown.iter().any(|n| n.title == "🌡️ Резкое изменение температуры"
            && n.body.contains("в Сочи")));
        assert!(!shown.iter().any(|n| n.title == "⚡ Гроза"));
    }

    #[tokio::test]
    async fn fetch_failure_is_counted_not_fatal() {
        let (mut poller, _sink, _store) = setup(Vec::new());
        let summary = poller.tick().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.checked, 0);
    }

    #[tokio::test]
    async fn feed_is_persisted_after_push() {
        let (mut poller, _sink, store) = setup(vec![weather(0.0, 20.0, 0)]);
        poller.tick().await.unwrap();

        let reloaded = NotificationFeed::load(store, 10).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.entries()[0].message, "Сильный ветер 20 км/ч");
    }
}
