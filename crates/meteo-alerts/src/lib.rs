//! Weather change alerts for Meteo
//!
//! The change analyzer watches labelled metric readings and emits alerts when
//! a reading moves sharply or crosses a danger threshold. Around it sit the
//! favorites monitor, the transition watcher for the viewed location, the
//! notification feed and the preference store that persists user state.

pub mod alert;
pub mod analyzer;
pub mod feed;
pub mod informer;
pub mod metric;
pub mod monitor;
pub mod prefs;
pub mod rules;
pub mod sink;
pub mod watch;

pub use alert::{Alert, Severity};
pub use analyzer::{AnalyzerState, ChangeAnalyzer, SharedAnalyzer, DEFAULT_COOLDOWN};
pub use feed::{relative_time, FeedEntry, NotificationFeed};
pub use informer::{readings, InformerReading};
pub use metric::{MetricCategory, MetricKey, MetricReading};
pub use monitor::{CityMonitor, CityNotification, CitySnapshot, NotificationKind};
pub use prefs::{
    FavoriteCity, Favorites, JsonFileStore, MemoryStore, NotificationSettings, PreferenceStore,
    PrefsError,
};
pub use rules::RuleId;
pub use sink::{dispatch, LogSink, MemorySink, NotificationSink, NotifyOptions};
pub use watch::{TransitionWatcher, WatchSnapshot};
