//! Where alerts go once the analyzer has emitted them.
//!
//! A sink decides whether it may notify at all (`request_permission`) and
//! how to present a notification (`show`). The analyzer never checks
//! permission itself.

use parking_lot::Mutex;

use crate::alert::Alert;

/// Presentation hints passed along with every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Notifications with the same tag replace each other
    pub tag: String,
    pub require_interaction: bool,
    /// Vibration pattern in milliseconds (on, off, on, ...)
    pub vibrate: Vec<u32>,
    pub icon: Option<String>,
}

impl NotifyOptions {
    /// Options used for analyzer alerts: tagged by metric, sticky, short buzz.
    pub fn for_alert(alert: &Alert) -> Self {
        Self {
            tag: alert.key.to_string(),
            require_interaction: true,
            vibrate: vec![200, 100, 200],
            icon: None,
        }
    }
}

pub trait NotificationSink: Send + Sync {
    /// Whether notifications may be shown. Sinks may prompt the user here.
    fn request_permission(&self) -> bool;

    fn show(&self, title: &str, body: &str, options: &NotifyOptions);
}

/// Forward alerts to a sink. Returns how many were shown.
pub fn dispatch(sink: &dyn NotificationSink, alerts: &[Alert]) -> usize {
    if alerts.is_empty() {
        return 0;
    }
    if !sink.request_permission() {
        tracing::debug!("Notification permission not granted, dropping {} alert(s)", alerts.len());
        return 0;
    }

    for alert in alerts {
        sink.show(&alert.title, &alert.body, &NotifyOptions::for_alert(alert));
    }
    alerts.len()
}

/// Headless sink: every notification becomes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn request_permission(&self) -> bool {
        true
    }

    fn show(&self, title: &str, body: &str, options: &NotifyOptions) {
        tracing::info!(tag = %options.tag, "{} {}", title, body);
    }
}

/// A notification captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownNotification {
    pub title: String,
    pub body: String,
    pub options: NotifyOptions,
}

/// Keeps shown notifications in memory.
#[derive(Debug)]
pub struct MemorySink {
    granted: bool,
    shown: Mutex<Vec<ShownNotification>>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MemorySink {
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<ShownNotification> {
        self.shown.lock().clone()
    }

    pub fn clear(&self) {
        self.shown.lock().clear();
    }
}

impl NotificationSink for MemorySink {
    fn request_permission(&self) -> bool {
        self.granted
    }

    fn show(&self, title: &str, body: &str, options: &NotifyOptions) {
        self.shown.lock().push(ShownNotification {
            title: title.to_string(),
            body: body.to_string(),
            options: options.clone(),
        });
    }
}
