use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metric::MetricKey;
use crate::rules::RuleId;

/// How loudly a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

impl Severity {
    /// Badge text shown next to a notification
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "Инфо",
            Self::Warning => "Внимание",
            Self::Danger => "Опасно",
        }
    }
}

/// An alert emitted by the change analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub key: MetricKey,
    pub rule: RuleId,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}
