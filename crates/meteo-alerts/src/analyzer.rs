//! Weather change analyzer.
//!
//! Turns successive textual readings of a metric into alerts. Per metric key
//! the analyzer moves from unseen to baselined on the first valid reading and
//! then stays in the alerted/quiet loop for the rest of the session. A
//! per-key cooldown keeps the same metric from notifying more than once per
//! window.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::alert::Alert;
use crate::metric::{MetricCategory, MetricKey, MetricReading};
use crate::rules::{self, Change};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);

/// Memory of one analyzer: last value and last alert time per metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerState {
    pub previous: HashMap<MetricKey, f64>,
    pub last_alert: HashMap<MetricKey, DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ChangeAnalyzer {
    state: AnalyzerState,
    cooldown: Duration,
}

impl Default for ChangeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeAnalyzer {
    pub fn new() -> Self {
        Self::with_cooldown(DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            state: AnalyzerState::default(),
            cooldown,
        }
    }

    /// Resume from previously captured state.
    pub fn from_state(state: AnalyzerState, cooldown: Duration) -> Self {
        Self { state, cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn state(&self) -> &AnalyzerState {
        &self.state
    }

    pub fn into_state(self) -> AnalyzerState {
        self.state
    }

    pub fn previous_value(&self, label: &str) -> Option<f64> {
        self.state.previous.get(&MetricKey::new(label)).copied()
    }

    pub fn last_alert_at(&self, label: &str) -> Option<DateTime<Utc>> {
        self.state.last_alert.get(&MetricKey::new(label)).copied()
    }

    /// Forget every baseline and cooldown.
    pub fn reset(&mut self) {
        self.state = AnalyzerState::default();
    }

    /// Record a reading at the current time, deriving the category from the label.
    pub fn record(&mut self, label: &str, display_value: &str, description: &str) -> Vec<Alert> {
        self.record_at(label, display_value, description, Utc::now())
    }

    pub fn record_at(
        &mut self,
        label: &str,
        display_value: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let key = MetricKey::new(label);
        let category = MetricCategory::from_key(&key);
        self.record_key(category, key, display_value, description, now)
    }

    /// Record a reading whose category the caller already knows.
    pub fn record_as(
        &mut self,
        category: MetricCategory,
        label: &str,
        display_value: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        self.record_key(category, MetricKey::new(label), display_value, description, now)
    }

    /// Move the baseline for `label` to a new reading without evaluating
    /// rules or touching the cooldown. Returns false for unparseable input.
    pub fn rebaseline(&mut self, label: &str, display_value: &str) -> bool {
        match MetricReading::parse(MetricKey::new(label), display_value) {
            Some(reading) => {
                self.state.previous.insert(reading.key, reading.value);
                true
            }
            None => false,
        }
    }

    fn record_key(
        &mut self,
        category: MetricCategory,
        key: MetricKey,
        display_value: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let Some(reading) = MetricReading::parse(key, display_value) else {
            tracing::trace!("Ignoring non-numeric reading {:?}", display_value);
            return Vec::new();
        };

        let Some(previous) = self.state.previous.get(&reading.key).copied() else {
            tracing::debug!("Baseline for {}: {}", reading.key, reading.value);
            self.state.previous.insert(reading.key, reading.value);
            return Vec::new();
        };

        let change = Change::new(previous, reading.value);
        let fired = rules::evaluate(category, &change);

        let mut alerts = Vec::new();
        if !fired.is_empty() {
            if self.in_cooldown(&reading.key, now) {
                tracing::debug!(
                    "Suppressed {} alert(s) for {} ({}): cooldown active",
                    fired.len(),
                    reading.key,
                    description
                );
            } else {
                for rule in fired {
                    let (title, body) = rule.render(&change, &reading.display_value);
                    tracing::info!("Alert {:?} for {}: {}", rule.id, reading.key, title);
                    alerts.push(Alert {
                        key: reading.key.clone(),
                        rule: rule.id,
                        severity: rule.severity,
                        title,
                        body,
                        timestamp: now,
                    });
                }
                self.state.last_alert.insert(reading.key.clone(), now);
            }
        }

        self.state.previous.insert(reading.key, reading.value);
        alerts
    }

    fn in_cooldown(&self, key: &MetricKey, now: DateTime<Utc>) -> bool {
        match self.state.last_alert.get(key) {
            // A clock that went backwards counts as still cooling down.
            Some(last) => (now - *last)
                .to_std()
                .map(|elapsed| elapsed < self.cooldown)
                .unwrap_or(true),
            None => false,
        }
    }
}

/// An analyzer shared between tasks.
///
/// Each `record` runs its read-modify-write under one lock, so two readings
/// for the same key never interleave.
#[derive(Debug, Clone, Default)]
pub struct SharedAnalyzer {
    inner: Arc<Mutex<ChangeAnalyzer>>,
}

impl SharedAnalyzer {
    pub fn new(analyzer: ChangeAnalyzer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(analyzer)),
        }
    }

    pub fn record(&self, label: &str, display_value: &str, description: &str) -> Vec<Alert> {
        self.inner.lock().record(label, display_value, description)
    }

    pub fn record_at(
        &self,
        label: &str,
        display_value: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        self.inner.lock().record_at(label, display_value, description, now)
    }

    pub fn snapshot(&self) -> AnalyzerState {
        self.inner.lock().state().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleId;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> chrono::Duration {
        chrono::Duration::minutes(m)
    }

    #[test]
    fn first_reading_is_baseline_only() {
        let mut analyzer = ChangeAnalyzer::new();
        let alerts = analyzer.record_at("Температура", "-30°C", "Ясно", t0());
        assert!(alerts.is_empty());
        assert_eq!(analyzer.previous_value("температура"), Some(-30.0));
        assert_eq!(analyzer.last_alert_at("температура"), None);
    }

    #[test]
    fn identical_reading_never_alerts() {
        let mut analyzer = ChangeAnalyzer::new();
        let readings = [
            ("Температура", "12°C"),
            ("Ветер", "5 км/ч"),
            ("Влажность", "55%"),
            ("Давление", "750 мм"),
            ("Осадки", "0.5 мм"),
        ];
        for (label, value) in readings {
            assert!(analyzer.record_at(label, value, "", t0()).is_empty());
            assert!(analyzer.record_at(label, value, "", t0() + minutes(1)).is_empty());
        }
    }

    #[test]
    fn unparseable_input_leaves_state_untouched() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Давление", "750 мм", "", t0());
        let before = analyzer.state().clone();

        let alerts = analyzer.record_at("Давление", "загрузка…", "", t0() + minutes(5));
        assert!(alerts.is_empty());
        assert_eq!(analyzer.state(), &before);

        let alerts = analyzer.record_at("Влажность", "—", "", t0());
        assert!(alerts.is_empty());
        assert_eq!(analyzer.previous_value("влажность"), None);
    }

    #[test]
    fn multi_rule_firing_in_table_order() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Температура", "10°C", "", t0());
        let alerts = analyzer.record_at("Температура", "-25°C", "Снег", t0() + minutes(30));

        let rules: Vec<RuleId> = alerts.iter().map(|a| a.rule).collect();
        assert_eq!(rules, vec![RuleId::ColdSnap, RuleId::ExtremeCold]);
        assert_eq!(alerts[0].body, "Температура упала на 35.0°C. Сейчас: -25°C");
        assert_eq!(alerts[1].title, "⚠️ Экстремальный холод!");
        assert!(alerts.iter().all(|a| a.key.as_str() == "температура"));
        assert_eq!(analyzer.last_alert_at("Температура"), Some(t0() + minutes(30)));
    }

    #[test]
    fn percent_guard_for_zero_previous() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Ветер", "0 км/ч", "", t0());
        let alerts = analyzer.record_at("Ветер", "20 км/ч", "", t0() + minutes(1));

        let rules: Vec<RuleId> = alerts.iter().map(|a| a.rule).collect();
        assert_eq!(rules, vec![RuleId::StrongWind]);
    }

    #[test]
    fn cooldown_suppresses_but_still_tracks_value() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Ветер", "5 км/ч", "", t0());

        let first = analyzer.record_at("Ветер", "16 км/ч", "", t0() + minutes(1));
        assert!(!first.is_empty());

        let suppressed = analyzer.record_at("Ветер", "30 км/ч", "", t0() + minutes(20));
        assert!(suppressed.is_empty());
        assert_eq!(analyzer.previous_value("Ветер"), Some(30.0));
        assert_eq!(analyzer.last_alert_at("Ветер"), Some(t0() + minutes(1)));

        let after = analyzer.record_at("Ветер", "31 км/ч", "", t0() + minutes(31));
        let rules: Vec<RuleId> = after.iter().map(|a| a.rule).collect();
        assert_eq!(rules, vec![RuleId::StrongWind]);
        assert_eq!(analyzer.last_alert_at("Ветер"), Some(t0() + minutes(31)));
    }

    #[test]
    fn cooldown_boundary_is_inclusive_of_window_end() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Влажность", "50%", "", t0());
        assert_eq!(analyzer.record_at("Влажность", "95%", "", t0()).len(), 1);
        assert!(analyzer
            .record_at("Влажность", "96%", "", t0() + minutes(30) - chrono::Duration::seconds(1))
            .is_empty());
        assert_eq!(
            analyzer.record_at("Влажность", "97%", "", t0() + minutes(30)).len(),
            1
        );
    }

    #[test]
    fn categories_are_independent() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Температура", "20°C", "", t0());
        analyzer.record_at("Ветер", "3 км/ч", "", t0());

        let temp = analyzer.record_at("Температура", "10°C", "", t0() + minutes(1));
        assert_eq!(temp.len(), 1);

        let wind = analyzer.record_at("Ветер", "18 км/ч", "", t0() + minutes(2));
        assert_eq!(wind.len(), 2);
        assert_eq!(analyzer.previous_value("Температура"), Some(10.0));
        assert_eq!(analyzer.previous_value("Ветер"), Some(18.0));
    }

    #[test]
    fn unknown_category_tracks_value_without_alerting() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("УФ-индекс", "1", "", t0());
        let alerts = analyzer.record_at("УФ-индекс", "11", "", t0() + minutes(1));
        assert!(alerts.is_empty());
        assert_eq!(analyzer.previous_value("УФ-индекс"), Some(11.0));
    }

    #[test]
    fn explicit_category_bypasses_label_matching() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_as(MetricCategory::Wind, "gusts", "2", "", t0());
        let alerts = analyzer.record_as(MetricCategory::Wind, "gusts", "22", "", t0() + minutes(1));
        assert_eq!(alerts[0].rule, RuleId::StrongWind);
    }

    #[test]
    fn clock_going_backwards_keeps_cooldown() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Осадки", "0 мм", "", t0());
        assert_eq!(analyzer.record_at("Осадки", "12 мм", "", t0()).len(), 1);
        assert!(analyzer
            .record_at("Осадки", "15 мм", "", t0() - minutes(60))
            .is_empty());
    }

    #[test]
    fn shared_analyzer_records_under_lock() {
        let shared = SharedAnalyzer::new(ChangeAnalyzer::with_cooldown(Duration::from_secs(60)));
        let other = shared.clone();

        shared.record_at("Давление", "750 мм", "", t0());
        let alerts = other.record_at("Давление", "742 мм", "", t0() + minutes(1));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule, RuleId::PressureSwing);

        let state = shared.snapshot();
        assert_eq!(state.previous.get(&MetricKey::new("давление")), Some(&742.0));
    }

    #[test]
    fn state_roundtrips_through_from_state() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Температура", "1°C", "", t0());
        let resumed = ChangeAnalyzer::from_state(analyzer.into_state(), DEFAULT_COOLDOWN);
        assert_eq!(resumed.previous_value("температура"), Some(1.0));
    }

    #[test]
    fn rebaseline_moves_value_without_alerting() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Температура", "10°C", "", t0());

        assert!(analyzer.rebaseline("Температура", "2°C"));
        assert_eq!(analyzer.previous_value("температура"), Some(2.0));
        assert_eq!(analyzer.last_alert_at("температура"), None);
        assert!(!analyzer.rebaseline("Температура", "—"));

        // The next drop is measured from the new baseline and is not in cooldown.
        let alerts = analyzer.record_at("Температура", "-6°C", "", t0() + minutes(1));
        let rules: Vec<RuleId> = alerts.iter().map(|a| a.rule).collect();
        assert_eq!(rules, vec![RuleId::ColdSnap]);
        assert_eq!(alerts[0].body, "Температура упала на 8.0°C. Сейчас: -6°C");
    }

    #[test]
    fn reset_forgets_baselines() {
        let mut analyzer = ChangeAnalyzer::new();
        analyzer.record_at("Температура", "1°C", "", t0());
        analyzer.reset();
        assert!(analyzer
            .record_at("Температура", "-30°C", "", t0() + minutes(1))
            .is_empty());
    }
}
