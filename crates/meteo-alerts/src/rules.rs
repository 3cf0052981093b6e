//! The static alert rule table.
//!
//! Every rule belongs to one metric category and is evaluated independently,
//! so a single reading may fire several rules of its category. The only
//! exception is expressed through [`AlertRule::unless`]: a rule is skipped when
//! one of the listed rules already fired for the same reading.

use serde::{Deserialize, Serialize};

use crate::alert::Severity;
use crate::metric::{format_fixed, MetricCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    ColdSnap,
    WarmSnap,
    ExtremeCold,
    ExtremeHeat,
    StrongWind,
    WindRising,
    VeryHumid,
    VeryDry,
    LowPressure,
    HighPressure,
    PressureSwing,
    HeavyPrecipitation,
}

/// The difference between a reading and the one before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Change {
    pub previous: f64,
    pub value: f64,
    pub delta: f64,
    /// `|delta| / |previous| * 100`; `None` when the previous value is zero.
    pub delta_percent: Option<f64>,
}

impl Change {
    pub fn new(previous: f64, value: f64) -> Self {
        let delta = value - previous;
        let delta_percent = if previous == 0.0 {
            None
        } else {
            Some(delta.abs() / previous.abs() * 100.0)
        };
        Self {
            previous,
            value,
            delta,
            delta_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    DeltaAtMost(f64),
    DeltaAtLeast(f64),
    AbsDeltaAtLeast(f64),
    ValueAtMost(f64),
    ValueAtLeast(f64),
    /// Rise of at least `delta` that is also at least `percent` of the previous value.
    RiseWithPercent { delta: f64, percent: f64 },
}

impl Condition {
    pub fn holds(&self, change: &Change) -> bool {
        match *self {
            Condition::DeltaAtMost(limit) => change.delta <= limit,
            Condition::DeltaAtLeast(limit) => change.delta >= limit,
            Condition::AbsDeltaAtLeast(limit) => change.delta.abs() >= limit,
            Condition::ValueAtMost(limit) => change.value <= limit,
            Condition::ValueAtLeast(limit) => change.value >= limit,
            Condition::RiseWithPercent { delta, percent } => {
                change.delta >= delta && change.delta_percent.is_some_and(|p| p >= percent)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertRule {
    pub id: RuleId,
    pub category: MetricCategory,
    pub condition: Condition,
    pub severity: Severity,
    /// Rules that, having fired on the same reading, cancel this one.
    pub unless: &'static [RuleId],
}

pub const RULES: &[AlertRule] = &[
    AlertRule {
        id: RuleId::ColdSnap,
        category: MetricCategory::Temperature,
        condition: Condition::DeltaAtMost(-5.0),
        severity: Severity::Warning,
        unless: &[],
    },
    AlertRule {
        id: RuleId::WarmSnap,
        category: MetricCategory::Temperature,
        condition: Condition::DeltaAtLeast(5.0),
        severity: Severity::Warning,
        unless: &[],
    },
    AlertRule {
        id: RuleId::ExtremeCold,
        category: MetricCategory::Temperature,
        condition: Condition::ValueAtMost(-20.0),
        severity: Severity::Danger,
        unless: &[],
    },
    AlertRule {
        id: RuleId::ExtremeHeat,
        category: MetricCategory::Temperature,
        condition: Condition::ValueAtLeast(35.0),
        severity: Severity::Danger,
        unless: &[],
    },
    AlertRule {
        id: RuleId::StrongWind,
        category: MetricCategory::Wind,
        condition: Condition::ValueAtLeast(15.0),
        severity: Severity::Warning,
        unless: &[],
    },
    AlertRule {
        id: RuleId::WindRising,
        category: MetricCategory::Wind,
        condition: Condition::RiseWithPercent {
            delta: 7.0,
            percent: 50.0,
        },
        severity: Severity::Info,
        unless: &[],
    },
    AlertRule {
        id: RuleId::VeryHumid,
        category: MetricCategory::Humidity,
        condition: Condition::ValueAtLeast(90.0),
        severity: Severity::Info,
        unless: &[],
    },
    AlertRule {
        id: RuleId::VeryDry,
        category: MetricCategory::Humidity,
        condition: Condition::ValueAtMost(30.0),
        severity: Severity::Info,
        unless: &[],
    },
    AlertRule {
        id: RuleId::LowPressure,
        category: MetricCategory::Pressure,
        condition: Condition::ValueAtMost(730.0),
        severity: Severity::Warning,
        unless: &[],
    },
    AlertRule {
        id: RuleId::HighPressure,
        category: MetricCategory::Pressure,
        condition: Condition::ValueAtLeast(770.0),
        severity: Severity::Warning,
        unless: &[],
    },
    AlertRule {
        id: RuleId::PressureSwing,
        category: MetricCategory::Pressure,
        condition: Condition::AbsDeltaAtLeast(5.0),
        severity: Severity::Warning,
        unless: &[RuleId::LowPressure, RuleId::HighPressure],
    },
    AlertRule {
        id: RuleId::HeavyPrecipitation,
        category: MetricCategory::Precipitation,
        condition: Condition::ValueAtLeast(10.0),
        severity: Severity::Warning,
        unless: &[],
    },
];

impl AlertRule {
    /// Title and body for the notification this rule raises.
    pub fn render(&self, change: &Change, display_value: &str) -> (String, String) {
        let (title, body) = match self.id {
            RuleId::ColdSnap => (
                "🥶 Резкое похолодание!",
                format!(
                    "Температура упала на {}°C. Сейчас: {}",
                    format_fixed(change.delta.abs(), 1),
                    display_value
                ),
            ),
            RuleId::WarmSnap => (
                "🌡️ Резкое потепление!",
                format!(
                    "Температура выросла на {}°C. Сейчас: {}",
                    format_fixed(change.delta, 1),
                    display_value
                ),
            ),
            RuleId::ExtremeCold => (
                "⚠️ Экстремальный холод!",
                format!("Очень низкая температура: {}. Оденьтесь теплее!", display_value),
            ),
            RuleId::ExtremeHeat => (
                "🔥 Экстремальная жара!",
                format!("Очень высокая температура: {}. Берегите здоровье!", display_value),
            ),
            RuleId::StrongWind => (
                "💨 Сильный ветер!",
                format!("Скорость ветра: {}. Будьте осторожны!", display_value),
            ),
            RuleId::WindRising => (
                "🌪️ Ветер усиливается!",
                format!("Скорость ветра увеличилась до {}", display_value),
            ),
            RuleId::VeryHumid => (
                "💧 Очень высокая влажность!",
                format!("Влажность: {}. Возможен туман или осадки", display_value),
            ),
            RuleId::VeryDry => (
                "🏜️ Низкая влажность!",
                format!("Влажность: {}. Пейте больше воды", display_value),
            ),
            RuleId::LowPressure => (
                "📉 Низкое давление!",
                format!(
                    "Атмосферное давление: {}. Возможно ухудшение самочувствия",
                    display_value
                ),
            ),
            RuleId::HighPressure => (
                "📈 Высокое давление!",
                format!("Атмосферное давление: {}. Берегите здоровье", display_value),
            ),
            RuleId::PressureSwing => {
                let direction = if change.delta > 0.0 {
                    "повысилось"
                } else {
                    "понизилось"
                };
                (
                    "⚠️ Резкий перепад давления!",
                    format!(
                        "Давление {} на {} мм. Сейчас: {}",
                        direction,
                        format_fixed(change.delta.abs(), 0),
                        display_value
                    ),
                )
            }
            RuleId::HeavyPrecipitation => (
                "☔ Сильные осадки!",
                format!("Интенсивность: {}. Возьмите зонт!", display_value),
            ),
        };
        (title.to_string(), body)
    }
}

/// Rules of `category` that fire for `change`, in table order.
pub fn evaluate(category: MetricCategory, change: &Change) -> Vec<&'static AlertRule> {
    let mut fired: Vec<&'static AlertRule> = Vec::new();

    for rule in RULES.iter().filter(|r| r.category == category) {
        if !rule.condition.holds(change) {
            continue;
        }
        if fired.iter().any(|f| rule.unless.contains(&f.id)) {
            continue;
        }
        fired.push(rule);
    }

    fired
}
