//! Metric keys, categories and numeric extraction from display strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower-cased label of a tracked quantity, e.g. `"температура"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricKey(String);

impl MetricKey {
    pub fn new(label: &str) -> Self {
        Self(label.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetricKey {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// Which rule group applies to a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Temperature,
    Wind,
    Humidity,
    Pressure,
    Precipitation,
    /// Tracked for baselines, never alerts.
    Other,
}

impl MetricCategory {
    /// Probe order for label-driven dispatch; first match wins.
    const TOKENS: &'static [(MetricCategory, &'static [&'static str])] = &[
        (MetricCategory::Temperature, &["температура", "temperature"]),
        (MetricCategory::Wind, &["ветер", "wind"]),
        (MetricCategory::Humidity, &["влажность", "humidity"]),
        (MetricCategory::Pressure, &["давление", "pressure"]),
        (
            MetricCategory::Precipitation,
            &["осадки", "дождь", "precipitation", "rain"],
        ),
    ];

    /// Derive the category from a label by substring containment.
    ///
    /// Compatibility path for callers that only have the informer label;
    /// callers that know the category should pass it explicitly.
    pub fn from_key(key: &MetricKey) -> Self {
        let label = key.as_str();
        Self::TOKENS
            .iter()
            .find(|(_, tokens)| tokens.iter().any(|t| label.contains(t)))
            .map(|(category, _)| *category)
            .unwrap_or(MetricCategory::Other)
    }
}

/// One observation of a metric, with its value already extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    pub key: MetricKey,
    pub display_value: String,
    pub value: f64,
}

impl MetricReading {
    /// Returns `None` when the display string carries no number
    /// (placeholders such as "loading…" or "—").
    pub fn parse(key: MetricKey, display_value: &str) -> Option<Self> {
        let value = parse_numeric(display_value)?;
        Some(Self {
            key,
            display_value: display_value.to_string(),
            value,
        })
    }
}

/// Extract a number from a display string such as `"-25°C"` or `"12 км/ч"`.
///
/// Everything except ASCII digits, `.` and `-` is dropped, then the longest
/// leading float (`-?digits[.digits]`) is parsed. Trailing leftovers are
/// ignored, so `"12-15 км/ч"` yields 12.
pub fn parse_numeric(display_value: &str) -> Option<f64> {
    let filtered: String = display_value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let bytes = filtered.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - frac_start;
        if frac_digits > 0 || digits > 0 {
            end = frac_end;
            digits += frac_digits;
        }
    }

    if digits == 0 {
        return None;
    }

    filtered[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// Format `value` with `digits` decimals, rounding halves away from zero.
///
/// `format!("{:.1}", 0.25)` rounds half to even and prints `0.2`; user-facing
/// deltas should read `0.3` instead.
pub fn format_fixed(value: f64, digits: usize) -> String {
    let scale = 10f64.powi(digits as i32);
    format!("{:.*}", digits, (value * scale).round() / scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_lowercased() {
        assert_eq!(MetricKey::new("Температура").as_str(), "температура");
        assert_eq!(MetricKey::from("Wind Speed").as_str(), "wind speed");
    }

    #[test]
    fn category_by_substring() {
        let cases = [
            ("Температура", MetricCategory::Temperature),
            ("Скорость ветер", MetricCategory::Wind),
            ("Ветер", MetricCategory::Wind),
            ("Влажность", MetricCategory::Humidity),
            ("Атмосферное давление", MetricCategory::Pressure),
            ("Осадки", MetricCategory::Precipitation),
            ("Вероятность дождя", MetricCategory::Other),
            ("Сильный дождь", MetricCategory::Precipitation),
            ("Видимость", MetricCategory::Other),
        ];
        for (label, expected) in cases {
            assert_eq!(MetricCategory::from_key(&MetricKey::new(label)), expected, "{}", label);
        }
    }

    #[test]
    fn parse_strips_units() {
        assert_eq!(parse_numeric("-25°C"), Some(-25.0));
        assert_eq!(parse_numeric("12 км/ч"), Some(12.0));
        assert_eq!(parse_numeric("745 мм"), Some(745.0));
        assert_eq!(parse_numeric("85%"), Some(85.0));
        assert_eq!(parse_numeric("0.4 мм"), Some(0.4));
        assert_eq!(parse_numeric(".5"), Some(0.5));
        assert_eq!(parse_numeric("5."), Some(5.0));
    }

    #[test]
    fn parse_takes_leading_number_only() {
        assert_eq!(parse_numeric("12-15 км/ч"), Some(12.0));
        assert_eq!(parse_numeric("1.2.3"), Some(1.2));
    }

    #[test]
    fn parse_rejects_text_without_digits() {
        assert_eq!(parse_numeric("loading…"), None);
        assert_eq!(parse_numeric("—"), None);
        assert_eq!(parse_numeric("-"), None);
        assert_eq!(parse_numeric("."), None);
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("AQI -.-"), None);
    }

    #[test]
    fn fixed_format_rounds_halves_up() {
        assert_eq!(format_fixed(6.5, 0), "7");
        assert_eq!(format_fixed(0.25, 1), "0.3");
        assert_eq!(format_fixed(2.25, 1), "2.3");
        assert_eq!(format_fixed(-6.5, 0), "-7");
        assert_eq!(format_fixed(10.0, 1), "10.0");
        assert_eq!(format_fixed(1.04, 1), "1.0");
    }

    #[test]
    fn reading_keeps_display_value() {
        let reading = MetricReading::parse(MetricKey::new("Ветер"), "20 км/ч").unwrap();
        assert_eq!(reading.value, 20.0);
        assert_eq!(reading.display_value, "20 км/ч");
        assert!(MetricReading::parse(MetricKey::new("Ветер"), "нет данных").is_none());
    }
}
