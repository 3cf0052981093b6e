//! Maps a weather snapshot to the labelled readings fed into the analyzer.

use meteo_weather::CurrentWeather;

use crate::metric::{format_fixed, MetricCategory};

pub const TEMPERATURE: &str = "Температура";
pub const WIND: &str = "Ветер";
pub const HUMIDITY: &str = "Влажность";
pub const PRESSURE: &str = "Давление";
pub const PRECIPITATION: &str = "Осадки";

/// One informer card: what the dashboard shows for a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct InformerReading {
    pub label: &'static str,
    pub category: MetricCategory,
    pub display_value: String,
    pub description: String,
}

pub fn readings(weather: &CurrentWeather) -> Vec<InformerReading> {
    let wind = weather.wind_speed;
    let humidity = weather.humidity;
    let pressure = whole(weather.pressure_mmhg());

    vec![
        InformerReading {
            label: TEMPERATURE,
            category: MetricCategory::Temperature,
            display_value: format!("{}°C", whole(weather.temperature)),
            description: weather.condition.description().to_string(),
        },
        InformerReading {
            label: WIND,
            category: MetricCategory::Wind,
            display_value: format!("{} км/ч", whole(wind)),
            description: if wind > 20.0 {
                "Сильный"
            } else if wind > 10.0 {
                "Умеренный"
            } else {
                "Слабый"
            }
            .to_string(),
        },
        InformerReading {
            label: HUMIDITY,
            category: MetricCategory::Humidity,
            display_value: format!("{}%", humidity),
            description: if humidity > 70 {
                "Высокая"
            } else if humidity > 40 {
                "Комфортная"
            } else {
                "Низкая"
            }
            .to_string(),
        },
        InformerReading {
            label: PRESSURE,
            category: MetricCategory::Pressure,
            display_value: format!("{} мм", pressure),
            description: if pressure > 760 {
                "Высокое"
            } else if pressure > 740 {
                "Нормальное"
            } else {
                "Низкое"
            }
            .to_string(),
        },
        InformerReading {
            label: PRECIPITATION,
            category: MetricCategory::Precipitation,
            display_value: format!("{} мм", format_fixed(weather.precipitation_mm, 1)),
            description: if weather.precipitation_mm > 0.0 {
                weather.condition.description().to_string()
            } else {
                "Без осадков".to_string()
            },
        },
    ]
}

fn whole(value: f64) -> i64 {
    value.round() as i64
}
