use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Millimetres of mercury per hectopascal.
const MMHG_PER_HPA: f64 = 0.750_061_683;

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    /// Human-readable (Russian) description, as shown on the dashboard
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Ясно",
            Self::PartlyCloudy => "Переменная облачность",
            Self::Cloudy => "Облачно",
            Self::Fog => "Туман",
            Self::Drizzle => "Морось",
            Self::Rain => "Дождь",
            Self::HeavyRain => "Сильный дождь",
            Self::Snow => "Снег",
            Self::Sleet => "Мокрый снег",
            Self::Thunderstorm => "Гроза",
        }
    }
}

/// Geographic location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city_name: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            city_name: None,
        }
    }

    pub fn named(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            city_name: Some(name.into()),
        }
    }
}

/// Current weather conditions at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Air temperature, °C
    pub temperature: f64,
    pub feels_like: f64,
    /// Relative humidity, %
    pub humidity: u8,
    /// Wind speed at 10 m, km/h
    pub wind_speed: f64,
    /// Surface pressure, hPa
    pub pressure_hpa: f64,
    /// Precipitation over the preceding hour, mm
    pub precipitation_mm: f64,
    pub weather_code: i32,
    pub condition: WeatherCondition,
    pub updated_at: DateTime<Utc>,
}

impl CurrentWeather {
    pub fn pressure_mmhg(&self) -> f64 {
        hpa_to_mmhg(self.pressure_hpa)
    }
}

pub fn hpa_to_mmhg(hpa: f64) -> f64 {
    hpa * MMHG_PER_HPA
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmo_code_clear() {
        assert_eq!(WeatherCondition::from_wmo_code(0), WeatherCondition::Clear);
    }

    #[test]
    fn test_wmo_code_partly_cloudy() {
        assert_eq!(WeatherCondition::from_wmo_code(1), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_wmo_code(2), WeatherCondition::PartlyCloudy);
    }

    #[test]
    fn test_wmo_code_rain() {
        assert_eq!(WeatherCondition::from_wmo_code(61), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_wmo_code(63), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_wmo_code(80), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_wmo_code(65), WeatherCondition::HeavyRain);
    }

    #[test]
    fn test_wmo_code_snow() {
        for code in [71, 73, 75, 77, 85, 86] {
            assert_eq!(WeatherCondition::from_wmo_code(code), WeatherCondition::Snow);
        }
    }

    #[test]
    fn test_wmo_code_sleet() {
        for code in [56, 57, 66, 67] {
            assert_eq!(WeatherCondition::from_wmo_code(code), WeatherCondition::Sleet);
        }
    }

    #[test]
    fn test_wmo_code_thunderstorm() {
        for code in [95, 96, 99] {
            assert_eq!(WeatherCondition::from_wmo_code(code), WeatherCondition::Thunderstorm);
        }
    }

    #[test]
    fn test_wmo_code_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_wmo_code(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_wmo_code(-1), WeatherCondition::Clear);
    }

    #[test]
    fn test_descriptions_carry_onset_stems() {
        // Transition watching keys off these stems.
        assert!(WeatherCondition::Thunderstorm.description().to_lowercase().contains("гроз"));
        assert!(WeatherCondition::Snow.description().to_lowercase().contains("снег"));
        assert!(WeatherCondition::Sleet.description().to_lowercase().contains("снег"));
        assert!(!WeatherCondition::Rain.description().to_lowercase().contains("снег"));
    }

    #[test]
    fn test_hpa_to_mmhg() {
        assert_eq!(hpa_to_mmhg(1013.25).round(), 760.0);
        assert_eq!(hpa_to_mmhg(0.0), 0.0);
    }
}
