//! Open-Meteo weather source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{CurrentWeather, Location, WeatherCondition, WeatherError};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Meteo/0.1.0";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
weather_code,wind_speed_10m,surface_pressure,precipitation";

/// Anything that can produce a current-conditions snapshot for a location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, location: &Location) -> Result<CurrentWeather, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: Option<String>,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: Option<f64>,
    weather_code: Option<i32>,
    wind_speed_10m: f64,
    surface_pressure: f64,
    precipitation: Option<f64>,
}

impl From<CurrentBlock> for CurrentWeather {
    fn from(block: CurrentBlock) -> Self {
        let weather_code = block.weather_code.unwrap_or(0);
        let updated_at = block
            .time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok())
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
            .unwrap_or_else(Utc::now);

        Self {
            temperature: block.temperature_2m,
            feels_like: block.apparent_temperature.unwrap_or(block.temperature_2m),
            humidity: block.relative_humidity_2m.round().clamp(0.0, 100.0) as u8,
            wind_speed: block.wind_speed_10m,
            pressure_hpa: block.surface_pressure,
            precipitation_mm: block.precipitation.unwrap_or(0.0),
            weather_code,
            condition: WeatherCondition::from_wmo_code(weather_code),
            updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl OpenMeteoProvider {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(OPEN_METEO_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Point the provider at a different endpoint (self-hosted Open-Meteo, test server).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoProvider {
    #[instrument(skip(self), level = "info")]
    async fn current(&self, location: &Location) -> Result<CurrentWeather, WeatherError> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        let response = with_retry(&self.retry, || {
            self.client
                .get(&self.base_url)
                .query(&[
                    ("latitude", latitude.as_str()),
                    ("longitude", longitude.as_str()),
                    ("current", CURRENT_FIELDS),
                    ("wind_speed_unit", "kmh"),
                    ("timezone", "UTC"),
                ])
                .send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("JSON parse error: {}", e)))?;

        let current = body
            .current
            .ok_or_else(|| WeatherError::Parse("response has no `current` block".to_string()))?;

        let weather = CurrentWeather::from(current);
        tracing::debug!(
            "Fetched weather: {:.1}°C, wind {:.1} km/h, code {}",
            weather.temperature,
            weather.wind_speed,
            weather.weather_code
        );
        Ok(weather)
    }
}
