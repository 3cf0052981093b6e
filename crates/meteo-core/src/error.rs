//! Centralized error types for the Meteo application.
//!
//! Crate-level errors (`WeatherError`, `PrefsError`) convert into `AppError`,
//! which offers `user_message()` for anything shown to the user and keeps the
//! full error chain for logging.

use meteo_alerts::PrefsError;
use meteo_weather::WeatherError;
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Preference storage error: {0}")]
    Preferences(#[from] PrefsError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => weather_user_message(e),
            AppError::Preferences(_) => "Saved settings could not be read or written.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Classify a failure from `Config` loading, keeping `ConfigError`s typed.
    pub fn from_config(err: anyhow::Error) -> Self {
        match err.downcast::<ConfigError>() {
            Ok(config) => AppError::Config(config),
            Err(other) => AppError::Other(other),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

fn weather_user_message(err: &WeatherError) -> &'static str {
    match err {
        WeatherError::Network(e) if e.is_timeout() => "The weather request timed out. Please try again.",
        WeatherError::Network(_) => "Unable to reach the weather service. Check your internet connection.",
        WeatherError::Status { status, .. } if *status >= 500 => {
            "Weather service unavailable. Please try again later."
        }
        WeatherError::Status { .. } => "Weather service error. Please try again.",
        WeatherError::Parse(_) => "Received unexpected weather data. Please try again.",
    }
}
