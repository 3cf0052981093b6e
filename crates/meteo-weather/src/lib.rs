//! Weather data for Meteo
//!
//! Current conditions from the Open-Meteo API behind the `WeatherSource` trait,
//! with retry on transient failures.

pub mod provider;
pub mod retry;
pub mod types;

pub use provider::{OpenMeteoProvider, WeatherSource};
pub use retry::RetryConfig;
pub use types::*;
