use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use meteo_alerts::{
    relative_time, FavoriteCity, Favorites, JsonFileStore, LogSink, NotificationFeed,
    PreferenceStore,
};
use meteo_core::{AppError, Config};
use meteo_weather::OpenMeteoProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod poller;

use poller::Poller;

/// Meteo - weather change notifications for your favorite cities
#[derive(Parser, Debug)]
#[command(name = "meteo", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "METEO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll favorites until interrupted (default)
    Run,
    /// Poll favorites once and exit
    Once,
    /// Add a favorite city
    Add {
        name: String,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Remove a favorite city by its "lat,lon" key
    Remove { key: String },
    /// List favorite cities
    List,
    /// Show the notification feed
    Feed {
        /// Clear the feed instead of showing it
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    meteo_core::init()?;
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let (config, _) = match Config::load_validated_from(&config_path).map_err(AppError::from_config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("{} ({})", e.user_message(), e);
            return Err(e.into());
        }
    };
    tracing::info!("Config directory: {}", config.config_dir.display());

    let store: Arc<dyn PreferenceStore> = Arc::new(
        JsonFileStore::in_dir(&config.config_dir).context("Failed to open preference store")?,
    );

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config, store, false).await,
        Command::Once => run(&config, store, true).await,
        Command::Add { name, lat, lon } => {
            let mut favorites = Favorites::load(store.as_ref())?;
            let city = FavoriteCity::new(name, lat, lon);
            let key = city.key();
            if favorites.add(city) {
                favorites.save(store.as_ref())?;
                println!("Added {}", key);
            } else {
                println!("{} is already a favorite", key);
            }
            Ok(())
        }
        Command::Remove { key } => {
            let mut favorites = Favorites::load(store.as_ref())?;
            if favorites.remove(&key) {
                favorites.save(store.as_ref())?;
                println!("Removed {}", key);
            } else {
                println!("No favorite with key {}", key);
            }
            Ok(())
        }
        Command::List => {
            for city in Favorites::load(store.as_ref())?.iter() {
                println!("{:<24} {}", city.name, city.key());
            }
            Ok(())
        }
        Command::Feed { clear } => {
            let mut feed = NotificationFeed::load(store, config.alerts.feed_capacity)?;
            if clear {
                feed.clear()?;
                println!("Feed cleared");
                return Ok(());
            }
            if feed.is_empty() {
                println!("Нет новых уведомлений");
            }
            let now = Utc::now();
            for entry in feed.entries() {
                println!(
                    "[{}] {}: {} ({})",
                    entry.severity.label(),
                    entry.city_name,
                    entry.message,
                    relative_time(entry.timestamp, now)
                );
            }
            Ok(())
        }
    }
}

async fn run(config: &Config, store: Arc<dyn PreferenceStore>, once: bool) -> Result<()> {
    let provider = OpenMeteoProvider::with_base_url(
        &config.weather.api_url,
        config.weather.request_timeout(),
    )?;
    let mut poller = Poller::new(Arc::new(provider), store, Arc::new(LogSink), &config.alerts)?;

    if once {
        poller.tick().await?;
        return Ok(());
    }

    // A zero period would make the interval panic.
    let period = config.weather.refresh_interval().max(Duration::from_secs(60));
    let mut interval = tokio::time::interval(period);
    tracing::info!("Polling every {} minutes, Ctrl+C to stop", period.as_secs() / 60);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = poller.tick().await {
                    tracing::error!("Poll failed: {} ({})", e.user_message(), e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
