use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::{sync::Arc, time::Duration};
use weather_core::{
    CitySearch, Config, FavoritesStore, LastQuery, TemperatureUnit, WeatherService, WeatherStore,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather lookup")]
pub struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and default unit.
    Configure,

    /// Show current weather for a city or a coordinate pair.
    Show {
        #[command(flatten)]
        target: Target,

        /// Retry this many times if the lookup fails.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },

    /// Keep showing the weather, refreshing on an interval until Ctrl-C.
    Watch {
        #[command(flatten)]
        target: Target,

        /// Seconds between refreshes. Coordinate targets wait at least the
        /// cache TTL plus the request timeout so each refresh is a new fetch.
        #[arg(long, default_value_t = 300)]
        every: u64,
    },

    /// List places matching a partial city name.
    Suggest {
        query: String,
    },

    /// Manage saved locations.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
}

#[derive(Debug, Args)]
pub struct Target {
    /// City name, e.g. "London" or "Paris,FR".
    pub city: Option<String>,

    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Temperature unit: C or F. Defaults to the configured unit.
    #[arg(long)]
    pub unit: Option<String>,
}

impl Target {
    fn query(&self) -> anyhow::Result<LastQuery> {
        match (&self.city, self.lat, self.lon) {
            (Some(city), None, None) => Ok(LastQuery::ByCity(city.clone())),
            (None, Some(lat), Some(lon)) => Ok(LastQuery::ByCoordinates { lat, lon }),
            _ => bail!("Provide either a city name or both --lat and --lon."),
        }
    }

    fn unit(&self, config: &Config) -> anyhow::Result<TemperatureUnit> {
        match &self.unit {
            Some(u) => TemperatureUnit::try_from(u.as_str()),
            None => Ok(config.unit),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// Show saved locations with their last known weather.
    List,

    /// Search for a place and save it.
    Add {
        query: String,

        /// 1-based index into the suggestions; prompts when absent.
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Remove a saved location by id.
    Remove { id: String },

    /// Re-fetch weather for every saved location.
    Refresh,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { target, retries } => show(target, retries).await,
            Command::Watch { target, every } => watch(target, every).await,
            Command::Suggest { query } => suggest(&query).await,
            Command::Favorites { action } => favorites(action).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let units = vec![TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit];
    let start = usize::from(config.unit == TemperatureUnit::Fahrenheit);
    config.unit = inquire::Select::new("Default temperature unit:", units)
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read unit")?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn build_store(config: &Config, target: &Target) -> anyhow::Result<WeatherStore> {
    let service = WeatherService::from_config(config)?;
    Ok(WeatherStore::new(Arc::new(service)).with_unit(target.unit(config)?))
}

fn refresh_period(every_secs: u64, query: &LastQuery, config: &Config) -> Duration {
    let every = Duration::from_secs(every_secs.max(1));
    match query {
        // The cache entry is stamped when the response arrives, which can be
        // up to one timeout after the tick.
        LastQuery::ByCoordinates { .. } => {
            let ttl = Duration::from_millis(config.cache.ttl_ms.max(0) as u64);
            every.max(ttl + config.timeouts.weather())
        }
        LastQuery::ByCity(_) | LastQuery::None => every,
    }
}

async fn run_query(store: &WeatherStore, query: &LastQuery) {
    match query {
        LastQuery::ByCity(name) => store.search_by_city(name).await,
        LastQuery::ByCoordinates { lat, lon } => store.search_by_coordinates(*lat, *lon).await,
        LastQuery::None => {}
    }
}

async fn show(target: Target, retries: u32) -> anyhow::Result<()> {
    let config = Config::load()?;
    let query = target.query()?;
    let store = build_store(&config, &target)?;

    run_query(&store, &query).await;
    for attempt in 1..=retries {
        if store.state().error_message.is_none() {
            break;
        }
        tracing::info!(attempt, "retrying last lookup");
        store.retry_last_query().await;
    }

    let state = store.state();
    if let Some(message) = state.error_message {
        bail!(message);
    }
    println!("{}", render::weather(&state));
    Ok(())
}

async fn watch(target: Target, every: u64) -> anyhow::Result<()> {
    let config = Config::load()?;
    let query = target.query()?;
    let store = build_store(&config, &target)?;
    let sweeper = store.service().spawn_cache_sweeper(config.cache.sweep_interval());

    let mut rx = store.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if state.is_loading {
                continue;
            }
            match &state.error_message {
                Some(message) => eprintln!("{message}"),
                None if state.current_weather.is_some() => {
                    println!("[{}]\n{}\n", Utc::now().format("%H:%M:%S"), render::weather(&state));
                }
                None => {}
            }
        }
    });

    run_query(&store, &query).await;

    let period = refresh_period(every, &query, &config);
    if period > Duration::from_secs(every) {
        tracing::info!(
            requested = every,
            used = period.as_secs(),
            "raised refresh interval past cache TTL"
        );
    }
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => store.retry_last_query().await,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    sweeper.abort();
    printer.abort();
    Ok(())
}

async fn suggest(query: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let search = CitySearch::from_config(&config)?;

    let found = search.suggest(query).await;
    if found.is_empty() {
        println!("No matching places.");
    } else {
        println!("{}", render::suggestions(&found));
    }
    Ok(())
}

async fn favorites(action: FavoritesCommand) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut store = FavoritesStore::open_default()?;

    match action {
        FavoritesCommand::List => {
            println!("{}", render::favorites(store.list(), config.unit));
        }
        FavoritesCommand::Add { query, pick } => {
            let search = CitySearch::from_config(&config)?;
            let mut found = search.suggest(&query).await;
            if found.is_empty() {
                bail!("No places match '{query}'.");
            }

            let place = match pick {
                Some(n) if (1..=found.len()).contains(&n) => found.swap_remove(n - 1),
                Some(n) => bail!("--pick must be between 1 and {}, got {n}", found.len()),
                None => inquire::Select::new("Which place?", found)
                    .prompt()
                    .context("Failed to read selection")?,
            };

            let service = WeatherService::from_config(&config)?;
            let saved = store.add(&service, &place, Utc::now().timestamp_millis()).await?;
            println!("{} has been added to your locations (id {}).", saved.name, saved.id);
        }
        FavoritesCommand::Remove { id } => {
            let name = store.get(&id).map(|f| f.name.clone());
            if store.remove(&id)? {
                println!("Removed {}.", name.unwrap_or(id));
            } else {
                bail!("No saved location with id '{id}'.");
            }
        }
        FavoritesCommand::Refresh => {
            let service = WeatherService::from_config(&config)?;
            let updated = store.refresh(&service).await?;
            println!("Updated {updated} of {} locations.", store.list().len());
            println!("{}", render::favorites(store.list(), config.unit));
        }
    }

    Ok(())
}
