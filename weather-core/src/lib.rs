//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - An HTTP fetch client with failure classification
//! - A coordinate-keyed weather cache and the access layer around it
//! - The application state container the presentation layer observes
//! - City autocomplete with debouncing, and saved favorite locations
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod cache;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod favorites;
pub mod fetch;
pub mod geocode;
pub mod model;
pub mod openweather;
pub mod service;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::WeatherCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use debounce::{SuggestionBatch, SuggestionDebouncer};
pub use error::{FetchError, LookupError};
pub use favorites::{AddFavoriteError, FavoriteLocation, FavoritesStore};
pub use fetch::{Fetcher, HttpFetcher};
pub use geocode::CitySearch;
pub use model::{CitySuggestion, Coordinates, TemperatureUnit, WeatherSnapshot};
pub use service::WeatherService;
pub use state::{LastQuery, RacePolicy, WeatherState, WeatherStore};
