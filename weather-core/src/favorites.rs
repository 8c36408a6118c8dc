//! Saved favorite locations with their last known weather.
//!
//! Stored as a JSON array in the platform data directory. Two places within
//! 0.01° of each other in both latitude and longitude count as the same place.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use thiserror::Error;

use crate::{
    config::Config,
    error::LookupError,
    model::{CitySuggestion, WeatherSnapshot},
    service::WeatherService,
};

pub const SAME_PLACE_DEGREES: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteLocation {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature_celsius: f64,
    pub condition_main: String,
    pub condition_icon_code: String,
    #[serde(default)]
    pub is_current_location: bool,
    pub date_added_millis: i64,
}

impl FavoriteLocation {
    pub fn is_near(&self, lat: f64, lon: f64) -> bool {
        (self.latitude - lat).abs() < SAME_PLACE_DEGREES
            && (self.longitude - lon).abs() < SAME_PLACE_DEGREES
    }

    fn apply_weather(&mut self, snapshot: &WeatherSnapshot) {
        self.temperature_celsius = snapshot.temperature_celsius;
        self.condition_main = snapshot.condition_main.clone();
        self.condition_icon_code = snapshot.condition_icon_code.clone();
    }
}

#[derive(Debug, Error)]
pub enum AddFavoriteError {
    #[error("{0} is already in your saved locations")]
    AlreadySaved(String),

    #[error(transparent)]
    Weather(#[from] LookupError),

    #[error("Failed to save locations: {0:#}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    items: Vec<FavoriteLocation>,
}

impl FavoritesStore {
    /// Open the store at the default data path.
    pub fn open_default() -> Result<Self> {
        Self::open(Config::favorites_file_path()?)
    }

    /// Load the list at `path`; a missing file is an empty list.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read favorites file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse favorites file: {}", path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self { path, items })
    }

    pub fn list(&self) -> &[FavoriteLocation] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&FavoriteLocation> {
        self.items.iter().find(|f| f.id == id)
    }

    /// Save `place` with its current weather. Rejected without a network call
    /// if an entry for the same place already exists.
    pub async fn add(
        &mut self,
        service: &WeatherService,
        place: &CitySuggestion,
        now_millis: i64,
    ) -> Result<FavoriteLocation, AddFavoriteError> {
        if self.items.iter().any(|f| f.is_near(place.latitude, place.longitude)) {
            return Err(AddFavoriteError::AlreadySaved(place.name.clone()));
        }

        let snapshot = service.fetch_by_coordinates(place.latitude, place.longitude).await?;

        let favorite = FavoriteLocation {
            id: format!("{}-{}-{}", place.latitude, place.longitude, now_millis),
            name: place.name.clone(),
            country: Some(place.country.clone()),
            state: place.state.clone(),
            latitude: place.latitude,
            longitude: place.longitude,
            temperature_celsius: snapshot.temperature_celsius,
            condition_main: snapshot.condition_main,
            condition_icon_code: snapshot.condition_icon_code,
            is_current_location: false,
            date_added_millis: now_millis,
        };

        // Only keep the entry in memory once it is on disk.
        let mut items = self.items.clone();
        items.push(favorite.clone());
        self.write(&items)?;
        self.items = items;
        tracing::info!(id = %favorite.id, name = %favorite.name, "saved favorite location");

        Ok(favorite)
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }

        let items: Vec<_> = self.items.iter().filter(|f| f.id != id).cloned().collect();
        self.write(&items)?;
        self.items = items;
        Ok(true)
    }

    /// Re-fetch weather for every entry concurrently. Entries whose lookup
    /// fails keep their previous values. Returns how many were updated.
    pub async fn refresh(&mut self, service: &WeatherService) -> Result<usize> {
        let lookups = self
            .items
            .iter()
            .map(|f| service.fetch_by_coordinates(f.latitude, f.longitude));
        let results = futures::future::join_all(lookups).await;

        let mut updated = 0;
        for (favorite, result) in self.items.iter_mut().zip(results) {
            match result {
                Ok(snapshot) => {
                    favorite.apply_weather(&snapshot);
                    updated += 1;
                }
                Err(e) => {
                    tracing::warn!(id = %favorite.id, error = %e.kind, "keeping stale favorite weather");
                }
            }
        }

        self.save()?;
        Ok(updated)
    }

    pub fn save(&self) -> Result<()> {
        self.write(&self.items)
    }

    fn write(&self, items: &[FavoriteLocation]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create favorites directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(items)
            .context("Failed to serialize favorites to JSON")?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write favorites file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FetchError,
        testing::{FakeFetcher, current_weather_json},
    };
    use std::sync::Arc;

    fn service(fetcher: &Arc<FakeFetcher>) -> WeatherService {
        WeatherService::new(fetcher.clone(), "KEY", &Config::default())
    }

    fn place(name: &str, lat: f64, lon: f64) -> CitySuggestion {
        CitySuggestion {
            name: name.into(),
            country: "GB".into(),
            state: Some("England".into()),
            latitude: lat,
            longitude: lon,
        }
    }

    #[tokio::test]
    async fn add_fetches_weather_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_ok(current_weather_json("London", 18.4, 51.5074, -0.1278));

        let mut store = FavoritesStore::open(&path).unwrap();
        let fav = store
            .add(&service(&fetcher), &place("London", 51.5074, -0.1278), 1_700_000_000_000)
            .await
            .unwrap();

        assert_eq!(fav.id, "51.5074--0.1278-1700000000000");
        assert_eq!(fav.temperature_celsius, 18.4);
        assert_eq!(fav.condition_main, "Clouds");
        assert_eq!(fav.state.as_deref(), Some("England"));

        let reopened = FavoritesStore::open(&path).unwrap();
        assert_eq!(reopened.list(), &[fav]);
    }

    #[tokio::test]
    async fn nearby_place_is_rejected_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_ok(current_weather_json("London", 18.0, 51.5074, -0.1278));
        let svc = service(&fetcher);

        let mut store = FavoritesStore::open(dir.path().join("f.json")).unwrap();
        store.add(&svc, &place("London", 51.5074, -0.1278), 1).await.unwrap();

        let err = store.add(&svc, &place("City of London", 51.512, -0.13), 2).await.unwrap_err();
        assert!(matches!(err, AddFavoriteError::AlreadySaved(ref n) if n == "City of London"));
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(store.list().len(), 1);
    }

    #[tokio::test]
    async fn failed_weather_lookup_does_not_add() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.json");
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_err(FetchError::Timeout);

        let mut store = FavoritesStore::open(&path).unwrap();
        let err = store.add(&service(&fetcher), &place("Leeds", 53.8, -1.55), 1).await.unwrap_err();

        assert!(matches!(err, AddFavoriteError::Weather(_)));
        assert!(store.list().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be.
        let blocker = dir.path().join("data");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("f.json");

        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_ok(current_weather_json("York", 12.0, 53.96, -1.08));
        let svc = service(&fetcher);
        let york = place("York", 53.96, -1.08);

        let mut store = FavoritesStore::open(&path).unwrap();
        let err = store.add(&svc, &york, 1).await.unwrap_err();
        assert!(matches!(err, AddFavoriteError::Storage(_)), "got {err:?}");
        assert!(store.list().is_empty());

        // Once the directory can be created the same place is accepted; the
        // snapshot comes from the service cache.
        fs::remove_file(&blocker).unwrap();
        let fav = store.add(&svc, &york, 2).await.unwrap();
        assert_eq!(store.list(), &[fav]);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(FavoritesStore::open(&path).unwrap().list().len(), 1);
    }

    #[tokio::test]
    async fn remove_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.json");
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.push_ok(current_weather_json("York", 12.0, 53.96, -1.08));

        let mut store = FavoritesStore::open(&path).unwrap();
        let fav = store.add(&service(&fetcher), &place("York", 53.96, -1.08), 5).await.unwrap();

        assert!(!store.remove("missing").unwrap());
        assert!(store.remove(&fav.id).unwrap());
        assert!(store.get(&fav.id).is_none());
        assert!(FavoritesStore::open(&path).unwrap().list().is_empty());
    }

    #[tokio::test]
    async fn refresh_keeps_old_values_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        let clock = Arc::new(crate::clock::ManualClock::new(0));
        let svc = service(&fetcher).with_clock(clock.clone());
        fetcher.push_ok(current_weather_json("A", 10.0, 10.0, 10.0));
        fetcher.push_ok(current_weather_json("B", 20.0, 20.0, 20.0));

        let mut store = FavoritesStore::open(dir.path().join("f.json")).unwrap();
        store.add(&svc, &place("A", 10.0, 10.0), 1).await.unwrap();
        store.add(&svc, &place("B", 20.0, 20.0), 2).await.unwrap();

        // expire cached snapshots so refresh goes to the network
        clock.advance(crate::cache::DEFAULT_TTL_MILLIS);
        let mut a = current_weather_json("A", 11.0, 10.0, 10.0);
        a["weather"][0]["main"] = serde_json::json!("Rain");
        fetcher.push_ok(a);
        fetcher.push_err(FetchError::RateLimited);

        let updated = store.refresh(&svc).await.unwrap();

        assert_eq!(updated, 1);
        assert_eq!(store.list()[0].temperature_celsius, 11.0);
        assert_eq!(store.list()[0].condition_main, "Rain");
        assert_eq!(store.list()[1].temperature_celsius, 20.0);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.json");
        fs::write(&path, "not json").unwrap();

        let err = FavoritesStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse favorites file"));
    }

    #[test]
    fn legacy_records_without_current_flag_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.json");
        fs::write(
            &path,
            r#"[{"id":"x","name":"Oslo","country":"NO","state":null,"latitude":59.9,
                "longitude":10.7,"temperature_celsius":-2.0,"condition_main":"Snow",
                "condition_icon_code":"13d","date_added_millis":3}]"#,
        )
        .unwrap();

        let store = FavoritesStore::open(&path).unwrap();
        assert!(!store.list()[0].is_current_location);
        assert!(store.list()[0].is_near(59.905, 10.695));
    }
}
