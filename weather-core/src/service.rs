use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::{
    cache::WeatherCache,
    clock::{Clock, SystemClock},
    config::Config,
    error::{FetchError, LookupError, LookupTarget},
    fetch::{Fetcher, HttpFetcher},
    model::WeatherSnapshot,
    openweather,
};

/// Entry point for weather data: decides between the cache and the network.
///
/// The service is the only writer of its cache. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct WeatherService {
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    cache: Arc<Mutex<WeatherCache>>,
    weather_url: String,
    api_key: String,
    timeout: Duration,
}

impl WeatherService {
    pub fn new(fetcher: Arc<dyn Fetcher>, api_key: impl Into<String>, config: &Config) -> Self {
        Self {
            fetcher,
            clock: Arc::new(SystemClock),
            cache: Arc::new(Mutex::new(WeatherCache::new(config.cache.ttl_ms))),
            weather_url: config.endpoints.weather_url.clone(),
            api_key: api_key.into(),
            timeout: config.timeouts.weather(),
        }
    }

    /// Build a service backed by the real HTTP client.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;
        Ok(Self::new(Arc::new(HttpFetcher::new()), api_key, config))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<Mutex<WeatherCache>> {
        &self.cache
    }

    /// Always goes to the network. A successful result is also cached under the
    /// coordinates the provider reported, so a later coordinate lookup can hit.
    pub async fn fetch_by_city_name(&self, name: &str) -> Result<WeatherSnapshot, LookupError> {
        let params = [
            ("q", name.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ];

        tracing::info!(city = name, "fetching weather by city");
        let snapshot = self
            .request_snapshot(&params)
            .await
            .map_err(|kind| LookupError::new(kind, LookupTarget::City(name)))
            .inspect_err(|e| tracing::warn!(city = name, error = %e.kind, "city lookup failed"))?;

        let now = self.clock.now_millis();
        let coords = snapshot.coordinates;
        self.cache.lock().put(coords.latitude, coords.longitude, snapshot.clone(), now);

        Ok(snapshot)
    }

    /// Cache first; on a miss fetches and caches the result. Failures leave the
    /// cache untouched.
    pub async fn fetch_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherSnapshot, LookupError> {
        let now = self.clock.now_millis();
        let cached = self.cache.lock().get(lat, lon, now);
        if let Some(snapshot) = cached {
            tracing::debug!(lat, lon, "weather cache hit");
            return Ok(snapshot);
        }
        tracing::debug!(lat, lon, "weather cache miss");

        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ];

        tracing::info!(lat, lon, "fetching weather by coordinates");
        let snapshot = self
            .request_snapshot(&params)
            .await
            .map_err(|kind| LookupError::new(kind, LookupTarget::Coordinates))
            .inspect_err(|e| tracing::warn!(lat, lon, error = %e.kind, "coordinate lookup failed"))?;

        let now = self.clock.now_millis();
        self.cache.lock().put(lat, lon, snapshot.clone(), now);

        Ok(snapshot)
    }

    /// Periodically drop stale cache entries. Abort the returned handle to stop.
    pub fn spawn_cache_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let clock = Arc::clone(&self.clock);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.lock().sweep(clock.now_millis());
                if removed > 0 {
                    tracing::debug!(removed, "swept stale weather cache entries");
                }
            }
        })
    }

    async fn request_snapshot(
        &self,
        params: &[(&str, String)],
    ) -> Result<WeatherSnapshot, FetchError> {
        let body = self.fetcher.request(&self.weather_url, params, self.timeout).await?;
        openweather::parse_current(body)
    }
}
