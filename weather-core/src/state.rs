//! Application state container.
//!
//! [`WeatherStore`] owns the single [`WeatherState`] of the process and is the
//! only code that mutates it. The presentation layer reads it with
//! [`WeatherStore::state`] or watches it through [`WeatherStore::subscribe`].
//!
//! A search moves the state through `Idle -> Loading -> Success | Failure`.
//! Loading is entered before the request is awaited; the await is the only
//! suspension point.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;

use crate::{
    error::{BLANK_CITY_MESSAGE, LookupError},
    model::{TemperatureUnit, WeatherSnapshot},
    service::WeatherService,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LastQuery {
    #[default]
    None,
    ByCity(String),
    ByCoordinates { lat: f64, lon: f64 },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherState {
    pub current_weather: Option<WeatherSnapshot>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub unit_preference: TemperatureUnit,
    pub last_query: LastQuery,
}

impl WeatherState {
    /// Current temperature in the preferred unit.
    pub fn display_temperature(&self) -> Option<i64> {
        self.current_weather
            .as_ref()
            .map(|w| self.unit_preference.convert(w.temperature_celsius))
    }

    pub fn display_feels_like(&self) -> Option<i64> {
        self.current_weather
            .as_ref()
            .map(|w| self.unit_preference.convert(w.feels_like_celsius))
    }
}

/// How results of overlapping searches are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RacePolicy {
    /// Every result is applied as it arrives; the slowest response decides the
    /// final state.
    #[default]
    LastResolvedWins,
    /// Only the result of the most recently issued search is applied; earlier
    /// ones are dropped when they resolve.
    LatestRequestWins,
}

#[derive(Debug)]
pub struct WeatherStore {
    service: Arc<WeatherService>,
    state: watch::Sender<WeatherState>,
    policy: RacePolicy,
    issued: AtomicU64,
}

impl WeatherStore {
    pub fn new(service: Arc<WeatherService>) -> Self {
        Self {
            service,
            state: watch::Sender::new(WeatherState::default()),
            policy: RacePolicy::default(),
            issued: AtomicU64::new(0),
        }
    }

    pub fn with_race_policy(mut self, policy: RacePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_unit(self, unit: TemperatureUnit) -> Self {
        self.set_unit_preference(unit);
        self
    }

    pub fn service(&self) -> &Arc<WeatherService> {
        &self.service
    }

    pub fn state(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    pub async fn search_by_city(&self, name: &str) {
        if name.trim().is_empty() {
            self.state.send_modify(|s| s.error_message = Some(BLANK_CITY_MESSAGE.to_string()));
            return;
        }

        let ticket = self.begin(LastQuery::ByCity(name.to_string()));
        let result = self.service.fetch_by_city_name(name).await;
        self.finish(ticket, result);
    }

    pub async fn search_by_coordinates(&self, lat: f64, lon: f64) {
        let ticket = self.begin(LastQuery::ByCoordinates { lat, lon });
        let result = self.service.fetch_by_coordinates(lat, lon).await;
        self.finish(ticket, result);
    }

    pub fn set_unit_preference(&self, unit: TemperatureUnit) {
        self.state.send_modify(|s| s.unit_preference = unit);
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error_message = None);
    }

    /// Repeat whatever search ran last. Does nothing before the first search.
    pub async fn retry_last_query(&self) {
        let last = self.state.borrow().last_query.clone();
        match last {
            LastQuery::None => {}
            LastQuery::ByCity(name) => self.search_by_city(&name).await,
            LastQuery::ByCoordinates { lat, lon } => self.search_by_coordinates(lat, lon).await,
        }
    }

    fn begin(&self, query: LastQuery) -> u64 {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error_message = None;
            s.last_query = query;
        });
        ticket
    }

    fn finish(&self, ticket: u64, result: Result<WeatherSnapshot, LookupError>) {
        if self.policy == RacePolicy::LatestRequestWins
            && ticket != self.issued.load(Ordering::SeqCst)
        {
            tracing::debug!(ticket, "discarding result of superseded search");
            return;
        }

        self.state.send_modify(|s| {
            s.is_loading = false;
            match result {
                Ok(snapshot) => s.current_weather = Some(snapshot),
                Err(err) => {
                    s.error_message = Some(err.message);
                    s.current_weather = None;
                }
            }
        });
    }
}
