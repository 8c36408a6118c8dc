//! City autocomplete via the direct-geocoding endpoint.
//! Best effort: failures degrade to "no suggestions".

use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    fetch::{Fetcher, HttpFetcher},
    model::CitySuggestion,
    openweather,
};

pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug)]
pub struct CitySearch {
    fetcher: Arc<dyn Fetcher>,
    geocoding_url: String,
    api_key: String,
    limit: u32,
    timeout: Duration,
}

impl CitySearch {
    pub fn new(fetcher: Arc<dyn Fetcher>, api_key: impl Into<String>, config: &Config) -> Self {
        Self {
            fetcher,
            geocoding_url: config.endpoints.geocoding_url.clone(),
            api_key: api_key.into(),
            limit: config.search.limit,
            timeout: config.timeouts.geocoding(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;
        Ok(Self::new(Arc::new(HttpFetcher::new()), api_key, config))
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Suggestions for `query`; empty for short input or on any failure.
    pub async fn suggest(&self, query: &str) -> Vec<CitySuggestion> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        let params = [
            ("q", query.to_string()),
            ("limit", self.limit.to_string()),
            ("appid", self.api_key.clone()),
        ];

        let result = self
            .fetcher
            .request(&self.geocoding_url, &params, self.timeout)
            .await
            .and_then(openweather::parse_geocode);

        match result {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::debug!(query, error = %e, "city search failed, returning no suggestions");
                Vec::new()
            }
        }
    }
}
