//! Search-as-you-type debouncing.
//!
//! Each keystroke cancels the pending timer and schedules a new suggestion
//! fetch after the idle window. Every input gets a sequence number; a batch is
//! only published if its number is still the latest issued, so a slow response
//! can never replace the suggestions for newer input.

use parking_lot::Mutex;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::Config,
    geocode::{CitySearch, MIN_QUERY_CHARS},
    model::CitySuggestion,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuggestionBatch {
    pub seq: u64,
    pub query: String,
    pub suggestions: Vec<CitySuggestion>,
}

#[derive(Debug)]
pub struct SuggestionDebouncer {
    search: Arc<CitySearch>,
    window: Duration,
    latest: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    batches: Arc<watch::Sender<SuggestionBatch>>,
}

impl SuggestionDebouncer {
    pub fn new(search: Arc<CitySearch>, window: Duration) -> Self {
        Self {
            search,
            window,
            latest: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            batches: Arc::new(watch::Sender::new(SuggestionBatch::default())),
        }
    }

    /// Debouncer using the configured `search.debounce_ms` idle window.
    pub fn from_config(search: Arc<CitySearch>, config: &Config) -> Self {
        Self::new(search, config.search.debounce())
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionBatch> {
        self.batches.subscribe()
    }

    pub fn latest(&self) -> SuggestionBatch {
        self.batches.borrow().clone()
    }

    /// Feed the current contents of the search box. Returns its sequence number.
    pub fn input(&self, text: &str) -> u64 {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_pending();

        let query = text.trim().to_string();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.batches.send_replace(SuggestionBatch { seq, query, suggestions: Vec::new() });
            return seq;
        }

        let search = Arc::clone(&self.search);
        let latest = Arc::clone(&self.latest);
        let batches = Arc::clone(&self.batches);
        let window = self.window;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let suggestions = search.suggest(&query).await;

            if latest.load(Ordering::SeqCst) != seq {
                tracing::debug!(seq, query = %query, "dropping suggestions for superseded input");
                return;
            }
            batches.send_replace(SuggestionBatch { seq, query, suggestions });
        });
        *self.pending.lock() = Some(handle);

        seq
    }

    pub fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for SuggestionDebouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
