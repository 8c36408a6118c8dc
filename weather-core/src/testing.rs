//! Test doubles shared by the unit test modules.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::{collections::VecDeque, time::Duration};

use crate::{
    error::FetchError,
    fetch::Fetcher,
    model::{Coordinates, WeatherSnapshot},
};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub timeout: Duration,
}

impl RecordedCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Replays scripted responses in order and records every call.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    responses: Mutex<VecDeque<(Duration, Result<Value, FetchError>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, body: Value) {
        self.responses.lock().push_back((Duration::ZERO, Ok(body)));
    }

    pub fn push_err(&self, err: FetchError) {
        self.responses.lock().push_back((Duration::ZERO, Err(err)));
    }

    /// Scripted response that only resolves after `delay` of tokio time.
    pub fn push_delayed(&self, delay: Duration, result: Result<Value, FetchError>) {
        self.responses.lock().push_back((delay, result));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, FetchError> {
        self.calls.lock().push(RecordedCall {
            endpoint: endpoint.to_string(),
            params: params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            timeout,
        });

        let next = self.responses.lock().pop_front();
        match next {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(FetchError::NetworkUnreachable("no scripted response".into())),
        }
    }
}

pub fn current_weather_json(name: &str, temp: f64, lat: f64, lon: f64) -> Value {
    json!({
        "coord": {"lon": lon, "lat": lat},
        "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
        "main": {"temp": temp, "feels_like": temp - 1.0, "humidity": 72, "pressure": 1012},
        "visibility": 10000,
        "wind": {"speed": 4.1, "deg": 240},
        "sys": {"country": "GB"},
        "name": name,
        "cod": 200
    })
}

pub fn snapshot(name: &str, temp: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        location_name: name.to_string(),
        temperature_celsius: temp,
        feels_like_celsius: temp,
        humidity_percent: 50,
        pressure_hpa: 1013.0,
        wind_speed_mps: 3.0,
        condition_main: "Clear".into(),
        condition_description: "clear sky".into(),
        condition_icon_code: "01d".into(),
        visibility_meters: None,
        coordinates: Coordinates { latitude: 0.0, longitude: 0.0 },
        country_code: None,
    }
}
