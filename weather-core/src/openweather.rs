//! Wire schema for the OpenWeatherMap current-weather and direct-geocoding
//! responses.
//!
//! Bodies are deserialized into the structs below and then validated; any
//! missing or out-of-range field is reported as an unknown-server failure
//! instead of producing a half-filled snapshot.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::FetchError,
    model::{CitySuggestion, Coordinates, WeatherSnapshot},
};

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    coord: OwCoord,
    visibility: Option<u32>,
    sys: Option<OwSys>,
}

#[derive(Debug, Deserialize)]
struct OwGeocodeEntry {
    name: String,
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

pub fn parse_current(body: Value) -> Result<WeatherSnapshot, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_value(body)
        .map_err(|e| FetchError::malformed(format!("invalid current weather body: {e}")))?;

    if parsed.main.humidity > 100 {
        return Err(FetchError::malformed(format!(
            "humidity out of range: {}",
            parsed.main.humidity
        )));
    }

    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::malformed("current weather body has no conditions"))?;

    Ok(WeatherSnapshot {
        location_name: parsed.name,
        temperature_celsius: parsed.main.temp,
        feels_like_celsius: parsed.main.feels_like,
        humidity_percent: parsed.main.humidity,
        pressure_hpa: parsed.main.pressure,
        wind_speed_mps: parsed.wind.speed,
        condition_main: condition.main,
        condition_description: condition.description,
        condition_icon_code: condition.icon,
        visibility_meters: parsed.visibility,
        coordinates: Coordinates { latitude: parsed.coord.lat, longitude: parsed.coord.lon },
        country_code: parsed.sys.and_then(|s| s.country),
    })
}

pub fn parse_geocode(body: Value) -> Result<Vec<CitySuggestion>, FetchError> {
    let entries: Vec<OwGeocodeEntry> = serde_json::from_value(body)
        .map_err(|e| FetchError::malformed(format!("invalid geocoding body: {e}")))?;

    Ok(entries
        .into_iter()
        .map(|e| CitySuggestion {
            name: e.name,
            country: e.country,
            state: e.state,
            latitude: e.lat,
            longitude: e.lon,
        })
        .collect())
}
