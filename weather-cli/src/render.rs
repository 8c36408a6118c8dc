//! Plain-text formatting of weather, suggestions and saved locations.

use chrono::DateTime;
use std::fmt::Write;
use weather_core::{CitySuggestion, FavoriteLocation, TemperatureUnit, WeatherState};

pub fn weather(state: &WeatherState) -> String {
    let Some(w) = &state.current_weather else {
        return "No weather loaded.".to_string();
    };
    let unit = state.unit_preference;

    let mut out = String::new();
    let place = match &w.country_code {
        Some(country) => format!("{}, {}", w.location_name, country),
        None => w.location_name.clone(),
    };
    let _ = writeln!(out, "{place} ({:.4}, {:.4})", w.coordinates.latitude, w.coordinates.longitude);
    let _ = writeln!(
        out,
        "  {}{}  {} ({})",
        state.display_temperature().unwrap_or_default(),
        unit.symbol(),
        w.condition_main,
        w.condition_description,
    );
    let feels_like = state.display_feels_like().unwrap_or_default();
    let _ = writeln!(out, "  Feels like  {feels_like}{}", unit.symbol());
    let _ = writeln!(out, "  Humidity    {}%", w.humidity_percent);
    let _ = writeln!(out, "  Wind        {:.1} m/s", w.wind_speed_mps);
    let _ = write!(out, "  Pressure    {:.0} hPa", w.pressure_hpa);
    if let Some(v) = w.visibility_meters {
        let _ = write!(out, "\n  Visibility  {:.1} km", f64::from(v) / 1000.0);
    }
    out
}

pub fn suggestions(found: &[CitySuggestion]) -> String {
    found
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{:>2}. {s}  ({:.4}, {:.4})", i + 1, s.latitude, s.longitude))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn favorites(saved: &[FavoriteLocation], unit: TemperatureUnit) -> String {
    if saved.is_empty() {
        return "No saved locations.".to_string();
    }

    saved
        .iter()
        .map(|f| {
            let added = DateTime::from_timestamp_millis(f.date_added_millis)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let country = f.country.as_deref().map(|c| format!(", {c}")).unwrap_or_default();
            format!(
                "{}{country}  {}{} {}  [{}] added {added}",
                f.name,
                unit.convert(f.temperature_celsius),
                unit.symbol(),
                f.condition_main,
                f.id,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
