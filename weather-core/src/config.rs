use anyhow::{Context, Result, anyhow, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    cache::{DEFAULT_SWEEP_INTERVAL_MILLIS, DEFAULT_TTL_MILLIS},
    model::TemperatureUnit,
};

pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Provider endpoints. Overridable so tests and proxies can point elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub weather_url: String,
    pub geocoding_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            geocoding_url: "https://api.openweathermap.org/geo/1.0/direct".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub weather_ms: u64,
    pub geocoding_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { weather_ms: 10_000, geocoding_ms: 8_000 }
    }
}

impl TimeoutConfig {
    pub fn weather(&self) -> Duration {
        Duration::from_millis(self.weather_ms)
    }

    pub fn geocoding(&self) -> Duration {
        Duration::from_millis(self.geocoding_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: i64,
    pub sweep_interval_ms: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_ms: DEFAULT_TTL_MILLIS, sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MILLIS }
    }
}

impl CacheConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1) as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of suggestions requested from the geocoding endpoint.
    pub limit: u32,
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { limit: 5, debounce_ms: 300 }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// unit = "fahrenheit"
///
/// [cache]
/// ttl_ms = 300000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub unit: TemperatureUnit,
    pub endpoints: EndpointConfig,
    pub timeouts: TimeoutConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Reject values that would leave the cache or the network unusable.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.cache.ttl_ms > 0, "cache.ttl_ms must be positive, got {}", self.cache.ttl_ms);
        ensure!(
            self.cache.sweep_interval_ms > 0,
            "cache.sweep_interval_ms must be positive, got {}",
            self.cache.sweep_interval_ms
        );
        ensure!(self.timeouts.weather_ms > 0, "timeouts.weather_ms must be positive");
        ensure!(self.timeouts.geocoding_ms > 0, "timeouts.geocoding_ms must be positive");
        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-lookup", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the saved favorites list.
    pub fn favorites_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("favorites.json"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Resolve the API key, preferring `OPENWEATHER_API_KEY` over the stored one.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_with_override(std::env::var(API_KEY_ENV).ok())
    }

    pub fn api_key_with_override(&self, env_key: Option<String>) -> Result<String> {
        env_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `weather configure` or set {API_KEY_ENV}."
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.timeouts.weather(), Duration::from_secs(10));
        assert_eq!(cfg.timeouts.geocoding(), Duration::from_secs(8));
        assert_eq!(cfg.cache.ttl_ms, 5 * 60 * 1000);
        assert_eq!(cfg.cache.sweep_interval(), Duration::from_secs(600));
        assert_eq!(cfg.search.limit, 5);
        assert_eq!(cfg.search.debounce(), Duration::from_millis(300));
        assert_eq!(cfg.unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.api_key_with_override(None).unwrap_err();

        assert!(err.to_string().contains("No OpenWeather API key configured"));
        assert!(err.to_string().contains("weather configure"));
    }

    #[test]
    fn env_key_overrides_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("STORED".into());

        assert_eq!(cfg.api_key_with_override(None).unwrap(), "STORED");
        assert_eq!(cfg.api_key_with_override(Some("ENV".into())).unwrap(), "ENV");
        assert_eq!(cfg.api_key_with_override(Some("  ".into())).unwrap(), "STORED");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            api_key = "abc"
            unit = "fahrenheit"

            [cache]
            ttl_ms = 1000
            "#,
        )
        .expect("valid toml");

        assert_eq!(cfg.api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(cfg.cache.ttl_ms, 1000);
        assert_eq!(cfg.cache.sweep_interval_ms, DEFAULT_SWEEP_INTERVAL_MILLIS);
        assert_eq!(cfg.endpoints, EndpointConfig::default());
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.search.limit = 8;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn out_of_range_values_are_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        for (body, field) in [
            ("[cache]\nttl_ms = -5\n", "cache.ttl_ms"),
            ("[cache]\nsweep_interval_ms = 0\n", "cache.sweep_interval_ms"),
            ("[timeouts]\nweather_ms = 0\n", "timeouts.weather_ms"),
            ("[timeouts]\ngeocoding_ms = 0\n", "timeouts.geocoding_ms"),
        ] {
            fs::write(&path, body).unwrap();
            let err = Config::load_from(&path).unwrap_err();
            assert!(err.to_string().contains("Invalid config file"), "{err:#}");
            assert!(format!("{err:#}").contains(field), "{err:#}");
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }
}
