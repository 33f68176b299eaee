use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Environment variable that overrides the stored OpenWeather API key.
pub const API_KEY_ENV: &str = "CITYWATCH_OPENWEATHER_KEY";

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_AIR_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Daily heating degree-day report for Oshawa (station 48649).
pub const DEFAULT_REPORT_URL: &str = "https://climate.weather.gc.ca/climate_data/daily_data_e.html?StationID=48649&timeframe=2&StartYear=1840&EndYear=2022&type=bar&MeasTypeID=heatingdegreedays&time=LST&Day=24&Year=2025&Month=1#";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// OpenWeather credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,

    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// The pollution history endpoint is served from its own base.
    #[serde(default = "default_air_base_url")]
    pub air_base_url: String,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            air_base_url: default_air_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegreeDayConfig {
    #[serde(default = "default_report_url")]
    pub report_url: String,

    /// When set, the 5th header cell must contain this label or the
    /// extracted value is discarded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_label: Option<String>,
}

impl Default for DegreeDayConfig {
    fn default() -> Self {
        Self {
            report_url: default_report_url(),
            header_label: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout applied to every outbound call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: DEFAULT_TIMEOUT_SECS }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// JSON feeds for the power-grid collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerConfig {
    pub data_url: Option<String>,
    pub generation_url: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// catalog = "/home/me/cities.json"
///
/// [openweather]
/// api_key = "..."
///
/// [http]
/// timeout_secs = 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to the city catalog; defaults to `cities.json` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    #[serde(default)]
    pub openweather: OpenWeatherConfig,

    #[serde(default)]
    pub degree_day: DegreeDayConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub power: PowerConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    /// The API key environment variable wins over the stored key.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = if path.exists() {
            Self::load_from(&path)?
        } else {
            // First run: no config file.
            Self::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            cfg.apply_api_key_override(Some(key));
        }

        Ok(cfg)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("ca", "city-watch", "citywatch")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// The configured catalog path, or `cities.json` in the config directory.
    pub fn catalog_path(&self) -> Result<PathBuf> {
        match &self.catalog {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.config_dir().join("cities.json")),
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }

    fn apply_api_key_override(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.openweather.api_key = Some(key);
        }
    }

    /// Returns the OpenWeather API key, if present.
    pub fn api_key(&self) -> Option<&str> {
        self.openweather.api_key.as_deref()
    }

    /// Like [`Config::api_key`] but fails with a setup hint.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key().ok_or_else(|| {
            anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `citywatch configure` or set {API_KEY_ENV}."
            )
        })
    }
}

fn default_weather_base_url() -> String {
    DEFAULT_WEATHER_BASE_URL.to_string()
}

fn default_air_base_url() -> String {
    DEFAULT_AIR_BASE_URL.to_string()
}

fn default_report_url() -> String {
    DEFAULT_REPORT_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
