use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/";

/// Names shown as suggestions before anything has been searched.
pub const DEFAULT_SUGGESTIONS: [&str; 4] = ["Tokyo", "London", "New York", "Sydney"];

/// City seeded into an empty store on first run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultCity {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Default for DefaultCity {
    fn default() -> Self {
        Self {
            name: "台北市".to_string(),
            lat: 25.0330,
            lon: 121.5654,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// lang = "zh_tw"
/// timezone = "Asia/Taipei"
/// suggested_cities = ["高雄", "桃園", "台中", "新竹"]
///
/// [default_city]
/// name = "台北市"
/// lat = 25.033
/// lon = 121.5654
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    /// Language passed to the provider for descriptions and local names.
    pub lang: String,
    /// IANA timezone used for hour-of-day labels.
    pub timezone: String,
    pub request_timeout_secs: u64,
    pub database_path: Option<PathBuf>,
    pub default_city: DefaultCity,
    /// Seeded into an empty search history, most prominent first.
    pub suggested_cities: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            lang: "en".to_string(),
            timezone: "Asia/Taipei".to_string(),
            request_timeout_secs: 10,
            database_path: None,
            default_city: DefaultCity::default(),
            suggested_cities: DEFAULT_SUGGESTIONS.map(String::from).to_vec(),
        }
    }
}

impl Config {
    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Result<String> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        if let Some(key) = from_env.filter(|k| !k.trim().is_empty()) {
            return Ok(key);
        }

        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key.to_string()),
            _ => Err(anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `cityweather configure` or set {API_KEY_ENV}."
            )),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone '{}': {e}", self.timezone))
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents).with_context(|| {
            format!("Failed to parse config file: {}", path.display())
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.timezone()?;
        Ok(cfg)
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

        fs::write(&path, toml).with_context(|| {
            format!("Failed to write config file: {}", path.display())
        })?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Configured database path, or `cities.db` in the platform data dir.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        Ok(Self::project_dirs()?.data_dir().join("cities.db"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "cityweather", "cityweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}
