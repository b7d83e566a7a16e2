use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{
    Config,
    error::FetchError,
    model::{Coordinates, CurrentConditions, ForecastSample, GeoCandidate, WeatherDescriptor},
};

use super::WeatherFetch;

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn/";

/// Small (@2x) icon image URL for an OpenWeather icon code.
pub fn icon_url(code: &str) -> String {
    format!("{ICON_BASE_URL}{code}@2x.png")
}

/// Large (@4x) icon image URL for an OpenWeather icon code.
pub fn large_icon_url(code: &str) -> String {
    format!("{ICON_BASE_URL}{code}@4x.png")
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    lang: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, lang: String) -> Self {
        Self::with_base_url(api_key, lang, crate::config::DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, lang: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            lang,
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            api_key: config.api_key()?,
            base_url: config.api_base_url.clone(),
            lang: config.lang.clone(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &'static str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = self.url(path);
        debug!(%url, what, "OpenWeather request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Parse { what, source })
    }

    fn coordinate_query(&self, at: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("lat", at.lat.to_string()),
            ("lon", at.lon.to_string()),
            ("units", "metric".to_string()),
            ("lang", self.lang.clone()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    id: i64,
    name: String,
    coord: OwCoord,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    dt_txt: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

impl From<OwWeather> for WeatherDescriptor {
    fn from(w: OwWeather) -> Self {
        WeatherDescriptor {
            description: w.description,
            icon: w.icon,
        }
    }
}

impl From<OwCurrentResponse> for CurrentConditions {
    fn from(r: OwCurrentResponse) -> Self {
        CurrentConditions {
            remote_id: r.id,
            name: r.name,
            country_code: r.sys.country.unwrap_or_default(),
            lat: r.coord.lat,
            lon: r.coord.lon,
            temp_c: r.main.temp,
            temp_max_c: r.main.temp_max,
            temp_min_c: r.main.temp_min,
            descriptors: r.weather.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<OwForecastEntry> for ForecastSample {
    fn from(e: OwForecastEntry) -> Self {
        ForecastSample {
            dt: e.dt,
            dt_txt: e.dt_txt,
            temp: e.main.temp,
            temp_min: e.main.temp_min,
            temp_max: e.main.temp_max,
            weather: e.weather.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl WeatherFetch for OpenWeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_current(&self, at: Coordinates) -> Result<CurrentConditions, FetchError> {
        let query = self.coordinate_query(at);
        let parsed: OwCurrentResponse = self
            .get_json("data/2.5/weather", "current weather", &query)
            .await?;
        Ok(parsed.into())
    }

    #[instrument(skip(self), level = "info")]
    async fn fetch_forecast(&self, at: Coordinates) -> Result<Vec<ForecastSample>, FetchError> {
        let query = self.coordinate_query(at);
        let parsed: OwForecastResponse = self
            .get_json("data/2.5/forecast", "forecast", &query)
            .await?;
        Ok(parsed.list.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), level = "info")]
    async fn search_city(&self, query: &str, limit: u8) -> Result<Vec<GeoCandidate>, FetchError> {
        self.get_json(
            "geo/1.0/direct",
            "geocoding",
            &[("q", query.to_string()), ("limit", limit.to_string())],
        )
        .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
