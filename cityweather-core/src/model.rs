use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Icon code used when the provider returns no weather descriptor.
pub const DEFAULT_ICON: &str = "01d";

/// Validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, WeatherError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);

        if !valid {
            return Err(WeatherError::InvalidCoordinates { lat, lon });
        }

        Ok(Self { lat, lon })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherDescriptor {
    pub description: String,
    pub icon: String,
}

impl WeatherDescriptor {
    /// The first descriptor of a provider list, or the `01d` / empty fallback.
    pub fn primary(list: &[WeatherDescriptor]) -> WeatherDescriptor {
        list.first().cloned().unwrap_or_else(|| WeatherDescriptor {
            description: String::new(),
            icon: DEFAULT_ICON.to_string(),
        })
    }
}

/// Current conditions for a coordinate, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub remote_id: i64,
    pub name: String,
    pub country_code: String,
    pub lat: f64,
    pub lon: f64,
    pub temp_c: f64,
    pub temp_max_c: f64,
    pub temp_min_c: f64,
    pub descriptors: Vec<WeatherDescriptor>,
}

/// One 3-hour entry of the provider's 5-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Epoch seconds.
    pub dt: i64,
    /// `yyyy-MM-dd HH:mm:ss`, as sent by the provider.
    pub dt_txt: String,
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub weather: Vec<WeatherDescriptor>,
}

impl ForecastSample {
    /// Calendar date portion of `dt_txt` (everything before the first space).
    pub fn date_key(&self) -> &str {
        self.dt_txt.split(' ').next().unwrap_or_default()
    }
}

/// A city the user tracks, as persisted in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCity {
    pub id: i64,
    /// Provider city id; 0 for legacy or synthetic rows.
    pub remote_id: i64,
    pub name: String,
    pub country: String,
    pub description: String,
    pub icon: String,
    pub current_temp: i32,
    pub high_temp: i32,
    pub low_temp: i32,
    pub lat: f64,
    pub lon: f64,
    pub sort_order: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl SavedCity {
    pub fn coordinates(&self) -> Result<Coordinates, WeatherError> {
        Coordinates::new(self.lat, self.lon)
    }

    /// Overwrite the weather fields from a fresh fetch.
    ///
    /// Identity (local id, remote id, name, coordinates, ordering) is kept.
    pub fn with_weather(&self, current: &CurrentConditions, now: DateTime<Utc>) -> SavedCity {
        let weather = WeatherDescriptor::primary(&current.descriptors);
        SavedCity {
            description: weather.description,
            icon: weather.icon,
            current_temp: round_half_up(current.temp_c),
            high_temp: round_half_up(current.temp_max_c),
            low_temp: round_half_up(current.temp_min_c),
            updated_at: now,
            ..self.clone()
        }
    }
}

/// A city that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCity {
    pub remote_id: i64,
    pub name: String,
    pub country: String,
    pub description: String,
    pub icon: String,
    pub current_temp: i32,
    pub high_temp: i32,
    pub low_temp: i32,
    pub lat: f64,
    pub lon: f64,
    pub sort_order: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl NewCity {
    pub fn from_conditions(
        current: &CurrentConditions,
        override_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let weather = WeatherDescriptor::primary(&current.descriptors);
        Self {
            remote_id: current.remote_id,
            name: override_name.unwrap_or(&current.name).to_string(),
            country: current.country_code.clone(),
            description: weather.description,
            icon: weather.icon,
            current_temp: round_half_up(current.temp_c),
            high_temp: round_half_up(current.temp_max_c),
            low_temp: round_half_up(current.temp_min_c),
            lat: current.lat,
            lon: current.lon,
            sort_order: None,
            updated_at: now,
        }
    }

    pub fn into_saved(self, id: i64) -> SavedCity {
        SavedCity {
            id,
            remote_id: self.remote_id,
            name: self.name,
            country: self.country,
            description: self.description,
            icon: self.icon,
            current_temp: self.current_temp,
            high_temp: self.high_temp,
            low_temp: self.low_temp,
            lat: self.lat,
            lon: self.lon,
            sort_order: self.sort_order,
            updated_at: self.updated_at,
        }
    }
}

/// Result of reconciling a coordinate against the saved cities.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub city: SavedCity,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyWeather {
    /// "Now" or a two-digit hour of day.
    pub label: String,
    pub temp: i32,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWeather {
    /// "Today" or a weekday abbreviation.
    pub label: String,
    pub high: i32,
    pub low: i32,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub hourly: Vec<HourlyWeather>,
    pub daily: Vec<DailyWeather>,
}

/// A geocoding hit for a free-text city query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCandidate {
    pub name: String,
    #[serde(default)]
    pub local_names: Option<std::collections::HashMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub state: Option<String>,
}

/// A search hit ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CitySearchResult {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Outcome of adding a city from the search screen.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedCity {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub is_new: bool,
}

/// Round to the nearest integer, ties toward positive infinity.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
