//! In-memory fetcher used by unit tests.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::FetchError,
    model::{Coordinates, CurrentConditions, ForecastSample, GeoCandidate, WeatherDescriptor},
    provider::WeatherFetch,
};

fn key(at: Coordinates) -> String {
    format!("{:.4},{:.4}", at.lat, at.lon)
}

#[derive(Debug, Default)]
pub struct FakeWeather {
    current: Mutex<HashMap<String, CurrentConditions>>,
    forecast: Mutex<Vec<ForecastSample>>,
    geo: Mutex<Vec<GeoCandidate>>,
    pub current_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeWeather {
    /// Serve `conditions` for requests at `(lat, lon)`; the response reports
    /// the same coordinates.
    pub fn place(&self, lat: f64, lon: f64, remote_id: i64, name: &str, temp: f64) {
        self.set_current(lat, lon, Self::conditions(remote_id, name, lat, lon, temp));
    }

    pub fn conditions(
        remote_id: i64,
        name: &str,
        lat: f64,
        lon: f64,
        temp: f64,
    ) -> CurrentConditions {
        CurrentConditions {
            remote_id,
            name: name.to_string(),
            country_code: "TW".to_string(),
            lat,
            lon,
            temp_c: temp,
            temp_max_c: temp + 3.0,
            temp_min_c: temp - 3.0,
            descriptors: vec![WeatherDescriptor {
                description: "clear sky".to_string(),
                icon: "01d".to_string(),
            }],
        }
    }

    pub fn set_current(&self, lat: f64, lon: f64, conditions: CurrentConditions) {
        let at = Coordinates { lat, lon };
        self.current
            .lock()
            .expect("fake lock")
            .insert(key(at), conditions);
    }

    pub fn remove(&self, lat: f64, lon: f64) {
        self.current
            .lock()
            .expect("fake lock")
            .remove(&key(Coordinates { lat, lon }));
    }

    pub fn set_forecast(&self, samples: Vec<ForecastSample>) {
        *self.forecast.lock().expect("fake lock") = samples;
    }

    pub fn set_geo(&self, hits: Vec<GeoCandidate>) {
        *self.geo.lock().expect("fake lock") = hits;
    }
}

#[async_trait]
impl WeatherFetch for FakeWeather {
    async fn fetch_current(&self, at: Coordinates) -> Result<CurrentConditions, FetchError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.current
            .lock()
            .expect("fake lock")
            .get(&key(at))
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
    }

    async fn fetch_forecast(&self, _at: Coordinates) -> Result<Vec<ForecastSample>, FetchError> {
        Ok(self.forecast.lock().expect("fake lock").clone())
    }

    async fn search_city(&self, _query: &str, limit: u8) -> Result<Vec<GeoCandidate>, FetchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let geo = self.geo.lock().expect("fake lock");
        Ok(geo.iter().take(limit as usize).cloned().collect())
    }
}
