use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::FetchError,
    model::{Coordinates, CurrentConditions, ForecastSample, GeoCandidate},
};

pub mod openweather;

pub use openweather::{OpenWeatherClient, icon_url, large_icon_url};

/// Source of weather and geocoding data.
#[async_trait]
pub trait WeatherFetch: Send + Sync + Debug {
    async fn fetch_current(&self, at: Coordinates) -> Result<CurrentConditions, FetchError>;

    /// 3-hour samples, ascending by time.
    async fn fetch_forecast(&self, at: Coordinates) -> Result<Vec<ForecastSample>, FetchError>;

    async fn search_city(&self, query: &str, limit: u8) -> Result<Vec<GeoCandidate>, FetchError>;
}

#[async_trait]
impl<T: WeatherFetch + ?Sized> WeatherFetch for std::sync::Arc<T> {
    async fn fetch_current(&self, at: Coordinates) -> Result<CurrentConditions, FetchError> {
        (**self).fetch_current(at).await
    }

    async fn fetch_forecast(&self, at: Coordinates) -> Result<Vec<ForecastSample>, FetchError> {
        (**self).fetch_forecast(at).await
    }

    async fn search_city(&self, query: &str, limit: u8) -> Result<Vec<GeoCandidate>, FetchError> {
        (**self).search_city(query, limit).await
    }
}
