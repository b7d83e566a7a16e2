//! Core library for the `cityweather` client.
//!
//! This crate defines:
//! - Configuration handling
//! - The OpenWeather client behind the [`WeatherFetch`] port
//! - The SQLite city store behind the [`CityStore`] port
//! - Saved-city reconciliation and forecast aggregation
//! - City search and home-screen state
//!
//! It is used by `cityweather-cli`, but the ports let other front ends reuse it.

pub mod config;
pub mod error;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod reconcile;
pub mod search;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{Config, DefaultCity};
pub use error::{FetchError, StoreError, WeatherError};
pub use forecast::{DayLabels, ForecastAggregator};
pub use model::{
    AddedCity, CitySearchResult, Coordinates, CurrentConditions, DailyWeather, ForecastResult,
    ForecastSample, HourlyWeather, Reconciled, SavedCity, WeatherDescriptor,
};
pub use provider::{OpenWeatherClient, WeatherFetch, icon_url, large_icon_url};
pub use reconcile::CityReconciler;
pub use search::CitySearch;
pub use state::{HomeAction, HomeState, reduce};
pub use store::{CityStore, SearchHistoryStore, SqliteCityStore};
