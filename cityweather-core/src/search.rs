//! City search, adding cities from search results, and suggested searches.

use chrono::{Duration, Utc};
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::{
    config::DEFAULT_SUGGESTIONS,
    error::WeatherError,
    model::{AddedCity, CitySearchResult, GeoCandidate},
    provider::WeatherFetch,
    reconcile::CityReconciler,
    store::{CityStore, SearchHistoryStore},
};

pub const SEARCH_LIMIT: u8 = 5;
pub const SUGGESTION_LIMIT: usize = 5;

pub struct CitySearch<'a, F, S> {
    reconciler: &'a CityReconciler<F, S>,
    lang: String,
    /// Seeded into an empty search history.
    defaults: Vec<String>,
}

impl<'a, F, S> CitySearch<'a, F, S>
where
    F: WeatherFetch,
    S: CityStore + SearchHistoryStore,
{
    /// `lang` picks which local name the geocoder result is displayed under.
    pub fn new(reconciler: &'a CityReconciler<F, S>, lang: impl Into<String>) -> Self {
        Self {
            reconciler,
            lang: lang.into(),
            defaults: DEFAULT_SUGGESTIONS.map(String::from).to_vec(),
        }
    }

    /// Replace the names seeded into an empty search history.
    pub fn with_default_suggestions(mut self, names: Vec<String>) -> Self {
        self.defaults = names;
        self
    }

    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let fetcher = self.reconciler.fetcher();
        let hits = fetcher.search_city(query, SEARCH_LIMIT).await?;
        debug!(count = hits.len(), "Geocoding hits");

        let mut seen = HashSet::new();
        Ok(hits
            .iter()
            .filter(|geo| seen.insert(format!("{},{}", geo.lat, geo.lon)))
            .map(|geo| CitySearchResult {
                name: display_name(geo, &self.lang),
                lat: geo.lat,
                lon: geo.lon,
            })
            .collect())
    }

    /// Save a picked search result and remember it as a suggestion.
    pub async fn add_city(
        &self,
        lat: f64,
        lon: f64,
        name: &str,
    ) -> Result<AddedCity, WeatherError> {
        let result = self.reconciler.reconcile(lat, lon, Some(name)).await?;
        self.reconciler.store().record_search(name, Utc::now())?;

        Ok(AddedCity {
            id: result.city.id,
            name: result.city.name,
            lat: result.city.lat,
            lon: result.city.lon,
            is_new: result.is_new,
        })
    }

    /// Most recent searches, seeding the defaults on first use.
    pub fn suggested_cities(&self) -> Result<Vec<String>, WeatherError> {
        let store = self.reconciler.store();
        if store.history_len()? == 0 {
            let now = Utc::now();
            for (index, city) in self.defaults.iter().enumerate() {
                store.record_search(city, now - Duration::seconds(index as i64))?;
            }
        }
        Ok(store.recent_searches(SUGGESTION_LIMIT)?)
    }
}

/// Local name in `lang` if the geocoder has one, the provider name in
/// parentheses when it differs, then the state.
pub fn display_name(geo: &GeoCandidate, lang: &str) -> String {
    let local = geo
        .local_names
        .as_ref()
        .and_then(|names| names.get(lang))
        .filter(|n| !n.is_empty());

    let mut name = match local {
        Some(local) if local != &geo.name => format!("{local} ({})", geo.name),
        Some(local) => local.clone(),
        None => geo.name.clone(),
    };

    if let Some(state) = geo.state.as_deref().filter(|s| !s.is_empty()) {
        name.push_str(", ");
        name.push_str(state);
    }
    name
}
