//! Merging freshly fetched weather into the saved-city set.
//!
//! Saved cities are keyed by the provider's city id, not by name or
//! coordinate: two searches that land on the same provider city update one
//! row instead of creating a duplicate.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::{
    config::DefaultCity,
    error::WeatherError,
    model::{Coordinates, NewCity, Reconciled, SavedCity},
    provider::WeatherFetch,
    state::{HomeAction, HomeState, reduce},
    store::CityStore,
};

#[derive(Debug)]
pub struct CityReconciler<F, S> {
    fetcher: F,
    store: S,
}

impl<F: WeatherFetch, S: CityStore> CityReconciler<F, S> {
    pub fn new(fetcher: F, store: S) -> Self {
        Self { fetcher, store }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch current weather at `(lat, lon)` and insert or update the
    /// matching saved city.
    ///
    /// `override_name` only applies to a newly inserted city; an existing
    /// city keeps the name it was saved under. Fetch and store errors are
    /// returned as-is.
    #[instrument(skip(self), level = "info")]
    pub async fn reconcile(
        &self,
        lat: f64,
        lon: f64,
        override_name: Option<&str>,
    ) -> Result<Reconciled, WeatherError> {
        let at = Coordinates::new(lat, lon)?;
        let current = self.fetcher.fetch_current(at).await?;
        let now = Utc::now();

        match self.store.find_by_remote_id(current.remote_id)? {
            None => {
                let new_city = NewCity::from_conditions(&current, override_name, now);
                let id = self.store.insert(&new_city)?;
                info!(id, remote_id = current.remote_id, "Saved new city");
                Ok(Reconciled {
                    city: new_city.into_saved(id),
                    is_new: true,
                })
            }
            Some(existing) => {
                let city = SavedCity {
                    country: current.country_code.clone(),
                    lat: current.lat,
                    lon: current.lon,
                    ..existing.with_weather(&current, now)
                };
                self.store.update(&city)?;
                info!(id = city.id, "Updated existing city");
                Ok(Reconciled {
                    city,
                    is_new: false,
                })
            }
        }
    }

    /// Refetch one saved city at its stored coordinates.
    #[instrument(skip(self, city), fields(id = city.id), level = "debug")]
    pub async fn refresh_one(&self, city: &SavedCity) -> Result<SavedCity, WeatherError> {
        let current = self.fetcher.fetch_current(city.coordinates()?).await?;
        let updated = city.with_weather(&current, Utc::now());
        self.store.update(&updated)?;
        Ok(updated)
    }

    /// Refresh every saved city, keeping stale data for the ones that fail.
    ///
    /// Only the initial listing can fail the call. The result has the same
    /// length and order as that listing.
    #[instrument(skip(self), level = "info")]
    pub async fn refresh_all(&self) -> Result<Vec<SavedCity>, WeatherError> {
        let snapshot = self.store.list_all()?;
        let mut refreshed = Vec::with_capacity(snapshot.len());

        for city in snapshot {
            match self.refresh_one(&city).await {
                Ok(updated) => refreshed.push(updated),
                Err(e) => {
                    warn!(id = city.id, name = %city.name, "Keeping stale weather: {e}");
                    refreshed.push(city);
                }
            }
        }

        Ok(refreshed)
    }

    /// Delete a saved city by local id, returning what was removed.
    pub fn remove(&self, id: i64) -> Result<SavedCity, WeatherError> {
        let city = self.store.remove(id)?.ok_or(WeatherError::NotFound(id))?;
        info!(id, "Removed city");
        Ok(city)
    }

    /// Seed the default city when nothing has been saved yet.
    pub async fn ensure_default_city(
        &self,
        default: &DefaultCity,
    ) -> Result<Option<Reconciled>, WeatherError> {
        if !self.store.list_all()?.is_empty() {
            return Ok(None);
        }
        self.reconcile(default.lat, default.lon, Some(&default.name))
            .await
            .map(Some)
    }

    /// Home-screen state at startup.
    ///
    /// On first run the default city is saved and also reported as the
    /// current location. A failed seed leaves an error notice but still
    /// lists whatever is stored.
    pub async fn load_home(&self, default: &DefaultCity) -> HomeState {
        let mut state = HomeState::default();

        match self.ensure_default_city(default).await {
            Ok(Some(seeded)) => {
                state = reduce(state, HomeAction::CurrentLocationLoaded(seeded.city));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Could not add default city: {e}");
                state = reduce(state, HomeAction::Failed(e.user_message()));
            }
        }

        match self.store.list_all() {
            Ok(cities) => reduce(state, HomeAction::CitiesLoaded(cities)),
            Err(e) => {
                let message = WeatherError::from(e).user_message();
                reduce(state, HomeAction::Failed(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FetchError, model::CurrentConditions, store::SqliteCityStore, testing::FakeWeather,
    };
    use std::sync::{Arc, atomic::Ordering};

    type TestReconciler = CityReconciler<Arc<FakeWeather>, SqliteCityStore>;

    fn reconciler() -> TestReconciler {
        let store = SqliteCityStore::in_memory().expect("store opens");
        CityReconciler::new(Arc::new(FakeWeather::default()), store)
    }

    async fn save(r: &TestReconciler, lat: f64, lon: f64, name: Option<&str>) -> Reconciled {
        r.reconcile(lat, lon, name).await.expect("reconciles")
    }

    fn stored(r: &TestReconciler, id: i64) -> SavedCity {
        r.store().get(id).expect("query").expect("row exists")
    }

    #[tokio::test]
    async fn first_reconcile_inserts() {
        let r = reconciler();
        let fake = r.fetcher();
        fake.place(24.1477, 120.6736, 1668399, "Taichung", 26.6);

        let result = save(&r, 24.1477, 120.6736, None).await;

        assert!(result.is_new);
        assert_eq!(result.city.name, "Taichung");
        assert_eq!(result.city.remote_id, 1668399);
        assert_eq!(result.city.current_temp, 27);
        let row = stored(&r, result.city.id);
        assert_eq!(row.remote_id, result.city.remote_id);
        assert_eq!(row.high_temp, result.city.high_temp);
    }

    #[tokio::test]
    async fn override_name_applies_on_insert() {
        let r = reconciler();
        let fake = r.fetcher();
        fake.place(24.1477, 120.6736, 1668399, "Taichung", 26.0);

        let result = save(&r, 24.1477, 120.6736, Some("台中市")).await;

        assert_eq!(result.city.name, "台中市");
    }

    #[tokio::test]
    async fn reconciling_twice_updates_in_place() {
        let r = reconciler();
        let fake = r.fetcher();
        fake.place(24.1477, 120.6736, 1668399, "Taichung", 26.0);

        let first = save(&r, 24.1477, 120.6736, Some("My city")).await;
        fake.place(24.1477, 120.6736, 1668399, "Taichung", 19.0);
        let second = save(&r, 24.1477, 120.6736, Some("Ignored")).await;

        assert!(!second.is_new);
        assert_eq!(second.city.id, first.city.id);
        assert_eq!(second.city.name, "My city");
        assert_eq!(second.city.current_temp, 19);
        assert_eq!(r.store().list_all().expect("list").len(), 1);
    }

    #[tokio::test]
    async fn nearby_coordinate_with_same_remote_id_matches() {
        let r = reconciler();
        let fake = r.fetcher();
        fake.place(25.0330, 121.5654, 1668341, "Taipei", 25.0);
        let nearby = FakeWeather::conditions(1668341, "Taipei", 25.0478, 121.5319, 24.0);
        fake.set_current(25.0400, 121.5600, nearby);

        let first = save(&r, 25.0330, 121.5654, Some("台北市")).await;
        let second = save(&r, 25.0400, 121.5600, None).await;

        assert!(!second.is_new);
        assert_eq!(second.city.id, first.city.id);
        assert_eq!(second.city.name, "台北市");
        // coordinates follow the provider's latest answer
        assert_eq!(second.city.lat, 25.0478);
        assert_eq!(second.city.lon, 121.5319);
    }

    #[tokio::test]
    async fn distinct_places_get_distinct_ids() {
        let r = reconciler();
        let fake = r.fetcher();
        fake.place(25.0330, 121.5654, 1, "Taipei", 25.0);
        fake.place(22.6273, 120.3014, 2, "Kaohsiung", 28.0);
        fake.place(24.1477, 120.6736, 3, "Taichung", 26.0);

        let mut ids = Vec::new();
        for (lat, lon) in [(25.0330, 121.5654), (22.6273, 120.3014), (24.1477, 120.6736)] {
            let result = save(&r, lat, lon, None).await;
            assert!(result.is_new);
            ids.push(result.city.id);
        }

        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn fetch_failure_propagates_and_saves_nothing() {
        let r = reconciler();

        let err = r.reconcile(10.0, 10.0, None).await.unwrap_err();

        let WeatherError::Fetch(FetchError::Status { status, .. }) = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(status, 503);
        assert!(r.store().list_all().expect("list").is_empty());
    }

    #[tokio::test]
    async fn invalid_coordinates_fail_before_fetching() {
        let r = reconciler();

        let err = r.reconcile(120.0, 10.0, None).await.unwrap_err();

        assert!(matches!(err, WeatherError::InvalidCoordinates { .. }));
        assert_eq!(r.fetcher().current_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_descriptors_use_default_icon() {
        let r = reconciler();
        let nowhere = CurrentConditions {
            remote_id: 11,
            name: "Nowhere".into(),
            country_code: String::new(),
            lat: 1.0,
            lon: 2.0,
            temp_c: 30.0,
            temp_max_c: 31.0,
            temp_min_c: 29.0,
            descriptors: vec![],
        };
        r.fetcher().set_current(1.0, 2.0, nowhere);

        let result = save(&r, 1.0, 2.0, None).await;

        assert_eq!(result.city.icon, "01d");
        assert_eq!(result.city.description, "");
    }

    #[tokio::test]
    async fn refresh_all_tolerates_individual_failures() {
        let r = reconciler();
        let fake = r.fetcher();
        fake.place(25.0330, 121.5654, 1, "Taipei", 25.0);
        fake.place(22.6273, 120.3014, 2, "Kaohsiung", 28.0);
        fake.place(24.1477, 120.6736, 3, "Taichung", 26.0);
        for (lat, lon) in [(25.0330, 121.5654), (22.6273, 120.3014), (24.1477, 120.6736)] {
            save(&r, lat, lon, None).await;
        }
        let before = r.store().list_all().expect("list");

        fake.remove(22.6273, 120.3014);
        fake.place(25.0330, 121.5654, 1, "Taipei", 11.0);
        fake.place(24.1477, 120.6736, 3, "Taichung", 12.0);

        let after = r.refresh_all().await.expect("refreshes");

        assert_eq!(after.len(), before.len());
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(old.id, new.id);
            assert_eq!(old.name, new.name);
            if old.remote_id == 2 {
                assert_eq!(new, old);
            } else {
                assert_ne!(new.current_temp, old.current_temp);
            }
        }
        let rows = r.store().list_all().expect("list");
        let taipei = rows.iter().find(|c| c.remote_id == 1);
        assert_eq!(taipei.map(|c| c.current_temp), Some(11));
    }

    #[tokio::test]
    async fn refresh_all_on_empty_store() {
        let r = reconciler();
        assert!(r.refresh_all().await.expect("refresh").is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_and_reports_missing() {
        let r = reconciler();
        r.fetcher().place(25.0330, 121.5654, 1, "Taipei", 25.0);
        let added = save(&r, 25.0330, 121.5654, None).await;

        let removed = r.remove(added.city.id).expect("removes");
        assert_eq!(removed.id, added.city.id);
        assert_eq!(removed.name, "Taipei");
        assert!(r.store().list_all().expect("list").is_empty());

        let err = r.remove(added.city.id).unwrap_err();
        assert!(matches!(err, WeatherError::NotFound(_)));
    }

    #[tokio::test]
    async fn removed_city_is_reinserted_as_new() {
        let r = reconciler();
        r.fetcher().place(25.0330, 121.5654, 1, "Taipei", 25.0);
        let first = save(&r, 25.0330, 121.5654, None).await;
        r.remove(first.city.id).expect("removes");

        let second = save(&r, 25.0330, 121.5654, None).await;

        assert!(second.is_new);
        assert_ne!(second.city.id, first.city.id);
    }

    #[tokio::test]
    async fn default_city_only_seeded_when_empty() {
        let r = reconciler();
        let default = DefaultCity::default();
        let fake = r.fetcher();
        fake.place(default.lat, default.lon, 1668341, "Taipei", 25.0);

        let seeded = r.ensure_default_city(&default).await.expect("seeds");
        let seeded = seeded.expect("inserted");
        assert!(seeded.is_new);
        assert_eq!(seeded.city.name, "台北市");

        let again = r.ensure_default_city(&default).await.expect("no-op");
        assert!(again.is_none());
        assert_eq!(fake.current_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_home_load_reports_default_city_as_current_location() {
        let r = reconciler();
        let default = DefaultCity::default();
        let fake = r.fetcher();
        fake.place(default.lat, default.lon, 1668341, "Taipei", 25.0);

        let home = r.load_home(&default).await;

        assert!(!home.is_loading);
        assert!(home.error.is_none());
        assert_eq!(home.cities.len(), 1);
        let current = home.current_location.expect("default city shown");
        assert_eq!(current.name, "台北市");
        assert_eq!(current.id, home.cities[0].id);

        let home = r.load_home(&default).await;
        assert!(home.current_location.is_none());
        assert_eq!(home.cities.len(), 1);
    }

    #[tokio::test]
    async fn home_load_survives_failed_default_city() {
        let r = reconciler();

        let home = r.load_home(&DefaultCity::default()).await;

        assert!(!home.is_loading);
        assert!(home.cities.is_empty());
        assert!(home.current_location.is_none());
        let notice = home.error.expect("error notice");
        assert_eq!(notice, "Weather service is unavailable right now");
    }
}
