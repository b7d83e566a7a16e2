//! Home-screen state as a plain value updated by a pure reducer.

use crate::model::SavedCity;

#[derive(Debug, Clone, PartialEq)]
pub struct HomeState {
    pub cities: Vec<SavedCity>,
    /// Weather at the device location (or the default city), not persisted.
    pub current_location: Option<SavedCity>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub error: Option<String>,
}

impl Default for HomeState {
    fn default() -> Self {
        Self {
            cities: Vec::new(),
            current_location: None,
            is_loading: true,
            is_refreshing: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HomeAction {
    /// New snapshot from the store's live view.
    CitiesLoaded(Vec<SavedCity>),
    CurrentLocationLoaded(SavedCity),
    RefreshStarted,
    RefreshFinished(Vec<SavedCity>),
    Failed(String),
    ErrorDismissed,
}

pub fn reduce(state: HomeState, action: HomeAction) -> HomeState {
    match action {
        HomeAction::CitiesLoaded(cities) => HomeState {
            cities,
            is_loading: false,
            ..state
        },
        HomeAction::CurrentLocationLoaded(city) => HomeState {
            current_location: Some(city),
            is_loading: false,
            ..state
        },
        HomeAction::RefreshStarted => HomeState {
            is_refreshing: true,
            ..state
        },
        HomeAction::RefreshFinished(cities) => HomeState {
            cities,
            is_refreshing: false,
            is_loading: false,
            ..state
        },
        // Cached cities stay on screen; the error is a transient notice.
        HomeAction::Failed(message) => HomeState {
            error: Some(message),
            is_loading: false,
            is_refreshing: false,
            ..state
        },
        HomeAction::ErrorDismissed => HomeState {
            error: None,
            ..state
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn city(id: i64, temp: i32) -> SavedCity {
        SavedCity {
            id,
            remote_id: id * 100,
            name: format!("city {id}"),
            country: "TW".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
            current_temp: temp,
            high_temp: temp + 2,
            low_temp: temp - 2,
            lat: 25.0,
            lon: 121.5,
            sort_order: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn initial_state_is_loading() {
        let state = HomeState::default();
        assert!(state.is_loading);
        assert!(state.cities.is_empty());
    }

    #[test]
    fn refresh_cycle() {
        let loaded = HomeAction::CitiesLoaded(vec![city(1, 20)]);
        let state = reduce(HomeState::default(), loaded);
        assert!(!state.is_loading);

        let state = reduce(state, HomeAction::RefreshStarted);
        assert!(state.is_refreshing);

        let state = reduce(state, HomeAction::RefreshFinished(vec![city(1, 25)]));
        assert!(!state.is_refreshing);
        assert_eq!(state.cities[0].current_temp, 25);
    }

    #[test]
    fn failure_keeps_cached_cities() {
        let loaded = HomeAction::CitiesLoaded(vec![city(1, 20), city(2, 22)]);
        let state = reduce(HomeState::default(), loaded);
        let state = reduce(state, HomeAction::RefreshStarted);
        let state = reduce(state, HomeAction::Failed("Network error".into()));

        assert_eq!(state.cities.len(), 2);
        assert!(!state.is_refreshing);
        assert_eq!(state.error.as_deref(), Some("Network error"));

        let state = reduce(state, HomeAction::ErrorDismissed);
        assert!(state.error.is_none());
        assert_eq!(state.cities.len(), 2);
    }

    #[test]
    fn retry_clears_the_notice_only_once_dismissed() {
        let loaded = HomeAction::CitiesLoaded(vec![city(1, 20)]);
        let state = reduce(HomeState::default(), loaded);
        let state = reduce(state, HomeAction::Failed("Network error".into()));

        let restarted = reduce(state.clone(), HomeAction::RefreshStarted);
        assert!(restarted.error.is_some());

        let state = reduce(state, HomeAction::ErrorDismissed);
        let state = reduce(state, HomeAction::RefreshStarted);
        assert!(state.is_refreshing);
        assert!(state.error.is_none());

        let state = reduce(state, HomeAction::RefreshFinished(vec![city(1, 24)]));
        assert!(!state.is_refreshing);
        assert_eq!(state.cities[0].current_temp, 24);
    }

    #[test]
    fn current_location_is_separate_from_saved_cities() {
        let located = HomeAction::CurrentLocationLoaded(city(9, 30));
        let state = reduce(HomeState::default(), located);
        assert_eq!(state.current_location.as_ref().map(|c| c.id), Some(9));
        assert!(state.cities.is_empty());
    }
}
