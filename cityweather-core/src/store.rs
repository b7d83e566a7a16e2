//! Persistence ports for saved cities and search history.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::{
    error::StoreError,
    model::{NewCity, SavedCity},
};

pub mod sqlite;

pub use sqlite::SqliteCityStore;

/// Record store for saved cities.
///
/// Every mutation is a single-row statement, so an interrupted caller never
/// leaves a half-written city behind.
pub trait CityStore: Send + Sync {
    fn find_by_remote_id(&self, remote_id: i64) -> Result<Option<SavedCity>, StoreError>;

    fn get(&self, id: i64) -> Result<Option<SavedCity>, StoreError>;

    /// Insert and return the assigned local id.
    fn insert(&self, city: &NewCity) -> Result<i64, StoreError>;

    /// Replace the row with the same local id.
    fn update(&self, city: &SavedCity) -> Result<(), StoreError>;

    fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Delete by local id, returning the removed city if there was one.
    fn remove(&self, id: i64) -> Result<Option<SavedCity>, StoreError> {
        let Some(city) = self.get(id)? else {
            return Ok(None);
        };
        self.delete(id)?;
        Ok(Some(city))
    }

    /// One-shot snapshot of all saved cities in display order.
    fn list_all(&self) -> Result<Vec<SavedCity>, StoreError>;

    /// Live view of the saved cities; a new snapshot is published after
    /// every mutation.
    fn subscribe(&self) -> watch::Receiver<Vec<SavedCity>>;
}

/// Recently searched / suggested city names.
pub trait SearchHistoryStore: Send + Sync {
    fn history_len(&self) -> Result<usize, StoreError>;

    /// Most recent names first.
    fn recent_searches(&self, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Insert or bump `name` to `at`.
    fn record_search(&self, name: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

impl<T: CityStore + ?Sized> CityStore for std::sync::Arc<T> {
    fn find_by_remote_id(&self, remote_id: i64) -> Result<Option<SavedCity>, StoreError> {
        (**self).find_by_remote_id(remote_id)
    }

    fn get(&self, id: i64) -> Result<Option<SavedCity>, StoreError> {
        (**self).get(id)
    }

    fn insert(&self, city: &NewCity) -> Result<i64, StoreError> {
        (**self).insert(city)
    }

    fn update(&self, city: &SavedCity) -> Result<(), StoreError> {
        (**self).update(city)
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn list_all(&self) -> Result<Vec<SavedCity>, StoreError> {
        (**self).list_all()
    }

    fn subscribe(&self) -> watch::Receiver<Vec<SavedCity>> {
        (**self).subscribe()
    }
}

impl<T: SearchHistoryStore + ?Sized> SearchHistoryStore for std::sync::Arc<T> {
    fn history_len(&self) -> Result<usize, StoreError> {
        (**self).history_len()
    }

    fn recent_searches(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        (**self).recent_searches(limit)
    }

    fn record_search(&self, name: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).record_search(name, at)
    }
}
