//! SQLite-backed city store.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{CityStore, SearchHistoryStore};
use crate::{
    error::StoreError,
    model::{NewCity, SavedCity},
};

const CITY_COLUMNS: &str = "id, remote_id, name, country, description, icon, current_temp, \
     high_temp, low_temp, lat, lon, sort_order, updated_at";

pub struct SqliteCityStore {
    conn: Mutex<Connection>,
    live: watch::Sender<Vec<SavedCity>>,
}

impl SqliteCityStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        let (live, _) = watch::channel(Vec::new());
        let store = Self {
            conn: Mutex::new(conn),
            live,
        };
        store.publish();
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn publish(&self) {
        match self.list_all() {
            Ok(cities) => {
                self.live.send_replace(cities);
            }
            Err(e) => warn!("Failed to publish saved cities snapshot: {e}"),
        }
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS city_weather (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL,
            country TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            icon TEXT NOT NULL,
            current_temp INTEGER NOT NULL,
            high_temp INTEGER NOT NULL,
            low_temp INTEGER NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL,
            sort_order INTEGER,
            updated_at INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_city_remote_id
            ON city_weather(remote_id) WHERE remote_id != 0;

        CREATE TABLE IF NOT EXISTS search_history (
            city_name TEXT PRIMARY KEY,
            searched_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn row_to_city(row: &Row<'_>) -> rusqlite::Result<SavedCity> {
    let updated_ms: i64 = row.get(12)?;
    Ok(SavedCity {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        name: row.get(2)?,
        country: row.get(3)?,
        description: row.get(4)?,
        icon: row.get(5)?,
        current_temp: row.get(6)?,
        high_temp: row.get(7)?,
        low_temp: row.get(8)?,
        lat: row.get(9)?,
        lon: row.get(10)?,
        sort_order: row.get(11)?,
        updated_at: DateTime::from_timestamp_millis(updated_ms).unwrap_or_default(),
    })
}

impl CityStore for SqliteCityStore {
    fn find_by_remote_id(&self, remote_id: i64) -> Result<Option<SavedCity>, StoreError> {
        let conn = self.lock()?;
        let city = conn
            .query_row(
                &format!(
                    "SELECT {CITY_COLUMNS} FROM city_weather \
                     WHERE remote_id = ?1 AND remote_id != 0"
                ),
                params![remote_id],
                row_to_city,
            )
            .optional()?;
        Ok(city)
    }

    fn get(&self, id: i64) -> Result<Option<SavedCity>, StoreError> {
        let conn = self.lock()?;
        let city = conn
            .query_row(
                &format!("SELECT {CITY_COLUMNS} FROM city_weather WHERE id = ?1"),
                params![id],
                row_to_city,
            )
            .optional()?;
        Ok(city)
    }

    fn insert(&self, city: &NewCity) -> Result<i64, StoreError> {
        let id = {
            let conn = self.lock()?;
            conn.execute(
                r#"
                INSERT INTO city_weather
                (remote_id, name, country, description, icon, current_temp,
                 high_temp, low_temp, lat, lon, sort_order, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    city.remote_id,
                    city.name,
                    city.country,
                    city.description,
                    city.icon,
                    city.current_temp,
                    city.high_temp,
                    city.low_temp,
                    city.lat,
                    city.lon,
                    city.sort_order,
                    city.updated_at.timestamp_millis(),
                ],
            )?;
            conn.last_insert_rowid()
        };
        debug!(id, remote_id = city.remote_id, "Inserted city");
        self.publish();
        Ok(id)
    }

    fn update(&self, city: &SavedCity) -> Result<(), StoreError> {
        {
            let conn = self.lock()?;
            conn.execute(
                r#"
                UPDATE city_weather SET
                    remote_id = ?2, name = ?3, country = ?4, description = ?5, icon = ?6,
                    current_temp = ?7, high_temp = ?8, low_temp = ?9, lat = ?10, lon = ?11,
                    sort_order = ?12, updated_at = ?13
                WHERE id = ?1
                "#,
                params![
                    city.id,
                    city.remote_id,
                    city.name,
                    city.country,
                    city.description,
                    city.icon,
                    city.current_temp,
                    city.high_temp,
                    city.low_temp,
                    city.lat,
                    city.lon,
                    city.sort_order,
                    city.updated_at.timestamp_millis(),
                ],
            )?;
        }
        self.publish();
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        {
            let conn = self.lock()?;
            conn.execute("DELETE FROM city_weather WHERE id = ?1", params![id])?;
        }
        self.publish();
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<SavedCity>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CITY_COLUMNS} FROM city_weather \
             ORDER BY sort_order IS NULL, sort_order ASC, id DESC"
        ))?;
        let rows = stmt.query_map([], row_to_city)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn subscribe(&self) -> watch::Receiver<Vec<SavedCity>> {
        self.live.subscribe()
    }
}

impl SearchHistoryStore for SqliteCityStore {
    fn history_len(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM search_history", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn recent_searches(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT city_name FROM search_history ORDER BY searched_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |r| r.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }

    fn record_search(&self, name: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO search_history (city_name, searched_at) VALUES (?1, ?2)",
            params![name, at.timestamp_millis()],
        )?;
        Ok(())
    }
}
