//! SQLite weather log. Statements run on the blocking pool.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{PublishError, Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo};

/// Weather log table, one row per publish cycle.
pub struct SqliteLog {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteLog {
    pub fn new() -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
        }
    }
}

/// Open (or create) the database at `path` and its table.
pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS weather_log (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp       TEXT,
            station         TEXT NOT NULL,
            pressure        REAL NOT NULL,
            temperature     REAL NOT NULL,
            humidity        REAL NOT NULL,
            windspeed       REAL NOT NULL,
            winddirection   REAL NOT NULL,
            gustspeed       REAL NOT NULL,
            gustdirection   REAL NOT NULL,
            rainfall_1min   REAL NOT NULL,
            rainfall_1hr    REAL NOT NULL,
            rainfall_day    REAL NOT NULL,
            rainfall_month  REAL NOT NULL,
            rainfall_year   REAL NOT NULL,
            dewpoint        REAL NOT NULL,
            heatindex       REAL NOT NULL
        );",
    )?;
    Ok(conn)
}

pub fn insert(conn: &Connection, station: &str, obs: &Observation) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO weather_log (timestamp, station, pressure, temperature, humidity,
            windspeed, winddirection, gustspeed, gustdirection, rainfall_1min,
            rainfall_1hr, rainfall_day, rainfall_month, rainfall_year, dewpoint, heatindex)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            obs.timestamp,
            station,
            obs.pressure,
            obs.temperature,
            obs.humidity,
            obs.wind_speed,
            obs.wind_direction,
            obs.gust_speed,
            obs.gust_direction,
            obs.rainfall_minute,
            obs.rainfall_60min,
            obs.rainfall_day,
            obs.rainfall_month,
            obs.rainfall_year,
            obs.dewpoint,
            obs.heatindex,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Publisher for SqliteLog {
    async fn init(&self, config: &DestinationConfig) -> Result<()> {
        if config.host.trim().is_empty() {
            return Err(PublishError::Config(
                "sqlite needs a database path in host".into(),
            ));
        }
        let path = config.host.trim().to_string();
        let conn = tokio::task::spawn_blocking(move || open(Path::new(&path))).await??;
        log::info!("[Database] opened {}", config.host);
        *self.conn.lock().unwrap_or_else(|e| e.into_inner()) = Some(conn);
        Ok(())
    }

    async fn update(
        &self,
        config: &DestinationConfig,
        station: &StationInfo,
        mut observation: Observation,
    ) -> Result<()> {
        if !config.metric {
            observation.to_imperial(Conversion::All);
        }
        let conn = Arc::clone(&self.conn);
        let name = station.name.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            let conn = guard.as_ref().ok_or(PublishError::NotInitialized("sqlite"))?;
            insert(conn, &name, &observation)?;
            Ok(())
        })
        .await?
    }

    async fn cleanup(&self) {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(conn) = conn {
            if let Err((_, e)) = conn.close() {
                log::warn!("[Database] close failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rows_are_appended_per_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");
        let config = DestinationConfig {
            service: "sqlite".into(),
            host: path.to_string_lossy().into_owned(),
            metric: true,
            ..Default::default()
        };
        let station = StationInfo {
            name: "home".into(),
            ..Default::default()
        };

        let db = SqliteLog::new();
        db.init(&config).await.unwrap();
        for t in [10.0, 11.5] {
            let obs = Observation {
                temperature: t,
                ..Default::default()
            };
            db.update(&config, &station, obs).await.unwrap();
        }
        db.cleanup().await;

        let conn = Connection::open(&path).unwrap();
        let temps: Vec<f64> = conn
            .prepare("SELECT temperature FROM weather_log ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(temps, vec![10.0, 11.5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_updates_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");
        let config = DestinationConfig {
            service: "sqlite".into(),
            host: path.to_string_lossy().into_owned(),
            metric: true,
            ..Default::default()
        };
        let db = Arc::new(SqliteLog::new());
        db.init(&config).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let db = Arc::clone(&db);
            let config = config.clone();
            tasks.spawn(async move {
                let obs = Observation {
                    temperature: f64::from(i),
                    ..Default::default()
                };
                db.update(&config, &StationInfo::default(), obs).await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        db.cleanup().await;

        let conn = Connection::open(&path).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM weather_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 8);
    }

    #[tokio::test]
    async fn update_before_init_fails() {
        let db = SqliteLog::new();
        let err = db
            .update(
                &DestinationConfig::default(),
                &StationInfo::default(),
                Observation::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NotInitialized("sqlite")));
    }

    #[tokio::test]
    async fn init_requires_path() {
        let db = SqliteLog::new();
        assert!(db.init(&DestinationConfig::default()).await.is_err());
    }
}
