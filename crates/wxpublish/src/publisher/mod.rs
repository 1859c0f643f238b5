//! Downstream destinations for the consolidated snapshot.
//!
//! Every destination kind implements [`Publisher`]. The registry resolves a
//! configured service tag to one of the kinds in [`ServiceKind`] once at
//! startup; nothing is looked up by name afterwards.

mod average;
mod cwop;
mod display;
mod http;
mod logfile;
mod mqtt;
mod pws;
pub mod registry;
mod sqlite;
mod weatherbug;
mod wunderground;

pub use average::Averager;
pub use registry::{Destination, Registry};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DestinationConfig;
use crate::observation::{Observation, StationInfo};

/// Errors from a destination's own delivery.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid destination config: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0} is not initialized")]
    NotInitialized(&'static str),
}

pub type Result<T> = std::result::Result<T, PublishError>;

/// Lifecycle of one destination.
///
/// `init` runs once before the first cycle and `cleanup` once at shutdown.
/// `update` receives its own copy of the snapshot and may convert it in
/// place. Two cycles may call `update` on the same destination at once if
/// a delivery outlives the gap between cycles.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn init(&self, _config: &DestinationConfig) -> Result<()> {
        Ok(())
    }

    async fn update(
        &self,
        config: &DestinationConfig,
        station: &StationInfo,
        observation: Observation,
    ) -> Result<()>;

    async fn cleanup(&self) {}
}

/// The closed set of destination kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    WeatherUnderground,
    WeatherBug,
    PersonalWeatherStation,
    Cwop,
    Mqtt,
    Sqlite,
    LogFile,
    Display,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 8] = [
        ServiceKind::WeatherUnderground,
        ServiceKind::WeatherBug,
        ServiceKind::PersonalWeatherStation,
        ServiceKind::Cwop,
        ServiceKind::Mqtt,
        ServiceKind::Sqlite,
        ServiceKind::LogFile,
        ServiceKind::Display,
    ];

    /// Resolve a configured service tag (case-insensitive).
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("database") {
            return Some(ServiceKind::Sqlite);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(tag))
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ServiceKind::WeatherUnderground => "WeatherUnderground",
            ServiceKind::WeatherBug => "WeatherBug",
            ServiceKind::PersonalWeatherStation => "PersonalWeatherStation",
            ServiceKind::Cwop => "CWOP",
            ServiceKind::Mqtt => "MQTT",
            ServiceKind::Sqlite => "sqlite",
            ServiceKind::LogFile => "logfile",
            ServiceKind::Display => "Display",
        }
    }

    /// Build a fresh publisher of this kind.
    pub fn create(&self) -> Arc<dyn Publisher> {
        match self {
            ServiceKind::WeatherUnderground => Arc::new(wunderground::WeatherUnderground::new()),
            ServiceKind::WeatherBug => Arc::new(weatherbug::WeatherBug::new()),
            ServiceKind::PersonalWeatherStation => Arc::new(pws::PwsWeather::new()),
            ServiceKind::Cwop => Arc::new(cwop::Cwop::new()),
            ServiceKind::Mqtt => Arc::new(mqtt::Mqtt::new()),
            ServiceKind::Sqlite => Arc::new(sqlite::SqliteLog::new()),
            ServiceKind::LogFile => Arc::new(logfile::LogFile::new()),
            ServiceKind::Display => Arc::new(display::Display::new()),
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_tags() {
        assert_eq!(
            ServiceKind::parse("WeatherUnderground"),
            Some(ServiceKind::WeatherUnderground)
        );
        assert_eq!(ServiceKind::parse("cwop"), Some(ServiceKind::Cwop));
        assert_eq!(ServiceKind::parse(" MQTT "), Some(ServiceKind::Mqtt));
        assert_eq!(ServiceKind::parse("database"), Some(ServiceKind::Sqlite));
        assert_eq!(ServiceKind::parse("LogFile"), Some(ServiceKind::LogFile));
    }

    #[test]
    fn unknown_tags_do_not_resolve() {
        assert_eq!(ServiceKind::parse("Pigeon"), None);
        assert_eq!(ServiceKind::parse(""), None);
    }

    #[test]
    fn every_tag_round_trips() {
        for kind in ServiceKind::ALL {
            assert_eq!(ServiceKind::parse(kind.tag()), Some(kind));
        }
    }
}
