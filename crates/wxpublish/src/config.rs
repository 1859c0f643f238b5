//! Station and destination configuration.
//!
//! Loaded once at startup from YAML. Every field has a default so a
//! minimal file only needs the station identity and its services.

use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::observation::StationInfo;

/// Upper bound for the shutdown drain of in-flight deliveries.
pub const MAX_SHUTDOWN_GRACE_SECS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub station: StationInfo,
    /// UDP address the hub broadcasts to.
    pub listen: String,
    /// Where rainfall totals are persisted.
    pub rainfall_file: PathBuf,
    pub shutdown_grace_secs: u64,
    /// Bound on deliveries running at the same time.
    pub max_in_flight: usize,
    /// Queued snapshots waiting for the dispatcher.
    pub queue_depth: usize,
    pub services: Vec<DestinationConfig>,
    pub mapping: Vec<SensorMapping>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            station: StationInfo::default(),
            listen: "0.0.0.0:50222".to_string(),
            rainfall_file: PathBuf::from("rainfall.json"),
            shutdown_grace_secs: 5,
            max_in_flight: 64,
            queue_depth: 4,
            services: Vec::new(),
            mapping: Vec::new(),
        }
    }
}

/// One configured destination.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DestinationConfig {
    /// Service tag, e.g. `CWOP` or `MQTT`.
    pub service: String,
    pub enabled: bool,
    pub host: String,
    pub name: String,
    pub password: String,
    /// Service specific extra value (MQTT topic prefix, WeatherBug number).
    pub extra: String,
    pub metric: bool,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            service: String::new(),
            enabled: true,
            host: String::new(),
            name: String::new(),
            password: String::new(),
            extra: String::new(),
            metric: false,
        }
    }
}

/// Display location for an auxiliary sensor.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SensorMapping {
    pub serial_number: String,
    pub location: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid listen address '{0}'")]
    Listen(String),
    #[error("shutdown_grace_secs {0} exceeds 300")]
    Grace(u64),
    #[error("max_in_flight and queue_depth must be at least 1")]
    Bounds,
    #[error("service #{0} has no service name")]
    UnnamedService(usize),
}

impl Config {
    /// Load and validate configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.shutdown_grace_secs > MAX_SHUTDOWN_GRACE_SECS {
            return Err(ConfigError::Grace(self.shutdown_grace_secs));
        }
        if self.max_in_flight == 0 || self.queue_depth == 0 {
            return Err(ConfigError::Bounds);
        }
        if let Some(i) = self
            .services
            .iter()
            .position(|s| s.service.trim().is_empty())
        {
            return Err(ConfigError::UnnamedService(i));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::Listen(self.listen.clone()))
    }

    /// Serial number to location lookup for auxiliary sensors.
    pub fn mapping_table(&self) -> HashMap<String, String> {
        self.mapping
            .iter()
            .map(|m| (m.serial_number.clone(), m.location.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
station:
  name: KXYZ
  location: Backyard
  latitude: 45.5
  longitude: -122.6
  elevation_m: 50
rainfall_file: /tmp/rain.json
services:
  - service: CWOP
    name: EW1234
  - service: MQTT
    enabled: false
    host: localhost
    extra: wx
mapping:
  - serial_number: ST-00000512
    location: Garage
"#;

    #[test]
    fn parse_full_config() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.station.name, "KXYZ");
        assert_eq!(config.station.elevation_m, 50.0);
        assert_eq!(config.listen, "0.0.0.0:50222");
        assert_eq!(config.rainfall_file, PathBuf::from("/tmp/rain.json"));
        assert_eq!(config.services.len(), 2);
        assert!(config.services[0].enabled);
        assert!(!config.services[0].metric);
        assert!(!config.services[1].enabled);
        assert_eq!(config.services[1].extra, "wx");
        assert_eq!(
            config.mapping_table().get("ST-00000512").map(String::as_str),
            Some("Garage")
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.shutdown_grace_secs, 5);
        assert_eq!(config.max_in_flight, 64);
        assert!(config.services.is_empty());
        assert_eq!(config.listen_addr().unwrap().port(), 50222);
    }

    #[test]
    fn unknown_service_is_not_a_config_error() {
        let config = Config::parse("services:\n  - service: Pigeon\n").unwrap();
        assert_eq!(config.services[0].service, "Pigeon");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::parse("listen: not-an-address"),
            Err(ConfigError::Listen(_))
        ));
        assert!(matches!(
            Config::parse("shutdown_grace_secs: 301"),
            Err(ConfigError::Grace(301))
        ));
        assert!(matches!(
            Config::parse("max_in_flight: 0"),
            Err(ConfigError::Bounds)
        ));
        assert!(matches!(
            Config::parse("services:\n  - host: example.com\n"),
            Err(ConfigError::UnnamedService(0))
        ));
        assert!(matches!(
            Config::parse("station: 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = Config::from_file("/nonexistent/wxpublish.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn from_file_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.station.location, "Backyard");
    }
}
