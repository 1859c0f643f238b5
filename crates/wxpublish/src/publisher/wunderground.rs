//! Weather Underground upload, every cycle in imperial units.

use async_trait::async_trait;
use chrono::Utc;

use super::http::{self, num};
use super::{Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo};

const DEFAULT_HOST: &str = "rtupdate.wunderground.com";
const PATH: &str = "/weatherstation/updateweatherstation.php";

/// Weather Underground personal station upload, sent every cycle.
///
/// The protocol is imperial only, so `metric` is ignored.
pub struct WeatherUnderground {
    client: reqwest::Client,
}

impl WeatherUnderground {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

/// Query parameters for an imperial snapshot.
pub fn query(
    config: &DestinationConfig,
    obs: &Observation,
    date_utc: String,
) -> Vec<(&'static str, String)> {
    vec![
        ("ID", config.name.clone()),
        ("PASSWORD", config.password.clone()),
        ("dateutc", date_utc),
        ("softwaretype", "wxpublish".to_string()),
        ("action", "updateraw".to_string()),
        ("baromin", num(obs.pressure_sealevel)),
        ("dailyrainin", num(obs.rainfall_day)),
        ("rainin", num(obs.rainfall_60min)),
        ("windgustdir", num(obs.gust_direction)),
        ("winddir", num(obs.wind_direction)),
        ("windgustmph", num(obs.gust_speed)),
        ("windspeedmph", num(obs.wind_speed)),
        ("humidity", num(obs.humidity)),
        ("dewptf", num(obs.dewpoint)),
        ("tempf", num(obs.temperature)),
    ]
}

#[async_trait]
impl Publisher for WeatherUnderground {
    async fn update(
        &self,
        config: &DestinationConfig,
        _station: &StationInfo,
        mut observation: Observation,
    ) -> Result<()> {
        observation.to_imperial(Conversion::All);
        let url = format!("{}{}", http::base_url(&config.host, DEFAULT_HOST), PATH);
        let params = query(config, &observation, http::date_utc(Utc::now()));
        http::upload(&self.client, "WeatherUnderground", &url, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carries_credentials_and_imperial_values() {
        let config = DestinationConfig {
            service: "WeatherUnderground".into(),
            name: "KXYZ123".into(),
            password: "secret".into(),
            ..Default::default()
        };
        let mut obs = Observation {
            temperature: 20.0,
            humidity: 50.0,
            wind_speed: 0.44704,
            ..Default::default()
        };
        obs.to_imperial(Conversion::All);

        let params = query(&config, &obs, "2024-01-01 00:00:00".into());
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("ID"), Some("KXYZ123"));
        assert_eq!(get("PASSWORD"), Some("secret"));
        assert_eq!(get("tempf"), Some("68.00"));
        assert_eq!(get("windspeedmph"), Some("1.00"));
        assert_eq!(get("action"), Some("updateraw"));
    }
}
