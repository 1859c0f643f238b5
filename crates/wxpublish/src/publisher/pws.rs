//! PWSweather upload, averaged over two minutes.

use async_trait::async_trait;
use chrono::{Local, Timelike, Utc};

use super::http::{self, num};
use super::{Averager, Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo};

const DEFAULT_HOST: &str = "www.pwsweather.com";
const PATH: &str = "/pwsupdate/pwsupdate.php";
const EVERY_MINUTES: u32 = 2;

/// PWSWeather upload, averaged over two minutes.
pub struct PwsWeather {
    client: reqwest::Client,
    averager: Averager,
}

impl PwsWeather {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            averager: Averager::new(EVERY_MINUTES),
        }
    }
}

pub fn query(
    config: &DestinationConfig,
    obs: &Observation,
    date_utc: String,
) -> Vec<(&'static str, String)> {
    vec![
        ("ID", config.name.clone()),
        ("PASSWORD", config.password.clone()),
        ("dateutc", date_utc),
        ("baromin", num(obs.pressure_sealevel)),
        ("dailyrainin", num(obs.rainfall_day)),
        ("rainin", num(obs.rainfall_60min)),
        ("winddir", num(obs.wind_direction)),
        ("windgustmph", num(obs.gust_speed)),
        ("windspeedmph", num(obs.wind_speed)),
        ("humidity", num(obs.humidity)),
        ("dewptf", num(obs.dewpoint)),
        ("tempf", num(obs.temperature)),
        ("monthrainin", num(obs.rainfall_month)),
        ("yearrainin", num(obs.rainfall_year)),
        ("solarradiation", num(obs.solar)),
        ("UV", num(obs.uv)),
        ("softwaretype", "wxpublish".to_string()),
        ("action", "updateraw".to_string()),
    ]
}

#[async_trait]
impl Publisher for PwsWeather {
    async fn update(
        &self,
        config: &DestinationConfig,
        _station: &StationInfo,
        mut observation: Observation,
    ) -> Result<()> {
        if !config.metric {
            observation.to_imperial(Conversion::All);
        }
        let Some(report) = self.averager.offer(&observation, Local::now().minute()) else {
            return Ok(());
        };

        let url = format!("{}{}", http::base_url(&config.host, DEFAULT_HOST), PATH);
        let params = query(config, &report, http::date_utc(Utc::now()));
        http::upload(&self.client, "PWSWeather", &url, &params).await
    }
}
