//! WeatherBug upload, averaged over two minutes.

use async_trait::async_trait;
use chrono::{Local, Timelike, Utc};

use super::http::{self, num};
use super::{Averager, Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo};

const DEFAULT_HOST: &str = "data.backyard2.weatherbug.com";
const PATH: &str = "/data/livedata.aspx";
const EVERY_MINUTES: u32 = 2;

/// WeatherBug backyard station upload, averaged over two minutes.
pub struct WeatherBug {
    client: reqwest::Client,
    averager: Averager,
}

impl WeatherBug {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            averager: Averager::new(EVERY_MINUTES),
        }
    }

    /// Fold in a snapshot and return what to send at this minute, if any.
    fn prepare(
        &self,
        config: &DestinationConfig,
        mut observation: Observation,
        minute: u32,
    ) -> Option<Observation> {
        if !config.metric {
            observation.to_imperial(Conversion::All);
        }
        self.averager.offer(&observation, minute)
    }
}

pub fn query(
    config: &DestinationConfig,
    obs: &Observation,
    date_utc: String,
) -> Vec<(&'static str, String)> {
    vec![
        ("action", "live".to_string()),
        ("ID", config.name.clone()),
        ("Key", config.password.clone()),
        ("Num", config.extra.clone()),
        ("dateutc", date_utc),
        ("softwaretype", "wxpublish".to_string()),
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
        ("monthlyrainin", num(obs.rainfall_month)),
        ("Yearlyrainin", num(obs.rainfall_year)),
    ]
}

#[async_trait]
impl Publisher for WeatherBug {
    async fn update(
        &self,
        config: &DestinationConfig,
        _station: &StationInfo,
        observation: Observation,
    ) -> Result<()> {
        let Some(report) = self.prepare(config, observation, Local::now().minute()) else {
            return Ok(());
        };
        let url = format!("{}{}", http::base_url(&config.host, DEFAULT_HOST), PATH);
        let params = query(config, &report, http::date_utc(Utc::now()));
        http::upload(&self.client, "WeatherBug", &url, &params).await
    }
}
