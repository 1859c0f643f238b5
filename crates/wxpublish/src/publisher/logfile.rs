//! Appends one formatted line per cycle to a local file.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::io::AsyncWriteExt;

use super::{PublishError, Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo, TIMESTAMP_FORMAT};

/// Appends one `|`-separated line per cycle to the file named by `host`.
pub struct LogFile;

impl LogFile {
    pub fn new() -> Self {
        Self
    }
}

pub fn format_line(obs: &Observation, metric: bool, now: NaiveDateTime) -> String {
    let (pressure_unit, speed_unit) = if metric { ("mb", "m/s") } else { ("inHg", "mph") };
    format!(
        "{}|{:.2}{}|{:.2}|{:.2}|{:.2}|{:.2}|{:.2}|{:3.0}|{:.1}{}|{:.1}{}|{:.1}%|{:.1}º|{:.1}º\n",
        now.format(TIMESTAMP_FORMAT),
        obs.pressure,
        pressure_unit,
        obs.rainfall_year,
        obs.rainfall_month,
        obs.rainfall_day,
        obs.rainfall_60min,
        obs.rain,
        obs.wind_direction,
        obs.gust_speed,
        speed_unit,
        obs.wind_speed,
        speed_unit,
        obs.humidity,
        obs.dewpoint,
        obs.temperature,
    )
}

#[async_trait]
impl Publisher for LogFile {
    async fn init(&self, config: &DestinationConfig) -> Result<()> {
        if config.host.trim().is_empty() {
            return Err(PublishError::Config("logfile needs a file path in host".into()));
        }
        Ok(())
    }

    async fn update(
        &self,
        config: &DestinationConfig,
        _station: &StationInfo,
        mut observation: Observation,
    ) -> Result<()> {
        if !config.metric {
            observation.to_imperial(Conversion::All);
        }
        let line = format_line(&observation, config.metric, Local::now().naive_local());

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.host.trim())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn line_layout() {
        let obs = Observation {
            pressure: 1013.25,
            rainfall_day: 1.5,
            wind_direction: 270.0,
            wind_speed: 3.0,
            gust_speed: 5.3,
            humidity: 55.0,
            dewpoint: 10.0,
            temperature: 19.96,
            ..Default::default()
        };
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            format_line(&obs, true, now),
            "2024-06-01 08:30:00|1013.25mb|0.00|0.00|1.50|0.00|0.00|270|5.3m/s|3.0m/s|55.0%|10.0º|20.0º\n"
        );
    }

    #[tokio::test]
    async fn update_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.log");
        let config = DestinationConfig {
            service: "logfile".into(),
            host: path.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let log = LogFile::new();
        log.init(&config).await.unwrap();
        for _ in 0..3 {
            log.update(&config, &StationInfo::default(), Observation::default())
                .await
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.lines().all(|l| l.contains("inHg")));
    }
}
