//! Citizen Weather Observer Program upload over APRS-IS.

use async_trait::async_trait;
use chrono::{DateTime, Local, Timelike, Utc};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::{Averager, PublishError, Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo};

const DEFAULT_HOST: &str = "cwop.aprs.net";
const PORT: u16 = 14580;
const EVERY_MINUTES: u32 = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// APRS-IS servers drop packets sent right after the login line.
const LOGIN_SETTLE: Duration = Duration::from_secs(2);

/// CWOP weather report, averaged over ten minutes.
pub struct Cwop {
    averager: Averager,
}

impl Cwop {
    pub fn new() -> Self {
        Self {
            averager: Averager::new(EVERY_MINUTES),
        }
    }
}

/// `DDMM.mmN` form of a latitude.
pub fn aprs_latitude(degrees: f64) -> String {
    let hemisphere = if degrees < 0.0 { 'S' } else { 'N' };
    let (deg, min) = split_degrees(degrees.abs());
    format!("{:02}{:05.2}{}", deg, min, hemisphere)
}

/// `DDDMM.mmE` form of a longitude.
pub fn aprs_longitude(degrees: f64) -> String {
    let hemisphere = if degrees < 0.0 { 'W' } else { 'E' };
    let (deg, min) = split_degrees(degrees.abs());
    format!("{:03}{:05.2}{}", deg, min, hemisphere)
}

fn split_degrees(abs: f64) -> (u32, f64) {
    let mut deg = abs.trunc() as u32;
    let mut min = ((abs - abs.trunc()) * 60.0 * 100.0).round() / 100.0;
    if min >= 60.0 {
        deg += 1;
        min = 0.0;
    }
    (deg, min)
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

/// Login line sent before the report.
pub fn login_line(callsign: &str) -> String {
    format!(
        "user {} pass -1 vers wxpublish {}\r\n",
        callsign,
        env!("CARGO_PKG_VERSION")
    )
}

/// APRS positionless-time weather report.
///
/// Expects temperatures in °F, speeds in mph and rain in inches, with
/// pressure still in millibars.
pub fn aprs_packet(
    callsign: &str,
    station: &StationInfo,
    report: &Observation,
    now: DateTime<Utc>,
) -> String {
    let humidity = match round(report.humidity) {
        100 => 0,
        h => h,
    };
    format!(
        "{}>APRS,TCPIP*:@{}z{}/{}_{:03}/{:03}g{:03}t{:03}r{:03}P{:03}h{:02}b{:05}L{:03}\r\n",
        callsign,
        now.format("%d%H%M"),
        aprs_latitude(station.latitude),
        aprs_longitude(station.longitude),
        round(report.wind_direction),
        round(report.wind_speed),
        round(report.gust_speed),
        round(report.temperature),
        round(report.rainfall_60min * 100.0),
        round(report.rainfall_day * 100.0),
        humidity,
        round(report.pressure * 10.0),
        round(report.solar),
    )
}

fn server_addr(host: &str) -> String {
    let host = host.trim();
    match host {
        "" => format!("{}:{}", DEFAULT_HOST, PORT),
        h if h.contains(':') => h.to_string(),
        h => format!("{}:{}", h, PORT),
    }
}

#[async_trait]
impl Publisher for Cwop {
    async fn init(&self, config: &DestinationConfig) -> Result<()> {
        if config.name.trim().is_empty() {
            return Err(PublishError::Config("CWOP needs a station callsign in name".into()));
        }
        Ok(())
    }

    async fn update(
        &self,
        config: &DestinationConfig,
        station: &StationInfo,
        mut observation: Observation,
    ) -> Result<()> {
        observation.to_imperial(Conversion::KeepPressure);
        let Some(report) = self.averager.offer(&observation, Local::now().minute()) else {
            return Ok(());
        };

        let packet = aprs_packet(&config.name, station, &report, Utc::now());
        log::debug!("[CWOP] {}", packet.trim_end());

        let addr = server_addr(&config.host);
        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {} timed out", addr),
                )
            })??;

        stream.write_all(login_line(&config.name).as_bytes()).await?;
        tokio::time::sleep(LOGIN_SETTLE).await;
        stream.write_all(packet.as_bytes()).await?;
        stream.shutdown().await?;

        log::info!("[CWOP] report sent to {}", addr);
        Ok(())
    }
}
