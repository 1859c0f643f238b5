//! MQTT publisher: one topic per value under a configurable prefix.

use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{PublishError, Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo};

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_PREFIX: &str = "weather";
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

struct Session {
    client: AsyncClient,
    event_loop: JoinHandle<()>,
}

/// Publishes each snapshot field to its own topic under a prefix.
///
/// The broker connection is opened in `init` and kept for the process
/// lifetime. `extra` sets the topic prefix.
pub struct Mqtt {
    session: Mutex<Option<Session>>,
}

impl Mqtt {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }
}

fn broker(host: &str) -> Result<(String, u16)> {
    let host = host.trim();
    if host.is_empty() {
        return Err(PublishError::Config("MQTT needs a broker host".into()));
    }
    match host.rsplit_once(':') {
        Some((name, port)) => {
            let port = port
                .parse()
                .map_err(|_| PublishError::Config(format!("bad MQTT port in '{}'", host)))?;
            Ok((name.to_string(), port))
        }
        None => Ok((host.to_string(), DEFAULT_PORT)),
    }
}

fn prefix(extra: &str) -> &str {
    match extra.trim().trim_end_matches('/') {
        "" => DEFAULT_PREFIX,
        p => p,
    }
}

/// Topic and payload pairs for one snapshot.
pub fn messages(prefix: &str, obs: &Observation) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = [
        ("Temperature", obs.temperature),
        ("Humidity", obs.humidity),
        ("Pressure", obs.pressure),
        ("SeaLevelPressure", obs.pressure_sealevel),
        ("Windspeed", obs.wind_speed),
        ("Winddirection", obs.wind_direction),
        ("Gustspeed", obs.gust_speed),
        ("Gustdirection", obs.gust_direction),
        ("Dewpoint", obs.dewpoint),
        ("Heatindex", obs.heatindex),
        ("Windchill", obs.windchill),
        ("FeelsLike", obs.feelslike),
        ("SolarRadiation", obs.solar),
        ("UVIndex", obs.uv),
        ("Illumination", obs.illumination),
        ("Rain", obs.rain),
        ("RainHour", obs.rainfall_60min),
        ("RainDay", obs.rainfall_day),
        ("RainMonth", obs.rainfall_month),
        ("RainYear", obs.rainfall_year),
        ("Strikes", f64::from(obs.strikes)),
    ]
    .into_iter()
    .map(|(name, value)| (format!("{}/{}", prefix, name), format!("{:.2}", value)))
    .collect();

    out.push((format!("{}/Trend", prefix), obs.trend.to_string()));
    for sensor in &obs.aux_sensors {
        out.push((
            format!("{}/{}/Temperature", prefix, sensor.location),
            format!("{:.2}", sensor.temperature),
        ));
        out.push((
            format!("{}/{}/Humidity", prefix, sensor.location),
            format!("{:.2}", sensor.humidity),
        ));
    }
    out
}

#[async_trait]
impl Publisher for Mqtt {
    async fn init(&self, config: &DestinationConfig) -> Result<()> {
        let (host, port) = broker(&config.host)?;
        let client_id = format!("wxpublish-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, host.clone(), port);
        options.set_keep_alive(KEEP_ALIVE);
        if !config.name.is_empty() {
            options.set_credentials(config.name.clone(), config.password.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 64);
        let event_loop = tokio::spawn(async move {
            loop {
                if let Err(e) = event_loop.poll().await {
                    log::warn!("[MQTT] connection error: {}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        });

        log::info!("[MQTT] connecting to {}:{}", host, port);
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *session = Some(Session { client, event_loop });
        Ok(())
    }

    async fn update(
        &self,
        config: &DestinationConfig,
        _station: &StationInfo,
        mut observation: Observation,
    ) -> Result<()> {
        let client = {
            let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            session
                .as_ref()
                .map(|s| s.client.clone())
                .ok_or(PublishError::NotInitialized("MQTT"))?
        };

        if !config.metric {
            observation.to_imperial(Conversion::All);
        }

        for (topic, payload) in messages(prefix(&config.extra), &observation) {
            client.publish(topic, QoS::AtMostOnce, false, payload).await?;
        }
        Ok(())
    }

    async fn cleanup(&self) {
        let session = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(session) = session {
            if let Err(e) = session.client.disconnect().await {
                log::warn!("[MQTT] disconnect failed: {}", e);
            }
            // Give the event loop a moment to flush the disconnect.
            tokio::time::sleep(Duration::from_millis(100)).await;
            session.event_loop.abort();
        }
    }
}
