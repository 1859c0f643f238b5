//! Test helpers for dispatch scenarios

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use wxpublish::config::DestinationConfig;
use wxpublish::observation::{Observation, StationInfo};
use wxpublish::publisher::{Destination, PublishError, Publisher, Result};

/// Records every snapshot it is handed.
#[derive(Default)]
pub struct RecordingPublisher {
    received: Mutex<Vec<Observation>>,
    delivered: Notify,
}

impl RecordingPublisher {
    pub fn received(&self) -> Vec<Observation> {
        self.received.lock().unwrap().clone()
    }

    /// Wait until at least `count` snapshots have arrived.
    pub async fn wait_for(&self, count: usize, limit: Duration) -> Vec<Observation> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let notified = self.delivered.notified();
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.received();
            }
        }
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn update(
        &self,
        _config: &DestinationConfig,
        _station: &StationInfo,
        observation: Observation,
    ) -> Result<()> {
        self.received.lock().unwrap().push(observation);
        self.delivered.notify_waiters();
        Ok(())
    }
}

/// Holds its delivery until released, then records it.
#[derive(Default)]
pub struct GatedPublisher {
    pub gate: Notify,
    pub inner: RecordingPublisher,
}

#[async_trait]
impl Publisher for GatedPublisher {
    async fn update(
        &self,
        config: &DestinationConfig,
        station: &StationInfo,
        observation: Observation,
    ) -> Result<()> {
        self.gate.notified().await;
        self.inner.update(config, station, observation).await
    }
}

/// Always returns a delivery error.
pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn update(
        &self,
        _config: &DestinationConfig,
        _station: &StationInfo,
        _observation: Observation,
    ) -> Result<()> {
        Err(PublishError::Config("connection refused".into()))
    }
}

/// Panics inside `update`.
pub struct PanickingPublisher;

#[async_trait]
impl Publisher for PanickingPublisher {
    async fn update(
        &self,
        _config: &DestinationConfig,
        _station: &StationInfo,
        observation: Observation,
    ) -> Result<()> {
        let sensors = &observation.aux_sensors;
        // Out-of-bounds index on an empty list.
        let _ = &sensors[sensors.len()];
        Ok(())
    }
}

pub fn destination(name: &str, publisher: Arc<dyn Publisher>) -> Arc<Destination> {
    Arc::new(Destination::with_publisher(
        DestinationConfig {
            service: name.to_string(),
            ..Default::default()
        },
        StationInfo::default(),
        publisher,
    ))
}

pub const AIR: &[u8] = br#"{"serial_number":"AR-00004049","type":"obs_air","hub_sn":"HB-00000001","obs":[[1717243200,1013.25,20.0,50,0,0,3.46,1]],"firmware_revision":17}"#;

pub const SKY: &[u8] = br#"{"serial_number":"SK-00008453","type":"obs_sky","hub_sn":"HB-00000001","obs":[[1717243260,9000,3,0.2,4.1,5.0,6.2,180,3.12,1,130,null,0,3]],"firmware_revision":29}"#;

pub const TOWER: &[u8] = br#"{"serial_number":"ST-00000512","type":"obs_tower","obs":[[1717243200,1000.0,15.0,60,0,0,0,0]]}"#;
