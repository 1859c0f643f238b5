//! Process wiring: UDP ingest, dispatch task, destination lifecycle.

use chrono::{Local, NaiveDateTime};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

use crate::aggregate::RainfallAccumulator;
use crate::config::{Config, ConfigError};
use crate::dispatch::Dispatcher;
use crate::observation::{Observation, Station};
use crate::packet::Packet;
use crate::publisher::Registry;

/// Largest datagram the hub sends is well under this.
const MAX_DATAGRAM: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Bind the configured UDP address and run until `shutdown` fires.
pub async fn run(config: Config, shutdown: watch::Receiver<()>) -> Result<(), AppError> {
    let addr = config.listen_addr()?;
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| AppError::Bind { addr, source })?;
    log::info!("[Ingest] listening on {}", addr);
    run_with_socket(config, socket, shutdown).await
}

/// Run the service on an already bound socket.
pub async fn run_with_socket(
    config: Config,
    socket: UdpSocket,
    mut shutdown: watch::Receiver<()>,
) -> Result<(), AppError> {
    let rainfall = RainfallAccumulator::open(&config.rainfall_file, Local::now().naive_local());

    let registry = Registry::from_config(&config.services, &config.station);
    let ready = registry.init_all().await;
    log::info!(
        "[App] {} of {} destination(s) ready",
        ready,
        registry.destinations().len()
    );

    let (snapshots, rx) = mpsc::channel(config.queue_depth);
    let dispatcher = Dispatcher::new(
        registry.destinations().to_vec(),
        config.max_in_flight,
        Duration::from_secs(config.shutdown_grace_secs),
    );
    let dispatch_task = tokio::spawn(dispatcher.run(rx));

    let mut station = Station::new(config.station.clone(), rainfall, config.mapping_table());
    ingest(&socket, &mut station, &snapshots, &mut shutdown).await;

    // Closing the channel stops the dispatcher after its drain.
    drop(snapshots);
    if let Err(e) = dispatch_task.await {
        log::error!("[App] dispatch task failed: {}", e);
    }

    registry.cleanup_all().await;
    log::info!("[App] stopped");
    Ok(())
}

/// Receive and apply datagrams until shutdown.
pub async fn ingest(
    socket: &UdpSocket,
    station: &mut Station,
    snapshots: &mpsc::Sender<Observation>,
    shutdown: &mut watch::Receiver<()>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => {
                    log::trace!("[Ingest] {} bytes from {}", len, from);
                    handle_datagram(station, snapshots, &buf[..len], Local::now().naive_local());
                }
                Err(e) => log::warn!("[Ingest] receive failed: {}", e),
            },
            _ = shutdown.changed() => {
                log::info!("[Ingest] shutdown signal received, exiting");
                break;
            }
        }
    }
}

/// Decode and apply one datagram received at local time `now`.
///
/// Returns `true` when a snapshot was handed to the dispatcher. Never
/// waits: if the dispatcher has fallen behind the cycle is dropped.
pub fn handle_datagram(
    station: &mut Station,
    snapshots: &mpsc::Sender<Observation>,
    bytes: &[u8],
    now: NaiveDateTime,
) -> bool {
    let packet = match Packet::decode(bytes) {
        Ok(packet) => packet,
        Err(e) => {
            log::warn!("[Ingest] dropping malformed packet: {}", e);
            return false;
        }
    };

    let Some(snapshot) = station.ingest(&packet, now) else {
        return false;
    };

    match snapshots.try_send(snapshot) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            log::warn!("[Ingest] dispatcher is behind, dropping this cycle");
            false
        }
        Err(TrySendError::Closed(_)) => {
            log::error!("[Ingest] dispatcher has stopped, dropping this cycle");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::StationInfo;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    const AIR: &[u8] = br#"{"serial_number":"AR-1","type":"obs_air","obs":[[1717243200,1013.25,20.0,50,0,0,3.46,1]]}"#;
    const SKY: &[u8] = br#"{"serial_number":"SK-1","type":"obs_sky","obs":[[1717243200,1000,2,0.2,4,5,7,180,3.1,1,150,null,0,3]]}"#;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn station() -> Station {
        Station::new(
            StationInfo::default(),
            RainfallAccumulator::new(),
            HashMap::new(),
        )
    }

    #[test]
    fn malformed_packet_changes_nothing() {
        let mut station = station();
        let (tx, mut rx) = mpsc::channel(1);
        assert!(!handle_datagram(&mut station, &tx, b"{\"type\":\"obs_air\"", now()));
        assert_eq!(*station.observation(), Observation::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn complete_cycle_is_queued() {
        let mut station = station();
        let (tx, mut rx) = mpsc::channel(1);
        assert!(!handle_datagram(&mut station, &tx, AIR, now()));
        assert!(handle_datagram(&mut station, &tx, SKY, now()));
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.pressure, 1013.25);
        assert_eq!(snapshot.wind_speed, 5.0);
    }

    #[test]
    fn full_queue_drops_cycle_without_blocking() {
        let mut station = station();
        let (tx, _rx) = mpsc::channel(1);
        handle_datagram(&mut station, &tx, AIR, now());
        assert!(handle_datagram(&mut station, &tx, SKY, now()));
        handle_datagram(&mut station, &tx, AIR, now());
        assert!(!handle_datagram(&mut station, &tx, SKY, now()));
        // The live snapshot still advanced.
        assert!((station.observation().rainfall_day - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            rainfall_file: dir.path().join("rain.json"),
            listen: "127.0.0.1:0".into(),
            ..Default::default()
        };
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = watch::channel(());
        let handle = tokio::spawn(run_with_socket(config, socket, rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
