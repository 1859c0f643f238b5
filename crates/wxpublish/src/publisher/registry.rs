//! Configured destinations and their lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{PublishError, Publisher, Result, ServiceKind};
use crate::config::DestinationConfig;
use crate::observation::{Observation, StationInfo};

/// One configured destination, built once at startup.
///
/// Only the enabled flag changes afterwards.
pub struct Destination {
    kind: Option<ServiceKind>,
    enabled: AtomicBool,
    config: DestinationConfig,
    station: StationInfo,
    publisher: Option<Arc<dyn Publisher>>,
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("service", &self.config.service)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Destination {
    /// Resolve a configured destination. An unknown service tag is logged
    /// and the destination is left inert.
    pub fn from_config(config: DestinationConfig, station: StationInfo) -> Self {
        let kind = ServiceKind::parse(&config.service);
        let publisher = match kind {
            Some(kind) => Some(kind.create()),
            None => {
                log::warn!(
                    "[Registry] unknown service '{}', destination will not be used",
                    config.service
                );
                None
            }
        };
        Self {
            kind,
            enabled: AtomicBool::new(config.enabled && publisher.is_some()),
            config,
            station,
            publisher,
        }
    }

    /// Destination backed by a caller-supplied publisher.
    pub fn with_publisher(
        config: DestinationConfig,
        station: StationInfo,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            kind: ServiceKind::parse(&config.service),
            enabled: AtomicBool::new(config.enabled),
            config,
            station,
            publisher: Some(publisher),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.service
    }

    pub fn kind(&self) -> Option<ServiceKind> {
        self.kind
    }

    pub fn config(&self) -> &DestinationConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Run the publisher's `init`. A failure disables the destination.
    pub async fn init(&self) -> bool {
        let Some(publisher) = self.publisher.as_ref().filter(|_| self.is_enabled()) else {
            return false;
        };
        match publisher.init(&self.config).await {
            Ok(()) => {
                log::info!("[Registry] {} ready", self.name());
                true
            }
            Err(e) => {
                log::error!("[Registry] {} init failed, disabling: {}", self.name(), e);
                self.disable();
                false
            }
        }
    }

    /// Deliver one snapshot copy.
    pub async fn update(&self, observation: Observation) -> Result<()> {
        let publisher = self
            .publisher
            .as_ref()
            .ok_or_else(|| PublishError::Config(format!("no publisher for '{}'", self.name())))?;
        publisher
            .update(&self.config, &self.station, observation)
            .await
    }

    pub async fn cleanup(&self) {
        if let Some(publisher) = &self.publisher {
            publisher.cleanup().await;
        }
    }
}

/// Every configured destination, in configuration order.
#[derive(Debug, Default)]
pub struct Registry {
    destinations: Vec<Arc<Destination>>,
}

impl Registry {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            destinations: destinations.into_iter().map(Arc::new).collect(),
        }
    }

    /// Build destinations from configuration, copying the station identity
    /// into each.
    pub fn from_config(services: &[DestinationConfig], station: &StationInfo) -> Self {
        Self::new(
            services
                .iter()
                .map(|s| Destination::from_config(s.clone(), station.clone()))
                .collect(),
        )
    }

    /// Initialise every enabled destination. Returns how many are ready.
    pub async fn init_all(&self) -> usize {
        let mut ready = 0;
        for destination in &self.destinations {
            if destination.init().await {
                ready += 1;
            }
        }
        ready
    }

    pub async fn cleanup_all(&self) {
        for destination in &self.destinations {
            destination.cleanup().await;
        }
    }

    pub fn destinations(&self) -> &[Arc<Destination>] {
        &self.destinations
    }

    pub fn enabled_count(&self) -> usize {
        self.destinations.iter().filter(|d| d.is_enabled()).count()
    }
}
