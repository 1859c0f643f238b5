//! Concurrent fan-out of snapshots to destinations.
//!
//! In-flight deliveries are bounded and drained on shutdown.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::observation::Observation;
use crate::publisher::Destination;

/// Fans each snapshot out to every enabled destination.
///
/// Each destination gets its own copy and its own task. Tasks are not
/// awaited per cycle; the set only bounds how many run at once and lets
/// shutdown wait for them.
pub struct Dispatcher {
    destinations: Vec<Arc<Destination>>,
    in_flight: JoinSet<()>,
    /// Completed dispatch cycles, for log correlation.
    cycle: u64,
    max_in_flight: usize,
    grace: Duration,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// One delivery. Errors and panics end here and never reach the dispatcher.
async fn deliver(destination: Arc<Destination>, observation: Observation, cycle: u64) {
    let outcome = AssertUnwindSafe(destination.update(observation))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(())) => log::debug!("[Dispatch] cycle {}: {} done", cycle, destination.name()),
        Ok(Err(e)) => log::warn!(
            "[Dispatch] cycle {}: {} failed: {}",
            cycle,
            destination.name(),
            e
        ),
        Err(payload) => log::error!(
            "[Dispatch] cycle {}: {} panicked: {}",
            cycle,
            destination.name(),
            panic_message(payload.as_ref())
        ),
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            log::error!("[Dispatch] delivery task panicked: {}", e);
        } else {
            log::debug!("[Dispatch] delivery task cancelled");
        }
    }
}

impl Dispatcher {
    pub fn new(destinations: Vec<Arc<Destination>>, max_in_flight: usize, grace: Duration) -> Self {
        Self {
            destinations,
            in_flight: JoinSet::new(),
            cycle: 0,
            max_in_flight: max_in_flight.max(1),
            grace,
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Deliveries started and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start one delivery per enabled destination. Returns how many started.
    ///
    /// A destination that cannot be started because the in-flight bound is
    /// reached is logged and skipped for this cycle; its copy is never made.
    pub fn dispatch(&mut self, observation: Observation) -> usize {
        self.reap();
        self.cycle += 1;

        let mut started = 0;
        for destination in self.destinations.iter().filter(|d| d.is_enabled()) {
            if self.in_flight.len() >= self.max_in_flight {
                log::error!(
                    "[Dispatch] cycle {}: cannot start {}, {} deliveries still running",
                    self.cycle,
                    destination.name(),
                    self.in_flight.len()
                );
                continue;
            }
            self.in_flight.spawn(deliver(
                Arc::clone(destination),
                observation.clone(),
                self.cycle,
            ));
            started += 1;
        }

        log::debug!(
            "[Dispatch] cycle {}: started {} deliveries",
            self.cycle,
            started
        );
        started
    }

    /// Collect finished deliveries without waiting.
    pub fn reap(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            log_join(result);
        }
    }

    /// Dispatch every snapshot received until the channel closes, then
    /// drain in-flight deliveries.
    pub async fn run(mut self, mut snapshots: mpsc::Receiver<Observation>) {
        log::info!(
            "[Dispatch] started with {} enabled destination(s)",
            self.destinations.iter().filter(|d| d.is_enabled()).count()
        );
        while let Some(observation) = snapshots.recv().await {
            self.dispatch(observation);
        }
        self.drain().await;
        log::info!("[Dispatch] stopped after {} cycle(s)", self.cycle);
    }

    /// Wait up to the grace period for in-flight deliveries, then abort the
    /// rest.
    pub async fn drain(&mut self) {
        self.reap();
        if self.in_flight.is_empty() {
            return;
        }

        log::info!(
            "[Dispatch] waiting up to {}s for {} deliveries",
            self.grace.as_secs(),
            self.in_flight.len()
        );
        let in_flight = &mut self.in_flight;
        let wait = async {
            while let Some(result) = in_flight.join_next().await {
                log_join(result);
            }
        };

        if tokio::time::timeout(self.grace, wait).await.is_err() {
            log::warn!(
                "[Dispatch] grace period over, aborting {} deliveries",
                self.in_flight.len()
            );
            self.in_flight.abort_all();
            while let Some(result) = self.in_flight.join_next().await {
                log_join(result);
            }
        }
    }
}
