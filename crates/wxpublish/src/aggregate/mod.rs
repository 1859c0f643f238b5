//! Stateful trackers fed by the ingest path: rainfall totals and gust hold.

pub mod gust;
pub mod rainfall;

pub use gust::{Gust, GustTracker, GUST_INTERVAL};
pub use rainfall::{RainTotals, RainfallAccumulator, RainfallError, RainfallRecord};
