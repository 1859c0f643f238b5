//! wxpublish: listens to a WeatherFlow hub, keeps one consolidated
//! weather snapshot and fans it out to the configured weather services.

pub mod aggregate;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod observation;
pub mod packet;
pub mod publisher;
pub mod units;

// Re-export commonly used types
pub use config::Config;
pub use observation::{Observation, Station, StationInfo};
pub use packet::Packet;
pub use publisher::{Destination, Publisher, Registry};
