//! Publish cycles: when to fire and how to fan out.

mod engine;
mod trigger;

pub use engine::Dispatcher;
pub use trigger::DispatchTrigger;
