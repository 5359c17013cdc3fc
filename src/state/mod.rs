//! Process-wide aggregation shared by every agent and the scenario
//! controller.
mod shared;
mod window;


pub use shared::{DEFAULT_SETTLE_DELAY, SharedState};
pub use window::{DEFAULT_LATENCY_SAMPLES, WindowSnapshot};
