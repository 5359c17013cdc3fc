//! Simulated agents: connect, authenticate, then submit one batch at a time
//! at a self-paced share of the shared rate budget.
mod identity;
mod pacing;
mod phase;
mod runner;
mod slot;


pub use identity::{AgentIdentity, NAME_PREFIX, PEER_PREFIX};
pub use pacing::pacing_interval;
pub use phase::AgentPhase;
pub use runner::{
    Agent, AgentOutcome, AgentSettings, DEFAULT_CONFIRM_READ_ATTEMPTS, DEFAULT_RATE_POLL_INTERVAL,
    DEFAULT_START_STAGGER,
};
pub use slot::{ConfirmSlot, Resolution};
