//! Run orchestration: agents, controller, control commands and the final
//! report.
mod command;
mod report;
mod runner;

#[cfg(test)]
mod tests;

pub use command::{ControlCommand, HarnessHandle};
pub use report::RunReport;
pub use runner::{DEFAULT_DRAIN_GRACE, DEFAULT_READY_TIMEOUT, Harness, HarnessConfig};
