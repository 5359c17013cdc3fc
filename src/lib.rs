//! Core library for the `agentstorm` CLI.
//!
//! `agentstorm` simulates a fleet of agents speaking a length-prefixed JSON
//! protocol over TCP or TLS. Every agent authenticates, then submits event
//! batches one at a time at its share of a shared rate budget while a
//! scenario controller steps that budget through warm-up, ramp, spike, settle
//! and soak phases and measures confirm latency and errors per window.
//!
//! The primary interface is the command-line application; the library
//! modules are public so the harness can be driven programmatically through
//! [`harness::Harness`] and [`harness::HarnessHandle`].
pub mod agent;
pub mod args;
pub mod config;
pub mod error;
pub mod harness;
pub mod scenario;
pub mod shutdown;
pub mod state;
pub mod transport;
pub mod wire;

mod app;
mod entry;
mod system;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;

#[cfg(test)]
mod test_support;

/// Parses the command line, then runs the selected scenario or probe.
///
/// # Errors
///
/// Returns an error for invalid arguments or config, a failed results export,
/// or an incomplete probe.
pub fn run() -> error::AppResult<()> {
    entry::run()
}
