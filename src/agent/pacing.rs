use std::time::Duration;

/// Gap between two batch sends that keeps one agent at `per_agent_eps`.
///
/// Zero when no usable rate is set, meaning the agent is only limited by
/// confirmation round trips.
#[must_use]
pub fn pacing_interval(events_per_batch: usize, per_agent_eps: f64) -> Duration {
    if !per_agent_eps.is_finite() || per_agent_eps <= 0.0 {
        return Duration::ZERO;
    }
    let seconds = events_per_batch as f64 / per_agent_eps;
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}
