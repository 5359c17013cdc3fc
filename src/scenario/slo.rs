use serde::{Deserialize, Serialize};

use crate::state::WindowSnapshot;

/// Below this many samples the p95 is reported as the maximum sample.
pub const MIN_PERCENTILE_SAMPLES: usize = 100;
const P95_NUMERATOR: usize = 95;
const PERCENT_DIVISOR: usize = 100;

/// 95th percentile by nearest rank over at least
/// [`MIN_PERCENTILE_SAMPLES`] samples, the maximum for fewer, 0 for none.
#[must_use]
pub fn p95(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len().saturating_sub(1);
    if sorted.len() < MIN_PERCENTILE_SAMPLES {
        return sorted.get(last).copied().unwrap_or(0.0);
    }
    let rank = sorted
        .len()
        .saturating_mul(P95_NUMERATOR)
        .saturating_add(PERCENT_DIVISOR.saturating_sub(1))
        .checked_div(PERCENT_DIVISOR)
        .unwrap_or(0);
    let index = rank.saturating_sub(1).min(last);
    sorted.get(index).copied().unwrap_or(0.0)
}

/// Derived metrics for one measurement window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub target_eps: f64,
    pub batches_sent: u64,
    pub confirms: u64,
    pub errors: u64,
    pub samples: usize,
    /// Seconds.
    pub p95: f64,
    /// Seconds.
    pub mean_latency: f64,
    pub error_rate: f64,
    pub confirmed_eps: f64,
    pub sent_eps: f64,
    pub window_secs: f64,
}

impl WindowStats {
    #[must_use]
    pub fn from_snapshot(
        snapshot: &WindowSnapshot,
        events_per_batch: usize,
        target_eps: f64,
    ) -> Self {
        let window_secs = snapshot.elapsed.as_secs_f64();
        let samples = snapshot.latencies.len();
        let mean_latency = if samples == 0 {
            0.0
        } else {
            snapshot.latencies.iter().sum::<f64>() / samples as f64
        };
        let attempts = snapshot.confirms.saturating_add(snapshot.errors).max(1);
        let events = events_per_batch as f64;
        let per_second = |batches: u64| {
            if window_secs > 0.0 {
                batches as f64 * events / window_secs
            } else {
                0.0
            }
        };

        Self {
            target_eps,
            batches_sent: snapshot.batches_sent,
            confirms: snapshot.confirms,
            errors: snapshot.errors,
            samples,
            p95: p95(&snapshot.latencies),
            mean_latency,
            error_rate: snapshot.errors as f64 / attempts as f64,
            confirmed_eps: per_second(snapshot.confirms),
            sent_eps: per_second(snapshot.batches_sent),
            window_secs,
        }
    }
}

/// How enabled breach predicates combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BreachMode {
    /// Any enabled predicate breaches.
    #[default]
    Any,
    /// Every enabled predicate must breach.
    All,
}

/// SLO predicates evaluated against each ramp window. A `None` threshold
/// disables that predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreachPolicy {
    /// Seconds.
    pub max_p95: Option<f64>,
    pub max_error_rate: Option<f64>,
    /// Minimum `confirmed_eps / target_eps`.
    pub min_throughput_ratio: Option<f64>,
    pub mode: BreachMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreachVerdict {
    pub latency: bool,
    pub errors: bool,
    pub throughput: bool,
    pub breached: bool,
}

impl BreachPolicy {
    #[must_use]
    pub fn evaluate(&self, stats: &WindowStats) -> BreachVerdict {
        let latency = self.max_p95.map(|max| stats.p95 > max);
        let errors = self.max_error_rate.map(|max| stats.error_rate > max);
        let throughput = self
            .min_throughput_ratio
            .map(|ratio| stats.confirmed_eps < stats.target_eps * ratio);
        let enabled: Vec<bool> = [latency, errors, throughput].into_iter().flatten().collect();
        let breached = match self.mode {
            BreachMode::Any => enabled.iter().any(|hit| *hit),
            BreachMode::All => !enabled.is_empty() && enabled.iter().all(|hit| *hit),
        };
        BreachVerdict {
            latency: latency.unwrap_or(false),
            errors: errors.unwrap_or(false),
            throughput: throughput.unwrap_or(false),
            breached,
        }
    }
}

impl BreachVerdict {
    /// Names of the predicates that fired, for log lines.
    #[must_use]
    pub fn reasons(&self) -> String {
        let reasons: Vec<&str> = [
            (self.latency, "p95"),
            (self.errors, "error rate"),
            (self.throughput, "throughput"),
        ]
        .into_iter()
        .filter_map(|(hit, name)| hit.then_some(name))
        .collect();
        if reasons.is_empty() {
            "none".to_owned()
        } else {
            reasons.join(", ")
        }
    }
}
