use std::collections::BTreeMap;

use crate::agent::AgentOutcome;
use crate::error::FailureKind;
use crate::scenario::ScenarioSummary;

/// Everything a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: ScenarioSummary,
    pub agents: usize,
    pub events_per_batch: usize,
    pub approved: usize,
    pub outcomes: Vec<AgentOutcome>,
    /// Agents still running when the drain grace ran out.
    pub aborted: usize,
}

impl RunReport {
    #[must_use]
    pub fn batches_sent(&self) -> u64 {
        self.outcomes
            .iter()
            .fold(0u64, |total, outcome| total.saturating_add(outcome.batches_sent))
    }

    #[must_use]
    pub fn batches_confirmed(&self) -> u64 {
        self.outcomes
            .iter()
            .fold(0u64, |total, outcome| total.saturating_add(outcome.batches_confirmed))
    }

    /// Failed agents grouped by failure kind.
    #[must_use]
    pub fn failures(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for kind in self.outcomes.iter().filter_map(|outcome| outcome.failure) {
            let count = counts.entry(FailureKind::as_str(kind)).or_insert(0usize);
            *count = count.saturating_add(1);
        }
        counts
    }
}
