use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Connecting,
    Authenticating,
    Ready,
    Sending,
    WaitingForConfirm,
    Draining,
    Closed,
    Error,
}

impl AgentPhase {
    const ALL: [AgentPhase; 8] = [
        AgentPhase::Connecting,
        AgentPhase::Authenticating,
        AgentPhase::Ready,
        AgentPhase::Sending,
        AgentPhase::WaitingForConfirm,
        AgentPhase::Draining,
        AgentPhase::Closed,
        AgentPhase::Error,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AgentPhase::Connecting => "connecting",
            AgentPhase::Authenticating => "authenticating",
            AgentPhase::Ready => "ready",
            AgentPhase::Sending => "sending",
            AgentPhase::WaitingForConfirm => "waiting-for-confirm",
            AgentPhase::Draining => "draining",
            AgentPhase::Closed => "closed",
            AgentPhase::Error => "error",
        }
    }

    const fn index(self) -> u8 {
        match self {
            AgentPhase::Connecting => 0,
            AgentPhase::Authenticating => 1,
            AgentPhase::Ready => 2,
            AgentPhase::Sending => 3,
            AgentPhase::WaitingForConfirm => 4,
            AgentPhase::Draining => 5,
            AgentPhase::Closed => 6,
            AgentPhase::Error => 7,
        }
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase shared between the send and receive halves of one agent.
#[derive(Debug)]
pub(super) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(super) const fn new(phase: AgentPhase) -> Self {
        Self(AtomicU8::new(phase.index()))
    }

    pub(super) fn set(&self, phase: AgentPhase) {
        self.0.store(phase.index(), Ordering::Release);
    }

    pub(super) fn get(&self) -> AgentPhase {
        let index = usize::from(self.0.load(Ordering::Acquire));
        AgentPhase::ALL
            .get(index)
            .copied()
            .unwrap_or(AgentPhase::Error)
    }
}
