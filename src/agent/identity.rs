use rand::Rng;
use rand::distributions::{Distribution, Standard};

pub const NAME_PREFIX: &str = "FakeAgent_";
pub const PEER_PREFIX: &str = "EA2ULYEX7D6TG4MA";

/// Name and peer id presented by one agent. Both share the same random
/// 16-digit uppercase hex suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub name: String,
    pub peer_id: String,
}

impl AgentIdentity {
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let suffix: u64 = Standard.sample(rng);
        Self::from_suffix(&format!("{suffix:016X}"))
    }

    #[must_use]
    pub fn from_suffix(suffix: &str) -> Self {
        Self {
            name: format!("{NAME_PREFIX}{suffix}"),
            peer_id: format!("{PEER_PREFIX}{suffix}"),
        }
    }
}
