//! Tuning knobs for the group facade.

/// Default confidence level of randomized algorithms.
pub const DEFAULT_CONFIDENCE: f64 = 1.0 - 1e-6;

/// Configuration carried by a [`PermGroup`](crate::group::PermGroup).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupConfig {
    /// Confidence level of the randomized Schreier-Sims run that builds a chain.
    pub confidence: f64,
    /// Seed for the random number generator used by randomized algorithms.
    pub seed: u64,
    /// Run the deterministic Schreier-Sims check after the randomized build.
    ///
    /// Without it, chains are complete only with probability `confidence`.
    pub verify: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        GroupConfig {
            confidence: DEFAULT_CONFIDENCE,
            seed: 0x5eed_9e37_79b9_7f4a,
            verify: true,
        }
    }
}

impl GroupConfig {
    pub fn with_confidence(self, confidence: f64) -> Self {
        GroupConfig { confidence, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        GroupConfig { seed, ..self }
    }

    pub fn with_verify(self, verify: bool) -> Self {
        GroupConfig { verify, ..self }
    }
}
