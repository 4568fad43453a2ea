//! Trust scoring inputs and the discrete tier derived from them.
//!
//! The trust service owns the continuous 0-100 score; this module only
//! buckets it. Tiers relax softening and length rules as the relationship
//! matures, never the crisis path, which ignores trust entirely.

use serde::{Deserialize, Serialize};

/// Score cutoffs for tiers 2-5. Below the first cutoff is tier 1.
pub const TRUST_TIER_CUTOFFS: [i32; 4] = [20, 40, 60, 80];

/// Read-only snapshot from the external trust service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrustSnapshot {
    /// Continuous trust score, 0-100.
    #[serde(default)]
    pub trust_score: i32,
    /// The trust service's own level counter (not the tier; kept for
    /// reporting parity with the service).
    #[serde(default)]
    pub trust_level: i32,
}

impl TrustSnapshot {
    /// Bucket the score into a [`TrustTier`].
    pub fn tier(&self) -> TrustTier {
        TrustTier::from_score(self.trust_score)
    }
}

/// Discrete trust bucket, 1 (new) to 5 (long-standing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrustTier(u8);

impl TrustTier {
    /// Bucket a 0-100 score using [`TRUST_TIER_CUTOFFS`].
    pub fn from_score(score: i32) -> Self {
        let mut tier = 1u8;
        for cutoff in TRUST_TIER_CUTOFFS {
            if score >= cutoff {
                tier += 1;
            }
        }
        TrustTier(tier)
    }

    /// Tier as a plain number, 1-5.
    pub fn level(self) -> u8 {
        self.0
    }

    /// Directness is preserved (no directive softening) from this tier up.
    pub fn keeps_directness(self) -> bool {
        self.0 >= 4
    }
}

impl Default for TrustTier {
    fn default() -> Self {
        TrustTier(1)
    }
}

// ============================================================================
// Tests
// ============================================================================
