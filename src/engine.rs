//! Engine mode selection: which completion engine answers a message.
//!
//! Pure and deterministic. The decision ladder:
//! ```text
//! explicit LITE request ──────────────→ CORE_FAST (honored for everyone)
//! explicit DEEP request ─┬─ premium ──→ PREMIUM_DEEP
//!                        └─ free ─────→ CORE_DEEP
//! no request ─┬─ free ────────────────→ CORE_FAST
//!             └─ premium ─┬─ severity ≥ SUPPORT ──→ PREMIUM_DEEP
//!                         ├─ history ≥ threshold ─→ PREMIUM_DEEP
//!                         ├─ trust tier 5 ────────→ PREMIUM_DEEP
//!                         └─ otherwise ───────────→ CORE_DEEP
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{RequestedMode, SeverityLevel, TrustTier};

/// Conversations at least this long bias premium users onto the deep engine.
pub const DEEP_HISTORY_THRESHOLD: usize = 12;

/// The three reply engines, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineMode {
    /// Small, quick model for everyday traffic.
    CoreFast,
    /// Larger model, standard reasoning budget.
    CoreDeep,
    /// Largest model with the full reasoning budget.
    PremiumDeep,
}

impl EngineMode {
    /// Wire label, matching the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            EngineMode::CoreFast => "CORE_FAST",
            EngineMode::CoreDeep => "CORE_DEEP",
            EngineMode::PremiumDeep => "PREMIUM_DEEP",
        }
    }

    /// Deep engines carry extended replies; the fast engine is flattened.
    pub fn is_deep(self) -> bool {
        !matches!(self, EngineMode::CoreFast)
    }
}

/// Pick the engine for one message.
///
/// An explicit client request always wins, capped by entitlement: free
/// users asking for DEEP get the core deep engine, never the premium one.
/// Without a request, free traffic stays on the fast engine and premium
/// traffic escalates on distress, long threads, or top-tier trust.
pub fn select_mode(
    severity: SeverityLevel,
    trust_tier: TrustTier,
    premium: bool,
    requested: Option<RequestedMode>,
    history_len: usize,
) -> EngineMode {
    match requested {
        Some(RequestedMode::Lite) => return EngineMode::CoreFast,
        Some(RequestedMode::Deep) => {
            return if premium {
                EngineMode::PremiumDeep
            } else {
                EngineMode::CoreDeep
            };
        }
        None => {}
    }

    if !premium {
        return EngineMode::CoreFast;
    }

    if severity >= SeverityLevel::Support
        || history_len >= DEEP_HISTORY_THRESHOLD
        || trust_tier.level() >= 5
    {
        EngineMode::PremiumDeep
    } else {
        EngineMode::CoreDeep
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(level: u8) -> TrustTier {
        TrustTier::from_score(match level {
            1 => 0,
            2 => 25,
            3 => 45,
            4 => 65,
            _ => 90,
        })
    }

    #[test]
    fn test_lite_request_wins_for_everyone() {
        let mode = select_mode(
            SeverityLevel::HighRisk,
            tier(5),
            true,
            Some(RequestedMode::Lite),
            50,
        );
        assert_eq!(mode, EngineMode::CoreFast);
    }

    #[test]
    fn test_deep_request_capped_by_entitlement() {
        let premium = select_mode(
            SeverityLevel::Casual,
            tier(1),
            true,
            Some(RequestedMode::Deep),
            0,
        );
        let free = select_mode(
            SeverityLevel::Casual,
            tier(1),
            false,
            Some(RequestedMode::Deep),
            0,
        );
        assert_eq!(premium, EngineMode::PremiumDeep);
        assert_eq!(free, EngineMode::CoreDeep);
    }

    #[test]
    fn test_free_default_is_fast() {
        let mode = select_mode(SeverityLevel::Support, tier(5), false, None, 100);
        assert_eq!(mode, EngineMode::CoreFast);
    }

    #[test]
    fn test_premium_escalates_on_distress() {
        assert_eq!(
            select_mode(SeverityLevel::Support, tier(2), true, None, 0),
            EngineMode::PremiumDeep
        );
        assert_eq!(
            select_mode(SeverityLevel::HighRisk, tier(1), true, None, 0),
            EngineMode::PremiumDeep
        );
        assert_eq!(
            select_mode(SeverityLevel::Venting, tier(2), true, None, 0),
            EngineMode::CoreDeep
        );
    }

    #[test]
    fn test_premium_escalates_on_long_history() {
        assert_eq!(
            select_mode(
                SeverityLevel::Casual,
                tier(2),
                true,
                None,
                DEEP_HISTORY_THRESHOLD
            ),
            EngineMode::PremiumDeep
        );
        assert_eq!(
            select_mode(
                SeverityLevel::Casual,
                tier(2),
                true,
                None,
                DEEP_HISTORY_THRESHOLD - 1
            ),
            EngineMode::CoreDeep
        );
    }

    #[test]
    fn test_premium_escalates_on_top_trust() {
        assert_eq!(
            select_mode(SeverityLevel::Casual, tier(5), true, None, 0),
            EngineMode::PremiumDeep
        );
        assert_eq!(
            select_mode(SeverityLevel::Casual, tier(4), true, None, 0),
            EngineMode::CoreDeep
        );
    }

    #[test]
    fn test_labels_match_wire_form() {
        assert_eq!(EngineMode::CoreFast.label(), "CORE_FAST");
        assert_eq!(
            serde_json::to_string(&EngineMode::PremiumDeep).unwrap(),
            "\"PREMIUM_DEEP\""
        );
        assert!(!EngineMode::CoreFast.is_deep());
        assert!(EngineMode::PremiumDeep.is_deep());
    }
}
