//! The quota shape attached to a subscription tier.

use serde::{Deserialize, Serialize};

/// Quota limits for one subscription plan.
///
/// A limit of `0` or below means "unlimited but still tracked": consumes
/// always succeed and the counter still increments for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Daily message cap for free-tier enforcement.
    pub daily_limit: i64,
    /// Monthly message cap for premium-tier enforcement.
    pub monthly_limit: i64,
    /// Tester accounts bypass the limiter entirely; their record is never
    /// touched.
    #[serde(default)]
    pub is_tester: bool,
}

impl PlanLimits {
    /// Standard free plan: daily-capped, monthly tracked only.
    pub fn free(daily_limit: i64) -> Self {
        Self {
            daily_limit,
            monthly_limit: 0,
            is_tester: false,
        }
    }

    /// Standard premium plan: monthly-capped, no daily gate.
    pub fn premium(monthly_limit: i64) -> Self {
        Self {
            daily_limit: 0,
            monthly_limit,
            is_tester: false,
        }
    }

    /// Internal tester plan.
    pub fn tester() -> Self {
        Self {
            daily_limit: 0,
            monthly_limit: 0,
            is_tester: true,
        }
    }

    /// Whether the daily limit actually gates (`> 0`).
    pub fn daily_enforced(&self) -> bool {
        self.daily_limit > 0
    }

    /// Whether the monthly limit actually gates (`> 0`).
    pub fn monthly_enforced(&self) -> bool {
        self.monthly_limit > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_is_unlimited() {
        let plan = PlanLimits::premium(0);
        assert!(!plan.monthly_enforced());
        assert!(!plan.daily_enforced());
    }

    #[test]
    fn test_free_plan_shape() {
        let plan = PlanLimits::free(20);
        assert!(plan.daily_enforced());
        assert!(!plan.monthly_enforced());
        assert!(!plan.is_tester);
    }
}
