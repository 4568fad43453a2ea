//! Per-user quota counters and the storage contract behind them.
//!
//! The ledger is the only shared mutable state in the core. Every backend
//! must expose the conditional increments as *single* atomic storage
//! operations ("increment where count < limit"); read-then-write sequences
//! are not an acceptable implementation, they reintroduce the overshoot
//! race the limiter exists to prevent.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::PlanLimits;

pub use memory::MemoryLedger;
#[cfg(feature = "postgres")]
pub use postgres::PgLedger;
pub use sqlite::SqliteLedger;

/// Persisted quota counters for one user.
///
/// Invariants: counts never go negative; `daily_reset_at` is `None` while
/// unlocked, a future instant while the rolling 24h lock is armed, and is
/// cleared (not merely ignored) once it has passed; `monthly_reset_at`
/// always holds the next calendar-month boundary (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Owning user.
    pub user_id: String,
    /// Messages consumed in the current daily window.
    pub daily_count: i64,
    /// Messages consumed in the current calendar month.
    pub monthly_count: i64,
    /// End of the rolling 24h lock, when armed.
    pub daily_reset_at: Option<DateTime<Utc>>,
    /// Start of the next calendar month (UTC).
    pub monthly_reset_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Fresh zeroed record for `user_id`.
    pub fn new(user_id: impl Into<String>, monthly_reset_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            daily_count: 0,
            monthly_count: 0,
            daily_reset_at: None,
            monthly_reset_at,
        }
    }
}

/// Read-only usage summary handed to callers (granted consumes, the usage
/// endpoint, and limit-reached payloads all derive from this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    /// Owning user.
    pub user_id: String,
    /// Daily consumption and cap (`0` cap = not enforced).
    pub daily_used: i64,
    pub daily_limit: i64,
    /// Monthly consumption and cap (`0` cap = not enforced).
    pub monthly_used: i64,
    pub monthly_limit: i64,
    /// Rolling daily lock end, when armed.
    pub daily_reset_at: Option<DateTime<Utc>>,
    /// Next monthly boundary (absent only for tester bypass reports).
    pub monthly_reset_at: Option<DateTime<Utc>>,
    /// Whether this account bypasses the limiter.
    pub is_tester: bool,
}

impl UsageReport {
    /// Build a report from a stored record plus the caller's plan.
    pub fn from_record(record: &UsageRecord, plan: &PlanLimits) -> Self {
        Self {
            user_id: record.user_id.clone(),
            daily_used: record.daily_count,
            daily_limit: plan.daily_limit.max(0),
            monthly_used: record.monthly_count,
            monthly_limit: plan.monthly_limit.max(0),
            daily_reset_at: record.daily_reset_at,
            monthly_reset_at: Some(record.monthly_reset_at),
            is_tester: plan.is_tester,
        }
    }

    /// Report for a tester bypass: nothing tracked, nothing enforced.
    pub fn tester(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            daily_used: 0,
            daily_limit: 0,
            monthly_used: 0,
            monthly_limit: 0,
            daily_reset_at: None,
            monthly_reset_at: None,
            is_tester: true,
        }
    }
}

/// Storage contract for usage records.
///
/// The two `try_consume_*` operations are the heart of the limiter: each is
/// one indivisible conditional update at the storage layer, equivalent to a
/// compare-and-swap. `ensure` must converge under creation races
/// (get-or-create, never get-or-duplicate).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read a record without creating it.
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError>;

    /// Get the record, creating a zeroed one if absent.
    async fn ensure(
        &self,
        user_id: &str,
        monthly_reset_at: DateTime<Utc>,
    ) -> Result<UsageRecord, LedgerError>;

    /// Atomically increment the daily counter (and the monthly counter,
    /// which tracks every consume) iff `daily_count < daily_limit`.
    /// Returns whether the slot was won.
    async fn try_consume_daily(
        &self,
        user_id: &str,
        daily_limit: i64,
    ) -> Result<bool, LedgerError>;

    /// Atomically increment the monthly counter iff
    /// `monthly_count < monthly_limit`. Returns whether the slot was won.
    async fn try_consume_monthly(
        &self,
        user_id: &str,
        monthly_limit: i64,
    ) -> Result<bool, LedgerError>;

    /// Unconditional daily+monthly increment, for unlimited-but-tracked
    /// daily plans.
    async fn consume_daily_unchecked(&self, user_id: &str) -> Result<(), LedgerError>;

    /// Unconditional monthly increment, for unlimited-but-tracked monthly
    /// plans.
    async fn consume_monthly_unchecked(&self, user_id: &str) -> Result<(), LedgerError>;

    /// Arm the rolling daily lock iff none is armed, returning the armed
    /// instant. Under concurrent first rejections the earliest writer wins
    /// and everyone observes its value.
    async fn arm_daily_lock(
        &self,
        user_id: &str,
        reset_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, LedgerError>;

    /// Clear the daily lock and zero the daily counter iff the lock has
    /// expired (`daily_reset_at <= now`). No-op otherwise.
    async fn clear_daily_lock_if_expired(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError>;

    /// Zero the monthly counter and advance the boundary to `next_reset`
    /// iff the stored boundary has passed (`monthly_reset_at <= now`).
    async fn roll_monthly_if_expired(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        next_reset: DateTime<Utc>,
    ) -> Result<(), LedgerError>;
}

/// Start of the calendar month after `now` (UTC).
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        // Unreachable for day-1 midnight, but never panic in the ledger path.
        .unwrap_or_else(|| now + Duration::days(31))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_month_start_mid_year() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let next = next_month_start(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_month_start_december_rolls_year() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let next = next_month_start(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_report_clamps_negative_limits_to_zero() {
        let now = Utc::now();
        let record = UsageRecord::new("u1", next_month_start(now));
        let plan = PlanLimits {
            daily_limit: -1,
            monthly_limit: -5,
            is_tester: false,
        };
        let report = UsageReport::from_record(&record, &plan);
        assert_eq!(report.daily_limit, 0);
        assert_eq!(report.monthly_limit, 0);
    }
}
