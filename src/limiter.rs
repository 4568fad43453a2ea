//! Usage limiter: plan-aware quota enforcement over a [`LedgerStore`].
//!
//! The limiter never does read-then-write accounting. Every grant goes
//! through the store's conditional "increment where below limit" update, so
//! two racing requests for a user's last slot can never both win. Rejection
//! is a typed outcome carrying accurate counts and the reset instant, not
//! an error.
//!
//! Free plans consume a daily allowance with a rolling lock: the first
//! rejected attempt arms a reset instant a full window ahead, and every
//! later rejection reports that same instant until it passes. Premium plans
//! consume a calendar-month allowance. Tester accounts bypass the ledger
//! entirely and leave no usage record behind.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::LedgerError;
use crate::ledger::{next_month_start, LedgerStore, UsageRecord, UsageReport};
use crate::types::PlanLimits;

/// Rolling daily lock window, armed on the first rejected attempt.
pub const DAILY_LOCK_WINDOW_HOURS: i64 = 24;

/// Which allowance a rejection was charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotaScope {
    Daily,
    Monthly,
}

/// A denied consume attempt, with the counts as stored after re-reading.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaRejection {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
    /// When the allowance reopens. Stable across repeated rejections.
    pub reset_at: Option<DateTime<Utc>>,
    pub reset_in_seconds: Option<i64>,
    pub scope: QuotaScope,
}

impl QuotaRejection {
    fn new(
        used: i64,
        limit: i64,
        reset_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        scope: QuotaScope,
    ) -> Self {
        Self {
            used,
            limit,
            remaining: (limit - used).max(0),
            reset_at,
            reset_in_seconds: reset_at.map(|t| (t - now).num_seconds().max(0)),
            scope,
        }
    }
}

/// Result of one consume attempt.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// The message may be answered; `usage` reflects the consumed slot.
    Granted { usage: UsageReport },
    /// The allowance is exhausted. Not an error.
    Rejected(QuotaRejection),
}

impl ConsumeOutcome {
    /// Test/reporting convenience.
    pub fn is_granted(&self) -> bool {
        matches!(self, ConsumeOutcome::Granted { .. })
    }
}

/// Plan-aware limiter over any ledger backend.
#[derive(Clone)]
pub struct Limiter {
    store: Arc<dyn LedgerStore>,
}

impl Limiter {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Attempt to consume one message slot for `user_id`.
    ///
    /// # Arguments
    /// * `plan` - The user's limits. `is_tester` bypasses everything.
    /// * `is_premium` - Charges the monthly allowance instead of the daily.
    pub async fn consume(
        &self,
        user_id: &str,
        plan: &PlanLimits,
        is_premium: bool,
    ) -> Result<ConsumeOutcome, LedgerError> {
        if plan.is_tester {
            // No read, no create. Tester traffic leaves no trace.
            return Ok(ConsumeOutcome::Granted {
                usage: UsageReport::tester(user_id),
            });
        }

        let now = Utc::now();
        self.store.ensure(user_id, next_month_start(now)).await?;
        self.store
            .roll_monthly_if_expired(user_id, now, next_month_start(now))
            .await?;

        if is_premium {
            self.consume_monthly(user_id, plan, now).await
        } else {
            self.consume_daily(user_id, plan, now).await
        }
    }

    /// Current usage for `user_id`, after applying any due window resets.
    pub async fn report(
        &self,
        user_id: &str,
        plan: &PlanLimits,
    ) -> Result<UsageReport, LedgerError> {
        if plan.is_tester {
            return Ok(UsageReport::tester(user_id));
        }

        let now = Utc::now();
        self.store.ensure(user_id, next_month_start(now)).await?;
        self.store
            .roll_monthly_if_expired(user_id, now, next_month_start(now))
            .await?;
        self.store.clear_daily_lock_if_expired(user_id, now).await?;

        let record = self.reread(user_id, now).await?;
        Ok(UsageReport::from_record(&record, plan))
    }

    // ── Premium: calendar-month allowance ──

    async fn consume_monthly(
        &self,
        user_id: &str,
        plan: &PlanLimits,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, LedgerError> {
        if !plan.monthly_enforced() {
            // Unlimited plan: still tracked, never rejected.
            self.store.consume_monthly_unchecked(user_id).await?;
            let record = self.reread(user_id, now).await?;
            return Ok(ConsumeOutcome::Granted {
                usage: UsageReport::from_record(&record, plan),
            });
        }

        if self
            .store
            .try_consume_monthly(user_id, plan.monthly_limit)
            .await?
        {
            let record = self.reread(user_id, now).await?;
            return Ok(ConsumeOutcome::Granted {
                usage: UsageReport::from_record(&record, plan),
            });
        }

        // Re-read so the rejection reports the counts as stored.
        let record = self.reread(user_id, now).await?;
        Ok(ConsumeOutcome::Rejected(QuotaRejection::new(
            record.monthly_count,
            plan.monthly_limit,
            Some(record.monthly_reset_at),
            now,
            QuotaScope::Monthly,
        )))
    }

    // ── Free: daily allowance with rolling lock ──

    async fn consume_daily(
        &self,
        user_id: &str,
        plan: &PlanLimits,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, LedgerError> {
        self.store.clear_daily_lock_if_expired(user_id, now).await?;

        let record = self.reread(user_id, now).await?;
        if let Some(reset_at) = record.daily_reset_at {
            if reset_at > now {
                // Window still locked from an earlier rejection.
                return Ok(ConsumeOutcome::Rejected(QuotaRejection::new(
                    record.daily_count,
                    plan.daily_limit.max(0),
                    Some(reset_at),
                    now,
                    QuotaScope::Daily,
                )));
            }
        }

        if !plan.daily_enforced() {
            self.store.consume_daily_unchecked(user_id).await?;
            let record = self.reread(user_id, now).await?;
            return Ok(ConsumeOutcome::Granted {
                usage: UsageReport::from_record(&record, plan),
            });
        }

        if self
            .store
            .try_consume_daily(user_id, plan.daily_limit)
            .await?
        {
            let record = self.reread(user_id, now).await?;
            return Ok(ConsumeOutcome::Granted {
                usage: UsageReport::from_record(&record, plan),
            });
        }

        // First rejection arms the lock; racers converge on one instant.
        let reset_at = self
            .store
            .arm_daily_lock(user_id, now + Duration::hours(DAILY_LOCK_WINDOW_HOURS))
            .await?;
        let record = self.reread(user_id, now).await?;
        Ok(ConsumeOutcome::Rejected(QuotaRejection::new(
            record.daily_count,
            plan.daily_limit,
            Some(reset_at),
            now,
            QuotaScope::Daily,
        )))
    }

    /// Post-update read. A missing row after `ensure` can only mean the
    /// backend lost it mid-flight; answer with a fresh window rather than
    /// failing the whole request.
    async fn reread(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, LedgerError> {
        Ok(self
            .store
            .get(user_id)
            .await?
            .unwrap_or_else(|| UsageRecord::new(user_id, next_month_start(now))))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    fn limiter() -> (Limiter, Arc<MemoryLedger>) {
        let store = Arc::new(MemoryLedger::new());
        (Limiter::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_free_plan_grants_until_daily_limit() {
        let (limiter, _) = limiter();
        let plan = PlanLimits::free(3);

        for i in 1..=3 {
            match limiter.consume("u1", &plan, false).await.unwrap() {
                ConsumeOutcome::Granted { usage } => {
                    assert_eq!(usage.daily_used, i);
                    assert_eq!(usage.daily_limit, 3);
                }
                other => panic!("expected grant, got {:?}", other),
            }
        }

        match limiter.consume("u1", &plan, false).await.unwrap() {
            ConsumeOutcome::Rejected(rejection) => {
                assert_eq!(rejection.used, 3);
                assert_eq!(rejection.limit, 3);
                assert_eq!(rejection.remaining, 0);
                assert_eq!(rejection.scope, QuotaScope::Daily);
                let reset_in = rejection.reset_in_seconds.unwrap();
                assert!(reset_in > 0 && reset_in <= DAILY_LOCK_WINDOW_HOURS * 3600);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repeated_rejections_share_one_reset_instant() {
        let (limiter, _) = limiter();
        let plan = PlanLimits::free(1);
        limiter.consume("u1", &plan, false).await.unwrap();

        let first = match limiter.consume("u1", &plan, false).await.unwrap() {
            ConsumeOutcome::Rejected(r) => r.reset_at.unwrap(),
            other => panic!("expected rejection, got {:?}", other),
        };
        for _ in 0..3 {
            match limiter.consume("u1", &plan, false).await.unwrap() {
                ConsumeOutcome::Rejected(r) => assert_eq!(r.reset_at.unwrap(), first),
                other => panic!("expected rejection, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_last_slot_yield_one_grant() {
        let (limiter, _) = limiter();
        let plan = PlanLimits::free(5);
        for _ in 0..4 {
            assert!(limiter.consume("u1", &plan, false).await.unwrap().is_granted());
        }

        let mut joins = Vec::new();
        for _ in 0..3 {
            let limiter = limiter.clone();
            let plan = plan.clone();
            joins.push(tokio::spawn(async move {
                limiter.consume("u1", &plan, false).await.unwrap()
            }));
        }

        let mut granted = 0;
        let mut rejected = 0;
        for join in futures::future::join_all(joins).await {
            match join.unwrap() {
                ConsumeOutcome::Granted { usage } => {
                    granted += 1;
                    assert!(usage.daily_used <= 5);
                }
                ConsumeOutcome::Rejected(r) => {
                    rejected += 1;
                    assert_eq!(r.used, 5);
                }
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(rejected, 2);
    }

    #[tokio::test]
    async fn test_tester_bypasses_without_creating_a_record() {
        let (limiter, store) = limiter();
        let plan = PlanLimits::tester();

        for _ in 0..10 {
            match limiter.consume("tester-1", &plan, false).await.unwrap() {
                ConsumeOutcome::Granted { usage } => {
                    assert!(usage.is_tester);
                    assert_eq!(usage.daily_used, 0);
                }
                other => panic!("expected grant, got {:?}", other),
            }
        }
        assert!(store.get("tester-1").await.unwrap().is_none());
        assert!(store.is_empty());

        let report = limiter.report("tester-1", &plan).await.unwrap();
        assert!(report.is_tester);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_nonpositive_daily_limit_tracks_but_never_rejects() {
        let (limiter, store) = limiter();
        let plan = PlanLimits::free(0);

        for _ in 0..25 {
            assert!(limiter.consume("u1", &plan, false).await.unwrap().is_granted());
        }
        let record = store.get("u1").await.unwrap().unwrap();
        assert_eq!(record.daily_count, 25);
        assert!(record.daily_reset_at.is_none());
    }

    #[tokio::test]
    async fn test_premium_monthly_cap_and_rejection_scope() {
        let (limiter, _) = limiter();
        let plan = PlanLimits::premium(2);

        assert!(limiter.consume("p1", &plan, true).await.unwrap().is_granted());
        assert!(limiter.consume("p1", &plan, true).await.unwrap().is_granted());

        match limiter.consume("p1", &plan, true).await.unwrap() {
            ConsumeOutcome::Rejected(rejection) => {
                assert_eq!(rejection.scope, QuotaScope::Monthly);
                assert_eq!(rejection.used, 2);
                assert_eq!(rejection.remaining, 0);
                // Boundary sits at the next calendar month start.
                assert!(rejection.reset_at.unwrap() > Utc::now());
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_premium_unlimited_tracks_monthly() {
        let (limiter, store) = limiter();
        let plan = PlanLimits::premium(0);

        for _ in 0..7 {
            assert!(limiter.consume("p1", &plan, true).await.unwrap().is_granted());
        }
        let record = store.get("p1").await.unwrap().unwrap();
        assert_eq!(record.monthly_count, 7);
        assert_eq!(record.daily_count, 0);
    }

    #[tokio::test]
    async fn test_expired_lock_reopens_the_daily_window() {
        let (limiter, store) = limiter();
        let plan = PlanLimits::free(2);

        // Exhausted window whose lock is already in the past.
        store.ensure("u1", next_month_start(Utc::now())).await.unwrap();
        store.consume_daily_unchecked("u1").await.unwrap();
        store.consume_daily_unchecked("u1").await.unwrap();
        store
            .arm_daily_lock("u1", Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        match limiter.consume("u1", &plan, false).await.unwrap() {
            ConsumeOutcome::Granted { usage } => {
                // Fresh window: the stale count was zeroed before this grant.
                assert_eq!(usage.daily_used, 1);
                assert!(usage.daily_reset_at.is_none());
            }
            other => panic!("expected grant, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_locked_window_rejects_before_touching_counters() {
        let (limiter, store) = limiter();
        let plan = PlanLimits::free(2);
        limiter.consume("u1", &plan, false).await.unwrap();
        limiter.consume("u1", &plan, false).await.unwrap();
        limiter.consume("u1", &plan, false).await.unwrap(); // arms the lock

        let before = store.get("u1").await.unwrap().unwrap();
        match limiter.consume("u1", &plan, false).await.unwrap() {
            ConsumeOutcome::Rejected(rejection) => {
                assert_eq!(rejection.used, before.daily_count);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        let after = store.get("u1").await.unwrap().unwrap();
        assert_eq!(after.daily_count, before.daily_count);
        assert_eq!(after.monthly_count, before.monthly_count);
    }

    #[tokio::test]
    async fn test_report_reflects_consumption() {
        let (limiter, _) = limiter();
        let plan = PlanLimits::free(20);
        limiter.consume("u1", &plan, false).await.unwrap();
        limiter.consume("u1", &plan, false).await.unwrap();

        let report = limiter.report("u1", &plan).await.unwrap();
        assert_eq!(report.daily_used, 2);
        assert_eq!(report.daily_limit, 20);
        assert_eq!(report.monthly_used, 2);
        assert!(!report.is_tester);
    }
}
