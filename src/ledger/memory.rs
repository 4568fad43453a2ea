//! In-memory ledger backed by a concurrent map.
//!
//! Default backend for development and tests. Atomicity comes from the
//! map's per-key locking: every conditional update runs inside a single
//! `get_mut`/`entry` critical section, so concurrent consumers of the same
//! user serialize on that key and the "increment where below limit" check
//! can never interleave with another writer.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use async_trait::async_trait;

use crate::error::LedgerError;

use super::{LedgerStore, UsageRecord};

/// Concurrent-map ledger. Cheap to clone-share via `Arc`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: DashMap<String, UsageRecord>,
}

impl MemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held (test/reporting convenience).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError> {
        Ok(self.records.get(user_id).map(|r| r.clone()))
    }

    async fn ensure(
        &self,
        user_id: &str,
        monthly_reset_at: DateTime<Utc>,
    ) -> Result<UsageRecord, LedgerError> {
        let entry = self
            .records
            .entry(user_id.to_string())
            .or_insert_with(|| UsageRecord::new(user_id, monthly_reset_at));
        Ok(entry.clone())
    }

    async fn try_consume_daily(
        &self,
        user_id: &str,
        daily_limit: i64,
    ) -> Result<bool, LedgerError> {
        match self.records.get_mut(user_id) {
            Some(mut record) => {
                if record.daily_count < daily_limit {
                    record.daily_count += 1;
                    record.monthly_count += 1;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            None => Ok(false),
        }
    }

    async fn try_consume_monthly(
        &self,
        user_id: &str,
        monthly_limit: i64,
    ) -> Result<bool, LedgerError> {
        match self.records.get_mut(user_id) {
            Some(mut record) => {
                if record.monthly_count < monthly_limit {
                    record.monthly_count += 1;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            None => Ok(false),
        }
    }

    async fn consume_daily_unchecked(&self, user_id: &str) -> Result<(), LedgerError> {
        if let Some(mut record) = self.records.get_mut(user_id) {
            record.daily_count += 1;
            record.monthly_count += 1;
        }
        Ok(())
    }

    async fn consume_monthly_unchecked(&self, user_id: &str) -> Result<(), LedgerError> {
        if let Some(mut record) = self.records.get_mut(user_id) {
            record.monthly_count += 1;
        }
        Ok(())
    }

    async fn arm_daily_lock(
        &self,
        user_id: &str,
        reset_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, LedgerError> {
        match self.records.get_mut(user_id) {
            Some(mut record) => match record.daily_reset_at {
                // Someone armed it first; their instant stands.
                Some(existing) => Ok(existing),
                None => {
                    record.daily_reset_at = Some(reset_at);
                    Ok(reset_at)
                }
            },
            None => Ok(reset_at),
        }
    }

    async fn clear_daily_lock_if_expired(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if let Some(mut record) = self.records.get_mut(user_id) {
            if matches!(record.daily_reset_at, Some(t) if t <= now) {
                record.daily_reset_at = None;
                record.daily_count = 0;
            }
        }
        Ok(())
    }

    async fn roll_monthly_if_expired(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        next_reset: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if let Some(mut record) = self.records.get_mut(user_id) {
            if record.monthly_reset_at <= now {
                record.monthly_count = 0;
                record.monthly_reset_at = next_reset;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
