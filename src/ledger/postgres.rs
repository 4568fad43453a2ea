//! PostgreSQL usage ledger.
//!
//! Requires the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! sanad = { features = ["postgres"] }
//! ```

#[cfg(feature = "postgres")]
mod inner {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use sqlx::PgPool;

    use crate::error::LedgerError;
    use crate::ledger::{LedgerStore, UsageRecord};

    impl From<sqlx::Error> for LedgerError {
        fn from(e: sqlx::Error) -> Self {
            LedgerError::OperationError {
                message: e.to_string(),
            }
        }
    }

    /// PostgreSQL ledger for multi-node deployments. The guarded `UPDATE`
    /// statements give the same atomicity as the SQLite backend, row-locked
    /// by the database instead of by a file.
    #[derive(Clone)]
    pub struct PgLedger {
        pool: PgPool,
    }

    impl PgLedger {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        /// Create the usage_records table if missing.
        pub async fn migrate(&self) -> Result<(), LedgerError> {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS usage_records (
                    user_id TEXT PRIMARY KEY,
                    daily_count BIGINT NOT NULL DEFAULT 0,
                    monthly_count BIGINT NOT NULL DEFAULT 0,
                    daily_reset_at TIMESTAMPTZ,
                    monthly_reset_at TIMESTAMPTZ NOT NULL
                )
                "#,
            )
            .execute(&self.pool)
            .await?;

            log::debug!("Usage ledger table migrated");
            Ok(())
        }

        async fn fetch(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError> {
            let row: Option<(String, i64, i64, Option<DateTime<Utc>>, DateTime<Utc>)> =
                sqlx::query_as(
                    r#"
                    SELECT user_id, daily_count, monthly_count, daily_reset_at, monthly_reset_at
                    FROM usage_records WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

            Ok(row.map(
                |(user_id, daily_count, monthly_count, daily_reset_at, monthly_reset_at)| {
                    UsageRecord {
                        user_id,
                        daily_count,
                        monthly_count,
                        daily_reset_at,
                        monthly_reset_at,
                    }
                },
            ))
        }
    }

    #[async_trait]
    impl LedgerStore for PgLedger {
        async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError> {
            self.fetch(user_id).await
        }

        async fn ensure(
            &self,
            user_id: &str,
            monthly_reset_at: DateTime<Utc>,
        ) -> Result<UsageRecord, LedgerError> {
            sqlx::query(
                r#"
                INSERT INTO usage_records (user_id, monthly_reset_at)
                VALUES ($1, $2)
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(monthly_reset_at)
            .execute(&self.pool)
            .await?;

            self.fetch(user_id)
                .await?
                .ok_or_else(|| LedgerError::OperationError {
                    message: format!("usage record for {} vanished after insert", user_id),
                })
        }

        async fn try_consume_daily(
            &self,
            user_id: &str,
            daily_limit: i64,
        ) -> Result<bool, LedgerError> {
            let result = sqlx::query(
                r#"
                UPDATE usage_records
                SET daily_count = daily_count + 1, monthly_count = monthly_count + 1
                WHERE user_id = $1 AND daily_count < $2
                "#,
            )
            .bind(user_id)
            .bind(daily_limit)
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() == 1)
        }

        async fn try_consume_monthly(
            &self,
            user_id: &str,
            monthly_limit: i64,
        ) -> Result<bool, LedgerError> {
            let result = sqlx::query(
                r#"
                UPDATE usage_records
                SET monthly_count = monthly_count + 1
                WHERE user_id = $1 AND monthly_count < $2
                "#,
            )
            .bind(user_id)
            .bind(monthly_limit)
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() == 1)
        }

        async fn consume_daily_unchecked(&self, user_id: &str) -> Result<(), LedgerError> {
            sqlx::query(
                r#"
                UPDATE usage_records
                SET daily_count = daily_count + 1, monthly_count = monthly_count + 1
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn consume_monthly_unchecked(&self, user_id: &str) -> Result<(), LedgerError> {
            sqlx::query(
                r#"
                UPDATE usage_records
                SET monthly_count = monthly_count + 1
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn arm_daily_lock(
            &self,
            user_id: &str,
            reset_at: DateTime<Utc>,
        ) -> Result<DateTime<Utc>, LedgerError> {
            // Set-if-null; the returned value is whichever instant actually
            // landed in the row, not necessarily ours.
            let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
                r#"
                UPDATE usage_records SET daily_reset_at = COALESCE(daily_reset_at, $2)
                WHERE user_id = $1
                RETURNING daily_reset_at
                "#,
            )
            .bind(user_id)
            .bind(reset_at)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.and_then(|(armed,)| armed).unwrap_or(reset_at))
        }

        async fn clear_daily_lock_if_expired(
            &self,
            user_id: &str,
            now: DateTime<Utc>,
        ) -> Result<(), LedgerError> {
            sqlx::query(
                r#"
                UPDATE usage_records SET daily_reset_at = NULL, daily_count = 0
                WHERE user_id = $1 AND daily_reset_at IS NOT NULL AND daily_reset_at <= $2
                "#,
            )
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn roll_monthly_if_expired(
            &self,
            user_id: &str,
            now: DateTime<Utc>,
            next_reset: DateTime<Utc>,
        ) -> Result<(), LedgerError> {
            sqlx::query(
                r#"
                UPDATE usage_records SET monthly_count = 0, monthly_reset_at = $3
                WHERE user_id = $1 AND monthly_reset_at <= $2
                "#,
            )
            .bind(user_id)
            .bind(now)
            .bind(next_reset)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

#[cfg(feature = "postgres")]
pub use inner::*;
