//! SQLite-backed usage ledger.
//!
//! Persistence for single-node deployments. Every conditional update is a
//! single guarded `UPDATE ... WHERE` statement, so the limit check and the
//! increment commit atomically inside SQLite even with many concurrent
//! callers. rusqlite is synchronous; each operation opens its own
//! connection inside `spawn_blocking`, with a busy timeout so parallel
//! writers queue instead of failing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::LedgerError;

use super::{LedgerStore, UsageRecord};

const BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite ledger storing one row per user in `usage_records`.
pub struct SqliteLedger {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

impl SqliteLedger {
    /// Open (or create) the database at `db_path` and ensure the schema.
    pub fn new(db_path: PathBuf) -> Result<Self, LedgerError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::ConnectionError {
                    message: e.to_string(),
                })?;
            }
        }

        let ledger = Self { db_path };
        ledger.initialize_db()?;
        Ok(ledger)
    }

    /// Create the `usage_records` table and switch to WAL journaling.
    fn initialize_db(&self) -> Result<(), LedgerError> {
        match open_connection(&self.db_path) {
            Ok(conn) => {
                // journal_mode returns a row, so it has to go through query_row.
                conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS usage_records (
                        user_id TEXT PRIMARY KEY,
                        daily_count INTEGER NOT NULL DEFAULT 0,
                        monthly_count INTEGER NOT NULL DEFAULT 0,
                        daily_reset_at TEXT,
                        monthly_reset_at TEXT NOT NULL
                    )",
                    [],
                )?;
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "LEDGER ERROR: An error occurred during database initialization: {}",
                    e
                );
                Err(e)
            }
        }
    }

    /// Run a closure against a fresh connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: &'static str, body: F) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, LedgerError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            body(&conn)
        })
        .await
        .map_err(|e| LedgerError::OperationError {
            message: e.to_string(),
        })?;

        if let Err(e) = &result {
            log::error!("LEDGER ERROR: An error occurred during {}: {}", op, e);
        }
        result
    }
}

fn open_connection(db_path: &Path) -> Result<Connection, LedgerError> {
    let conn = Connection::open(db_path).map_err(|e| LedgerError::ConnectionError {
        message: e.to_string(),
    })?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
    Ok(conn)
}

/// Fixed-width UTC timestamp text. Constant width keeps SQLite's string
/// comparison in the `<=` guards aligned with chronological order.
fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| LedgerError::DecodeError {
            message: format!("bad timestamp {:?}: {}", raw, e),
        })
}

fn select_record(conn: &Connection, user_id: &str) -> Result<Option<UsageRecord>, LedgerError> {
    let row = conn
        .query_row(
            "SELECT user_id, daily_count, monthly_count, daily_reset_at, monthly_reset_at
             FROM usage_records WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((user_id, daily_count, monthly_count, daily_raw, monthly_raw)) => {
            let daily_reset_at = match daily_raw {
                Some(raw) => Some(parse_ts(&raw)?),
                None => None,
            };
            Ok(Some(UsageRecord {
                user_id,
                daily_count,
                monthly_count,
                daily_reset_at,
                monthly_reset_at: parse_ts(&monthly_raw)?,
            }))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("get", move |conn| select_record(conn, &user_id))
            .await
    }

    async fn ensure(
        &self,
        user_id: &str,
        monthly_reset_at: DateTime<Utc>,
    ) -> Result<UsageRecord, LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("ensure", move |conn| {
            // OR IGNORE makes racing creators converge on one row.
            conn.execute(
                "INSERT OR IGNORE INTO usage_records (user_id, monthly_reset_at)
                 VALUES (?1, ?2)",
                params![user_id, fmt_ts(monthly_reset_at)],
            )?;
            select_record(conn, &user_id)?.ok_or_else(|| LedgerError::OperationError {
                message: format!("usage record for {} vanished after insert", user_id),
            })
        })
        .await
    }

    async fn try_consume_daily(
        &self,
        user_id: &str,
        daily_limit: i64,
    ) -> Result<bool, LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("try_consume_daily", move |conn| {
            let changed = conn.execute(
                "UPDATE usage_records
                 SET daily_count = daily_count + 1, monthly_count = monthly_count + 1
                 WHERE user_id = ?1 AND daily_count < ?2",
                params![user_id, daily_limit],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn try_consume_monthly(
        &self,
        user_id: &str,
        monthly_limit: i64,
    ) -> Result<bool, LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("try_consume_monthly", move |conn| {
            let changed = conn.execute(
                "UPDATE usage_records
                 SET monthly_count = monthly_count + 1
                 WHERE user_id = ?1 AND monthly_count < ?2",
                params![user_id, monthly_limit],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn consume_daily_unchecked(&self, user_id: &str) -> Result<(), LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("consume_daily_unchecked", move |conn| {
            conn.execute(
                "UPDATE usage_records
                 SET daily_count = daily_count + 1, monthly_count = monthly_count + 1
                 WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn consume_monthly_unchecked(&self, user_id: &str) -> Result<(), LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("consume_monthly_unchecked", move |conn| {
            conn.execute(
                "UPDATE usage_records
                 SET monthly_count = monthly_count + 1
                 WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn arm_daily_lock(
        &self,
        user_id: &str,
        reset_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("arm_daily_lock", move |conn| {
            // Set-if-null: only the first rejected caller writes the instant.
            conn.execute(
                "UPDATE usage_records SET daily_reset_at = ?2
                 WHERE user_id = ?1 AND daily_reset_at IS NULL",
                params![user_id, fmt_ts(reset_at)],
            )?;
            let armed: Option<Option<String>> = conn
                .query_row(
                    "SELECT daily_reset_at FROM usage_records WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()?;
            match armed.flatten() {
                Some(raw) => parse_ts(&raw),
                None => Ok(reset_at),
            }
        })
        .await
    }

    async fn clear_daily_lock_if_expired(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("clear_daily_lock_if_expired", move |conn| {
            conn.execute(
                "UPDATE usage_records SET daily_reset_at = NULL, daily_count = 0
                 WHERE user_id = ?1
                   AND daily_reset_at IS NOT NULL
                   AND daily_reset_at <= ?2",
                params![user_id, fmt_ts(now)],
            )?;
            Ok(())
        })
        .await
    }

    async fn roll_monthly_if_expired(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        next_reset: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let user_id = user_id.to_string();
        self.with_conn("roll_monthly_if_expired", move |conn| {
            conn.execute(
                "UPDATE usage_records SET monthly_count = 0, monthly_reset_at = ?3
                 WHERE user_id = ?1 AND monthly_reset_at <= ?2",
                params![user_id, fmt_ts(now), fmt_ts(next_reset)],
            )?;
            Ok(())
        })
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
