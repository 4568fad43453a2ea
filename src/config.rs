//! Service configuration, loaded once from the environment at startup.

use std::time::Duration;

use crate::types::conversation::Language;
use crate::types::plan::PlanLimits;

/// Default free-tier daily message cap.
pub const FREE_DAILY_LIMIT: i64 = 20;

/// Default premium monthly message cap.
pub const PREMIUM_MONTHLY_LIMIT: i64 = 1500;

/// Which usage-ledger backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    Sqlite,
    Postgres,
}

impl LedgerBackend {
    /// Parse the `LEDGER_BACKEND` value. Unknown names fall back to sqlite
    /// so a typo degrades to the durable default instead of data loss.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "memory" => LedgerBackend::Memory,
            "postgres" => LedgerBackend::Postgres,
            _ => LedgerBackend::Sqlite,
        }
    }
}

/// Configuration for the chat service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port.
    pub port: u16,
    /// Usage-ledger backend selector.
    pub ledger_backend: LedgerBackend,
    /// SQLite database path (when `ledger_backend` is sqlite).
    pub sqlite_path: String,
    /// PostgreSQL connection string (when `ledger_backend` is postgres).
    pub database_url: String,
    /// Completion API key.
    pub completion_api_key: String,
    /// Completion API base URL.
    pub completion_base_url: String,
    /// Model for fast-engine replies and classification.
    pub fast_model: String,
    /// Model for deep-engine replies.
    pub deep_model: String,
    /// Internal bookkeeping API (trust, timeline, memory, conversation
    /// state). Absent means those collaborators run as in-crate fallbacks.
    pub bookkeeping_url: Option<String>,
    /// Bookkeeping API key.
    pub bookkeeping_api_key: String,
    /// Free-plan daily message cap.
    pub free_daily_limit: i64,
    /// Premium-plan monthly message cap.
    pub premium_monthly_limit: i64,
    /// Language assumed when a request does not say.
    pub default_language: Language,
    /// Outbound HTTP timeout, seconds.
    pub http_timeout_secs: u64,
}

impl AppConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            ledger_backend: LedgerBackend::parse(
                &std::env::var("LEDGER_BACKEND").unwrap_or_default(),
            ),
            sqlite_path: std::env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "./data/usage.db".into()),
            database_url: std::env::var("DATABASE_URL").unwrap_or_default(),
            completion_api_key: std::env::var("COMPLETION_API_KEY")
                .or_else(|_| std::env::var("XAI_API_KEY"))
                .unwrap_or_default(),
            completion_base_url: std::env::var("COMPLETION_BASE_URL")
                .unwrap_or_else(|_| "https://api.x.ai/v1".into()),
            fast_model: std::env::var("FAST_MODEL").unwrap_or_else(|_| "grok-3-mini".into()),
            deep_model: std::env::var("DEEP_MODEL").unwrap_or_else(|_| "grok-3".into()),
            bookkeeping_url: std::env::var("BOOKKEEPING_URL").ok().filter(|v| !v.is_empty()),
            bookkeeping_api_key: std::env::var("BOOKKEEPING_API_KEY").unwrap_or_default(),
            free_daily_limit: std::env::var("FREE_DAILY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(FREE_DAILY_LIMIT),
            premium_monthly_limit: std::env::var("PREMIUM_MONTHLY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(PREMIUM_MONTHLY_LIMIT),
            default_language: match std::env::var("DEFAULT_LANGUAGE").as_deref() {
                Ok("ar") => Language::Ar,
                _ => Language::En,
            },
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Map a request's plan name onto concrete limits. Unknown plan names
    /// are treated as free tier.
    pub fn plan_limits(&self, plan: &str) -> PlanLimits {
        match plan.to_ascii_lowercase().as_str() {
            "premium" => PlanLimits::premium(self.premium_monthly_limit),
            "tester" => PlanLimits::tester(),
            _ => PlanLimits::free(self.free_daily_limit),
        }
    }

    /// Whether a plan name is the premium tier (drives engine selection).
    pub fn is_premium_plan(&self, plan: &str) -> bool {
        plan.eq_ignore_ascii_case("premium")
    }

    /// Shared outbound HTTP client with the configured timeout.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
            .unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            ledger_backend: LedgerBackend::Memory,
            sqlite_path: "./data/usage.db".into(),
            database_url: String::new(),
            completion_api_key: String::new(),
            completion_base_url: "https://api.x.ai/v1".into(),
            fast_model: "grok-3-mini".into(),
            deep_model: "grok-3".into(),
            bookkeeping_url: None,
            bookkeeping_api_key: String::new(),
            free_daily_limit: FREE_DAILY_LIMIT,
            premium_monthly_limit: PREMIUM_MONTHLY_LIMIT,
            default_language: Language::En,
            http_timeout_secs: 30,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_table_defaults_to_free() {
        let config = AppConfig::default();
        assert_eq!(config.plan_limits("free"), PlanLimits::free(FREE_DAILY_LIMIT));
        assert_eq!(config.plan_limits("FREE"), PlanLimits::free(FREE_DAILY_LIMIT));
        assert_eq!(
            config.plan_limits("enterprise-trial"),
            PlanLimits::free(FREE_DAILY_LIMIT)
        );
        assert_eq!(
            config.plan_limits("premium"),
            PlanLimits::premium(PREMIUM_MONTHLY_LIMIT)
        );
        assert!(config.plan_limits("tester").is_tester);
    }

    #[test]
    fn test_backend_parse_falls_back_to_sqlite() {
        assert_eq!(LedgerBackend::parse("memory"), LedgerBackend::Memory);
        assert_eq!(LedgerBackend::parse("Postgres"), LedgerBackend::Postgres);
        assert_eq!(LedgerBackend::parse("sqlte"), LedgerBackend::Sqlite);
        assert_eq!(LedgerBackend::parse(""), LedgerBackend::Sqlite);
    }

    #[test]
    fn test_premium_plan_name_check() {
        let config = AppConfig::default();
        assert!(config.is_premium_plan("Premium"));
        assert!(!config.is_premium_plan("free"));
    }
}
