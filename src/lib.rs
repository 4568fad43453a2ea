//! # Sanad
//!
//! Core engine of a bilingual (English/Arabic) companion chat service:
//! usage-quota gating, engine-mode selection, tone-aware reply shaping,
//! and fire-and-forget bookkeeping, exposed over HTTP.
//!
//! The crate splits into three layers:
//!
//! - **Gate**: [`ledger`] + [`limiter`], atomic per-user usage counters
//!   with rolling daily locks and calendar-month windows.
//! - **Shape**: [`engine`], [`tone`], and the [`orchestrator`] pipeline
//!   that rewrites raw model replies into safe, persona-consistent text.
//! - **Flow**: [`chat`] wiring the gate, collaborators, and shaper
//!   together, with [`server`] as the axum surface and [`background`]
//!   carrying the bookkeeping that must never delay a reply.

pub mod background;
pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod limiter;
pub mod orchestrator;
pub mod persona;
pub mod phrases;
pub mod providers;
pub mod server;
pub mod tone;
pub mod types;

// Primary entry points
pub use chat::{ChatOutcome, ChatReply, ChatRequest, ChatService};
pub use config::AppConfig;
pub use engine::{select_mode, EngineMode};
pub use ledger::{LedgerStore, MemoryLedger, SqliteLedger, UsageRecord, UsageReport};
pub use limiter::{ConsumeOutcome, Limiter, QuotaRejection, QuotaScope};
pub use orchestrator::{orchestrate, OrchestratorInput};
pub use tone::{select_tone, ToneProfile};

/// Library version.
pub const VERSION: &str = "0.9.2";
