//! Core data model for the reply-gating and reply-shaping pipeline.
//!
//! Everything here is either plain configuration data (`PlanLimits`) or a
//! read-only snapshot produced by an external collaborator (emotion
//! classifier, conversation tracker, trust service). The only entity with
//! persistent identity and mutation is the usage record, which lives in
//! [`crate::ledger`].

pub mod conversation;
pub mod emotion;
pub mod plan;
pub mod trust;

pub use conversation::{ChatTurn, ConversationState, Language, RequestedMode, VerbosityMode};
pub use emotion::{Classification, EmotionSnapshot, PrimaryEmotion, SeverityLevel, Trigger};
pub use plan::PlanLimits;
pub use trust::{TrustSnapshot, TrustTier};
