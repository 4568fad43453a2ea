//! Interfaces to the services the chat flow consults.
//!
//! Every trait here fronts a network dependency that can be slow, flaky, or
//! simply not deployed. The chat flow treats the read-side collaborators as
//! advisors: when one fails, the request degrades to a neutral default
//! instead of failing. The one exception is [`CompletionProvider`]; without
//! a model reply there is nothing to send, so its errors are real errors.
//!
//! The write-side methods (`record_*`) are only ever called from the
//! background queue, after the response has already gone out.

pub mod http;

use async_trait::async_trait;

use crate::engine::EngineMode;
use crate::types::conversation::{ChatTurn, ConversationState, Language};
use crate::types::emotion::Classification;
use crate::types::trust::TrustSnapshot;

pub use http::{HttpClassifier, HttpCompletion};

// ============================================================================
// Collaborator traits
// ============================================================================

/// Classifies one user message into emotion, severity, and trigger topics.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Classify `message`, with `recent` turns as context.
    ///
    /// Implementations should be lenient: a half-parsed response is better
    /// than an error, because the caller falls back to neutral anyway.
    async fn classify(
        &self,
        message: &str,
        recent: &[ChatTurn],
        language: Language,
    ) -> Result<Classification, anyhow::Error>;
}

/// Produces the raw model reply that the response pipeline then shapes.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one chat completion.
    ///
    /// `messages` is the full transcript to send (history plus the current
    /// user turn); the system prompt is passed separately so adapters can
    /// place it per their wire format. `mode` selects the model/parameters.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatTurn],
        mode: EngineMode,
    ) -> Result<String, anyhow::Error>;
}

/// Reports where the external dialogue state machine currently has a
/// session. This crate never transitions the state, it only reads it.
#[async_trait]
pub trait ConversationTracker: Send + Sync {
    async fn current_state(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<ConversationState, anyhow::Error>;
}

/// Read and write access to the relationship-trust service.
#[async_trait]
pub trait TrustService: Send + Sync {
    /// Current trust standing for a user.
    async fn snapshot(&self, user_id: &str) -> Result<TrustSnapshot, anyhow::Error>;

    /// Report one completed exchange so the service can adjust the score.
    /// Called from the background queue only.
    async fn record_interaction(
        &self,
        user_id: &str,
        severity: &str,
    ) -> Result<(), anyhow::Error>;
}

/// Append-only log of notable conversation events.
#[async_trait]
pub trait TimelineService: Send + Sync {
    async fn record(
        &self,
        user_id: &str,
        kind: &str,
        summary: &str,
    ) -> Result<(), anyhow::Error>;
}

/// Long-term memory writer. Stores the exchange for future retrieval.
#[async_trait]
pub trait MemoryService: Send + Sync {
    async fn record(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(), anyhow::Error>;
}

// ============================================================================
// In-crate fallbacks
// ============================================================================

/// Classifier that reads every message as neutral small talk. Used when no
/// classifier endpoint is configured, and as the degraded-mode stand-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralClassifier;

#[async_trait]
impl EmotionClassifier for NeutralClassifier {
    async fn classify(
        &self,
        _message: &str,
        _recent: &[ChatTurn],
        _language: Language,
    ) -> Result<Classification, anyhow::Error> {
        Ok(Classification::default())
    }
}

/// Trust service that answers every snapshot with the same fixed score and
/// accepts interaction reports without storing them.
#[derive(Debug, Clone, Copy)]
pub struct FixedTrust {
    pub trust_score: i32,
}

impl FixedTrust {
    pub fn new(trust_score: i32) -> Self {
        FixedTrust { trust_score }
    }
}

impl Default for FixedTrust {
    fn default() -> Self {
        // Mid-ladder: tier 3, so nothing trust-gated flips either way.
        FixedTrust { trust_score: 50 }
    }
}

#[async_trait]
impl TrustService for FixedTrust {
    async fn snapshot(&self, _user_id: &str) -> Result<TrustSnapshot, anyhow::Error> {
        Ok(TrustSnapshot {
            trust_score: self.trust_score,
            trust_level: 0,
        })
    }

    async fn record_interaction(
        &self,
        _user_id: &str,
        _severity: &str,
    ) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Conversation tracker that keeps every session in the neutral state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTracker;

#[async_trait]
impl ConversationTracker for NullTracker {
    async fn current_state(
        &self,
        _user_id: &str,
        _session_id: &str,
    ) -> Result<ConversationState, anyhow::Error> {
        Ok(ConversationState::Neutral)
    }
}

// ============================================================================
// Tests
// ============================================================================
