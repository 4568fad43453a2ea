//! End-to-end handling of one chat message.
//!
//! The flow is quota-first: nothing is fetched and no model is called until
//! the user's allowance admits the message. After the reply is shaped, all
//! bookkeeping (trust, timeline, memory) leaves through the background
//! queue so the response never waits on it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::background::{BackgroundJob, QueueHandle};
use crate::config::AppConfig;
use crate::engine::{select_mode, EngineMode};
use crate::error::ChatError;
use crate::ledger::UsageReport;
use crate::limiter::{ConsumeOutcome, Limiter, QuotaRejection};
use crate::orchestrator::{orchestrate, OrchestratorInput};
use crate::persona::{PersonaLibrary, PersonaStyle};
use crate::providers::{
    CompletionProvider, ConversationTracker, EmotionClassifier, TrustService,
};
use crate::types::conversation::{
    ChatTurn, ConversationState, Language, RequestedMode, VerbosityMode,
};
use crate::types::emotion::Classification;
use crate::types::trust::TrustSnapshot;

// ============================================================================
// Request / outcome types
// ============================================================================

/// One incoming chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Account the message belongs to.
    pub user_id: String,
    /// Session identifier, for conversation-state lookups.
    pub session_id: String,
    /// The user's message text.
    pub message: String,
    /// Subscription plan name. Unknown or absent means free tier.
    #[serde(default)]
    pub plan: String,
    /// Persona override; absent uses the default persona.
    #[serde(default)]
    pub persona_id: Option<String>,
    /// Conversation language; absent uses the configured default.
    #[serde(default)]
    pub language: Option<Language>,
    /// Reply verbosity preference.
    #[serde(default)]
    pub verbosity: Option<VerbosityMode>,
    /// Explicit engine hint.
    #[serde(default)]
    pub requested_mode: Option<RequestedMode>,
    /// Prior turns, oldest first. Replayed into the completion call.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// A successfully produced reply.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// The shaped reply text.
    pub reply: String,
    /// Engine tier that produced it.
    pub engine_mode: EngineMode,
    /// Persona that spoke.
    pub persona_id: String,
    /// Classifier's severity reading for the user's message.
    pub severity: String,
    /// Usage after this message was charged.
    pub usage: UsageReport,
}

/// What handling a message produced. Quota rejection is an outcome, not an
/// error; the caller decides how to present it.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Reply(ChatReply),
    LimitReached(QuotaRejection),
}

// ============================================================================
// Service
// ============================================================================

/// Owns the collaborators for the chat flow. Cheap to clone; every field is
/// shared.
#[derive(Clone)]
pub struct ChatService {
    config: Arc<AppConfig>,
    limiter: Limiter,
    personas: &'static PersonaLibrary,
    classifier: Arc<dyn EmotionClassifier>,
    completion: Arc<dyn CompletionProvider>,
    tracker: Arc<dyn ConversationTracker>,
    trust: Arc<dyn TrustService>,
    queue: QueueHandle,
}

impl ChatService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        limiter: Limiter,
        classifier: Arc<dyn EmotionClassifier>,
        completion: Arc<dyn CompletionProvider>,
        tracker: Arc<dyn ConversationTracker>,
        trust: Arc<dyn TrustService>,
        queue: QueueHandle,
    ) -> Self {
        ChatService {
            config,
            limiter,
            personas: PersonaLibrary::built_in(),
            classifier,
            completion,
            tracker,
            trust,
            queue,
        }
    }

    /// Process one message end to end.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatOutcome, ChatError> {
        let limits = self.config.plan_limits(&request.plan);
        let is_premium = self.config.is_premium_plan(&request.plan);

        // ── Step 1: Quota gate ──────────────────────────────────────────────
        let usage = match self
            .limiter
            .consume(&request.user_id, &limits, is_premium)
            .await?
        {
            ConsumeOutcome::Granted { usage } => usage,
            ConsumeOutcome::Rejected(rejection) => {
                return Ok(ChatOutcome::LimitReached(rejection));
            }
        };

        let language = request.language.unwrap_or(self.config.default_language);

        // ── Step 2: Gather context concurrently ─────────────────────────────
        let (classification, state, trust) = tokio::join!(
            self.classifier
                .classify(&request.message, &request.history, language),
            self.tracker
                .current_state(&request.user_id, &request.session_id),
            self.trust.snapshot(&request.user_id),
        );
        let classification = classification.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "classifier unavailable, reading message as neutral");
            Classification::default()
        });
        let state = state.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "conversation tracker unavailable, assuming neutral state");
            ConversationState::Neutral
        });
        let trust = trust.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "trust service unavailable, assuming new account");
            TrustSnapshot::default()
        });

        // ── Step 3: Pick the engine ─────────────────────────────────────────
        let mode = select_mode(
            classification.severity,
            trust.tier(),
            is_premium,
            request.requested_mode,
            request.history.len(),
        );

        // ── Step 4: Resolve the persona ─────────────────────────────────────
        let persona = match request.persona_id.as_deref() {
            Some(id) => self
                .personas
                .get(id)
                .ok_or_else(|| ChatError::UnknownPersona { id: id.to_string() })?,
            None => self.personas.default_persona(),
        };

        // ── Step 5: Completion call ─────────────────────────────────────────
        let system_prompt = build_system_prompt(&persona, language, state, mode);
        let mut messages = request.history.clone();
        messages.push(ChatTurn::user(request.message.clone()));
        let raw_reply = self
            .completion
            .complete(&system_prompt, &messages, mode)
            .await
            .map_err(|e| ChatError::Completion {
                message: e.to_string(),
            })?;

        // ── Step 6: Shape the reply ─────────────────────────────────────────
        let input = OrchestratorInput {
            raw_reply,
            emotion: classification.emotion.clone(),
            state,
            triggers: classification.triggers.clone(),
            language,
            severity: classification.severity,
            persona: persona.clone(),
            engine_mode: mode,
            is_premium,
            trust,
            verbosity: request.verbosity.unwrap_or_default(),
        };
        let reply = orchestrate(&input);

        // ── Step 7: Deferred bookkeeping ────────────────────────────────────
        self.queue.enqueue(BackgroundJob::trust_update(
            &request.user_id,
            classification.severity,
        ));
        self.queue.enqueue(BackgroundJob::timeline_event(
            &request.user_id,
            "chat_exchange",
            format!(
                "{} via {} as {}",
                classification.severity.label(),
                mode.label(),
                persona.id
            ),
        ));
        self.queue.enqueue(BackgroundJob::memory_write(
            &request.user_id,
            &request.message,
            &reply,
        ));

        Ok(ChatOutcome::Reply(ChatReply {
            reply,
            engine_mode: mode,
            persona_id: persona.id,
            severity: classification.severity.label().to_string(),
            usage,
        }))
    }

    /// Current usage for a user under a plan, for the usage endpoint.
    pub async fn usage_report(
        &self,
        user_id: &str,
        plan: &str,
    ) -> Result<UsageReport, ChatError> {
        let limits = self.config.plan_limits(plan);
        Ok(self.limiter.report(user_id, &limits).await?)
    }
}

/// Compose the system prompt: persona identity, then the standing
/// instructions the reply pipeline relies on.
fn build_system_prompt(
    persona: &PersonaStyle,
    language: Language,
    state: ConversationState,
    mode: EngineMode,
) -> String {
    let mut prompt = persona.system_prompt.trim_end().to_string();

    prompt.push_str(match language {
        Language::En => "\n\nReply in English.",
        Language::Ar => "\n\nReply in Arabic.",
    });

    if state.is_support_state() {
        prompt.push_str(
            "\nThe user is going through a difficult stretch. Stay present, \
             validate before anything else, and never minimize.",
        );
    }

    if mode == EngineMode::CoreFast {
        prompt.push_str("\nKeep the reply brief and conversational, plain prose only.");
    }

    prompt
}

// ============================================================================
// Tests
// ============================================================================
