//! Response orchestrator: the 10-step rewrite between model and user.
//!
//! The pipeline per reply:
//! 1. Directive softening (unless trust tier >= 4)
//! 2. Trigger redaction (top 3 topics)
//! 3. State-specific rewrite
//! 4. Empathy opener
//! 5. Emotion modulation
//! 6. Free/fast flattening
//! 7. Disclaimer normalization (at most one canonical footer)
//! 8. Length capping by engine mode
//! 9. Short-verbosity enforcement
//! 10. Emoji decoration
//!
//! Steps are strictly ordered and individually idempotent. The public
//! entry point is fail-open: any internal error is logged and the raw
//! reply goes out untouched, because delivering the reply outranks
//! decorating it.

pub mod disclaimer;
pub mod emoji;
pub mod length;
pub mod redaction;
pub mod rewrite;
pub mod softening;
pub mod text;

use crate::engine::EngineMode;
use crate::error::OrchestrateError;
use crate::persona::PersonaStyle;
use crate::tone::select_tone;
use crate::types::{
    ConversationState, EmotionSnapshot, Language, SeverityLevel, Trigger, TrustSnapshot,
    VerbosityMode,
};

/// Everything the pipeline needs to rewrite one reply.
#[derive(Debug, Clone)]
pub struct OrchestratorInput {
    /// The model's reply, verbatim.
    pub raw_reply: String,
    pub emotion: EmotionSnapshot,
    pub state: ConversationState,
    pub triggers: Vec<Trigger>,
    pub language: Language,
    pub severity: SeverityLevel,
    pub persona: PersonaStyle,
    pub engine_mode: EngineMode,
    pub is_premium: bool,
    pub trust: TrustSnapshot,
    pub verbosity: VerbosityMode,
}

/// Rewrite a reply, returning the raw text unchanged if anything inside
/// the pipeline fails.
pub fn orchestrate(input: &OrchestratorInput) -> String {
    match run_pipeline(input) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "reply pipeline failed, returning raw reply");
            input.raw_reply.clone()
        }
    }
}

/// The pipeline itself. Exposed for tests and for callers that want the
/// error instead of the fail-open fallback.
pub fn run_pipeline(input: &OrchestratorInput) -> Result<String, OrchestrateError> {
    let tier = input.trust.tier();
    let tone = select_tone(input.severity, input.state, &input.persona, tier);

    // ── Step 1: Directive softening ─────────────────────────────────────
    let mut reply = softening::soften_directives(&input.raw_reply, input.language, tier);

    // ── Step 2: Trigger redaction ───────────────────────────────────────
    reply = redaction::redact_triggers(&reply, &input.triggers, input.language)?;

    // ── Step 3: State rewrite ───────────────────────────────────────────
    reply = rewrite::apply_state_rewrite(&reply, input.state, input.language)?;

    // ── Step 4: Empathy opener ──────────────────────────────────────────
    reply = rewrite::apply_empathy_opener(
        &reply,
        &tone,
        input.severity,
        input.verbosity,
        input.language,
    )?;

    // ── Step 5: Emotion modulation ──────────────────────────────────────
    reply = rewrite::apply_emotion_modulation(&reply, &input.emotion, input.language)?;

    // ── Step 6: Free/fast flattening ────────────────────────────────────
    reply = length::flatten_fast_reply(&reply, input.engine_mode, input.is_premium);

    // ── Step 7: Disclaimer normalization ────────────────────────────────
    reply = disclaimer::normalize_disclaimers(
        &reply,
        &tone,
        input.severity,
        &input.emotion,
        input.state,
        input.language,
    )?;

    // ── Step 8: Length capping ──────────────────────────────────────────
    reply = length::cap_reply_lines(
        &reply,
        input.engine_mode,
        &tone,
        input.emotion.intensity,
        tier,
        input.state,
        input.language,
    );

    // ── Step 9: Short-verbosity enforcement ─────────────────────────────
    reply = length::enforce_short_verbosity(
        &reply,
        input.severity,
        input.verbosity,
        input.language,
    )?;

    // ── Step 10: Emoji decoration ───────────────────────────────────────
    Ok(emoji::decorate(&reply, input.emotion.primary, input.verbosity))
}

// ============================================================================
// Tests
// ============================================================================
