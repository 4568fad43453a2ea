//! State, empathy, and emotion rewrites: the reply learns to open gently.
//!
//! Three consecutive prepend-style steps. Each one is guarded by a
//! presence check, so a phrase lands at most once no matter how often the
//! pipeline runs over the same text. The guards use `contains` rather than
//! a prefix match because later steps prepend in front of earlier ones.

use crate::error::OrchestrateError;
use crate::orchestrator::text;
use crate::phrases;
use crate::tone::ToneProfile;
use crate::types::{
    ConversationState, EmotionSnapshot, Language, SeverityLevel, VerbosityMode,
};

/// Sentence budget a grieving reply is trimmed to. Long walls of text do
/// not comfort.
pub const SAD_SUPPORT_SENTENCE_BUDGET: usize = 4;

/// Step 3: conversation-state rewrite.
///
/// SAD_SUPPORT trims to a short budget; the other active states prepend
/// one grounding phrase; NEUTRAL passes through.
pub fn apply_state_rewrite(
    text: &str,
    state: ConversationState,
    language: Language,
) -> Result<String, OrchestrateError> {
    match state {
        ConversationState::SadSupport => {
            Ok(text::truncate_sentences(text, SAD_SUPPORT_SENTENCE_BUDGET))
        }
        _ => match phrases::pack(language).state_phrase(state)? {
            Some(phrase) => Ok(prepend_once(text, phrase)),
            None => Ok(text.to_string()),
        },
    }
}

/// Step 4: empathy opener.
///
/// High empathy gets the validating opener, medium the lighter one. The
/// opener is skipped when the model already opened empathically, and for
/// short casual chit-chat where it would read as boilerplate.
pub fn apply_empathy_opener(
    text: &str,
    tone: &ToneProfile,
    severity: SeverityLevel,
    verbosity: VerbosityMode,
    language: Language,
) -> Result<String, OrchestrateError> {
    if verbosity == VerbosityMode::Short && severity == SeverityLevel::Casual {
        return Ok(text.to_string());
    }

    match phrases::pack(language).opener(tone.empathy)? {
        Some(opener) => {
            if text.contains(opener) || has_empathic_prefix(text, language) {
                Ok(text.to_string())
            } else {
                Ok(format!("{} {}", opener, text))
            }
        }
        None => Ok(text.to_string()),
    }
}

/// Step 5: emotion modulation. One short framing phrase for the dominant
/// emotion, same at-most-once guard.
pub fn apply_emotion_modulation(
    text: &str,
    emotion: &EmotionSnapshot,
    language: Language,
) -> Result<String, OrchestrateError> {
    match phrases::pack(language).emotion_phrase(emotion.primary)? {
        Some(phrase) => Ok(prepend_once(text, phrase)),
        None => Ok(text.to_string()),
    }
}

fn prepend_once(text: &str, phrase: &str) -> String {
    if text.contains(phrase) {
        text.to_string()
    } else {
        format!("{} {}", phrase, text)
    }
}

/// Whether the reply already opens with validation in its own words.
fn has_empathic_prefix(text: &str, language: Language) -> bool {
    let normalized = text::normalize_for_dedupe(text);
    let prefixes: &[&str] = match language {
        Language::En => &[
            "i hear you",
            "im here",
            "i am here",
            "that sounds",
            "thank you for sharing",
            "it makes sense",
            "what youre feeling",
        ],
        Language::Ar => &["أسمعك", "أنا هنا", "شكرا لمشاركتك", "شكرا لأنك شاركتني", "مشاعرك مفهومة"],
    };
    prefixes
        .iter()
        .any(|p| normalized.starts_with(&text::normalize_for_dedupe(p)))
}

// ============================================================================
// Tests
// ============================================================================
