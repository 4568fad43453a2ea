//! Conversation-scoped inputs: tracked state, language, caller preferences.

use serde::{Deserialize, Serialize};

/// The state machine position the external conversation tracker has the
/// dialogue in. Read-only input; the tracker owns transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    SadSupport,
    AnxietyCalming,
    AngerDeescalate,
    LonelyCompanionship,
    HopeGuidance,
    #[default]
    #[serde(other)]
    Neutral,
}

impl ConversationState {
    /// The distress-containment states. Sustained severe negative emotion
    /// inside one of these forces the full safety footer even below
    /// HIGH_RISK severity. `HopeGuidance` is forward-looking and excluded.
    pub fn is_support_state(self) -> bool {
        matches!(
            self,
            ConversationState::SadSupport
                | ConversationState::AnxietyCalming
                | ConversationState::AngerDeescalate
                | ConversationState::LonelyCompanionship
        )
    }
}

/// Conversation language. Drives phrase selection, softening rules, and
/// disclaimer detection (detection always scans both rule sets; the
/// canonical footer follows this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    /// Phrase-pack key for this language.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

/// One prior turn of the dialogue, replayed verbatim into the completion
/// call. Roles follow the chat-completions wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "assistant"; forwarded untouched.
    pub role: String,
    /// The turn's text.
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        ChatTurn {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatTurn {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Caller-requested reply verbosity. `Short` turns on sentence dedup, the
/// 220-char clamp, and the follow-up question (severity permitting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbosityMode {
    Short,
    #[default]
    Full,
}

/// Explicit caller hint to the engine-mode selector. Absent a hint the
/// selector decides from severity, trust, and conversation length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedMode {
    /// Force the cheapest mode regardless of account status.
    Lite,
    /// Ask for the deepest mode the account is entitled to.
    Deep,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_state_set() {
        assert!(ConversationState::SadSupport.is_support_state());
        assert!(ConversationState::AngerDeescalate.is_support_state());
        assert!(!ConversationState::HopeGuidance.is_support_state());
        assert!(!ConversationState::Neutral.is_support_state());
    }

    #[test]
    fn test_state_wire_format() {
        let s: ConversationState = serde_json::from_str("\"ANXIETY_CALMING\"").unwrap();
        assert_eq!(s, ConversationState::AnxietyCalming);
        // Unknown states degrade to neutral rather than failing the request.
        let s: ConversationState = serde_json::from_str("\"GRIEF_HOLDING\"").unwrap();
        assert_eq!(s, ConversationState::Neutral);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::En.code(), "en");
        assert_eq!(Language::Ar.code(), "ar");
    }
}
