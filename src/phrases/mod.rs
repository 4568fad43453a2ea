//! Localized phrase pack for the reply pipeline.
//!
//! Openers, state/emotion framing phrases, safety footers, the short-mode
//! follow-up question, and the redaction placeholder, per language. Packs
//! are embedded JSON keyed `section -> key -> text`, loaded once per
//! language and cached for the process lifetime.
//!
//! Lookups return a typed error instead of panicking: a missing key feeds
//! the orchestrator's fail-open path rather than taking the request down.

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use crate::types::{ConversationState, Language, PrimaryEmotion};
use crate::tone::EmpathyLevel;

/// Embedded English phrases.
const EMBEDDED_EN_JSON: &str = include_str!("en.json");
/// Embedded Arabic phrases.
const EMBEDDED_AR_JSON: &str = include_str!("ar.json");

/// A phrase-pack lookup failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Phrase '{section}':'{key}' not found for language '{language}'")]
pub struct PhraseError {
    /// Pack section (e.g. "footers").
    pub section: String,
    /// Key inside the section (e.g. "full").
    pub key: String,
    /// Language code of the pack queried.
    pub language: &'static str,
}

/// All phrases for one language.
#[derive(Debug)]
pub struct PhrasePack {
    language: Language,
    sections: HashMap<String, HashMap<String, String>>,
}

impl PhrasePack {
    fn from_embedded(language: Language, json: &str) -> Self {
        let sections = serde_json::from_str(json)
            .unwrap_or_else(|e| panic!("Error decoding embedded {}.json phrases: {}", language.code(), e));
        Self { language, sections }
    }

    /// Retrieve a phrase by section and key.
    pub fn get(&self, section: &str, key: &str) -> Result<&str, PhraseError> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
            .ok_or_else(|| PhraseError {
                section: section.to_string(),
                key: key.to_string(),
                language: self.language.code(),
            })
    }

    /// The empathy opener for a tone level, if that level carries one.
    pub fn opener(&self, level: EmpathyLevel) -> Result<Option<&str>, PhraseError> {
        match level {
            EmpathyLevel::High => self.get("openers", "high").map(Some),
            EmpathyLevel::Medium => self.get("openers", "medium").map(Some),
            EmpathyLevel::Low => Ok(None),
        }
    }

    /// The short framing phrase prepended by the state rewrite, if the
    /// state carries one (SAD_SUPPORT truncates instead, NEUTRAL no-ops).
    pub fn state_phrase(&self, state: ConversationState) -> Result<Option<&str>, PhraseError> {
        let key = match state {
            ConversationState::AnxietyCalming => "anxiety_calming",
            ConversationState::AngerDeescalate => "anger_deescalate",
            ConversationState::LonelyCompanionship => "lonely_companionship",
            ConversationState::HopeGuidance => "hope_guidance",
            ConversationState::Neutral | ConversationState::SadSupport => return Ok(None),
        };
        self.get("states", key).map(Some)
    }

    /// The emotion-modulation phrase for a primary emotion, if modulated.
    pub fn emotion_phrase(&self, emotion: PrimaryEmotion) -> Result<Option<&str>, PhraseError> {
        let key = match emotion {
            PrimaryEmotion::Sad => "sad",
            PrimaryEmotion::Anxious => "anxious",
            PrimaryEmotion::Angry => "angry",
            PrimaryEmotion::Lonely => "lonely",
            PrimaryEmotion::Hopeful => "hopeful",
            PrimaryEmotion::Grateful | PrimaryEmotion::Neutral => return Ok(None),
        };
        self.get("emotions", key).map(Some)
    }

    /// The canonical full safety footer (crisis resources).
    pub fn footer_full(&self) -> Result<&str, PhraseError> {
        self.get("footers", "full")
    }

    /// The canonical mild footer (companion-not-professional).
    pub fn footer_mild(&self) -> Result<&str, PhraseError> {
        self.get("footers", "mild")
    }

    /// The short-mode follow-up question.
    pub fn followup_question(&self) -> Result<&str, PhraseError> {
        self.get("followups", "question")
    }

    /// The neutral placeholder substituted for redacted trigger topics.
    pub fn redaction_placeholder(&self) -> Result<&str, PhraseError> {
        self.get("redaction", "placeholder")
    }
}

static EN_PACK: OnceLock<PhrasePack> = OnceLock::new();
static AR_PACK: OnceLock<PhrasePack> = OnceLock::new();

/// Get the cached phrase pack for a language.
pub fn pack(language: Language) -> &'static PhrasePack {
    match language {
        Language::En => {
            EN_PACK.get_or_init(|| PhrasePack::from_embedded(Language::En, EMBEDDED_EN_JSON))
        }
        Language::Ar => {
            AR_PACK.get_or_init(|| PhrasePack::from_embedded(Language::Ar, EMBEDDED_AR_JSON))
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
    fn test_both_packs_parse_and_cover_core_keys() {
        for lang in [Language::En, Language::Ar] {
            let p = pack(lang);
            assert!(p.footer_full().is_ok());
            assert!(p.footer_mild().is_ok());
            assert!(p.followup_question().is_ok());
            assert!(p.redaction_placeholder().is_ok());
            assert!(p.opener(EmpathyLevel::High).unwrap().is_some());
            assert!(p.opener(EmpathyLevel::Medium).unwrap().is_some());
            assert!(p.opener(EmpathyLevel::Low).unwrap().is_none());
        }
    }

    #[test]
    fn test_every_modulated_emotion_has_a_phrase() {
        let p = pack(Language::En);
        for emotion in [
            PrimaryEmotion::Sad,
            PrimaryEmotion::Anxious,
            PrimaryEmotion::Angry,
            PrimaryEmotion::Lonely,
            PrimaryEmotion::Hopeful,
        ] {
            assert!(p.emotion_phrase(emotion).unwrap().is_some(), "{:?}", emotion);
        }
        assert!(p.emotion_phrase(PrimaryEmotion::Neutral).unwrap().is_none());
        assert!(p.emotion_phrase(PrimaryEmotion::Grateful).unwrap().is_none());
    }

    #[test]
    fn test_missing_key_is_typed() {
        let err = pack(Language::En).get("footers", "nonexistent").unwrap_err();
        assert_eq!(err.section, "footers");
        assert_eq!(err.key, "nonexistent");
        assert_eq!(err.language, "en");
    }

    #[test]
    fn test_sad_support_and_neutral_have_no_state_phrase() {
        let p = pack(Language::Ar);
        assert!(p.state_phrase(ConversationState::SadSupport).unwrap().is_none());
        assert!(p.state_phrase(ConversationState::Neutral).unwrap().is_none());
        assert!(p
            .state_phrase(ConversationState::LonelyCompanionship)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_ar_followup_ends_with_arabic_question_mark() {
        let q = pack(Language::Ar).followup_question().unwrap();
        assert!(q.ends_with('؟'));
    }
}
