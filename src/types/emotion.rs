//! Types produced by the external emotion classifier.
//!
//! All of these are produced by the external classifier service and consumed
//! read-only. Deserialization is tolerant: unknown emotions fall back to
//! `Neutral`, missing intensity to `0`, so a degraded classifier never takes
//! the reply path down with it.

use serde::{Deserialize, Serialize};

/// The primary emotion detected in a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimaryEmotion {
    Sad,
    Anxious,
    Angry,
    Lonely,
    Hopeful,
    Grateful,
    #[default]
    #[serde(other)]
    Neutral,
}

impl PrimaryEmotion {
    /// Whether this emotion is one of the negative set that, when intense
    /// and sustained inside a support state, forces the full safety footer.
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            PrimaryEmotion::Sad
                | PrimaryEmotion::Anxious
                | PrimaryEmotion::Angry
                | PrimaryEmotion::Lonely
        )
    }
}

/// Urgency/risk classification of the user's message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityLevel {
    #[default]
    Casual,
    Venting,
    Support,
    HighRisk,
}

impl SeverityLevel {
    /// Wire-format name, for logs and bookkeeping payloads.
    pub fn label(self) -> &'static str {
        match self {
            SeverityLevel::Casual => "CASUAL",
            SeverityLevel::Venting => "VENTING",
            SeverityLevel::Support => "SUPPORT",
            SeverityLevel::HighRisk => "HIGH_RISK",
        }
    }
}

/// A point-in-time emotion reading for one message.
///
/// `intensity` is clamped to 0-5 on construction; the classifier owns the
/// scale, we only consume it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmotionSnapshot {
    /// Dominant emotion.
    #[serde(default)]
    pub primary: PrimaryEmotion,
    /// Strength of the primary emotion, 0 (absent) to 5 (overwhelming).
    #[serde(default)]
    pub intensity: u8,
    /// Classifier confidence in `primary`, 0.0-1.0.
    #[serde(default)]
    pub confidence: f32,
    /// Secondary emotion, when the classifier reports one.
    #[serde(default)]
    pub secondary: Option<PrimaryEmotion>,
    /// Free-form classifier notes (never shown to the user).
    #[serde(default)]
    pub notes: Option<String>,
}

impl EmotionSnapshot {
    /// Build a snapshot, clamping intensity into the 0-5 range.
    pub fn new(primary: PrimaryEmotion, intensity: u8, confidence: f32) -> Self {
        Self {
            primary,
            intensity: intensity.min(5),
            confidence,
            secondary: None,
            notes: None,
        }
    }

    /// A neutral zero-intensity snapshot, used when the classifier is
    /// unreachable.
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// A known sensitive topic for this user, with the emotion it re-activates
/// and a relevance score. Consumed read-only by trigger redaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// Literal topic text to redact (e.g. a name, a place).
    pub topic: String,
    /// Emotion the topic is associated with.
    pub emotion: String,
    /// Relevance score; redaction keeps the top three by this value.
    pub score: f32,
}

/// Everything the classifier returns for one message.
///
/// Parsed tolerantly: any missing section degrades to its neutral default
/// instead of failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Emotion reading for the message.
    #[serde(default)]
    pub emotion: EmotionSnapshot,
    /// Urgency/risk level.
    #[serde(default)]
    pub severity: SeverityLevel,
    /// Known sensitive topics touched by the message.
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl Classification {
    /// Parse a classifier response body, falling back to neutral defaults
    /// on malformed JSON.
    pub fn parse_lenient(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
