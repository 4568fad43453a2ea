//! Tone profile selection: how a reply should sound.
//!
//! Pure mapping from (severity, conversation state, persona, trust) to a
//! [`ToneProfile`]. Severity sets the base posture, the state and persona
//! adjust it, and trust escalates warmth and length for users who have
//! been around. HIGH_RISK is the exception: its posture is fixed and no
//! adjustment may touch it.

use serde::{Deserialize, Serialize};

use crate::persona::{PersonaStyle, Register};
use crate::types::{ConversationState, SeverityLevel, TrustTier};

/// How strongly the reply opens with validation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmpathyLevel {
    Low,
    Medium,
    High,
}

/// Target reply length class, consumed by the line-capping step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageLength {
    Short,
    Normal,
    Extended,
}

/// The selected posture for one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneProfile {
    pub empathy: EmpathyLevel,
    pub length: MessageLength,
    /// Append the mild companion reminder.
    pub soft_disclaimer: bool,
    /// Append the full safety footer. Set only for HIGH_RISK here; the
    /// disclaimer step may also force it on sustained distress.
    pub full_footer: bool,
    pub allow_light_humor: bool,
}

/// Select the tone for one reply.
///
/// # Arguments
/// * `severity` - Classified severity of the user's message.
/// * `state` - Current conversation state.
/// * `persona` - Active persona; playfulness and register gate humor.
/// * `tier` - Trust tier; escalates empathy and length below HIGH_RISK.
pub fn select_tone(
    severity: SeverityLevel,
    state: ConversationState,
    persona: &PersonaStyle,
    tier: TrustTier,
) -> ToneProfile {
    let mut tone = match severity {
        SeverityLevel::HighRisk => ToneProfile {
            empathy: EmpathyLevel::High,
            length: MessageLength::Normal,
            soft_disclaimer: false,
            full_footer: true,
            allow_light_humor: false,
        },
        SeverityLevel::Support => ToneProfile {
            empathy: EmpathyLevel::High,
            length: MessageLength::Normal,
            soft_disclaimer: true,
            full_footer: false,
            allow_light_humor: persona.playful && persona.register == Register::Casual,
        },
        SeverityLevel::Venting => ToneProfile {
            empathy: EmpathyLevel::Medium,
            length: MessageLength::Normal,
            soft_disclaimer: true,
            full_footer: false,
            allow_light_humor: persona.playful,
        },
        SeverityLevel::Casual => ToneProfile {
            empathy: EmpathyLevel::Low,
            length: MessageLength::Short,
            soft_disclaimer: false,
            full_footer: false,
            allow_light_humor: persona.playful,
        },
    };

    // The safety posture is non-negotiable.
    if severity == SeverityLevel::HighRisk {
        return tone;
    }

    match state {
        ConversationState::SadSupport
        | ConversationState::AnxietyCalming
        | ConversationState::AngerDeescalate => tone.allow_light_humor = false,
        ConversationState::LonelyCompanionship => {
            tone.empathy = tone.empathy.max(EmpathyLevel::Medium);
        }
        _ => {}
    }

    // Trust escalation, applied as a ladder: a tier-5 casual chat climbs
    // short -> normal -> extended.
    if tier.level() >= 3 && tone.empathy == EmpathyLevel::Low {
        tone.empathy = EmpathyLevel::Medium;
    }
    if tier.level() >= 4 && tone.length == MessageLength::Short {
        tone.length = MessageLength::Normal;
    }
    if tier.level() >= 5 && tone.length == MessageLength::Normal {
        tone.length = MessageLength::Extended;
    }

    tone
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::PersonaLibrary;

    fn persona(id: &str) -> PersonaStyle {
        PersonaLibrary::built_in()
            .get(id)
            .unwrap_or_else(|| panic!("missing persona {}", id))
    }

    fn tier(level: u8) -> TrustTier {
        TrustTier::from_score(match level {
            1 => 0,
            2 => 25,
            3 => 45,
            4 => 65,
            _ => 90,
        })
    }

    #[test]
    fn test_high_risk_posture_is_fixed() {
        for state in [
            ConversationState::Neutral,
            ConversationState::SadSupport,
            ConversationState::LonelyCompanionship,
        ] {
            for level in 1..=5 {
                let tone = select_tone(
                    SeverityLevel::HighRisk,
                    state,
                    &persona("playful_friend"),
                    tier(level),
                );
                assert_eq!(tone.empathy, EmpathyLevel::High);
                assert_eq!(tone.length, MessageLength::Normal);
                assert!(tone.full_footer);
                assert!(!tone.soft_disclaimer);
                assert!(!tone.allow_light_humor);
            }
        }
    }

    #[test]
    fn test_support_humor_needs_playful_casual_persona() {
        let playful = select_tone(
            SeverityLevel::Support,
            ConversationState::Neutral,
            &persona("playful_friend"),
            tier(1),
        );
        let warm = select_tone(
            SeverityLevel::Support,
            ConversationState::Neutral,
            &persona("warm_companion"),
            tier(1),
        );
        assert!(playful.allow_light_humor);
        assert!(!warm.allow_light_humor);
        assert!(playful.soft_disclaimer);
        assert_eq!(playful.empathy, EmpathyLevel::High);
    }

    #[test]
    fn test_distress_states_suppress_humor() {
        for state in [
            ConversationState::SadSupport,
            ConversationState::AnxietyCalming,
            ConversationState::AngerDeescalate,
        ] {
            let tone = select_tone(
                SeverityLevel::Venting,
                state,
                &persona("playful_friend"),
                tier(2),
            );
            assert!(!tone.allow_light_humor, "humor must drop in {:?}", state);
        }
    }

    #[test]
    fn test_lonely_companionship_raises_empathy() {
        let tone = select_tone(
            SeverityLevel::Casual,
            ConversationState::LonelyCompanionship,
            &persona("calm_mentor"),
            tier(1),
        );
        assert_eq!(tone.empathy, EmpathyLevel::Medium);
    }

    #[test]
    fn test_trust_ladder_escalates_warmth_and_length() {
        let base = select_tone(
            SeverityLevel::Casual,
            ConversationState::Neutral,
            &persona("warm_companion"),
            tier(1),
        );
        assert_eq!(base.empathy, EmpathyLevel::Low);
        assert_eq!(base.length, MessageLength::Short);

        let mid = select_tone(
            SeverityLevel::Casual,
            ConversationState::Neutral,
            &persona("warm_companion"),
            tier(3),
        );
        assert_eq!(mid.empathy, EmpathyLevel::Medium);
        assert_eq!(mid.length, MessageLength::Short);

        let high = select_tone(
            SeverityLevel::Casual,
            ConversationState::Neutral,
            &persona("warm_companion"),
            tier(4),
        );
        assert_eq!(high.length, MessageLength::Normal);

        let top = select_tone(
            SeverityLevel::Casual,
            ConversationState::Neutral,
            &persona("warm_companion"),
            tier(5),
        );
        assert_eq!(top.length, MessageLength::Extended);
    }

    #[test]
    fn test_venting_base_posture() {
        let tone = select_tone(
            SeverityLevel::Venting,
            ConversationState::Neutral,
            &persona("warm_companion"),
            tier(2),
        );
        assert_eq!(tone.empathy, EmpathyLevel::Medium);
        assert_eq!(tone.length, MessageLength::Normal);
        assert!(tone.soft_disclaimer);
        assert!(!tone.full_footer);
    }
}
