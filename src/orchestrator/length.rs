//! Reply sizing: flattening, line ceilings, and short-mode enforcement.
//!
//! Three sizing steps share this module. Flattening turns fast-engine
//! replies into plain prose, the line cap bounds how much scrolling a
//! reply costs by engine and tone, and short-mode enforcement produces the
//! compact ask-back shape. The canonical safety footer, when present as
//! the final line, survives line capping: it is detached, the body is
//! capped one line lower, and it is reattached.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::engine::EngineMode;
use crate::error::OrchestrateError;
use crate::orchestrator::text;
use crate::phrases;
use crate::tone::{MessageLength, ToneProfile};
use crate::types::{ConversationState, Language, SeverityLevel, TrustTier, VerbosityMode};

/// Sentence budget for flattened fast-engine replies.
pub const FAST_SENTENCE_CAP: usize = 4;
/// Hard ceiling on non-empty lines in any reply.
pub const DEEP_LINE_CEILING: usize = 14;
/// Sentence budget in short verbosity, follow-up question included.
pub const SHORT_SENTENCE_CAP: usize = 2;
/// Character budget in short verbosity, follow-up question included.
pub const SHORT_CHAR_CAP: usize = 220;

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([-*•]|\d+[.)])\s+").unwrap());
static HEADER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#+\s+").unwrap());

/// Step 6: free traffic on the fast engine gets plain prose.
///
/// List and header markup is stripped, lines collapse into sentences, and
/// the reply is capped at [`FAST_SENTENCE_CAP`] sentences. Premium and
/// deep-engine replies pass through untouched.
pub fn flatten_fast_reply(raw: &str, mode: EngineMode, is_premium: bool) -> String {
    if is_premium || mode != EngineMode::CoreFast {
        return raw.to_string();
    }

    let mut prose: Vec<String> = Vec::new();
    for line in raw.lines() {
        let no_list = LIST_MARKER.replace(line, "");
        let no_header = HEADER_MARKER.replace(&no_list, "");
        let trimmed = no_header.trim();
        if !trimmed.is_empty() {
            prose.push(trimmed.to_string());
        }
    }
    text::truncate_sentences(&prose.join(" "), FAST_SENTENCE_CAP)
}

/// Non-empty-line ceiling for one reply.
pub fn line_cap(
    mode: EngineMode,
    tone: &ToneProfile,
    intensity: u8,
    tier: TrustTier,
    state: ConversationState,
) -> usize {
    let mut cap = match mode {
        EngineMode::PremiumDeep => {
            if intensity >= 3 {
                DEEP_LINE_CEILING
            } else {
                match tone.length {
                    MessageLength::Extended => 10,
                    MessageLength::Normal => 8,
                    MessageLength::Short => 6,
                }
            }
        }
        EngineMode::CoreDeep => {
            if intensity >= 3 {
                10
            } else if tone.length == MessageLength::Short {
                6
            } else {
                8
            }
        }
        EngineMode::CoreFast => 6,
    };

    if mode.is_deep() && tier.level() >= 4 {
        cap = (cap + 2).min(DEEP_LINE_CEILING);
    }
    // Grief wants brevity even off the deep engines.
    if state == ConversationState::SadSupport && !mode.is_deep() {
        cap = cap.min(5);
    }
    cap
}

/// Step 8: enforce the non-empty-line ceiling, keeping a trailing
/// canonical footer alive.
pub fn cap_reply_lines(
    raw: &str,
    mode: EngineMode,
    tone: &ToneProfile,
    intensity: u8,
    tier: TrustTier,
    state: ConversationState,
    language: Language,
) -> String {
    let cap = line_cap(mode, tone, intensity, tier, state);
    let (body_lines, footer) = split_trailing_footer(raw, language);

    let body_budget = if footer.is_some() {
        cap.saturating_sub(1)
    } else {
        cap
    };
    let mut kept = take_non_empty(&body_lines, body_budget);

    if let Some(footer) = footer {
        kept.push(footer);
    }
    kept.join("\n")
}

/// Split off the final line when it is one of the canonical footers.
fn split_trailing_footer<'a>(raw: &'a str, language: Language) -> (Vec<&'a str>, Option<&'a str>) {
    let lines: Vec<&str> = raw.lines().collect();
    if let Some(last) = lines.last() {
        let pack = phrases::pack(language);
        let is_footer = pack.footer_full().map(|f| f == last.trim()).unwrap_or(false)
            || pack.footer_mild().map(|f| f == last.trim()).unwrap_or(false);
        if is_footer {
            return (lines[..lines.len() - 1].to_vec(), Some(*last));
        }
    }
    (lines, None)
}

fn take_non_empty<'a>(lines: &[&'a str], max: usize) -> Vec<&'a str> {
    let mut kept: Vec<&str> = Vec::new();
    let mut non_empty = 0;
    for line in lines {
        if !line.trim().is_empty() {
            if non_empty == max {
                break;
            }
            non_empty += 1;
        }
        kept.push(line);
    }
    while kept.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        kept.pop();
    }
    kept
}

/// Step 9: short verbosity becomes "one thought, one question".
///
/// Near-duplicate sentences are dropped and at most one body sentence
/// survives. The trimmed reply fits the character budget and always ends
/// with a question: the reply's own closing question when it has one,
/// the canonical follow-up otherwise. HIGH_RISK replies are exempt;
/// safety language must never be squeezed out.
pub fn enforce_short_verbosity(
    raw: &str,
    severity: SeverityLevel,
    verbosity: VerbosityMode,
    language: Language,
) -> Result<String, OrchestrateError> {
    if verbosity != VerbosityMode::Short || severity == SeverityLevel::HighRisk {
        return Ok(raw.to_string());
    }

    let mut unique: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for sentence in text::split_sentences(raw) {
        if seen.insert(text::normalize_for_dedupe(&sentence)) {
            unique.push(sentence);
        }
    }

    let question: String = match unique.last() {
        Some(last) if text::is_question(last) => unique.pop().unwrap_or_default(),
        _ => phrases::pack(language).followup_question()?.to_string(),
    };

    let body = unique.into_iter().next().unwrap_or_default();
    let question_chars = question.chars().count();

    if body.is_empty() {
        return Ok(text::truncate_to_chars(&question, SHORT_CHAR_CAP));
    }

    let body_budget = SHORT_CHAR_CAP.saturating_sub(question_chars + 1);
    let body = text::truncate_to_chars(&body, body_budget);
    Ok(format!("{} {}", body, question))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::EmpathyLevel;

    fn tone(length: MessageLength) -> ToneProfile {
        ToneProfile {
            empathy: EmpathyLevel::Medium,
            length,
            soft_disclaimer: false,
            full_footer: false,
            allow_light_humor: false,
        }
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
    fn test_flattening_strips_markup_and_caps() {
        let raw = "# Ideas\n- First thing to try.\n- Second thing to try.\n1. Third one.\n2) Fourth one.\nFifth one.";
        let out = flatten_fast_reply(raw, EngineMode::CoreFast, false);
        assert!(!out.contains('-'));
        assert!(!out.contains('#'));
        assert_eq!(text::sentence_count(&out), FAST_SENTENCE_CAP);
        assert!(out.starts_with("Ideas First thing to try."));
    }

    #[test]
    fn test_flattening_skips_premium_and_deep() {
        let raw = "- a list\n- stays";
        assert_eq!(flatten_fast_reply(raw, EngineMode::CoreFast, true), raw);
        assert_eq!(flatten_fast_reply(raw, EngineMode::CoreDeep, false), raw);
    }

    #[test]
    fn test_line_cap_table() {
        // Premium deep: intensity rules, then tone length.
        assert_eq!(
            line_cap(EngineMode::PremiumDeep, &tone(MessageLength::Normal), 3, tier(1), ConversationState::Neutral),
            14
        );
        assert_eq!(
            line_cap(EngineMode::PremiumDeep, &tone(MessageLength::Extended), 2, tier(1), ConversationState::Neutral),
            10
        );
        assert_eq!(
            line_cap(EngineMode::PremiumDeep, &tone(MessageLength::Short), 0, tier(1), ConversationState::Neutral),
            6
        );
        // Core deep.
        assert_eq!(
            line_cap(EngineMode::CoreDeep, &tone(MessageLength::Normal), 4, tier(1), ConversationState::Neutral),
            10
        );
        assert_eq!(
            line_cap(EngineMode::CoreDeep, &tone(MessageLength::Normal), 1, tier(1), ConversationState::Neutral),
            8
        );
        // Fast engine is flat.
        assert_eq!(
            line_cap(EngineMode::CoreFast, &tone(MessageLength::Extended), 5, tier(5), ConversationState::Neutral),
            6
        );
    }

    #[test]
    fn test_trusted_users_get_two_extra_deep_lines() {
        assert_eq!(
            line_cap(EngineMode::CoreDeep, &tone(MessageLength::Normal), 1, tier(4), ConversationState::Neutral),
            10
        );
        // Never past the ceiling.
        assert_eq!(
            line_cap(EngineMode::PremiumDeep, &tone(MessageLength::Normal), 5, tier(5), ConversationState::Neutral),
            14
        );
    }

    #[test]
    fn test_sad_support_caps_fast_engine_at_five() {
        assert_eq!(
            line_cap(EngineMode::CoreFast, &tone(MessageLength::Normal), 2, tier(1), ConversationState::SadSupport),
            5
        );
        // Deep engines keep their own budget.
        assert_eq!(
            line_cap(EngineMode::CoreDeep, &tone(MessageLength::Normal), 2, tier(1), ConversationState::SadSupport),
            8
        );
    }

    #[test]
    fn test_cap_reply_lines_truncates() {
        let raw = (1..=12).map(|i| format!("Line {}.", i)).collect::<Vec<_>>().join("\n");
        let out = cap_reply_lines(
            &raw,
            EngineMode::CoreFast,
            &tone(MessageLength::Normal),
            0,
            tier(1),
            ConversationState::Neutral,
            Language::En,
        );
        assert_eq!(out.lines().count(), 6);
        assert!(out.ends_with("Line 6."));
    }

    #[test]
    fn test_cap_preserves_trailing_footer() {
        let footer = phrases::pack(Language::En).footer_full().unwrap();
        let mut lines: Vec<String> = (1..=12).map(|i| format!("Line {}.", i)).collect();
        lines.push(footer.to_string());
        let out = cap_reply_lines(
            &lines.join("\n"),
            EngineMode::CoreFast,
            &tone(MessageLength::Normal),
            0,
            tier(1),
            ConversationState::Neutral,
            Language::En,
        );
        assert_eq!(out.lines().count(), 6);
        assert!(out.ends_with(footer));
        assert!(out.contains("Line 5."));
        assert!(!out.contains("Line 6."));
    }

    #[test]
    fn test_short_verbosity_shape() {
        let raw = "I hear you. I hear you! Life gets heavy sometimes. Life gets heavy sometimes. And that's okay.";
        let out = enforce_short_verbosity(raw, SeverityLevel::Venting, VerbosityMode::Short, Language::En)
            .unwrap();
        assert!(text::sentence_count(&out) <= SHORT_SENTENCE_CAP);
        assert!(out.chars().count() <= SHORT_CHAR_CAP);
        assert!(text::is_question(&out));
        assert!(out.starts_with("I hear you."));
        assert!(out.ends_with("What's on your mind right now?"));
    }

    #[test]
    fn test_short_verbosity_keeps_existing_closing_question() {
        let raw = "That sounds exciting. Want to tell me more about it?";
        let out = enforce_short_verbosity(raw, SeverityLevel::Casual, VerbosityMode::Short, Language::En)
            .unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn test_short_verbosity_respects_char_budget() {
        let raw = "word ".repeat(100);
        let out = enforce_short_verbosity(&raw, SeverityLevel::Casual, VerbosityMode::Short, Language::En)
            .unwrap();
        assert!(out.chars().count() <= SHORT_CHAR_CAP);
        assert!(text::is_question(&out));
    }

    #[test]
    fn test_short_verbosity_exempts_high_risk_and_full_mode() {
        let raw = "A. B. C. D. E.";
        assert_eq!(
            enforce_short_verbosity(raw, SeverityLevel::HighRisk, VerbosityMode::Short, Language::En).unwrap(),
            raw
        );
        assert_eq!(
            enforce_short_verbosity(raw, SeverityLevel::Casual, VerbosityMode::Full, Language::En).unwrap(),
            raw
        );
    }

    #[test]
    fn test_short_verbosity_arabic_question() {
        let raw = "الحياة صعبة أحياناً.";
        let out = enforce_short_verbosity(raw, SeverityLevel::Venting, VerbosityMode::Short, Language::Ar)
            .unwrap();
        assert!(out.ends_with('؟'));
        assert!(out.starts_with("الحياة صعبة أحياناً."));
    }
}
