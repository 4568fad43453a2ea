//! Emoji decoration: a small visual cue, never confetti.
//!
//! Each primary emotion maps to one two-emoji pair. A reply with no emoji
//! gets its pair appended to the first content line; a reply the model
//! already decorated is only clamped. Short replies are never decorated,
//! and the safety footer stays emoji-free.

use crate::orchestrator::{disclaimer, text};
use crate::types::{PrimaryEmotion, VerbosityMode};

/// Most emoji any reply may carry.
pub const EMOJI_CAP: usize = 3;
/// Most emoji a short reply may carry.
pub const SHORT_EMOJI_CAP: usize = 2;

/// The decoration pair for an emotion.
pub fn emotion_pair(emotion: PrimaryEmotion) -> &'static str {
    match emotion {
        PrimaryEmotion::Sad => "💙🫂",
        PrimaryEmotion::Anxious => "🌿😌",
        PrimaryEmotion::Angry => "🙏💙",
        PrimaryEmotion::Lonely => "🤗💙",
        PrimaryEmotion::Hopeful => "🌅✨",
        PrimaryEmotion::Grateful => "💛✨",
        PrimaryEmotion::Neutral => "🙂✨",
    }
}

/// Step 10: decorate and clamp.
pub fn decorate(raw: &str, emotion: PrimaryEmotion, verbosity: VerbosityMode) -> String {
    if verbosity == VerbosityMode::Short {
        return text::clamp_emoji(raw, SHORT_EMOJI_CAP);
    }

    let decorated = if text::emoji_count(raw) == 0 {
        append_to_first_content_line(raw, emotion_pair(emotion))
    } else {
        raw.to_string()
    };
    text::clamp_emoji(&decorated, EMOJI_CAP)
}

/// Append the pair to the first non-empty line that is not a safety
/// sentence. When every line is safety text, leave the reply alone.
fn append_to_first_content_line(raw: &str, pair: &str) -> String {
    let mut lines: Vec<String> = raw.lines().map(str::to_string).collect();
    if lines.is_empty() {
        return raw.to_string();
    }
    for line in lines.iter_mut() {
        if line.trim().is_empty() || disclaimer::is_safety_sentence(line) {
            continue;
        }
        line.push(' ');
        line.push_str(pair);
        return lines.join("\n");
    }
    raw.to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases;
    use crate::types::Language;

    #[test]
    fn test_plain_reply_gets_emotion_pair() {
        let out = decorate("You're doing better than you think.", PrimaryEmotion::Sad, VerbosityMode::Full);
        assert!(out.ends_with("💙🫂"));
        assert_eq!(text::emoji_count(&out), 2);
    }

    #[test]
    fn test_decorated_reply_is_only_clamped() {
        let raw = "So proud of you! 🌅✨💛🙂😌";
        let out = decorate(raw, PrimaryEmotion::Hopeful, VerbosityMode::Full);
        assert_eq!(text::emoji_count(&out), EMOJI_CAP);
        assert!(out.starts_with("So proud of you!"));
    }

    #[test]
    fn test_short_replies_are_never_decorated() {
        let out = decorate("Take care.", PrimaryEmotion::Hopeful, VerbosityMode::Short);
        assert_eq!(out, "Take care.");

        let noisy = decorate("Take care. 💙🫂🌿", PrimaryEmotion::Sad, VerbosityMode::Short);
        assert_eq!(text::emoji_count(&noisy), SHORT_EMOJI_CAP);
    }

    #[test]
    fn test_footer_line_stays_clean() {
        let footer = phrases::pack(Language::En).footer_full().unwrap();
        let raw = format!("I'm with you.\n{}", footer);
        let out = decorate(&raw, PrimaryEmotion::Sad, VerbosityMode::Full);
        assert!(out.lines().next().unwrap().ends_with("💙🫂"));
        assert!(out.ends_with(footer));
    }

    #[test]
    fn test_decoration_is_idempotent() {
        let once = decorate("One step at a time.", PrimaryEmotion::Anxious, VerbosityMode::Full);
        let twice = decorate(&once, PrimaryEmotion::Anxious, VerbosityMode::Full);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_every_emotion_has_a_two_emoji_pair() {
        for emotion in [
            PrimaryEmotion::Sad,
            PrimaryEmotion::Anxious,
            PrimaryEmotion::Angry,
            PrimaryEmotion::Lonely,
            PrimaryEmotion::Hopeful,
            PrimaryEmotion::Grateful,
            PrimaryEmotion::Neutral,
        ] {
            assert_eq!(text::emoji_count(emotion_pair(emotion)), 2, "{:?}", emotion);
        }
    }
}
