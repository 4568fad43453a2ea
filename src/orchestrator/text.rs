//! Text primitives shared by the pipeline steps.
//!
//! Sentence handling is deliberately naive: replies are conversational
//! prose, not legal text, and both languages terminate sentences with a
//! small fixed set of marks. A newline always closes a sentence.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marks that close a sentence in either language.
pub const SENTENCE_TERMINATORS: [char; 5] = ['.', '!', '?', '؟', '…'];

static EMOJI_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Extended_Pictographic}").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Split text into trimmed sentences. Runs of terminators ("?!", "...")
/// and a trailing closing quote stay attached to their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            push_trimmed(&mut sentences, &mut current);
            continue;
        }
        current.push(c);
        if SENTENCE_TERMINATORS.contains(&c) {
            while let Some(&next) = chars.peek() {
                if SENTENCE_TERMINATORS.contains(&next) || matches!(next, '"' | '\'' | ')') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            push_trimmed(&mut sentences, &mut current);
        }
    }
    push_trimmed(&mut sentences, &mut current);
    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

pub fn sentence_count(text: &str) -> usize {
    split_sentences(text).len()
}

/// Keep at most `max` sentences, joined back into flowing prose.
pub fn truncate_sentences(text: &str, max: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= max {
        return text.to_string();
    }
    sentences[..max].join(" ")
}

/// Whether the text ends as a question in either language.
pub fn is_question(text: &str) -> bool {
    let trimmed = text.trim_end();
    trimmed.ends_with('?') || trimmed.ends_with('؟')
}

/// Canonical form for near-duplicate detection: lowercased, punctuation
/// and emoji stripped, whitespace collapsed.
pub fn normalize_for_dedupe(text: &str) -> String {
    let no_emoji = EMOJI_CHAR.replace_all(text, "");
    let words_only = NON_WORD.replace_all(&no_emoji, "");
    let collapsed = WHITESPACE_RUN.replace_all(&words_only, " ");
    collapsed.trim().to_lowercase()
}

/// Number of pictographic scalars in the text.
pub fn emoji_count(text: &str) -> usize {
    EMOJI_CHAR.find_iter(text).count()
}

/// Drop every pictographic scalar past the first `max`, along with any
/// variation selector or joiner glued to a dropped one.
pub fn clamp_emoji(text: &str, max: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut seen = 0;
    let mut last_removed = false;
    let mut buf = [0u8; 4];

    for c in text.chars() {
        if last_removed && matches!(c, '\u{FE0F}' | '\u{200D}') {
            continue;
        }
        if EMOJI_CHAR.is_match(c.encode_utf8(&mut buf)) {
            seen += 1;
            if seen > max {
                last_removed = true;
                continue;
            }
        }
        last_removed = false;
        out.push(c);
    }
    out
}

/// Character-budget truncation. Cuts on a char boundary and closes the
/// text with an ellipsis when something was dropped.
pub fn truncate_to_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    let kept = out.trim_end().len();
    out.truncate(kept);
    out.push('…');
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_handles_both_languages() {
        let sentences = split_sentences("I hear you. How was your day؟ Take care!");
        assert_eq!(
            sentences,
            vec!["I hear you.", "How was your day؟", "Take care!"]
        );
    }

    #[test]
    fn test_split_keeps_terminator_runs_together() {
        let sentences = split_sentences("Really?! Wait... okay.");
        assert_eq!(sentences, vec!["Really?!", "Wait...", "okay."]);
    }

    #[test]
    fn test_newline_closes_a_sentence() {
        let sentences = split_sentences("First thought\nSecond thought.");
        assert_eq!(sentences, vec!["First thought", "Second thought."]);
    }

    #[test]
    fn test_truncate_sentences_budget() {
        let text = "One. Two. Three. Four. Five.";
        assert_eq!(truncate_sentences(text, 3), "One. Two. Three.");
        assert_eq!(truncate_sentences(text, 9), text);
    }

    #[test]
    fn test_question_detection() {
        assert!(is_question("How are you?"));
        assert!(is_question("كيف حالك؟"));
        assert!(is_question("Ready? "));
        assert!(!is_question("I am here."));
    }

    #[test]
    fn test_normalize_for_dedupe_equates_variants() {
        assert_eq!(
            normalize_for_dedupe("I'm here for you!! 💙"),
            normalize_for_dedupe("im   here for you")
        );
        assert_ne!(
            normalize_for_dedupe("I'm here for you"),
            normalize_for_dedupe("I'm here with you")
        );
    }

    #[test]
    fn test_emoji_count_and_clamp() {
        let text = "Stay strong 💙🫂🌿😌✨";
        assert_eq!(emoji_count(text), 5);
        let clamped = clamp_emoji(text, 3);
        assert_eq!(emoji_count(&clamped), 3);
        assert!(clamped.starts_with("Stay strong"));
        assert_eq!(clamp_emoji("no emoji here", 0), "no emoji here");
    }

    #[test]
    fn test_truncate_to_chars_closes_with_ellipsis() {
        let text = "a very long reply that keeps going";
        let cut = truncate_to_chars(text, 12);
        assert!(cut.chars().count() <= 12);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate_to_chars("short", 10), "short");
    }
}
