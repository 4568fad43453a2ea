//! Directive softening: commands become invitations.
//!
//! Companion replies should suggest, not order. A per-language table maps
//! hard directive phrasings to softer equivalents, preserving a leading
//! capital. Users at trust tier 4 and above have asked for directness by
//! staying around; the step leaves their replies alone.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::types::{Language, TrustTier};

lazy_static! {
    static ref EN_RULES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\byou must\b").unwrap(), "you might want to"),
        (Regex::new(r"(?i)\byou should\b").unwrap(), "you could"),
        (Regex::new(r"(?i)\byou need to\b").unwrap(), "it might help to"),
        (Regex::new(r"(?i)\byou have to\b").unwrap(), "you could try to"),
    ];
    static ref AR_RULES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"يجب عليك").unwrap(), "قد ترغب في"),
        (Regex::new(r"يجب أن").unwrap(), "قد يكون من المفيد أن"),
        (Regex::new(r"عليك أن").unwrap(), "يمكنك أن"),
        (Regex::new(r"لا بد أن").unwrap(), "ربما من الجيد أن"),
    ];
}

/// Soften hard directives in `text` for `language`.
pub fn soften_directives(text: &str, language: Language, tier: TrustTier) -> String {
    if tier.keeps_directness() {
        return text.to_string();
    }

    let rules: &[(Regex, &'static str)] = match language {
        Language::En => &EN_RULES,
        Language::Ar => &AR_RULES,
    };

    let mut out = text.to_string();
    for (pattern, replacement) in rules {
        out = pattern
            .replace_all(&out, |caps: &Captures| {
                restore_leading_case(&caps[0], replacement)
            })
            .into_owned();
    }
    out
}

/// Carry an uppercase first letter from the matched phrase onto the
/// replacement, so sentence-initial directives stay sentence-initial.
fn restore_leading_case(matched: &str, replacement: &str) -> String {
    let matched_upper = matched
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false);
    if !matched_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn low_trust() -> TrustTier {
        TrustTier::from_score(10)
    }

    #[test]
    fn test_english_directives_soften() {
        let text = "You must rest. Also, you should eat, and you need to breathe.";
        let out = soften_directives(text, Language::En, low_trust());
        assert_eq!(
            out,
            "You might want to rest. Also, you could eat, and it might help to breathe."
        );
    }

    #[test]
    fn test_arabic_directives_soften() {
        let text = "يجب أن تنام مبكراً. عليك أن تشرب الماء.";
        let out = soften_directives(text, Language::Ar, low_trust());
        assert_eq!(out, "قد يكون من المفيد أن تنام مبكراً. يمكنك أن تشرب الماء.");
    }

    #[test]
    fn test_high_trust_keeps_directness() {
        let text = "You must talk to someone.";
        let tier = TrustTier::from_score(70);
        assert_eq!(soften_directives(text, Language::En, tier), text);
    }

    #[test]
    fn test_softening_is_idempotent() {
        let text = "You have to slow down. You should rest.";
        let once = soften_directives(text, Language::En, low_trust());
        let twice = soften_directives(&once, Language::En, low_trust());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_untouched_text_passes_through() {
        let text = "Maybe a short walk would feel nice.";
        assert_eq!(soften_directives(text, Language::En, low_trust()), text);
    }
}
