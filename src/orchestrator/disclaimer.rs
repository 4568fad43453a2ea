//! Disclaimer normalization: one voice for safety language.
//!
//! Models sprinkle their own "I'm not a therapist" hedges anywhere in a
//! reply, in either language. This step strips every sentence that reads
//! like a safety disclaimer and then appends at most one canonical footer,
//! chosen by risk. The canonical footers themselves match the detection
//! table, which is what makes the step idempotent: a second run strips the
//! footer it appended and puts back exactly one.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::OrchestrateError;
use crate::orchestrator::text;
use crate::phrases;
use crate::tone::ToneProfile;
use crate::types::{ConversationState, EmotionSnapshot, Language, SeverityLevel};

/// Emotion intensity at which distress counts as sustained.
pub const SUSTAINED_INTENSITY: u8 = 3;

lazy_static! {
    // Both tables run against every reply; models mix languages.
    static ref SAFETY_PATTERNS: Vec<Regex> = vec![
        // English
        Regex::new(r"(?i)\bnot a (doctor|therapist|medical professional|licensed)").unwrap(),
        Regex::new(r"(?i)\bnot a substitute for professional").unwrap(),
        Regex::new(r"(?i)\bseek professional help").unwrap(),
        Regex::new(r"(?i)\bconsult (a|an|your)\b").unwrap(),
        Regex::new(r"(?i)\bnot (medical|professional) advice\b").unwrap(),
        Regex::new(r"(?i)\bcrisis (line|hotline)\b").unwrap(),
        Regex::new(r"(?i)\bnot a professional\b").unwrap(),
        // Arabic
        Regex::new(r"لست\s+طبيب").unwrap(),
        Regex::new(r"ليس\s+تشخيص").unwrap(),
        Regex::new(r"استشر\s+(طبيب|مختص|معالج)").unwrap(),
        Regex::new(r"لا\s+يغني\s+عن").unwrap(),
        Regex::new(r"بديلاً?\s+عن").unwrap(),
        Regex::new(r"خط\s+(مساعدة|الأزمات)").unwrap(),
        Regex::new(r"لست\s+مختص").unwrap(),
    ];
}

/// Whether one sentence reads as a safety disclaimer in either language.
pub fn is_safety_sentence(sentence: &str) -> bool {
    SAFETY_PATTERNS.iter().any(|p| p.is_match(sentence))
}

/// Step 7: strip model-authored disclaimers, then append at most one
/// canonical footer.
///
/// The full footer goes out for HIGH_RISK, and for sustained negative
/// emotion inside a support state. Otherwise the mild companion reminder
/// goes out when the tone asks for a soft disclaimer. Everything else
/// carries no safety sentence at all.
pub fn normalize_disclaimers(
    raw: &str,
    tone: &ToneProfile,
    severity: SeverityLevel,
    emotion: &EmotionSnapshot,
    state: ConversationState,
    language: Language,
) -> Result<String, OrchestrateError> {
    let mut kept_lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        let sentences = text::split_sentences(line);
        if sentences.is_empty() {
            // Blank line: keep paragraph spacing.
            kept_lines.push(line.to_string());
            continue;
        }
        let kept: Vec<String> = sentences
            .into_iter()
            .filter(|s| !is_safety_sentence(s))
            .collect();
        if kept.is_empty() {
            continue;
        }
        kept_lines.push(kept.join(" "));
    }
    let mut out = kept_lines.join("\n");

    let sustained_distress = emotion.intensity >= SUSTAINED_INTENSITY
        && emotion.primary.is_negative()
        && state.is_support_state();
    let pack = phrases::pack(language);

    let footer = if severity == SeverityLevel::HighRisk || tone.full_footer || sustained_distress
    {
        Some(pack.footer_full()?)
    } else if tone.soft_disclaimer {
        Some(pack.footer_mild()?)
    } else {
        None
    };

    if let Some(footer) = footer {
        if out.trim().is_empty() {
            out = footer.to_string();
        } else {
            out.push('\n');
            out.push_str(footer);
        }
    }
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
