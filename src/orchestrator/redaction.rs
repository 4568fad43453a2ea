//! Trigger redaction: known painful topics disappear from replies.
//!
//! The classifier reports topics that set the user off. The strongest few
//! are replaced with a neutral per-language placeholder wherever the model
//! echoed them back, so a reply never rubs a raw spot by name.

use std::cmp::Ordering;

use regex::Regex;

use crate::error::OrchestrateError;
use crate::phrases;
use crate::types::{Language, Trigger};

/// Only the strongest topics are redacted; weak signals stay readable.
pub const TOP_TRIGGER_COUNT: usize = 3;

/// Replace the top-scored trigger topics in `text` with the placeholder.
pub fn redact_triggers(
    text: &str,
    triggers: &[Trigger],
    language: Language,
) -> Result<String, OrchestrateError> {
    if triggers.is_empty() {
        return Ok(text.to_string());
    }

    let placeholder = phrases::pack(language).redaction_placeholder()?;

    let mut ranked: Vec<&Trigger> = triggers.iter().collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut out = text.to_string();
    for trigger in ranked.into_iter().take(TOP_TRIGGER_COUNT) {
        let topic = trigger.topic.trim();
        if topic.is_empty() {
            continue;
        }
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(topic)))?;
        out = pattern.replace_all(&out, placeholder).into_owned();
    }
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
