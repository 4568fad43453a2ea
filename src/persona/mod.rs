//! Companion personas: who is speaking.
//!
//! A persona carries the voice of the reply (register, playfulness, system
//! prompt). Three built-ins ship embedded in the binary; deployments can
//! register more at runtime. The library hands `PersonaStyle` to the tone
//! selector and the persona's system prompt to the completion call.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Embedded built-in persona definitions.
const EMBEDDED_PERSONAS_YAML: &str = include_str!("personas.yaml");

/// Persona used when a request names none.
pub const DEFAULT_PERSONA_ID: &str = "warm_companion";

/// Speech register of a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    Casual,
    Warm,
    Formal,
}

/// One companion persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaStyle {
    /// Stable identifier, referenced by chat requests.
    pub id: String,
    /// Name shown to users.
    pub display_name: String,
    pub register: Register,
    /// Whether light humor fits this persona at all.
    pub playful: bool,
    /// Base system prompt for the completion provider.
    pub system_prompt: String,
}

/// Registry of personas: embedded defaults plus runtime registrations.
pub struct PersonaLibrary {
    personas: RwLock<HashMap<String, PersonaStyle>>,
}

impl PersonaLibrary {
    /// Library seeded with the embedded defaults.
    pub fn from_embedded() -> Self {
        let list: Vec<PersonaStyle> = serde_yaml::from_str(EMBEDDED_PERSONAS_YAML)
            .expect("embedded personas.yaml must parse");
        let personas = list.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            personas: RwLock::new(personas),
        }
    }

    /// Shared process-wide library.
    pub fn built_in() -> &'static PersonaLibrary {
        static LIBRARY: OnceLock<PersonaLibrary> = OnceLock::new();
        LIBRARY.get_or_init(PersonaLibrary::from_embedded)
    }

    /// Look up a persona by id.
    pub fn get(&self, id: &str) -> Option<PersonaStyle> {
        self.personas.read().get(id).cloned()
    }

    /// The persona used when a request names none.
    pub fn default_persona(&self) -> PersonaStyle {
        self.get(DEFAULT_PERSONA_ID).unwrap_or_else(|| PersonaStyle {
            id: DEFAULT_PERSONA_ID.to_string(),
            display_name: "Companion".to_string(),
            register: Register::Warm,
            playful: false,
            system_prompt: "You are a warm, supportive companion.".to_string(),
        })
    }

    /// Add or replace a persona at runtime.
    pub fn register(&self, persona: PersonaStyle) {
        self.personas.write().insert(persona.id.clone(), persona);
    }

    /// Registered persona ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.personas.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for PersonaLibrary {
    fn default() -> Self {
        Self::from_embedded()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_personas_load() {
        let library = PersonaLibrary::from_embedded();
        assert_eq!(
            library.ids(),
            vec!["calm_mentor", "playful_friend", "warm_companion"]
        );

        let sami = library.get("playful_friend").unwrap();
        assert_eq!(sami.register, Register::Casual);
        assert!(sami.playful);
        assert!(sami.system_prompt.contains("Sami"));
    }

    #[test]
    fn test_default_persona_is_warm_companion() {
        let persona = PersonaLibrary::from_embedded().default_persona();
        assert_eq!(persona.id, DEFAULT_PERSONA_ID);
        assert_eq!(persona.register, Register::Warm);
        assert!(!persona.playful);
    }

    #[test]
    fn test_runtime_registration_overrides() {
        let library = PersonaLibrary::from_embedded();
        library.register(PersonaStyle {
            id: "night_owl".to_string(),
            display_name: "Layl".to_string(),
            register: Register::Casual,
            playful: true,
            system_prompt: "You are a quiet late-night companion.".to_string(),
        });

        assert!(library.get("night_owl").is_some());
        assert_eq!(library.ids().len(), 4);
    }
}
