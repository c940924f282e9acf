//! Persona registry: the catalog of known personas.

use super::types::Persona;

/// Persona selected for JavaScript/TypeScript projects.
pub const JS_PERSONA: &str = "tars";

/// Persona selected for game-engine projects.
pub const GAME_PERSONA: &str = "red-queen";

/// Built-in entries, in presentation order.
const BUILTIN: [(&str, &str, &str); 3] = [
    (JS_PERSONA, "TARS", "$(robot)"),
    (GAME_PERSONA, "Red Queen", "$(device-camera-video)"),
    (super::types::BASE_PERSONA, "STEM", "$(book)"),
];

/// Ordered catalog of personas.
///
/// Declaration order is the order pickers show; it is never re-sorted.
/// Callers must not assume a fixed size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shipped with the tool.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, display, icon) in BUILTIN {
            registry.push(Persona::new(name, display, icon));
        }
        registry
    }

    /// Append a persona. A name already present is left untouched.
    pub fn push(&mut self, persona: Persona) {
        if self.get(&persona.name).is_none() {
            self.personas.push(persona);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }

    pub fn list(&self) -> &[Persona] {
        &self.personas
    }
}
