//! Effective-persona resolution.
//!
//! An explicit folder assignment always wins. Otherwise the folder classifier
//! runs with the state's `default` as its fallback. Resolution is read-only.

use std::fmt;
use std::path::Path;

use super::detect;
use super::types::PersonaState;

/// Where a resolved persona came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaSource {
    /// Explicit per-folder assignment in the state file.
    Assigned,
    /// Folder auto-detection matched a rule.
    Detected,
    /// Nothing matched; the state's default applied.
    Default,
}

impl fmt::Display for PersonaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaSource::Assigned => write!(f, "assigned"),
            PersonaSource::Detected => write!(f, "detected"),
            PersonaSource::Default => write!(f, "default"),
        }
    }
}

/// The effective persona for a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub persona: String,
    pub source: PersonaSource,

    /// When the assignment was written, for assigned personas that record it
    pub last_used: Option<String>,
}

/// Resolve the effective persona for `folder` against an already-loaded state.
pub fn resolve(state: &PersonaState, folder: &str) -> Resolution {
    if let Some(assignment) = state.assignment(folder) {
        return Resolution {
            persona: assignment.persona().to_string(),
            source: PersonaSource::Assigned,
            last_used: assignment.last_used().map(str::to_string),
        };
    }

    match detect::classify(Path::new(folder)) {
        Some(detected) => Resolution {
            persona: detected.to_string(),
            source: PersonaSource::Detected,
            last_used: None,
        },
        None => Resolution {
            persona: state.default_persona.clone(),
            source: PersonaSource::Default,
            last_used: None,
        },
    }
}
