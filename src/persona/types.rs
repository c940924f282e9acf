//! Core types for the persona system.
//!
//! Persona names are plain strings on purpose: a state file may name a persona
//! the registry has never heard of, and that name must survive a load/save
//! round trip and still render.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Current schema tag of the state file
pub const STATE_VERSION: u32 = 1;

/// Persona used when nothing else applies
pub const BASE_PERSONA: &str = "stem";

// ─────────────────────────────────────────────────────────────────
// Persona (registry entry)
// ─────────────────────────────────────────────────────────────────

/// A named system-prompt profile with a display label and icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Stable identifier, also used in prompt file names.
    pub name: String,

    /// Human-readable label.
    pub display_name: String,

    /// Editor icon token such as `$(robot)`.
    pub icon: String,
}

impl Persona {
    pub fn new(name: &str, display_name: &str, icon: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            icon: icon.to_string(),
        }
    }

    /// `"<icon> <displayName>"`, the form used by status text and pickers.
    pub fn label(&self) -> String {
        format!("{} {}", self.icon, self.display_name)
    }
}

// ─────────────────────────────────────────────────────────────────
// Persisted state
// ─────────────────────────────────────────────────────────────────

/// Contents of the persona state file.
///
/// Loading is tolerant below the root object: missing or mistyped `version`
/// and `default` fall back to the zero-state values, and each folder entry is
/// kept as written so a malformed one never costs the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaState {
    /// Schema tag.
    #[serde(deserialize_with = "lenient_version")]
    pub version: u32,

    /// Persona used when a folder has no assignment and detection finds nothing.
    #[serde(rename = "default", deserialize_with = "lenient_default")]
    pub default_persona: String,

    /// Explicit assignments keyed by folder path (exact string match).
    #[serde(deserialize_with = "lenient_folders")]
    pub folders: BTreeMap<String, FolderAssignment>,
}

impl Default for PersonaState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            default_persona: BASE_PERSONA.to_string(),
            folders: BTreeMap::new(),
        }
    }
}

impl PersonaState {
    /// The explicit assignment for a folder, ignoring entries without a persona name.
    pub fn assignment(&self, folder: &str) -> Option<&FolderAssignment> {
        self.folders.get(folder).filter(|a| !a.persona().is_empty())
    }
}

fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(STATE_VERSION))
}

fn lenient_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().unwrap_or(BASE_PERSONA).to_string())
}

fn lenient_folders<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, FolderAssignment>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(folder, entry)| (folder, FolderAssignment(entry)))
            .collect()),
        _ => Ok(BTreeMap::new()),
    }
}

/// A persisted persona choice for one folder.
///
/// Holds the entry exactly as it appeared in the file, so unknown fields and
/// odd values survive a read-modify-write of a neighbouring folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderAssignment(Value);

impl FolderAssignment {
    pub fn new(persona: &str, last_used: &str) -> Self {
        Self(json!({ "persona": persona, "lastUsed": last_used }))
    }

    /// Assigned persona name, empty when the entry has no string `persona`.
    pub fn persona(&self) -> &str {
        self.0.get("persona").and_then(Value::as_str).unwrap_or("")
    }

    /// ISO-8601 time of the last write, when recorded as a string.
    pub fn last_used(&self) -> Option<&str> {
        self.0.get("lastUsed").and_then(Value::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
