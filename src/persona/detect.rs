//! Folder classifier: picks a persona from a project folder's file names.
//!
//! Only the immediate directory listing is consulted. Nothing is read from
//! inside files and subdirectories are never entered.
//!
//! Rule order matters and is part of the contract: the JavaScript check runs
//! before the game-engine check, so a folder carrying both a `package.json`
//! and a `ProjectSettings` directory classifies as JavaScript.

use std::fs;
use std::path::Path;

use tracing::{debug, trace};

use super::registry::{GAME_PERSONA, JS_PERSONA};

/// JS/TS package manifest and lockfile names.
const JS_MARKERS: [&str; 2] = ["package.json", "bun.lockb"];

/// Unity project settings directory.
const GAME_SETTINGS_DIR: &str = "ProjectSettings";

/// Scene, C# project and Unreal project file suffixes.
const GAME_EXTENSIONS: [&str; 3] = [".unity", ".csproj", ".uproject"];

/// Classify a folder, returning `None` when no rule matches or the folder
/// cannot be listed.
pub fn classify(folder: &Path) -> Option<&'static str> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(folder = %folder.display(), error = %e, "Folder not readable, skipping detection");
            return None;
        }
    };

    let names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    let detected = classify_entries(&names);
    trace!(folder = %folder.display(), entries = names.len(), detected = ?detected, "Folder classified");
    detected
}

/// Apply the ordered rules to a list of entry names.
pub fn classify_entries<S: AsRef<str>>(names: &[S]) -> Option<&'static str> {
    let entries = || names.iter().map(|n| n.as_ref());

    if entries().any(|n| JS_MARKERS.iter().any(|marker| *marker == n)) {
        return Some(JS_PERSONA);
    }

    if entries().any(|n| n == GAME_SETTINGS_DIR || GAME_EXTENSIONS.iter().any(|ext| n.ends_with(ext))) {
        return Some(GAME_PERSONA);
    }

    None
}

/// Detected persona for a folder, or `fallback`. Never fails.
pub fn detect(folder: &Path, fallback: &str) -> String {
    classify(folder)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}
