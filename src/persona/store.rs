//! Persona state store: owns the on-disk JSON state file.
//!
//! Every operation loads fresh from disk; nothing is cached between calls.
//! Writers read-modify-write and replace the file by rename, so readers in
//! other processes see either the old file or the new one. Concurrent writers
//! race at file granularity and the last rename wins.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::config::{SwitcherConfig, DEFAULT_STATE_FILE};
use crate::error::{Error, Result};

use super::detect;
use super::registry::PersonaRegistry;
use super::resolver::{self, Resolution};
use super::types::{FolderAssignment, Persona, PersonaState, BASE_PERSONA};

/// File-backed persona preferences.
#[derive(Debug, Clone)]
pub struct StateStore {
    /// Path to the state JSON file
    state_path: PathBuf,

    /// Personas known for display lookups
    registry: PersonaRegistry,
}

impl StateStore {
    /// Store rooted at `base_dir`, using the default state file name.
    #[cfg(test)]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_path: base_dir.into().join(DEFAULT_STATE_FILE),
            registry: PersonaRegistry::builtin(),
        }
    }

    /// Store described by a loaded configuration.
    pub fn from_config(config: &SwitcherConfig) -> Self {
        Self {
            state_path: config.state_path(),
            registry: config.registry(),
        }
    }

    /// Path of the persisted state.
    pub fn path(&self) -> &Path {
        &self.state_path
    }

    // ─────────────────────────────────────────────────────────────
    // Load / Save
    // ─────────────────────────────────────────────────────────────

    /// Load the state.
    ///
    /// A missing or unreadable file, invalid JSON, or a root that is not an
    /// object yields the zero-state. Anything narrower is tolerated per field
    /// and per folder entry.
    pub fn load(&self) -> PersonaState {
        let content = match fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.state_path.display(), error = %e, "No readable state file, using zero-state");
                return PersonaState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.state_path.display(), error = %e, "Malformed state file, using zero-state");
                PersonaState::default()
            }
        }
    }

    /// Overwrite the state file with `state`.
    ///
    /// Writes a sibling temp file and renames it over the target. On failure
    /// the previous file is left as it was.
    pub fn save(&self, state: &PersonaState) -> Result<()> {
        let tmp_path = self.write_temp(state)?;
        if let Err(e) = fs::rename(&tmp_path, &self.state_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.write_error(e));
        }

        debug!(path = %self.state_path.display(), folders = state.folders.len(), "State saved");
        Ok(())
    }

    /// Write the zero-state if no state file exists yet. Returns whether it wrote.
    ///
    /// The complete temp file is hard-linked into place, which fails when the
    /// target already exists, so a file written concurrently is never replaced.
    pub fn seed(&self) -> Result<bool> {
        let tmp_path = self.write_temp(&PersonaState::default())?;
        let linked = fs::hard_link(&tmp_path, &self.state_path);
        let _ = fs::remove_file(&tmp_path);

        match linked {
            Ok(()) => {
                info!(path = %self.state_path.display(), "State file created");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %self.state_path.display(), "State file already exists, not seeding");
                Ok(false)
            }
            Err(e) => Err(self.write_error(e)),
        }
    }

    /// Serialize `state` into a fresh sibling temp file and return its path.
    fn write_temp(&self, state: &PersonaState) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(state)?;

        let dir = self
            .state_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        let tmp_path = dir.join(temp_file_name(&self.state_path));
        if let Err(e) = write_file(&tmp_path, json.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.write_error(e));
        }
        Ok(tmp_path)
    }

    fn write_error(&self, source: std::io::Error) -> Error {
        Error::StateWrite {
            path: self.state_path.clone(),
            source,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Folder assignments
    // ─────────────────────────────────────────────────────────────

    /// Effective persona for a folder, with its source. Never writes.
    pub fn resolve(&self, folder: &str) -> Resolution {
        resolver::resolve(&self.load(), folder)
    }

    /// Effective persona name for a folder. Never writes.
    pub fn get_persona(&self, folder: &str) -> String {
        self.resolve(folder).persona
    }

    /// Record an explicit persona for a folder, keeping every other entry.
    pub fn set_persona(&self, folder: &str, persona: &str) -> Result<()> {
        let mut state = self.load();
        state.folders.insert(
            folder.to_string(),
            FolderAssignment::new(persona, &now_timestamp()),
        );
        self.save(&state)?;

        info!(folder = %folder, persona = %persona, "Persona assigned");
        Ok(())
    }

    /// Classify the folder with the base persona as fallback and persist the result.
    pub fn detect_and_save(&self, folder: &str) -> Result<String> {
        let detected = detect::detect(Path::new(folder), BASE_PERSONA);
        self.set_persona(folder, &detected)?;
        Ok(detected)
    }

    // ─────────────────────────────────────────────────────────────
    // Registry lookups
    // ─────────────────────────────────────────────────────────────

    pub fn persona_info(&self, name: &str) -> Option<&Persona> {
        self.registry.get(name)
    }

    /// All personas in declaration order.
    pub fn list_personas(&self) -> &[Persona] {
        self.registry.list()
    }
}

/// `.persona-state.json.tmp.<pid>.<nanos>` next to the target
fn temp_file_name(target: &Path) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!(
        ".{}.tmp.{}.{}",
        target
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string()),
        std::process::id(),
        nanos
    )
}

fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// RFC 3339 UTC with milliseconds, e.g. `2024-01-01T00:00:00.000Z`
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (StateStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join(".claude"));
        (store, tmp)
    }

    fn project(tmp: &TempDir, name: &str, files: &[&str]) -> String {
        let dir = tmp.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        for f in files {
            fs::write(dir.join(f), "").unwrap();
        }
        dir.to_str().unwrap().to_string()
    }

    #[test]
    fn test_path_is_derived_from_base_dir() {
        let store = StateStore::new("/home/u/.claude");
        assert_eq!(store.path(), Path::new("/home/u/.claude/persona-state.json"));
    }

    #[test]
    fn test_load_missing_file_is_zero_state() {
        let (store, _tmp) = test_store();
        assert_eq!(store.load(), PersonaState::default());
    }

    #[test]
    fn test_load_invalid_json_is_zero_state() {
        let (store, _tmp) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "invalid json {{{").unwrap();

        let state = store.load();
        assert_eq!(state.version, 1);
        assert_eq!(state.default_persona, "stem");
        assert!(state.folders.is_empty());
    }

    #[test]
    fn test_load_non_object_root_is_zero_state() {
        let (store, _tmp) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "42").unwrap();
        assert_eq!(store.load(), PersonaState::default());

        fs::write(store.path(), r#"{"version": 1, "folders": 42}"#).unwrap();
        assert_eq!(store.load(), PersonaState::default());
    }

    #[test]
    fn test_malformed_entry_keeps_other_assignments() {
        let (store, _tmp) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            r#"{
                "version": 1,
                "default": "tars",
                "folders": {
                    "/a": { "persona": "red-queen", "lastUsed": "2024-01-01" },
                    "/b": { "lastUsed": "2024-01-01" },
                    "/n": { "persona": "stem", "lastUsed": null }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(store.get_persona("/a"), "red-queen");
        assert_eq!(store.get_persona("/n"), "stem");
        assert_eq!(store.get_persona("/b"), "tars");

        store.set_persona("/c", "stem").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["default"], "tars");
        assert_eq!(raw["folders"]["/a"]["persona"], "red-queen");
        assert_eq!(raw["folders"]["/b"], serde_json::json!({ "lastUsed": "2024-01-01" }));
        assert!(raw["folders"]["/n"]["lastUsed"].is_null());
        assert_eq!(raw["folders"]["/c"]["persona"], "stem");
        assert_eq!(store.get_persona("/a"), "red-queen");
    }

    #[test]
    fn test_save_writes_pretty_json_and_leaves_no_temp_files() {
        let (store, _tmp) = test_store();
        store.set_persona("/a", "tars").unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\n  \"version\": 1"));
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["folders"]["/a"]["persona"], "tars");

        let leftovers: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_set_persona_creates_missing_base_dir() {
        let (store, _tmp) = test_store();
        assert!(!store.path().parent().unwrap().exists());
        store.set_persona("/a", "stem").unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_set_persona_over_corrupt_file_produces_valid_state() {
        let (store, _tmp) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        store.set_persona("/a", "tars").unwrap();
        let state = store.load();
        assert_eq!(state.folders.len(), 1);
        assert_eq!(state.default_persona, "stem");
    }

    #[test]
    fn test_explicit_assignment_always_wins() {
        let (store, tmp) = test_store();
        let folder = project(&tmp, "js", &["package.json"]);

        assert_eq!(store.get_persona(&folder), "tars");
        store.set_persona(&folder, "stem").unwrap();
        assert_eq!(store.get_persona(&folder), "stem");
    }

    #[test]
    fn test_unassigned_folder_uses_detection_with_state_default() {
        let (store, tmp) = test_store();
        let empty = project(&tmp, "empty", &[]);

        let mut state = PersonaState::default();
        state.default_persona = "red-queen".to_string();
        store.save(&state).unwrap();

        assert_eq!(store.get_persona(&empty), detect::detect(Path::new(&empty), "red-queen"));
        assert_eq!(store.get_persona(&empty), "red-queen");
    }

    #[test]
    fn test_set_persona_is_idempotent_on_persona_field() {
        let (store, _tmp) = test_store();
        store.set_persona("/a", "tars").unwrap();
        let first = store.load();
        store.set_persona("/a", "tars").unwrap();
        let second = store.load();

        assert_eq!(first.folders.len(), 1);
        assert_eq!(second.folders.len(), 1);
        assert_eq!(first.folders["/a"].persona(), second.folders["/a"].persona());
    }

    #[test]
    fn test_set_persona_preserves_other_folders() {
        let (store, _tmp) = test_store();
        store.set_persona("/a", "tars").unwrap();
        let before = store.load().folders["/a"].clone();

        store.set_persona("/b", "red-queen").unwrap();
        store.set_persona("/b", "stem").unwrap();

        let state = store.load();
        assert_eq!(state.folders["/a"], before);
        assert_eq!(state.folders["/b"].persona(), "stem");
    }

    #[test]
    fn test_set_persona_preserves_default_and_unknown_names() {
        let (store, _tmp) = test_store();
        let mut state = PersonaState::default();
        state.default_persona = "custom-default".to_string();
        store.save(&state).unwrap();

        store.set_persona("/x", "ghost").unwrap();
        let state = store.load();
        assert_eq!(state.default_persona, "custom-default");
        assert_eq!(store.get_persona("/x"), "ghost");
    }

    #[test]
    fn test_last_used_timestamp_format() {
        let (store, _tmp) = test_store();
        store.set_persona("/a", "tars").unwrap();
        let state = store.load();
        let stamp = state.folders["/a"].last_used().unwrap();

        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        assert_eq!(stamp.len(), "2024-01-01T00:00:00.000Z".len());
    }

    #[test]
    fn test_get_persona_never_writes() {
        let (store, tmp) = test_store();
        let folder = project(&tmp, "js", &["package.json"]);

        store.get_persona(&folder);
        store.resolve(&folder);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_detect_and_save() {
        let (store, tmp) = test_store();
        let unity = project(&tmp, "unity", &["Main.unity"]);

        assert_eq!(store.detect_and_save(&unity).unwrap(), "red-queen");
        assert_eq!(store.load().folders[&unity].persona(), "red-queen");

        let empty = project(&tmp, "empty", &[]);
        assert_eq!(store.detect_and_save(&empty).unwrap(), "stem");
    }

    #[test]
    fn test_seed_only_when_absent() {
        let (store, _tmp) = test_store();
        assert!(store.seed().unwrap());
        store.set_persona("/a", "tars").unwrap();
        assert!(!store.seed().unwrap());
        assert_eq!(store.load().folders.len(), 1);
    }

    #[test]
    fn test_seed_never_replaces_existing_file() {
        let (store, _tmp) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(!store.seed().unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");

        let leftovers = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_reader_never_observes_partial_file() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        let (store, _tmp) = test_store();
        store.set_persona("/seed", "stem").unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let writer = {
            let store = store.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for i in 0..200 {
                    let persona = if i % 2 == 0 { "tars" } else { "red-queen" };
                    store.set_persona(&format!("/folder/{}", i % 17), persona).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let mut reads = 0;
        loop {
            let finished = done.load(Ordering::SeqCst);
            let content = fs::read_to_string(store.path()).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&content)
                .unwrap_or_else(|e| panic!("read {} saw invalid JSON: {}", reads, e));
            assert_eq!(parsed["folders"]["/seed"]["persona"], "stem");
            reads += 1;
            if finished {
                break;
            }
        }
        writer.join().unwrap();

        assert_eq!(store.load().folders.len(), 18);
    }

    #[test]
    fn test_registry_lookups() {
        let (store, _tmp) = test_store();
        assert_eq!(store.persona_info("stem").unwrap().display_name, "STEM");
        assert!(store.persona_info("ghost").is_none());

        let names: Vec<&str> = store.list_personas().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["tars", "red-queen", "stem"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_failure_is_reported_and_keeps_old_file() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _tmp) = test_store();
        store.set_persona("/a", "tars").unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let dir = store.path().parent().unwrap().to_path_buf();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o500)).unwrap();
        let result = store.set_persona("/b", "stem");
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        // Running as root bypasses directory permissions
        if let Err(err) = result {
            assert!(matches!(err, Error::StateWrite { .. }));
            assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        }
    }
}
