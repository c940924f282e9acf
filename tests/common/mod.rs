//! Common test utilities and fixtures
//!
//! Every test gets its own sandbox: a temporary HOME, config dir, base
//! directory and working directory, so nothing touches the real `~/.claude`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Environment variables that would leak host settings into a test run
const SCRUBBED_ENV: [&str; 9] = [
    "CLAUDE_WORKING_DIR",
    "PERSONA_SWITCHER_CONFIG",
    "PERSONA_SWITCHER_STATE_FILE",
    "PERSONA_SWITCHER_WORKING_DIR_ENV",
    "PERSONA_SWITCHER_LOG_LEVEL",
    "PERSONA_SWITCHER_LOG_FILE",
    "PERSONA_SWITCHER_LOG_JSON",
    "RUST_LOG",
    "APPDATA",
];

pub struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("home")).unwrap();
        fs::create_dir_all(root.path().join("xdg")).unwrap();
        fs::create_dir_all(root.path().join("work")).unwrap();
        Self { root }
    }

    /// Command for the persona-switcher binary, isolated to this sandbox
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("persona-switcher").unwrap();
        for var in SCRUBBED_ENV {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.work_dir())
            .env("HOME", self.root.path().join("home"))
            .env("XDG_CONFIG_HOME", self.root.path().join("xdg"))
            .env("PERSONA_SWITCHER_CLAUDE_DIR", self.claude_dir());
        cmd
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn claude_dir(&self) -> PathBuf {
        self.root.path().join("home").join(".claude")
    }

    pub fn state_path(&self) -> PathBuf {
        self.claude_dir().join("persona-state.json")
    }

    /// Create a project folder holding the given files and directories
    pub fn project(&self, name: &str, files: &[&str], dirs: &[&str]) -> String {
        let dir = self.root.path().join("projects").join(name);
        fs::create_dir_all(&dir).unwrap();
        for f in files {
            fs::write(dir.join(f), "").unwrap();
        }
        for d in dirs {
            fs::create_dir_all(dir.join(d)).unwrap();
        }
        dir.to_str().unwrap().to_string()
    }

    pub fn write_state(&self, content: &str) {
        fs::create_dir_all(self.claude_dir()).unwrap();
        fs::write(self.state_path(), content).unwrap();
    }

    pub fn read_state(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.state_path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    /// Write `persona-<name>.md` under `<claude_dir>/<subdir>`
    pub fn write_prompt(&self, subdir: &str, persona: &str, contents: &str) {
        let dir = self.claude_dir().join(subdir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("persona-{}.md", persona)), contents).unwrap();
    }

    /// Write a config file at `path` relative to the sandbox root
    pub fn write_config(&self, path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}
