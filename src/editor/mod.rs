//! Editor integration shell
//!
//! The persona core knows nothing about any particular editor. A host
//! implements [`EditorHost`] (status indicator, notices, quick-pick, command
//! and file-watch registration) and drives a [`PersonaExtension`] by feeding
//! it [`HostEvent`]s. All extension state lives in that one value.

pub mod status;
pub mod terminal;

use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::persona::detect;
use crate::persona::{StateStore, BASE_PERSONA};

pub use status::StatusText;

/// Command id of the interactive persona picker
pub const SWITCH_COMMAND: &str = "personaSwitcher.switch";

/// Command id of detect-and-save
pub const DETECT_COMMAND: &str = "personaSwitcher.detect";

const NO_FOLDER_SWITCH: &str = "Open a folder to use personas";
const NO_FOLDER_DETECT: &str = "Open a folder to detect persona";
const PICK_PLACEHOLDER: &str = "Select a persona for this folder";

/// One quick-pick entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub label: String,
    pub description: Option<String>,
}

/// Something the host tells the extension about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    StateFileCreated,
    StateFileChanged,
    /// The open folder, or its top-level entries, changed
    FoldersChanged,
    Command(String),
}

/// Capabilities the extension needs from its host
pub trait EditorHost {
    /// First open folder, if any
    fn active_folder(&self) -> Option<String>;

    fn set_status(&mut self, status: &StatusText);

    fn show_info(&mut self, message: &str);

    fn show_warning(&mut self, message: &str);

    /// Let the user choose one item. `Ok(None)` means cancelled.
    fn pick(&mut self, items: &[PickItem], placeholder: &str) -> Result<Option<usize>>;

    fn register_command(&mut self, id: &str) -> Result<()>;

    /// Deliver `StateFileCreated` / `StateFileChanged` for `path` from now on
    fn watch_file(&mut self, path: &Path) -> Result<()>;
}

/// Activation-scoped persona extension
pub struct PersonaExtension<H: EditorHost> {
    store: StateStore,
    host: H,
    status: StatusText,
}

impl<H: EditorHost> PersonaExtension<H> {
    /// Register commands and the state file watch, then render the indicator.
    pub fn activate(store: StateStore, mut host: H) -> Result<Self> {
        host.register_command(SWITCH_COMMAND)?;
        host.register_command(DETECT_COMMAND)?;
        host.watch_file(store.path())?;

        let mut extension = Self {
            store,
            host,
            status: StatusText::no_folder(),
        };
        extension.refresh();

        info!(state = %extension.store.path().display(), "Persona extension activated");
        Ok(extension)
    }

    /// React to a host event
    pub fn handle(&mut self, event: HostEvent) -> Result<()> {
        debug!(event = ?event, "Host event");
        match event {
            HostEvent::StateFileCreated | HostEvent::StateFileChanged | HostEvent::FoldersChanged => {
                self.refresh();
                Ok(())
            }
            HostEvent::Command(id) if id == SWITCH_COMMAND => self.switch_persona(),
            HostEvent::Command(id) if id == DETECT_COMMAND => self.detect_persona(),
            HostEvent::Command(id) => {
                debug!(command = %id, "Ignoring unknown command");
                Ok(())
            }
        }
    }

    /// Re-derive the indicator from the current state on disk
    pub fn refresh(&mut self) {
        self.status = match self.host.active_folder() {
            Some(folder) => {
                let persona = self.store.get_persona(&folder);
                StatusText::for_persona(&persona, self.store.persona_info(&persona))
            }
            None => StatusText::no_folder(),
        };
        self.host.set_status(&self.status);
    }

    /// Interactive persona picker for the active folder
    pub fn switch_persona(&mut self) -> Result<()> {
        let Some(folder) = self.host.active_folder() else {
            self.host.show_warning(NO_FOLDER_SWITCH);
            return Ok(());
        };

        let current = self.store.get_persona(&folder);
        let personas = self.store.list_personas();
        let items: Vec<PickItem> = personas
            .iter()
            .map(|p| PickItem {
                label: p.label(),
                description: (p.name == current).then(|| "(current)".to_string()),
            })
            .collect();

        let Some(index) = self.host.pick(&items, PICK_PLACEHOLDER)? else {
            debug!("Persona pick cancelled");
            return Ok(());
        };
        let Some(chosen) = personas.get(index).cloned() else {
            debug!(index, "Pick index out of range");
            return Ok(());
        };

        self.save(&folder, &chosen.name)?;
        self.refresh();
        self.host.show_info(&format!(
            "Switched to {} persona. Start a new conversation to use it.",
            chosen.display_name
        ));
        Ok(())
    }

    /// Classify the active folder and persist the result
    pub fn detect_persona(&mut self) -> Result<()> {
        let Some(folder) = self.host.active_folder() else {
            self.host.show_warning(NO_FOLDER_DETECT);
            return Ok(());
        };

        let detected = detect::detect(Path::new(&folder), BASE_PERSONA);
        self.save(&folder, &detected)?;
        self.refresh();

        let shown = self
            .store
            .persona_info(&detected)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| detected.clone());
        self.host.show_info(&format!("Auto-detected: {}", shown));
        Ok(())
    }

    fn save(&mut self, folder: &str, persona: &str) -> Result<()> {
        if let Err(e) = self.store.set_persona(folder, persona) {
            self.host.show_warning(&format!("Failed to save persona: {}", e));
            return Err(e);
        }
        Ok(())
    }

    /// Current indicator
    pub fn status(&self) -> &StatusText {
        &self.status
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
