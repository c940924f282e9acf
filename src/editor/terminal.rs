//! Terminal host: drives the persona extension from a shell.
//!
//! The status indicator and notices are printed, quick-pick is a `dialoguer`
//! select, and the state file and open folder are watched with `notify`.

use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use dialoguer::console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::status::plain_label;
use super::{EditorHost, HostEvent, PickItem, StatusText};

/// Host backed by stdin/stdout and a filesystem watcher
pub struct TerminalHost {
    folder: Option<String>,
    commands: Vec<String>,
    last_status: Option<StatusText>,
    events_tx: Sender<HostEvent>,
    events_rx: Receiver<HostEvent>,
    watcher: Option<RecommendedWatcher>,
}

impl TerminalHost {
    pub fn new(folder: Option<String>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            folder,
            commands: Vec::new(),
            last_status: None,
            events_tx,
            events_rx,
            watcher: None,
        }
    }

    /// Block until the next host event. `None` once no watcher is left to produce one.
    pub fn next_event(&mut self) -> Option<HostEvent> {
        if self.watcher.is_none() {
            return None;
        }
        self.events_rx.recv().ok()
    }
}

impl EditorHost for TerminalHost {
    fn active_folder(&self) -> Option<String> {
        self.folder.clone()
    }

    fn set_status(&mut self, status: &StatusText) {
        if self.last_status.as_ref() == Some(status) {
            return;
        }
        debug!(tooltip = %status.tooltip, command = ?status.command, "Status updated");
        println!("{}", plain_label(&status.text));
        self.last_status = Some(status.clone());
    }

    fn show_info(&mut self, message: &str) {
        println!("{}", message);
    }

    fn show_warning(&mut self, message: &str) {
        eprintln!("{} {}", style("warning:").yellow().bold(), message);
    }

    fn pick(&mut self, items: &[PickItem], placeholder: &str) -> Result<Option<usize>> {
        let labels: Vec<String> = items
            .iter()
            .map(|item| match &item.description {
                Some(description) => format!("{} {}", plain_label(&item.label), description),
                None => plain_label(&item.label),
            })
            .collect();
        let current = items.iter().position(|item| item.description.is_some()).unwrap_or(0);

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(placeholder)
            .items(&labels)
            .default(current)
            .interact_opt()?;
        Ok(selection)
    }

    fn register_command(&mut self, id: &str) -> Result<()> {
        debug!(command = %id, "Command registered");
        self.commands.push(id.to_string());
        Ok(())
    }

    fn watch_file(&mut self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| Error::IoWrite {
            path: dir.clone(),
            source: e,
        })?;

        // Entries appearing in the open folder can change what detection finds
        let folder = self
            .folder
            .as_deref()
            .map(Path::new)
            .filter(|f| f.is_dir())
            .map(|f| fs::canonicalize(f).unwrap_or_else(|_| f.to_path_buf()));

        let target = path.to_path_buf();
        let watched_folder = folder.clone();
        let tx = self.events_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(host_event) = map_event(&event, &target, watched_folder.as_deref()) {
                        let _ = tx.send(host_event);
                    }
                }
                Err(e) => warn!(error = %e, "State file watcher error"),
            },
            Config::default(),
        )
        .map_err(|e| watch_error(&dir, e))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(&dir, e))?;

        if let Some(folder) = folder.filter(|f| *f != dir) {
            match watcher.watch(&folder, RecursiveMode::NonRecursive) {
                Ok(()) => debug!(folder = %folder.display(), "Watching open folder"),
                Err(e) => warn!(folder = %folder.display(), error = %e, "Cannot watch open folder"),
            }
        }

        debug!(path = %path.display(), "Watching state file");
        self.watcher = Some(watcher);
        Ok(())
    }
}

fn watch_error(path: &Path, source: notify::Error) -> Error {
    Error::Watch {
        path: path.to_path_buf(),
        source,
    }
}

/// Translate a raw filesystem event into a host event for the state file
/// `target` or the open `folder`.
fn map_event(event: &Event, target: &Path, folder: Option<&Path>) -> Option<HostEvent> {
    let file_name = target.file_name()?;
    let touches_target = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name));
    if touches_target {
        return match event.kind {
            EventKind::Create(_) => Some(HostEvent::StateFileCreated),
            EventKind::Modify(_) => Some(HostEvent::StateFileChanged),
            _ => None,
        };
    }

    let folder = folder?;
    let touches_folder = event.paths.iter().any(|p| p.parent() == Some(folder));
    let entries_changed = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );
    (touches_folder && entries_changed).then_some(HostEvent::FoldersChanged)
}
