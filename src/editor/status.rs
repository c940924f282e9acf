//! Status indicator text

use crate::persona::Persona;

use super::SWITCH_COMMAND;

const UNKNOWN_ICON: &str = "$(question)";

/// What the status indicator shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    pub text: String,
    pub tooltip: String,
    /// Command run when the indicator is clicked
    pub command: Option<String>,
}

impl StatusText {
    /// Indicator for a window with no folder open
    pub fn no_folder() -> Self {
        Self {
            text: format!("{} No Folder", UNKNOWN_ICON),
            tooltip: "Open a folder to use personas".to_string(),
            command: Some(SWITCH_COMMAND.to_string()),
        }
    }

    /// Indicator for a resolved persona. `info` is `None` when the name is
    /// not in the registry.
    pub fn for_persona(name: &str, info: Option<&Persona>) -> Self {
        let (text, shown) = match info {
            Some(persona) => (persona.label(), persona.display_name.as_str()),
            None => (format!("{} {}", UNKNOWN_ICON, name), name),
        };
        Self {
            text,
            tooltip: format!("Persona: {}\nClick to switch", shown),
            command: Some(SWITCH_COMMAND.to_string()),
        }
    }
}

/// Strip `$(icon)` tokens for hosts that cannot draw them.
pub fn plain_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("$(") {
        match rest[start..].find(')') {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + end + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
