//! Invocation launcher
//!
//! Wraps an assistant program: resolves the persona for the working folder,
//! and when that persona has a prompt file and the caller has not already
//! taken control of the system prompt, prepends
//! `--append-system-prompt <contents>` to the program's arguments.
//!
//! The decision is made once, synchronously, before the program starts and
//! only touches local files.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::persona::StateStore;

/// Flag injected ahead of the user's arguments
pub const APPEND_PROMPT_FLAG: &str = "--append-system-prompt";

/// Flag that replaces the system prompt outright
pub const REPLACE_PROMPT_FLAG: &str = "--system-prompt";

/// Final decision for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Program to execute
    pub program: OsString,

    /// Arguments handed to the program
    pub args: Vec<OsString>,

    /// Persona resolved for the working folder
    pub persona: String,

    /// Prompt file whose contents were injected, if any
    pub prompt_file: Option<PathBuf>,
}

impl LaunchPlan {
    /// Whether a prompt flag was injected
    pub fn is_augmented(&self) -> bool {
        self.prompt_file.is_some()
    }
}

/// Folder the persona is resolved for: `$<env_name>` when set and non-empty,
/// else the current directory.
pub fn working_folder(env_name: &str) -> Result<String> {
    if let Some(dir) = std::env::var_os(env_name).filter(|v| !v.is_empty()) {
        return Ok(dir.to_string_lossy().into_owned());
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.to_string_lossy().into_owned())
}

/// First existing `persona-<name>.md` across `dirs`, in order.
pub fn find_prompt_file(dirs: &[PathBuf], persona: &str) -> Option<PathBuf> {
    if persona.is_empty() || persona.contains(['/', '\\']) || persona == ".." {
        debug!(persona = %persona, "Persona name is not usable as a file name");
        return None;
    }

    let file_name = format!("persona-{}.md", persona);
    dirs.iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Whether the caller already supplied either system-prompt flag.
///
/// Matches whole arguments only; `--system-prompt-file` or
/// `--append-system-prompt=x` do not count.
pub fn has_prompt_flag<S: AsRef<OsStr>>(args: &[S]) -> bool {
    args.iter().any(|arg| {
        let arg = arg.as_ref();
        arg == APPEND_PROMPT_FLAG || arg == REPLACE_PROMPT_FLAG
    })
}

/// Decide the final command line for `argv` (program first) run in `folder`.
pub fn plan(
    store: &StateStore,
    prompt_dirs: &[PathBuf],
    folder: &str,
    argv: Vec<OsString>,
) -> Result<LaunchPlan> {
    let mut argv = argv.into_iter();
    let program = argv.next().ok_or(Error::LaunchMissingProgram)?;
    let user_args: Vec<OsString> = argv.collect();

    let persona = store.get_persona(folder);
    debug!(folder = %folder, persona = %persona, "Resolved persona for launch");

    let passthrough = |persona: String| LaunchPlan {
        program: program.clone(),
        args: user_args.clone(),
        persona,
        prompt_file: None,
    };

    if has_prompt_flag(&user_args) {
        debug!("System prompt flag already present, passing arguments through");
        return Ok(passthrough(persona));
    }

    let Some(prompt_file) = find_prompt_file(prompt_dirs, &persona) else {
        debug!(persona = %persona, "No prompt file for persona, passing arguments through");
        return Ok(passthrough(persona));
    };

    let contents = match read_prompt(&prompt_file) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %prompt_file.display(), error = %e, "Prompt file unreadable, passing arguments through");
            return Ok(passthrough(persona));
        }
    };

    let mut args = Vec::with_capacity(user_args.len() + 2);
    args.push(OsString::from(APPEND_PROMPT_FLAG));
    args.push(OsString::from(contents));
    args.extend(user_args.iter().cloned());

    info!(persona = %persona, path = %prompt_file.display(), "Injecting persona prompt");

    Ok(LaunchPlan {
        program,
        args,
        persona,
        prompt_file: Some(prompt_file),
    })
}

fn read_prompt(path: &Path) -> std::io::Result<String> {
    fs::read_to_string(path)
}

/// Replace the current process with the planned command. Only returns on failure.
#[cfg(unix)]
pub fn exec(plan: &LaunchPlan) -> Result<i32> {
    use std::os::unix::process::CommandExt;

    let err = Command::new(&plan.program).args(&plan.args).exec();
    Err(Error::launch_failed(plan.program.to_string_lossy(), err))
}

/// Run the planned command and return its exit code.
#[cfg(not(unix))]
pub fn exec(plan: &LaunchPlan) -> Result<i32> {
    let status = Command::new(&plan.program)
        .args(&plan.args)
        .status()
        .map_err(|e| Error::launch_failed(plan.program.to_string_lossy(), e))?;
    Ok(status.code().unwrap_or(1))
}
