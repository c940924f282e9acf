//! Persona Switcher
//!
//! Entry point for the persona-switcher binary. Resolves the persona for a
//! project folder and either reports it, changes it, or launches the
//! assistant with the persona's prompt injected.

mod cli;
mod config;
mod editor;
mod error;
mod launcher;
mod logging;
mod persona;
mod version;

use std::path::Path;

use clap::Parser;
use tracing::{debug, warn};

use crate::cli::{Cli, Commands, ConfigSubcommand, StateSubcommand};
use crate::config::{LoggingSettings, SwitcherConfig};
use crate::editor::terminal::TerminalHost;
use crate::editor::{HostEvent, PersonaExtension, SWITCH_COMMAND};
use crate::error::{Error, Result};
use crate::logging::LogGuards;
use crate::persona::{detect, PersonaSource, StateStore, BASE_PERSONA};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        debug!(error = %e.format_for_log(), "Command failed");
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { ref subcommand } => {
            let _log_guards = logging::init_logging(&LoggingSettings::default(), cli.verbose, cli.quiet)?;
            return handle_config_command(subcommand.clone(), cli.config.as_deref());
        }
        _ => {}
    }

    let config = SwitcherConfig::load(cli.config.as_deref())?;

    // Held until exit so buffered file logs are flushed
    let log_guards = init_logging_from_config(&config, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(version = %build.full_version(), state = %config.state_path().display(), "Starting persona-switcher");

    let store = StateStore::from_config(&config);

    match cli.command {
        Commands::Launch { command } => run_launch(&config, &store, command, log_guards),
        Commands::Show { folder, name_only } => {
            let folder = resolve_folder(folder, &config)?;
            show_persona(&store, &folder, name_only);
            Ok(())
        }
        Commands::Set { persona, folder } => {
            let folder = resolve_folder(folder, &config)?;
            set_persona(&store, &folder, &persona)
        }
        Commands::Detect { folder, save } => {
            let folder = resolve_folder(folder, &config)?;
            detect_persona(&store, &folder, save)
        }
        Commands::List { folder } => {
            let folder = resolve_folder(folder, &config)?;
            list_personas(&store, &folder);
            Ok(())
        }
        Commands::Switch { folder } => {
            let folder = resolve_folder(folder, &config)?;
            let mut extension = PersonaExtension::activate(store, TerminalHost::new(Some(folder)))?;
            extension.handle(HostEvent::Command(SWITCH_COMMAND.to_string()))
        }
        Commands::Watch { folder } => {
            let folder = resolve_folder(folder, &config)?;
            watch_persona(store, folder)
        }
        Commands::State { subcommand } => handle_state_command(&store, subcommand),
        Commands::Version | Commands::Config { .. } => {
            // Already handled above
            unreachable!();
        }
    }
}

/// Initialize logging from configuration
fn init_logging_from_config(config: &SwitcherConfig, verbose: u8, quiet: bool) -> Result<LogGuards> {
    logging::init_logging(&config.logging, verbose, quiet)
}

/// `--folder` made absolute, else the launcher's working folder
fn resolve_folder(folder: Option<String>, config: &SwitcherConfig) -> Result<String> {
    match folder {
        Some(folder) if Path::new(&folder).is_absolute() => Ok(folder),
        Some(folder) => {
            let cwd = std::env::current_dir().map_err(|_| Error::NoFolder)?;
            Ok(cwd.join(folder).to_string_lossy().into_owned())
        }
        None => launcher::working_folder(&config.launcher.working_dir_env).map_err(|e| {
            debug!(error = %e, "No working folder");
            Error::NoFolder
        }),
    }
}

fn run_launch(
    config: &SwitcherConfig,
    store: &StateStore,
    command: Vec<std::ffi::OsString>,
    log_guards: LogGuards,
) -> Result<()> {
    let folder = launcher::working_folder(&config.launcher.working_dir_env)?;
    let plan = launcher::plan(store, &config.prompt_dirs(), &folder, command)?;

    debug!(
        program = %plan.program.to_string_lossy(),
        args = plan.args.len(),
        augmented = plan.is_augmented(),
        "Launching"
    );

    // exec and exit skip destructors, so flush file logs first
    drop(log_guards);
    let code = launcher::exec(&plan)?;
    std::process::exit(code);
}

fn show_persona(store: &StateStore, folder: &str, name_only: bool) {
    let resolution = store.resolve(folder);

    if name_only {
        println!("{}", resolution.persona);
        return;
    }

    let display = store
        .persona_info(&resolution.persona)
        .map(|p| p.display_name.as_str())
        .unwrap_or("unknown persona");

    println!("Folder:  {}", folder);
    println!("Persona: {} ({})", resolution.persona, display);
    println!("Source:  {}", resolution.source);
    if let Some(last_used) = &resolution.last_used {
        println!("Set at:  {}", last_used);
    }
    if resolution.source == PersonaSource::Default {
        println!("         no assignment and no project markers found");
    }
}

fn set_persona(store: &StateStore, folder: &str, persona: &str) -> Result<()> {
    let info = store.persona_info(persona);
    if info.is_none() {
        warn!(persona = %persona, "Persona is not in the registry; storing it anyway");
    }

    store.set_persona(folder, persona)?;

    let shown = info.map(|p| p.display_name.as_str()).unwrap_or(persona);
    println!("Switched to {} persona for {}", shown, folder);
    Ok(())
}

fn detect_persona(store: &StateStore, folder: &str, save: bool) -> Result<()> {
    if !save {
        println!("{}", detect::detect(Path::new(folder), BASE_PERSONA));
        return Ok(());
    }

    let detected = store.detect_and_save(folder)?;
    let shown = store
        .persona_info(&detected)
        .map(|p| p.display_name.clone())
        .unwrap_or_else(|| detected.clone());
    println!("Auto-detected: {}", shown);
    Ok(())
}

fn list_personas(store: &StateStore, folder: &str) {
    let current = store.get_persona(folder);

    for persona in store.list_personas() {
        let marker = if persona.name == current { "*" } else { " " };
        println!("{} {:<12} {}", marker, persona.name, persona.display_name);
    }
    if store.persona_info(&current).is_none() {
        println!("* {:<12} (unknown persona)", current);
    }
}

fn watch_persona(store: StateStore, folder: String) -> Result<()> {
    let mut extension = PersonaExtension::activate(store, TerminalHost::new(Some(folder)))?;

    while let Some(event) = extension.host_mut().next_event() {
        extension.handle(event)?;
        debug!(status = %extension.status().text, "Indicator refreshed");
    }
    Ok(())
}

fn handle_state_command(store: &StateStore, subcommand: StateSubcommand) -> Result<()> {
    match subcommand {
        StateSubcommand::Path => {
            println!("{}", store.path().display());
        }
        StateSubcommand::Show => {
            println!("{}", serde_json::to_string_pretty(&store.load())?);
        }
        StateSubcommand::Init => {
            if store.seed()? {
                println!("Created {}", store.path().display());
            } else {
                println!("State file already exists: {}", store.path().display());
            }
        }
    }
    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = SwitcherConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let created = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", created.display());
        }
        ConfigSubcommand::Validate => {
            SwitcherConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
