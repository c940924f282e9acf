//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for persona-switcher.

use std::ffi::OsString;

use clap::{Parser, Subcommand};

/// Persona Switcher - per-folder system-prompt personas for an AI coding assistant
///
/// Resolves which persona applies to a project folder (explicit assignment,
/// auto-detection, or default) and launches the assistant with that
/// persona's prompt appended.
#[derive(Parser, Debug)]
#[command(name = "persona-switcher")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "PERSONA_SWITCHER_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a program with the folder's persona prompt injected
    Launch {
        /// Program followed by its arguments, passed through untouched
        #[arg(
            value_name = "PROGRAM",
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<OsString>,
    },

    /// Show the effective persona for a folder
    Show {
        /// Folder to resolve (defaults to the working folder)
        #[arg(short, long)]
        folder: Option<String>,

        /// Print only the persona name
        #[arg(long)]
        name_only: bool,
    },

    /// Assign a persona to a folder
    Set {
        /// Persona name (e.g. tars, red-queen, stem)
        persona: String,

        /// Folder to assign (defaults to the working folder)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Auto-detect the persona for a folder
    Detect {
        /// Folder to classify (defaults to the working folder)
        #[arg(short, long)]
        folder: Option<String>,

        /// Persist the detected persona as the folder's assignment
        #[arg(short, long)]
        save: bool,
    },

    /// List known personas
    List {
        /// Folder whose current persona is marked (defaults to the working folder)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Pick a persona for a folder interactively
    Switch {
        /// Folder to assign (defaults to the working folder)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Print the folder's persona and update it when the state file changes
    Watch {
        /// Folder to follow (defaults to the working folder)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Persona state file management
    State {
        #[command(subcommand)]
        subcommand: StateSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

/// State file subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StateSubcommand {
    /// Print the state file path
    Path,

    /// Print the loaded state as JSON
    Show,

    /// Create the state file if it does not exist
    Init,
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}
