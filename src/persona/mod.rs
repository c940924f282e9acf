//! Persona system: per-folder system-prompt profiles.
//!
//! A folder resolves to a persona by explicit assignment in the state file,
//! else by auto-detection from its file names, else by the state's default.

pub mod detect;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod types;

pub use registry::PersonaRegistry;
pub use resolver::PersonaSource;
pub use store::StateStore;
pub use types::{Persona, BASE_PERSONA};
