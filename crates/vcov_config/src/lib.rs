//! Parsing and validation of `vcov.toml` configuration files.
//!
//! The configuration selects which coverage metrics are scored, bounds the
//! expression depth the synthesizer instruments, and names the output
//! directory. Every section is optional.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
