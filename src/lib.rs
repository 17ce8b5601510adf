pub mod activate;
pub mod commands;
pub mod config_file;
pub mod doctor;
pub mod document;
pub mod error;
pub mod keys;
pub mod parser;
pub mod paths;
pub mod pattern;
pub mod resolve;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

pub use activate::Activation;
pub use config_file::{ConfigFile, SaveOutcome, parse_config};
pub use document::{Directive, Document, Entry, HostBlock};
pub use error::ConfigError;
pub use keys::{expand_path, key_exists};
pub use parser::parse;
pub use resolve::Resolution;
