//! Switching the identity file used for a host.

use tracing::debug;

use crate::document::{BodyLine, Document, Entry, HostBlock, IDENTITY_FILE};
use crate::error::{ConfigError, Result};

/// What [`Document::activate_key`] did to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A new `Host <hostname>` block was inserted before the first host block
    Inserted,
    /// The host's dedicated block was edited
    Updated { previous: Option<String> },
    /// The dedicated block already pointed at this key
    Unchanged,
}

impl Activation {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl Document {
    /// Make `key_path` the identity file ssh uses for `hostname`.
    ///
    /// Edits the first block whose header is exactly `Host <hostname>`. When
    /// there is none, or an earlier block already supplies an identity for the
    /// host, a new dedicated block goes in front of every existing `Host` block
    /// so that it wins first-match resolution. Nothing else is touched.
    pub fn activate_key(&mut self, hostname: &str, key_path: &str) -> Result<Activation> {
        validate_hostname(hostname)?;
        validate_key_path(key_path)?;

        let value = quote_if_needed(key_path);
        let eol = self.eol;

        let dedicated = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Host(block) if block.is_dedicated_to(hostname)));

        if let Some(index) = dedicated {
            if self.identity_shadowed_before(index, hostname) {
                debug!(hostname, index, "dedicated block is shadowed by an earlier block");
            } else if let Some(Entry::Host(block)) = self.entries.get_mut(index) {
                let previous = block.directive_value(IDENTITY_FILE).map(String::from);
                if !block.set_directive(IDENTITY_FILE, &value, eol) {
                    return Ok(Activation::Unchanged);
                }
                debug!(hostname, index, ?previous, "updated dedicated block");
                return Ok(Activation::Updated { previous });
            }
        }

        let at = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Host(_)))
            .unwrap_or(self.entries.len());

        let mut block = HostBlock::dedicated(hostname, IDENTITY_FILE, &value, eol);
        if self.entries[..at].last().is_some_and(|e| !e.ends_with_newline()) {
            block.leading.push(eol.as_str().as_bytes().to_vec());
        }
        if at < self.entries.len() {
            block.body.push(BodyLine::Text(eol.as_str().as_bytes().to_vec()));
        }
        self.entries.insert(at, Entry::Host(block));
        debug!(hostname, at, "inserted dedicated block");

        Ok(Activation::Inserted)
    }
}

/// Hostnames must be a single literal host pattern
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(ConfigError::Validation("Hostname cannot be empty".to_string()));
    }
    if hostname
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '*' | '?' | '!' | '#' | '"' | '='))
    {
        return Err(ConfigError::Validation(format!(
            "Invalid hostname '{}'.\n\n Hostnames cannot contain whitespace, quotes, '=', '#', or wildcard characters (*, ?, !).",
            hostname
        )));
    }
    Ok(())
}

pub fn validate_key_path(key_path: &str) -> Result<()> {
    if key_path.trim().is_empty() {
        return Err(ConfigError::Validation("Key path cannot be empty".to_string()));
    }
    if key_path.chars().any(|c| c.is_control() || c == '"') {
        return Err(ConfigError::Validation(format!(
            "Invalid key path {:?}: control characters and double quotes are not allowed",
            key_path
        )));
    }
    Ok(())
}

fn quote_if_needed(key_path: &str) -> String {
    if key_path.chars().any(char::is_whitespace) {
        format!("\"{}\"", key_path)
    } else {
        key_path.to_string()
    }
}
