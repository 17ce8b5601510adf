//! First-match-wins resolution of `IdentityFile` for a hostname.

use tracing::debug;

use crate::document::{Document, Entry, IDENTITY_FILE};

/// Where a host's identity file comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Position of the supplying block among the document's host blocks
    pub block: usize,
    pub patterns: Vec<String>,
    pub identity_file: String,
}

impl Document {
    /// The identity file ssh would use for `hostname`, if any block sets one.
    ///
    /// Blocks are scanned in file order; the first matching block that defines
    /// `IdentityFile` wins, as in the ssh client.
    pub fn active_identity_file(&self, hostname: &str) -> Option<String> {
        self.resolve_identity(hostname).map(|r| r.identity_file)
    }

    /// Like [`Document::active_identity_file`], but also reports the block that supplied it
    pub fn resolve_identity(&self, hostname: &str) -> Option<Resolution> {
        let resolution = self
            .host_blocks()
            .enumerate()
            .filter(|(_, block)| block.matches(hostname))
            .find_map(|(index, block)| {
                block.directive_value(IDENTITY_FILE).map(|value| Resolution {
                    block: index,
                    patterns: block.patterns().into_iter().map(String::from).collect(),
                    identity_file: value.to_string(),
                })
            });
        debug!(hostname, ?resolution, "resolved identity file");
        resolution
    }

    /// Whether a host block before entry `index` already supplies an identity for `hostname`
    pub(crate) fn identity_shadowed_before(&self, index: usize, hostname: &str) -> bool {
        self.entries[..index].iter().any(|entry| match entry {
            Entry::Host(block) => {
                block.matches(hostname) && block.directive(IDENTITY_FILE).is_some()
            }
            Entry::Opaque(_) => false,
        })
    }
}
