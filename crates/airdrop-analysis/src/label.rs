//! Run label used as the cluster id prefix (`{name}_{rank}`).

use std::fmt;
use std::str::FromStr;

use eyre::{eyre, Result};

/// Validated clustering-run label, e.g. `1inch_eth`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterLabel(String);

impl ClusterLabel {
    /// Validate a label.
    ///
    /// # Errors
    /// Returns error if the label is empty or contains whitespace, commas or
    /// quotes (any of which would corrupt the CSV output).
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(eyre!("cluster label must not be empty"));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, ',' | '"' | '\''))
        {
            return Err(eyre!("cluster label {name:?} contains invalid character {bad:?}"));
        }
        Ok(Self(name.to_string()))
    }

    /// Compose `{protocol_slug}_{chain_slug}`.
    ///
    /// # Errors
    /// Returns error if either slug is empty or the result is not a valid label.
    pub fn from_slugs(protocol: &str, chain: &str) -> Result<Self> {
        let (protocol, chain) = (protocol.trim(), chain.trim());
        if protocol.is_empty() || chain.is_empty() {
            return Err(eyre!("protocol and chain slugs must both be non-empty"));
        }
        Self::new(&format!("{}_{}", protocol, chain).to_ascii_lowercase())
    }

    /// Cluster id for a 1-based rank.
    pub fn cluster_id(&self, rank: usize) -> String {
        format!("{}_{}", self.0, rank)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ClusterLabel {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
