//! Type definitions for airdrop transfer data and clustering output.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Burn sink: `0x…dead`. Always excluded as a transfer destination.
pub const BURN_ADDRESS: &str = "0x000000000000000000000000000000000000dead";

/// Zero address. Always excluded as a transfer destination.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Case-normalized address identifier (trimmed, lowercase hex text).
///
/// No checksum or length validation is performed; two addresses are equal
/// iff their normalized text is equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Normalize raw text into an address.
    ///
    /// Strips surrounding whitespace and double quotes, then lowercases.
    /// Returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the airdrop transfer query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Address that received the airdrop and moved it on.
    pub airdrop_recipient: Address,
    /// Destination of the onward transfer.
    pub sent_to: Address,
    /// Transferred amount (token units, as reported by the source query).
    pub amount: f64,
    /// Block the transfer landed in, when the source provided a parseable one.
    pub block_number: Option<u64>,
}

/// Set of centralized addresses (bridges, CEX hot wallets, …) loaded from disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionList {
    addresses: HashSet<Address>,
}

impl ExclusionList {
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }
}

impl FromIterator<Address> for ExclusionList {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Final address → cluster mapping row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// Clustered address.
    pub address: Address,
    /// `{name}_{rank}` label.
    pub cluster_id: String,
    /// 1-based rank of the cluster (1 = largest).
    #[serde(skip)]
    pub rank: usize,
}

/// Row counts produced while loading a transfer source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Data rows encountered (header and blank lines excluded).
    pub rows_read: usize,
    /// Rows dropped because an address or the amount was missing or unparseable.
    pub rows_skipped: usize,
}

impl LoadReport {
    pub fn rows_loaded(&self) -> usize {
        self.rows_read - self.rows_skipped
    }
}

/// Metadata for one persisted clustering run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunRecord {
    /// Row id assigned by the store (`None` before insertion).
    pub id: Option<i64>,
    /// Run label used as the cluster id prefix.
    pub name: String,
    /// RFC 3339 UTC timestamp of the run.
    pub clustered_at: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Transfer rows that passed the edge filter.
    pub edges_accepted: usize,
    pub address_count: usize,
    pub cluster_count: usize,
}
