//! Shared test helpers and utilities.
//!
//! Provides factory functions for transfer records, exclusion policies and
//! on-disk fixtures with sensible defaults.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use airdrop_analysis::{ClusterLabel, ExclusionPolicy};
use airdrop_data::store::Store;
use airdrop_data::types::{Address, ExclusionList, TransferRecord};

/// Creates an in-memory SQLite Store with all migrations applied.
///
/// # Panics
/// Panics if the in-memory database cannot be created (should never happen).
pub fn test_store() -> Store {
    Store::new(":memory:").expect("in-memory store should always open")
}

/// Normalized address from a literal.
pub fn addr(s: &str) -> Address {
    Address::parse(s).expect("test address should be non-empty")
}

/// Creates a transfer record at block 18_000_000.
///
/// # Example
/// ```ignore
/// let r = transfer("0xa", "0xb", 10.0);
/// assert_eq!(r.block_number, Some(18_000_000));
/// ```
pub fn transfer(from: &str, to: &str, amount: f64) -> TransferRecord {
    TransferRecord {
        airdrop_recipient: addr(from),
        sent_to: addr(to),
        amount,
        block_number: Some(18_000_000),
    }
}

/// Policy excluding the given centralized addresses (burn/zero always excluded).
pub fn policy(centralized: &[&str]) -> ExclusionPolicy {
    let list: ExclusionList = centralized.iter().map(|s| addr(s)).collect();
    ExclusionPolicy::new(list)
}

pub fn label(name: &str) -> ClusterLabel {
    ClusterLabel::new(name).expect("test label should be valid")
}

/// Sample exclusion list in the shape of `centralized_addresses.csv`.
pub const SAMPLE_EXCLUSIONS_CSV: &str = "\
label,address
\"Binance, Hot Wallet 14\",0x28c6c06298d514db089934071355e5743bf21d60
Wormhole Bridge,0x3ee18b2214aff97000d974cf647e7c347e8fa585
";

/// Sample transfer export in the shape of the airdrop query result.
///
/// Two user clusters ({aaa1, aaa2, aaa3} and {bbb1, bbb2}), one transfer to a
/// CEX hot wallet linking them, one burn, one zero-value transfer and one
/// malformed row.
pub const SAMPLE_TRANSFERS_CSV: &str = "\
AIRDROP_RECIPIENT,SENT_TO,AMOUNT,BLOCK_NUMBER
0xAAA1,0xaaa2,150.5,18000001
0xaaa2,0xAAA3,20,18000002
0xaaa3,0xaaa1,1,18000003
0xbbb1,0xbbb2,1000,18000004
0xaaa1,0x28c6c06298d514db089934071355e5743bf21d60,10,18000005
0xbbb2,0x28C6C06298D514DB089934071355E5743BF21D60,10,18000006
0xccc1,0x000000000000000000000000000000000000dead,99,18000007
0xddd1,0xddd2,0,18000008
0xeee1,,5,18000009
";

/// Write `content` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("fixture should be writable");
    path
}
