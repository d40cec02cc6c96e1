//! airdrop-data crate
//!
//! Input loading (CSV, Parquet), output writing and SQLite persistence for
//! airdrop address clustering.

pub mod loader;
pub mod parquet_reader;
pub mod store;
pub mod types;
pub mod writer;

pub use types::{
    Address, ClusterAssignment, ExclusionList, LoadReport, RunRecord, TransferRecord,
    BURN_ADDRESS, ZERO_ADDRESS,
};
