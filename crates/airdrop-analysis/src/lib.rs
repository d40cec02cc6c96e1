//! airdrop-analysis crate
//!
//! Entity resolution over airdrop transfers: edge filtering, undirected
//! address-graph construction, and connected-component clustering with
//! deterministic size-ranked cluster ids.

pub mod clusters;
pub mod edge_filter;
pub mod label;
pub mod pipeline;
pub mod transfer_graph;

pub use clusters::{Cluster, ClusteringStats, SizeBucket};
pub use edge_filter::{Edge, ExclusionPolicy, FilterStats, RejectReason};
pub use label::ClusterLabel;
pub use pipeline::{cluster_transfers, ClusteringOutcome};
pub use transfer_graph::AddressGraph;
