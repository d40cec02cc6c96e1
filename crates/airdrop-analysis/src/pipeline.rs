//! End-to-end clustering of loaded transfer records.
//!
//! Filter → graph → ranked clusters → assignments. Pure and in-memory; the
//! caller owns loading and writing.

use airdrop_data::types::{ClusterAssignment, TransferRecord};
use tracing::{debug, info};

use crate::clusters::{assignments, compute_stats, rank_clusters, Cluster, ClusteringStats};
use crate::edge_filter::{filter_edges, ExclusionPolicy, FilterStats};
use crate::label::ClusterLabel;
use crate::transfer_graph::AddressGraph;

/// Everything produced by one clustering run.
#[derive(Clone, Debug)]
pub struct ClusteringOutcome {
    /// Per-reason filter counts.
    pub filter: FilterStats,
    /// Clusters in rank order.
    pub clusters: Vec<Cluster>,
    /// One row per clustered address, ordered by rank then address.
    pub assignments: Vec<ClusterAssignment>,
    pub stats: ClusteringStats,
}

/// Cluster transfer records into ranked address groups.
///
/// An input where every record is filtered out yields an empty outcome.
#[tracing::instrument(skip_all, fields(label = %label, records = records.len()))]
pub fn cluster_transfers(
    records: &[TransferRecord],
    policy: &ExclusionPolicy,
    label: &ClusterLabel,
) -> ClusteringOutcome {
    let (edges, filter) = filter_edges(records, policy);
    debug!(
        accepted = filter.accepted,
        non_positive_amount = filter.non_positive_amount,
        excluded_recipient = filter.excluded_recipient,
        excluded_sink = filter.excluded_sink,
        "edge filter complete"
    );

    let graph = AddressGraph::from_edges(&edges);
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "address graph built"
    );

    let clusters = rank_clusters(&graph, label);
    let assignments = assignments(&clusters);
    let stats = compute_stats(&clusters);

    info!(
        addresses = stats.address_count,
        clusters = stats.cluster_count,
        largest = stats.largest_cluster,
        "clustering complete"
    );

    ClusteringOutcome {
        filter,
        clusters,
        assignments,
        stats,
    }
}
