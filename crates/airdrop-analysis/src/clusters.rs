//! Connected-component clustering with deterministic, size-ranked ids.
//!
//! 1. Union every edge's endpoints (petgraph [`UnionFind`])
//! 2. Group nodes by their root into components
//! 3. Sort components by size, descending
//! 4. Break size ties by the smallest member address, ascending
//! 5. Assign `{label}_{rank}` with rank 1 for the largest component
//!
//! Ranking happens only after every component is known, so the result does
//! not depend on node insertion order or on union-find root choice.

use std::collections::HashMap;

use airdrop_data::types::{Address, ClusterAssignment};
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::label::ClusterLabel;
use crate::transfer_graph::AddressGraph;

/// One ranked cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    /// 1-based rank (1 = largest).
    pub rank: usize,
    /// `{label}_{rank}`.
    pub cluster_id: String,
    /// Member addresses, sorted ascending.
    pub members: Vec<Address>,
    /// Number of distinct edges inside the cluster.
    pub edge_count: usize,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Smallest member address; also the tie-break key.
    pub fn representative(&self) -> &Address {
        &self.members[0]
    }
}

/// Cluster size ranges used in the run summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeBucket {
    /// Single address (self-transfer only).
    One,
    Two,
    ThreeToFive,
    SixToTen,
    ElevenToFifty,
    OverFifty,
}

impl SizeBucket {
    pub const ALL: [SizeBucket; 6] = [
        SizeBucket::One,
        SizeBucket::Two,
        SizeBucket::ThreeToFive,
        SizeBucket::SixToTen,
        SizeBucket::ElevenToFifty,
        SizeBucket::OverFifty,
    ];

    pub fn of(size: usize) -> Self {
        match size {
            0 | 1 => SizeBucket::One,
            2 => SizeBucket::Two,
            3..=5 => SizeBucket::ThreeToFive,
            6..=10 => SizeBucket::SixToTen,
            11..=50 => SizeBucket::ElevenToFifty,
            _ => SizeBucket::OverFifty,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeBucket::One => "1",
            SizeBucket::Two => "2",
            SizeBucket::ThreeToFive => "3-5",
            SizeBucket::SixToTen => "6-10",
            SizeBucket::ElevenToFifty => "11-50",
            SizeBucket::OverFifty => "51+",
        }
    }
}

/// Aggregate statistics over the ranked clusters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusteringStats {
    pub address_count: usize,
    pub edge_count: usize,
    pub cluster_count: usize,
    pub largest_cluster: usize,
    /// Clusters holding a single address (self-transfers).
    pub singleton_clusters: usize,
    /// Cluster count per size bucket, in [`SizeBucket::ALL`] order; empty buckets included.
    pub size_histogram: Vec<(SizeBucket, usize)>,
}

/// Partition graph nodes into connected components.
///
/// Each component's addresses are sorted ascending. Component order is
/// unspecified; see [`rank_clusters`] for the deterministic order.
pub fn connected_components(graph: &AddressGraph) -> Vec<Vec<Address>> {
    let labels = component_labels(graph);
    members_by_root(graph, &labels).into_values().collect()
}

/// Union-find root for every node index.
fn component_labels(graph: &AddressGraph) -> Vec<usize> {
    let mut uf = UnionFind::<usize>::new(graph.node_count());
    for edge in graph.graph.edge_references() {
        uf.union(edge.source().index(), edge.target().index());
    }
    uf.into_labeling()
}

/// Group node addresses by union-find root; members sorted ascending.
fn members_by_root(graph: &AddressGraph, labels: &[usize]) -> HashMap<usize, Vec<Address>> {
    let mut groups: HashMap<usize, Vec<Address>> = HashMap::new();
    for (ix, root) in labels.iter().enumerate() {
        groups
            .entry(*root)
            .or_default()
            .push(graph.graph[NodeIndex::new(ix)].clone());
    }
    for members in groups.values_mut() {
        members.sort();
    }
    groups
}

/// Compute components and rank them.
///
/// Order: size descending, then smallest member address ascending.
pub fn rank_clusters(graph: &AddressGraph, label: &ClusterLabel) -> Vec<Cluster> {
    let labels = component_labels(graph);

    let mut edges_by_root: HashMap<usize, usize> = HashMap::new();
    for edge in graph.graph.edge_references() {
        *edges_by_root.entry(labels[edge.source().index()]).or_default() += 1;
    }

    let mut components: Vec<(Vec<Address>, usize)> = members_by_root(graph, &labels)
        .into_iter()
        .map(|(root, members)| {
            let edges = edges_by_root.get(&root).copied().unwrap_or(0);
            (members, edges)
        })
        .collect();

    // Components are disjoint, so (size, first member) is a total order.
    components.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));

    components
        .into_iter()
        .enumerate()
        .map(|(i, (members, edge_count))| Cluster {
            rank: i + 1,
            cluster_id: label.cluster_id(i + 1),
            members,
            edge_count,
        })
        .collect()
}

/// One assignment row per address, ordered by rank then address.
pub fn assignments(clusters: &[Cluster]) -> Vec<ClusterAssignment> {
    clusters
        .iter()
        .flat_map(|cluster| {
            cluster.members.iter().map(move |address| ClusterAssignment {
                address: address.clone(),
                cluster_id: cluster.cluster_id.clone(),
                rank: cluster.rank,
            })
        })
        .collect()
}

/// Summarize ranked clusters.
pub fn compute_stats(clusters: &[Cluster]) -> ClusteringStats {
    let mut histogram: HashMap<SizeBucket, usize> = HashMap::new();
    for cluster in clusters {
        *histogram.entry(SizeBucket::of(cluster.size())).or_default() += 1;
    }

    ClusteringStats {
        address_count: clusters.iter().map(Cluster::size).sum(),
        edge_count: clusters.iter().map(|c| c.edge_count).sum(),
        cluster_count: clusters.len(),
        largest_cluster: clusters.first().map(Cluster::size).unwrap_or(0),
        singleton_clusters: clusters.iter().filter(|c| c.size() == 1).count(),
        size_histogram: SizeBucket::ALL
            .iter()
            .map(|b| (*b, histogram.get(b).copied().unwrap_or(0)))
            .collect(),
    }
}
