//! Undirected address graph built from accepted transfer edges.
//!
//! Nodes are addresses, edges are unordered address pairs. Multiplicity is
//! irrelevant to clustering, so repeated transfers between the same pair
//! collapse into a single edge. The resulting topology is independent of the
//! order in which edges are inserted; only node indices depend on it, and the
//! cluster assigner never exposes those.

use std::collections::{HashMap, HashSet};

use airdrop_data::types::Address;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::edge_filter::Edge;

/// Simple undirected graph over addresses.
#[derive(Debug, Default)]
pub struct AddressGraph {
    /// The underlying petgraph undirected graph.
    pub graph: UnGraph<Address, ()>,
    /// Lookup from address to node index.
    pub addr_to_ix: HashMap<Address, NodeIndex>,
    /// Normalized `(low, high)` index pairs already present.
    seen: HashSet<(NodeIndex, NodeIndex)>,
}

impl AddressGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from accepted edges.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = &'a Edge>,
    {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    /// Ensure both endpoints exist and connect them.
    ///
    /// Returns `false` when the edge was already present. A self-transfer
    /// adds a single self-loop so the address still materializes as a node.
    pub fn add_edge(&mut self, edge: &Edge) -> bool {
        let a = self.node(&edge.a);
        let b = self.node(&edge.b);
        let key = if a <= b { (a, b) } else { (b, a) };
        if !self.seen.insert(key) {
            return false;
        }
        self.graph.add_edge(a, b, ());
        true
    }

    fn node(&mut self, address: &Address) -> NodeIndex {
        if let Some(&ix) = self.addr_to_ix.get(address) {
            return ix;
        }
        let ix = self.graph.add_node(address.clone());
        self.addr_to_ix.insert(address.clone(), ix);
        ix
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addr_to_ix.contains_key(address)
    }

    /// Whether `{u, v}` is an edge of the graph.
    pub fn has_edge(&self, u: &Address, v: &Address) -> bool {
        match (self.addr_to_ix.get(u), self.addr_to_ix.get(v)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Sorted neighbours of `address` (empty if the address is not in the graph).
    pub fn neighbors(&self, address: &Address) -> Vec<&Address> {
        let Some(&ix) = self.addr_to_ix.get(address) else {
            return Vec::new();
        };
        let mut out: Vec<&Address> = self.graph.neighbors(ix).map(|n| &self.graph[n]).collect();
        out.sort();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn edge(u: &str, v: &str) -> Edge {
        Edge::new(addr(u), addr(v))
    }

    #[test]
    fn duplicate_edges_collapse() {
        let edges = vec![edge("0xa", "0xb"), edge("0xb", "0xa"), edge("0xa", "0xb")];
        let graph = AddressGraph::from_edges(&edges);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn add_edge_reports_novelty() {
        let mut graph = AddressGraph::new();
        assert!(graph.add_edge(&edge("0xa", "0xb")));
        assert!(!graph.add_edge(&edge("0xb", "0xa")));
        assert!(graph.add_edge(&edge("0xb", "0xc")));
    }

    #[test]
    fn self_loop_materializes_single_node() {
        let graph = AddressGraph::from_edges(&[edge("0xa", "0xa"), edge("0xa", "0xa")]);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains(&addr("0xa")));
    }

    #[test]
    fn no_edges_empty_graph() {
        let edges: Vec<Edge> = Vec::new();
        let graph = AddressGraph::from_edges(&edges);
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn topology_independent_of_insertion_order() {
        let forward = vec![edge("0xa", "0xb"), edge("0xb", "0xc"), edge("0xd", "0xe")];
        let mut reversed = forward.clone();
        reversed.reverse();

        let g1 = AddressGraph::from_edges(&forward);
        let g2 = AddressGraph::from_edges(&reversed);

        assert_eq!(g1.node_count(), g2.node_count());
        assert_eq!(g1.edge_count(), g2.edge_count());
        for e in &forward {
            assert!(g1.has_edge(&e.a, &e.b));
            assert!(g2.has_edge(&e.b, &e.a));
        }
        assert_eq!(g1.neighbors(&addr("0xb")), g2.neighbors(&addr("0xb")));
    }

    #[test]
    fn neighbors_of_unknown_address_is_empty() {
        let graph = AddressGraph::from_edges(&[edge("0xa", "0xb")]);
        assert!(graph.neighbors(&addr("0xz")).is_empty());
        assert!(!graph.has_edge(&addr("0xa"), &addr("0xz")));
    }
}
