//! Solution graph built with petgraph
//!
//! Holds the accepted, non-absent records with one edge per dependency from
//! the dependent to the record it depends on. Provides deterministic cycle
//! detection and the dependencies-first install order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use pod_core::error::PodError;
use pod_core::types::{CandidateRecord, PackageId};

use crate::ResolverResult;

/// Dependency graph over the records of one solution
#[derive(Debug)]
pub struct SolutionGraph<'g> {
    /// Edges point from dependent to dependency
    graph: DiGraph<&'g CandidateRecord, ()>,
    /// Map from package id to node for edge construction
    node_map: HashMap<&'g PackageId, NodeIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnPath,
    Done,
}

impl<'g> SolutionGraph<'g> {
    /// Build the graph from a solution; absent records are left out
    pub fn new(records: impl IntoIterator<Item = &'g CandidateRecord>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for record in records.into_iter().filter(|r| !r.is_absent()) {
            node_map
                .entry(record.id())
                .or_insert_with(|| graph.add_node(record));
        }

        let nodes: Vec<NodeIndex> = graph.node_indices().collect();
        for from in nodes {
            let record: &'g CandidateRecord = graph[from];
            for dependency in record.dependencies() {
                if let Some(&to) = node_map.get(&dependency.id) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, node_map }
    }

    /// Get number of packages in the graph
    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of dependency edges in the graph
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the record chosen for an id
    pub fn get(&self, id: &PackageId) -> Option<&'g CandidateRecord> {
        self.node_map.get(id).map(|&index| self.graph[index])
    }

    /// Nodes sorted by package id
    fn sorted(&self, nodes: impl Iterator<Item = NodeIndex>) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = nodes.collect();
        nodes.sort_by(|a, b| self.graph[*a].id().cmp(self.graph[*b].id()));
        nodes
    }

    /// Find the first dependency cycle, walking packages in id order
    ///
    /// The returned path is closed: its last element repeats the first.
    pub fn find_first_cycle(&self) -> Option<Vec<&'g CandidateRecord>> {
        let mut state = vec![Visit::New; self.graph.node_count()];

        for root in self.sorted(self.graph.node_indices()) {
            if state[root.index()] != Visit::New {
                continue;
            }

            // (node, its dependencies, next dependency to visit)
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            state[root.index()] = Visit::OnPath;
            stack.push((root, self.sorted(self.graph.neighbors(root)), 0));

            while let Some((node, children, next)) = stack.last_mut() {
                let Some(&child) = children.get(*next) else {
                    state[node.index()] = Visit::Done;
                    stack.pop();
                    continue;
                };
                *next += 1;

                match state[child.index()] {
                    Visit::Done => {},
                    Visit::OnPath => {
                        let start = stack.iter().position(|(n, _, _)| *n == child).unwrap_or(0);
                        let mut cycle: Vec<&'g CandidateRecord> =
                            stack[start..].iter().map(|(n, _, _)| self.graph[*n]).collect();
                        cycle.push(self.graph[child]);
                        return Some(cycle);
                    },
                    Visit::New => {
                        state[child.index()] = Visit::OnPath;
                        let grandchildren = self.sorted(self.graph.neighbors(child));
                        stack.push((child, grandchildren, 0));
                    },
                }
            }
        }

        None
    }

    /// Format cycle as "A 1.0.0 => B 1.0.0 => A 1.0.0"
    pub fn format_cycle(cycle: &[&CandidateRecord]) -> String {
        cycle
            .iter()
            .map(|record| record.to_string())
            .collect::<Vec<_>>()
            .join(" => ")
    }

    /// Check for cycles and return a `CircularDependency` error if found
    pub fn validate_no_cycles(&self) -> ResolverResult<()> {
        match self.find_first_cycle() {
            Some(cycle) => Err(PodError::CircularDependency {
                cycle: Self::format_cycle(&cycle),
            }),
            None => Ok(()),
        }
    }

    /// Order the records so every one follows everything it depends on
    ///
    /// Among the records whose dependencies are all emitted, the smallest id
    /// always goes next.
    pub fn dependencies_first(&self) -> ResolverResult<Vec<&'g CandidateRecord>> {
        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Outgoing).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<(&'g PackageId, NodeIndex)>> = self
            .graph
            .node_indices()
            .filter(|n| pending[n.index()] == 0)
            .map(|n| Reverse((self.graph[n].id(), n)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, node))) = ready.pop() {
            order.push(self.graph[node]);
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                let remaining = &mut pending[dependent.index()];
                *remaining -= 1;
                if *remaining == 0 {
                    ready.push(Reverse((self.graph[dependent].id(), dependent)));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            self.validate_no_cycles()?;
            return Err(PodError::CircularDependency {
                cycle: "unresolved packages remain after ordering".to_string(),
            });
        }

        Ok(order)
    }
}
