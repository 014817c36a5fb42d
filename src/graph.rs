//! The experiment graph: nodes, edges, and streams as flat arenas.
//!
//! Nodes are addressed by [`NodeId`] — an index into the experiment's node
//! arena, with the experiment itself at index 0 — and edges pair a source
//! output connector with a sink input connector, each owning exactly one
//! [`DataStream`]. A `petgraph` mirror of the structure answers the
//! structural questions (zero-in-degree roots, reachability) without any
//! node-to-edge back-references.
//!
//! The depth-first edge traversal exists for deterministic *setup* ordering
//! only — descriptor propagation walks edges in this order so a descriptor
//! is always computed before it is consumed downstream. Steady-state
//! execution runs all nodes concurrently and never consults it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::error::{SweepError, SweepResult};
use crate::stream::{DataStream, InputConnector, OutputConnector};

/// Handle to a node in the experiment's arena.
///
/// The experiment (the measurement driver) is always [`EXPERIMENT_NODE`];
/// filter and sink nodes get consecutive ids as they are added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// The experiment node's well-known id.
pub const EXPERIMENT_NODE: NodeId = NodeId(0);

impl NodeId {
    /// Arena index of this node.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One requested connection, by node handle and connector name.
#[derive(Clone, Debug)]
pub struct EdgeDef {
    /// Node owning the output connector.
    pub source_node: NodeId,
    /// Output connector name on the source node.
    pub source_connector: String,
    /// Node owning the input connector.
    pub sink_node: NodeId,
    /// Input connector name on the sink node.
    pub sink_connector: String,
}

/// Shorthand for building an [`EdgeDef`].
pub fn edge(
    source_node: NodeId,
    source_connector: &str,
    sink_node: NodeId,
    sink_connector: &str,
) -> EdgeDef {
    EdgeDef {
        source_node,
        source_connector: source_connector.to_string(),
        sink_node,
        sink_connector: sink_connector.to_string(),
    }
}

/// A resolved edge: two connectors joined by their stream.
pub struct GraphEdge {
    pub(crate) source: NodeId,
    pub(crate) sink: NodeId,
    pub(crate) source_connector: Arc<OutputConnector>,
    pub(crate) sink_connector: Arc<InputConnector>,
    pub(crate) stream: Arc<DataStream>,
}

impl GraphEdge {
    /// Node the data flows from.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Node the data flows to.
    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// The producing connector.
    pub fn source_connector(&self) -> &Arc<OutputConnector> {
        &self.source_connector
    }

    /// The consuming connector.
    pub fn sink_connector(&self) -> &Arc<InputConnector> {
        &self.sink_connector
    }

    /// The stream carrying this edge's batches.
    pub fn stream(&self) -> &Arc<DataStream> {
        &self.stream
    }
}

/// Directed graph of nodes and their connecting streams, built once per
/// run configuration.
pub struct ExperimentGraph {
    edges: Vec<GraphEdge>,
    dag: DiGraph<NodeId, usize>,
}

impl ExperimentGraph {
    pub(crate) fn build(edges: Vec<GraphEdge>) -> Self {
        let mut dag = DiGraph::new();
        let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();
        for (i, e) in edges.iter().enumerate() {
            let a = *indices
                .entry(e.source)
                .or_insert_with(|| dag.add_node(e.source));
            let b = *indices.entry(e.sink).or_insert_with(|| dag.add_node(e.sink));
            dag.add_edge(a, b, i);
        }
        debug!(
            nodes = dag.node_count(),
            edges = edges.len(),
            "experiment graph built"
        );
        Self { edges, dag }
    }

    /// Number of distinct nodes touched by an edge.
    pub fn node_count(&self) -> usize {
        self.dag.node_count()
    }

    /// Number of edges (and therefore streams).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The resolved edges, in registration order.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Every stream in the graph, in edge registration order.
    pub fn streams(&self) -> Vec<Arc<DataStream>> {
        self.edges.iter().map(|e| e.stream.clone()).collect()
    }

    /// Edge indices in depth-first order from all zero-in-degree nodes,
    /// each edge visited exactly once.
    pub fn dfs_edges(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.edges.len());
        let mut seen: HashSet<usize> = HashSet::new();
        let roots: Vec<NodeIndex> = self.dag.externals(Direction::Incoming).collect();
        for root in roots {
            self.visit(root, &mut seen, &mut order);
        }
        order
    }

    fn visit(&self, node: NodeIndex, seen: &mut HashSet<usize>, order: &mut Vec<usize>) {
        // petgraph walks adjacency newest-first; restore insertion order.
        let mut outgoing: Vec<(usize, NodeIndex)> = self
            .dag
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        outgoing.reverse();
        for (edge_index, target) in outgoing {
            if seen.insert(edge_index) {
                order.push(edge_index);
                self.visit(target, seen, order);
            }
        }
    }

    /// Reset every stream for a new run.
    pub(crate) fn reset(&self) -> SweepResult<()> {
        for e in &self.edges {
            e.stream.reset()?;
        }
        Ok(())
    }

    /// Verify that every stream produced exactly the point count its
    /// descriptor declares. A mismatch is a data-integrity defect.
    pub fn integrity_check(&self) -> SweepResult<()> {
        for e in &self.edges {
            let produced = e.stream.points_taken();
            let declared = e.stream.num_points();
            if produced != declared {
                return Err(SweepError::ShapeMismatch {
                    stream: e.stream.name().to_string(),
                    produced,
                    declared,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_edge(source: usize, sink: usize, tag: &str) -> GraphEdge {
        GraphEdge {
            source: NodeId(source),
            sink: NodeId(sink),
            source_connector: Arc::new(OutputConnector::new(format!("{tag}_out"))),
            sink_connector: Arc::new(InputConnector::new(format!("{tag}_in"))),
            stream: Arc::new(DataStream::new(tag)),
        }
    }

    #[test]
    fn test_dfs_follows_chain_depth_first() {
        // 0 -> 1 -> 2, plus 0 -> 3. The chain is explored to its end
        // before the sibling edge.
        let graph = ExperimentGraph::build(vec![
            make_edge(0, 1, "e0"),
            make_edge(0, 3, "e1"),
            make_edge(1, 2, "e2"),
        ]);
        assert_eq!(graph.dfs_edges(), vec![0, 2, 1]);
    }

    #[test]
    fn test_dfs_visits_every_edge_once() {
        // Diamond: 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3.
        let graph = ExperimentGraph::build(vec![
            make_edge(0, 1, "a"),
            make_edge(0, 2, "b"),
            make_edge(1, 3, "c"),
            make_edge(2, 3, "d"),
        ]);
        let order = graph.dfs_edges();
        assert_eq!(order.len(), 4);
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[tokio::test]
    async fn test_integrity_check_flags_shortfall() {
        let graph = ExperimentGraph::build(vec![make_edge(0, 1, "e")]);
        let stream = &graph.edges()[0].stream;
        let mut d = crate::axis::DataStreamDescriptor::new();
        d.add_axis(crate::axis::SharedAxis::new(crate::axis::DataAxis::new(
            "t",
            vec![0.0, 1.0],
        )));
        stream.set_descriptor(d);
        stream.push(crate::stream::DataBatch::from(0.5)).await.unwrap();
        let err = graph.integrity_check().unwrap_err();
        assert!(matches!(err, SweepError::ShapeMismatch { produced: 1, declared: 2, .. }));
    }
}
