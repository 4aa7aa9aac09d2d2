//! Input bundle for a simulation.

use crate::simulator::components::{
    links::Link,
    nodes::{Node, NodeId},
};
use petgraph::{
    graph::{Graph, IndexType},
    visit::EdgeRef,
    EdgeType,
};

/// Nodes and links handed to a simulation in one piece.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl GraphData {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    /// One unplaced node per graph node, identified by its index, and one link
    /// per edge. Weights are ignored.
    pub fn from_graph<N, E, Ty: EdgeType, Ix: IndexType>(graph: &Graph<N, E, Ty, Ix>) -> Self {
        let nodes = graph
            .node_indices()
            .map(|index| Node::new(NodeId::from(index.index())))
            .collect();
        let links = graph
            .edge_references()
            .map(|edge| Link::new(edge.source().index(), edge.target().index()))
            .collect();
        Self { nodes, links }
    }
}

impl<N, E, Ty: EdgeType, Ix: IndexType> From<&Graph<N, E, Ty, Ix>> for GraphData {
    fn from(graph: &Graph<N, E, Ty, Ix>) -> Self {
        Self::from_graph(graph)
    }
}

impl<N, E, Ty: EdgeType, Ix: IndexType> From<Graph<N, E, Ty, Ix>> for GraphData {
    fn from(graph: Graph<N, E, Ty, Ix>) -> Self {
        Self::from_graph(&graph)
    }
}
