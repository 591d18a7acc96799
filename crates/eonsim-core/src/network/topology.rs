//! The weighted directed topology and its adjacency-matrix text codec.

use std::fmt::Write as _;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use crate::units::Cost;

identifier!(Vertex, usize);

impl Vertex {
    /// Sentinel for an unbound endpoint; asks the router to pick one.
    pub const NULL: Vertex = Vertex::new(usize::MAX);

    /// Whether this is the unbound sentinel.
    pub const fn is_null(self) -> bool {
        self.0 == usize::MAX
    }
}

/// A weighted directed link between two vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: Vertex,
    pub destination: Vertex,
    pub cost: Cost,
}

impl Edge {
    pub const fn new(source: Vertex, destination: Vertex, cost: Cost) -> Self {
        Self {
            source,
            destination,
            cost,
        }
    }
}

/// An immutable weighted directed graph with adjacency lookup.
///
/// Storage is directed; topologies are expected (but not required) to be
/// supplied symmetric.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: DiGraph<Vertex, Cost>,
    id2idx: FxHashMap<Vertex, NodeIndex>,
}

impl Topology {
    /// Creates a topology over vertices `0..nr_vertices` from an edge list.
    ///
    /// Correctness properties:
    ///
    /// - Every edge endpoint must be a declared vertex.
    /// - Edge costs must be positive and finite (zero means "no edge" in the
    ///   matrix encoding and cannot appear as a stored cost).
    pub fn new(nr_vertices: usize, edges: &[Edge]) -> Result<Self, TopologyError> {
        let mut graph = DiGraph::new();
        let mut id2idx = FxHashMap::default();
        for v in 0..nr_vertices {
            let vertex = Vertex::new(v);
            let idx = graph.add_node(vertex);
            id2idx.insert(vertex, idx);
        }
        for &Edge {
            source,
            destination,
            cost,
        } in edges
        {
            // CORRECTNESS: Every edge endpoint must be a declared vertex.
            let &src = id2idx
                .get(&source)
                .ok_or(TopologyError::UndeclaredVertex(source))?;
            let &dst = id2idx
                .get(&destination)
                .ok_or(TopologyError::UndeclaredVertex(destination))?;
            // CORRECTNESS: Edge costs must be positive and finite.
            if !(cost.into_f64() > 0.0) || !cost.is_finite() {
                return Err(TopologyError::InvalidCost {
                    edge_source: source,
                    destination,
                });
            }
            graph.add_edge(src, dst, cost);
        }
        Ok(Self { graph, id2idx })
    }

    /// Parses the plain-text adjacency matrix format: the first line holds
    /// the vertex count `N`, followed by `N` rows of `N` space-separated
    /// weights where zero means "no edge".
    pub fn from_adjacency_matrix(text: &str) -> Result<Self, TopologyError> {
        let mut lines = text.lines();
        let header = lines.next().ok_or(TopologyError::MissingHeader)?;
        let size: usize = header
            .trim()
            .parse()
            .map_err(|_| TopologyError::MissingHeader)?;
        let mut edges = Vec::new();
        let mut nr_rows = 0;
        for (row, line) in lines.enumerate().take(size) {
            nr_rows += 1;
            let weights = line.split_whitespace().collect::<Vec<_>>();
            if weights.len() != size {
                return Err(TopologyError::RowWidth {
                    row,
                    expected: size,
                    found: weights.len(),
                });
            }
            for (column, weight) in weights.into_iter().enumerate() {
                let cost: f64 = weight
                    .parse()
                    .map_err(|_| TopologyError::UnparseableWeight { row, column })?;
                if cost < 0.0 {
                    return Err(TopologyError::UnparseableWeight { row, column });
                }
                if cost != 0.0 {
                    edges.push(Edge::new(
                        Vertex::new(row),
                        Vertex::new(column),
                        Cost::new(cost),
                    ));
                }
            }
        }
        if nr_rows != size {
            return Err(TopologyError::RowCount {
                expected: size,
                found: nr_rows,
            });
        }
        Self::new(size, &edges)
    }

    /// Renders the topology back into the adjacency-matrix text format.
    /// Round-trips with [`from_adjacency_matrix`](Self::from_adjacency_matrix)
    /// modulo absent edges, which serialize as zero.
    pub fn to_adjacency_matrix(&self) -> String {
        let size = self.size();
        let mut out = String::new();
        let _ = writeln!(out, "{size}");
        for row in 0..size {
            let source = Vertex::new(row);
            let line = (0..size)
                .map(|column| self.cost(source, Vertex::new(column)).into_f64().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "{line}");
        }
        out
    }

    /// The number of vertices.
    pub fn size(&self) -> usize {
        self.graph.node_count()
    }

    /// All vertices, in identifier order.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.graph.node_weights().copied()
    }

    /// All directed edges.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_indices().map(move |eidx| {
            let (src, dst) = self.graph.edge_endpoints(eidx).expect("edge index is valid");
            Edge::new(self.graph[src], self.graph[dst], self.graph[eidx])
        })
    }

    /// The adjacency list of `vertex`: each outgoing neighbor with its cost.
    pub fn at(&self, vertex: Vertex) -> impl Iterator<Item = (Vertex, Cost)> + '_ {
        self.id2idx
            .get(&vertex)
            .into_iter()
            .flat_map(move |&idx| self.graph.edges(idx))
            .map(move |edge| (self.graph[edge.target()], *edge.weight()))
    }

    /// The cost of the edge `source → destination`, or zero when absent.
    pub fn cost(&self, source: Vertex, destination: Vertex) -> Cost {
        self.at(source)
            .find(|&(vertex, _)| vertex == destination)
            .map(|(_, cost)| cost)
            .unwrap_or(Cost::ZERO)
    }

    /// Whether the directed edge `source → destination` exists.
    pub fn is_adjacent(&self, source: Vertex, destination: Vertex) -> bool {
        self.at(source).any(|(vertex, _)| vertex == destination)
    }
}

/// Topology construction error.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// The matrix text is empty or its first line is not a vertex count.
    #[error("adjacency matrix is missing its vertex-count header")]
    MissingHeader,

    /// The matrix has fewer rows than the header declares.
    #[error("adjacency matrix declares {expected} rows but holds {found}")]
    RowCount {
        /// Rows declared by the header.
        expected: usize,
        /// Rows actually present.
        found: usize,
    },

    /// A matrix row has the wrong number of columns.
    #[error("row {row} holds {found} weights, expected {expected}")]
    RowWidth {
        /// The offending row.
        row: usize,
        /// Columns declared by the header.
        expected: usize,
        /// Columns actually present.
        found: usize,
    },

    /// A matrix entry is not a non-negative number.
    #[error("weight at row {row}, column {column} is not a non-negative number")]
    UnparseableWeight {
        /// The offending row.
        row: usize,
        /// The offending column.
        column: usize,
    },

    /// An edge references a vertex outside the vertex set.
    #[error("edge references undeclared vertex {0}")]
    UndeclaredVertex(Vertex),

    /// An edge carries a non-positive or non-finite cost.
    #[error("edge {edge_source} → {destination} has an invalid cost")]
    InvalidCost {
        /// The edge source.
        edge_source: Vertex,
        /// The edge destination.
        destination: Vertex,
    },
}
