use crate::{Edge, Error, Graph, GraphDistance, NodeIndex, Vertex};
use indexmap::IndexSet;
use itertools::Itertools;
use pathfinding::prelude::dfs_reach;
use tracing::debug;

/// A graph reduced to integers, as exchanged with an [ExactOracle].
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct EncodedGraph {
    /// The label id of every vertex, by rank.
    pub vertices: Box<[u32]>,

    /// The ranks of both endpoints and the label id of every edge.
    pub edges: Box<[[u32; 3]]>,
}

/// An abstraction for an external solver of the exact graph edit distance under unit costs.
pub trait ExactOracle {
    /// Returns the edit distance between `target` and `query`, searching with a beam of `width`
    /// and giving up on edit paths that cost more than `bound`.
    fn edit_distance(
        &self,
        target: &EncodedGraph,
        query: &EncodedGraph,
        width: usize,
        bound: u32,
    ) -> Result<u32, Error>;
}

impl<O: ExactOracle + ?Sized> ExactOracle for &O {
    fn edit_distance(
        &self,
        target: &EncodedGraph,
        query: &EncodedGraph,
        width: usize,
        bound: u32,
    ) -> Result<u32, Error> {
        (**self).edit_distance(target, query, width, bound)
    }
}

/// Label ids shared by both graphs of a comparison.
#[derive(Default)]
struct Labels {
    vertices: IndexSet<String>,
    edges: IndexSet<String>,
}

impl Labels {
    fn learn<V: Vertex, E: Edge>(&mut self, graph: &Graph<V, E>) {
        for v in graph.node_weights() {
            self.vertices.insert(v.label().into_owned());
        }

        for e in graph.edge_weights() {
            self.edges.insert(e.label().into_owned());
        }
    }

    fn id(set: &IndexSet<String>, label: &str) -> u32 {
        set.get_index_of(label).map_or(0, |i| i as u32)
    }

    /// Encodes `graph` with vertices ranked in depth-first order, starting every traversal from
    /// the unranked vertex of least degree.
    fn encode<V: Vertex, E: Edge>(&self, graph: &Graph<V, E>) -> EncodedGraph {
        let by_degree = graph
            .node_indices()
            .sorted_by_key(|&v| graph.neighbors(v).count());

        let mut rank: Vec<Option<u32>> = vec![None; graph.node_count()];
        let mut order: Vec<NodeIndex> = Vec::with_capacity(graph.node_count());
        for v in by_degree {
            if rank[v.index()].is_none() {
                for u in dfs_reach(v, |&u| graph.neighbors(u)) {
                    rank[u.index()] = Some(order.len() as u32);
                    order.push(u);
                }
            }
        }

        let vertices = order
            .iter()
            .map(|&v| Self::id(&self.vertices, &graph[v].label()))
            .collect();

        let edges = graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = graph.edge_endpoints(e)?;
                let label = Self::id(&self.edges, &graph[e].label());
                Some([rank[a.index()]?, rank[b.index()]?, label])
            })
            .collect();

        EncodedGraph { vertices, edges }
    }
}

/// The exact graph edit distance as computed by an [ExactOracle].
///
/// Labels are collapsed to integer ids shared by both graphs, assigned to the labels of the
/// second graph first, and the second graph is passed to the oracle as the target.
#[derive(Debug, Default, Clone)]
pub struct OracleDistance<O> {
    oracle: O,
    width: usize,
}

impl<O: ExactOracle> OracleDistance<O> {
    pub fn new(oracle: O, width: usize) -> Self {
        OracleDistance { oracle, width }
    }

    /// Encodes both graphs in the format an [ExactOracle] expects, target first.
    pub fn encode<V: Vertex, E: Edge>(
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> (EncodedGraph, EncodedGraph) {
        let mut labels = Labels::default();
        labels.learn(g2);
        labels.learn(g1);
        (labels.encode(g2), labels.encode(g1))
    }

    /// The edit distance between `g1` and `g2`, or `bound` if it exceeds `bound`.
    ///
    /// The bound is clamped to the cost of deleting and inserting every element, which the edit
    /// distance never exceeds.
    pub fn bounded_distance<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
        bound: u32,
    ) -> Result<u32, Error> {
        let trivial = g1.node_count().max(g2.node_count()) + g1.edge_count() + g2.edge_count();
        let bound = bound.min(u32::try_from(trivial).unwrap_or(u32::MAX));

        let (target, query) = Self::encode(g1, g2);
        self.oracle.edit_distance(&target, &query, self.width, bound)
    }
}

impl<V: Vertex, E: Edge, O: ExactOracle> GraphDistance<V, E> for OracleDistance<O> {
    fn id(&self) -> String {
        format!("BSSExactGED_{}", self.width)
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        let cost = self.bounded_distance(g1, g2, u32::MAX)?;
        debug!(id = %GraphDistance::<V, E>::id(self), cost);
        Ok(cost.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_parts, labeled, CostModel, ExactGraphEditDistance, LabeledEdge};
    use crate::{LabeledVertex, MockGraph};
    use assert_matches::assert_matches;
    use std::sync::Mutex;
    use test_strategy::proptest;

    /// Solves by brute force after decoding the graphs.
    struct Decoding;

    fn decode(g: &EncodedGraph) -> Graph<LabeledVertex, LabeledEdge> {
        from_parts(
            g.vertices.iter().map(|l| LabeledVertex(l.to_string())),
            g.edges
                .iter()
                .map(|&[a, b, l]| (a as usize, b as usize, LabeledEdge(l.to_string()))),
        )
    }

    impl ExactOracle for Decoding {
        fn edit_distance(
            &self,
            target: &EncodedGraph,
            query: &EncodedGraph,
            _: usize,
            bound: u32,
        ) -> Result<u32, Error> {
            let exact = ExactGraphEditDistance::new(CostModel::default());
            let cost = exact.compute_graph_distance(&decode(target), &decode(query))?;
            Ok((cost as u32).min(bound))
        }
    }

    /// Records its arguments and fails.
    #[derive(Default)]
    struct Recording(Mutex<Vec<(EncodedGraph, EncodedGraph, usize, u32)>>);

    impl ExactOracle for Recording {
        fn edit_distance(
            &self,
            target: &EncodedGraph,
            query: &EncodedGraph,
            width: usize,
            bound: u32,
        ) -> Result<u32, Error> {
            let mut calls = self.0.lock().unwrap();
            calls.push((target.clone(), query.clone(), width, bound));
            Err(Error::Oracle("unavailable".into()))
        }
    }

    #[test]
    fn labels_of_the_target_are_numbered_first() {
        let g1 = labeled(&["C", "A"], &[(0, 1)]);
        let g2 = labeled(&["A", "B"], &[]);
        let (target, query) = OracleDistance::<Decoding>::encode(&g1, &g2);

        assert_eq!(&*target.vertices, &[0, 1]);
        assert!(target.edges.is_empty());
        assert_eq!(query.vertices.iter().sorted().collect_vec(), [&0, &2]);
        assert_eq!(query.edges.len(), 1);
    }

    #[test]
    fn vertices_are_ranked_from_the_least_connected() {
        let star = labeled(&["hub", "a", "a", "a"], &[(0, 1), (0, 2), (0, 3)]);
        let (encoded, _) = OracleDistance::<Decoding>::encode(&labeled(&[], &[]), &star);

        // a leaf, then the hub, then the remaining leaves
        assert_eq!(&*encoded.vertices, &[1, 0, 1, 1]);
        assert!(encoded.edges.iter().all(|&[a, b, _]| a == 1 || b == 1));
    }

    #[test]
    fn bound_is_clamped_to_the_trivial_edit_path() {
        let oracle = Recording::default();
        let distance = OracleDistance::new(&oracle, 50);
        let g1 = labeled(&["A", "B", "C"], &[(0, 1), (1, 2)]);
        let g2 = labeled(&["A"], &[]);

        assert_matches!(distance.bounded_distance(&g1, &g2, 100), Err(Error::Oracle(_)));
        assert_matches!(distance.bounded_distance(&g1, &g2, 2), Err(Error::Oracle(_)));

        let calls = oracle.0.lock().unwrap();
        assert_eq!(calls[0].2, 50);
        assert_eq!(calls[0].3, 5);
        assert_eq!(calls[1].3, 2);
    }

    #[test]
    fn oracle_failures_are_reported() {
        let distance = OracleDistance::new(Recording::default(), 1);
        let g = labeled(&["A"], &[]);
        assert_eq!(
            distance.compute_graph_distance(&g, &g),
            Err(Error::Oracle("unavailable".into()))
        );
    }

    #[test]
    fn id_names_the_width() {
        let distance = OracleDistance::new(Decoding, 50);
        assert_eq!(
            GraphDistance::<LabeledVertex, LabeledEdge>::id(&distance),
            "BSSExactGED_50"
        );
    }

    #[proptest]
    fn encoding_preserves_the_edit_distance(a: MockGraph, b: MockGraph) {
        let exact = ExactGraphEditDistance::new(CostModel::default());
        let oracle = OracleDistance::new(Decoding, 50);
        assert_eq!(
            oracle.compute_graph_distance(&a, &b),
            exact.compute_graph_distance(&a, &b)
        );
    }
}
