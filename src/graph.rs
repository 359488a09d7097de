use crate::CostModel;
use derive_more::{Display, From};
use pathfinding::prelude::dijkstra_all;
use std::{borrow::Cow, fmt::Display};

pub use petgraph::graph::{EdgeIndex, NodeIndex};

/// An undirected graph with vertex weights `V` and edge weights `E`.
pub type Graph<V, E> = petgraph::graph::UnGraph<V, E>;

/// An abstraction for a graph vertex that can be substituted, inserted or deleted.
pub trait Vertex {
    /// Returns this [Vertex]'s label.
    ///
    /// Two vertices with equal labels are assumed to be interchangeable, i.e. to have the same
    /// [distance][Vertex::distance] to every other vertex and the same
    /// [deletion cost][Vertex::deletion_cost].
    fn label(&self) -> Cow<'_, str>;

    /// Returns the cost of substituting this [Vertex] by `other`.
    ///
    /// Must be non-negative and symmetric.
    fn distance(&self, other: &Self, costs: &CostModel) -> f64;

    /// Returns the cost of deleting, or equivalently inserting, this [Vertex].
    fn deletion_cost(&self, costs: &CostModel) -> f64;
}

/// An abstraction for a graph edge that can be substituted, inserted or deleted.
pub trait Edge {
    /// Returns this [Edge]'s label, see [Vertex::label].
    fn label(&self) -> Cow<'_, str>;

    /// Returns the cost of substituting this [Edge] by `other`.
    ///
    /// Must be non-negative and symmetric.
    fn distance(&self, other: &Self, costs: &CostModel) -> f64;

    /// Returns the cost of deleting, or equivalently inserting, this [Edge].
    fn deletion_cost(&self, costs: &CostModel) -> f64;
}

impl<V: Vertex + ?Sized> Vertex for &V {
    fn label(&self) -> Cow<'_, str> {
        (**self).label()
    }

    fn distance(&self, other: &Self, costs: &CostModel) -> f64 {
        (**self).distance(*other, costs)
    }

    fn deletion_cost(&self, costs: &CostModel) -> f64 {
        (**self).deletion_cost(costs)
    }
}

impl<E: Edge + ?Sized> Edge for &E {
    fn label(&self) -> Cow<'_, str> {
        (**self).label()
    }

    fn distance(&self, other: &Self, costs: &CostModel) -> f64 {
        (**self).distance(*other, costs)
    }

    fn deletion_cost(&self, costs: &CostModel) -> f64 {
        (**self).deletion_cost(costs)
    }
}

/// A [Vertex] identified by a string label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From)]
pub struct LabeledVertex(pub String);

impl From<&str> for LabeledVertex {
    fn from(label: &str) -> Self {
        LabeledVertex(label.into())
    }
}

impl Vertex for LabeledVertex {
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }

    fn distance(&self, other: &Self, costs: &CostModel) -> f64 {
        if self.0 == other.0 {
            0.
        } else {
            costs.vertex_substitution
        }
    }

    fn deletion_cost(&self, costs: &CostModel) -> f64 {
        costs.vertex_insertion_deletion
    }
}

/// An unlabeled [Vertex], indistinguishable from any other.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderVertex;

impl Vertex for PlaceholderVertex {
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn distance(&self, _: &Self, _: &CostModel) -> f64 {
        0.
    }

    fn deletion_cost(&self, costs: &CostModel) -> f64 {
        costs.vertex_insertion_deletion
    }
}

/// A [Vertex] wrapping an arbitrary displayable value, labeled by its textual representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, From)]
pub struct Wrapped<T>(pub T);

impl<T: Display> Vertex for Wrapped<T> {
    fn label(&self) -> Cow<'_, str> {
        Cow::Owned(self.0.to_string())
    }

    fn distance(&self, other: &Self, costs: &CostModel) -> f64 {
        if self.label() == other.label() {
            0.
        } else {
            costs.vertex_substitution
        }
    }

    fn deletion_cost(&self, costs: &CostModel) -> f64 {
        costs.vertex_insertion_deletion
    }
}

/// An [Edge] identified by a string label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From)]
pub struct LabeledEdge(pub String);

impl From<&str> for LabeledEdge {
    fn from(label: &str) -> Self {
        LabeledEdge(label.into())
    }
}

impl Edge for LabeledEdge {
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }

    fn distance(&self, other: &Self, costs: &CostModel) -> f64 {
        if self.0 == other.0 {
            0.
        } else {
            costs.edge_substitution
        }
    }

    fn deletion_cost(&self, costs: &CostModel) -> f64 {
        costs.edge_insertion_deletion
    }
}

/// An unlabeled [Edge], indistinguishable from any other.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderEdge;

impl Edge for PlaceholderEdge {
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn distance(&self, _: &Self, _: &CostModel) -> f64 {
        0.
    }

    fn deletion_cost(&self, costs: &CostModel) -> f64 {
        costs.edge_insertion_deletion
    }
}

/// Builds a [Graph] from its vertices and edges, the latter given by the positions of their
/// endpoints in `vertices`.
///
/// # Panics
///
/// Panics if an edge refers to a vertex position out of bounds.
pub fn from_parts<V, E>(
    vertices: impl IntoIterator<Item = V>,
    edges: impl IntoIterator<Item = (usize, usize, E)>,
) -> Graph<V, E> {
    let mut graph = Graph::default();
    let nodes: Vec<_> = vertices.into_iter().map(|v| graph.add_node(v)).collect();
    for (a, b, e) in edges {
        graph.add_edge(nodes[a], nodes[b], e);
    }
    graph
}

/// Returns the endpoint of `edge` opposite to `vertex`.
pub(crate) fn opposite<V, E>(graph: &Graph<V, E>, edge: EdgeIndex, vertex: NodeIndex) -> NodeIndex {
    match graph.edge_endpoints(edge) {
        Some((a, b)) if a == vertex => b,
        Some((a, _)) => a,
        None => vertex,
    }
}

/// The largest number of edges on a shortest path from `vertex` to any vertex it can reach.
pub fn eccentricity<V, E>(graph: &Graph<V, E>, vertex: NodeIndex) -> usize {
    dijkstra_all(&vertex, |&v| graph.neighbors(v).map(|u| (u, 1usize)))
        .into_values()
        .map(|(_, d)| d)
        .max()
        .unwrap_or(0)
}

/// Prefixes the delimiters of lexicographic encodings with a backslash, so that distinct labels
/// never read alike once embedded in an encoding.
pub(crate) fn escape(label: &str) -> Cow<'_, str> {
    const DELIMITERS: [char; 8] = ['\\', '(', ')', '[', ']', ',', ':', ' '];
    if !label.contains(DELIMITERS) {
        return Cow::Borrowed(label);
    }

    let mut escaped = String::with_capacity(label.len() * 2);
    for c in label.chars() {
        if DELIMITERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    Cow::Owned(escaped)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use derive_more::{Deref, From};
    use proptest::{collection::vec, option, prelude::*};
    use test_strategy::proptest;

    pub(crate) type LabeledGraph = Graph<LabeledVertex, LabeledEdge>;

    /// A graph with one vertex per label and unlabeled edges.
    pub(crate) fn labeled(labels: &[&str], edges: &[(usize, usize)]) -> LabeledGraph {
        from_parts(
            labels.iter().map(|&l| l.into()),
            edges.iter().map(|&(a, b)| (a, b, "-".into())),
        )
    }

    /// A cycle through `n` vertices labeled `label`.
    pub(crate) fn ring(n: usize, label: &str) -> LabeledGraph {
        let labels = vec![label; n];
        let edges: Vec<_> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        labeled(&labels, &edges)
    }

    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, From)]
    pub struct Size(usize);

    impl Default for Size {
        fn default() -> Self {
            Size(4)
        }
    }

    fn graph(size: Size) -> impl Strategy<Value = MockGraph> {
        let label = || prop_oneof![Just("A"), Just("B"), Just("C")];
        let bond = || option::of(prop_oneof![Just("-"), Just("=")]);

        (0..=size.0)
            .prop_flat_map(move |n| (vec(label(), n), vec(bond(), n * n.saturating_sub(1) / 2)))
            .prop_map(|(labels, bonds)| {
                let n = labels.len();
                let pairs = (0..n).flat_map(|a| (a + 1..n).map(move |b| (a, b)));
                let edges = pairs
                    .zip(bonds)
                    .filter_map(|((a, b), bond)| Some((a, b, LabeledEdge::from(bond?))));

                MockGraph(from_parts(labels.into_iter().map(Into::into), edges))
            })
    }

    /// An arbitrary small labeled graph.
    #[derive(Debug, Clone, Deref)]
    pub(crate) struct MockGraph(LabeledGraph);

    impl Arbitrary for MockGraph {
        type Parameters = Size;
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(size: Size) -> Self::Strategy {
            graph(size).boxed()
        }
    }

    fn vertex() -> impl Strategy<Value = LabeledVertex> {
        prop_oneof![Just("A"), Just("B"), Just("AB")].prop_map(LabeledVertex::from)
    }

    #[proptest]
    fn distance_is_symmetric(
        #[strategy(vertex())] a: LabeledVertex,
        #[strategy(vertex())] b: LabeledVertex,
    ) {
        let costs = CostModel::default();
        assert_eq!(a.distance(&b, &costs), b.distance(&a, &costs));
    }

    #[proptest]
    fn distance_to_self_is_zero(#[strategy(vertex())] a: LabeledVertex) {
        assert_eq!(a.distance(&a, &CostModel::default()), 0.);
    }

    #[test]
    fn placeholders_are_indistinguishable() {
        let costs = CostModel::default();
        assert_eq!(PlaceholderVertex.distance(&PlaceholderVertex, &costs), 0.);
        assert_eq!(PlaceholderEdge.distance(&PlaceholderEdge, &costs), 0.);
        assert_eq!(PlaceholderVertex.deletion_cost(&costs), 1.);
        assert_eq!(PlaceholderEdge.deletion_cost(&costs), 1.);
    }

    #[test]
    fn wrapped_values_are_labeled_by_their_representation() {
        let costs = CostModel::default();
        assert_eq!(Wrapped(42).label(), "42");
        assert_eq!(Wrapped(42).distance(&Wrapped(42), &costs), 0.);
        assert_eq!(Wrapped(42).distance(&Wrapped(7), &costs), 1.);
    }

    #[test]
    fn delimiters_are_escaped() {
        assert_matches!(escape("C"), Cow::Borrowed("C"));
        assert_eq!(escape("A[(-)0]"), r"A\[\(-\)0\]");
        assert_eq!(escape(r"a\b, c:d"), r"a\\b\,\ c\:d");
    }

    #[test]
    fn eccentricity_of_ring_is_half_its_length() {
        let g = ring(6, "A");
        assert!(g.node_indices().all(|v| eccentricity(&g, v) == 3));
    }

    #[test]
    fn eccentricity_of_isolated_vertex_is_zero() {
        let g = labeled(&["A", "B"], &[]);
        assert_eq!(eccentricity(&g, NodeIndex::new(0)), 0);
    }

    #[proptest]
    fn eccentricity_is_bounded_by_vertex_count(g: MockGraph) {
        for v in g.node_indices() {
            assert!(eccentricity(&g, v) < g.node_count());
        }
    }

    #[proptest]
    fn opposite_endpoint_is_a_neighbor(g: MockGraph) {
        for e in g.edge_indices() {
            let (a, b) = g.edge_endpoints(e).unwrap();
            assert_eq!(opposite(&g, e, a), b);
            assert_eq!(opposite(&g, e, b), a);
        }
    }
}

#[cfg(test)]
pub(crate) use tests::{labeled, ring, MockGraph};
