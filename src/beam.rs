use crate::graph::opposite;
use crate::{CostModel, Edge, Error, Graph, GraphDistance, NodeIndex, Vertex};
use petgraph::visit::EdgeRef;
use std::{collections::BTreeMap, time::Duration, time::Instant};
use tracing::{debug, trace, warn};

/// How a vertex is resolved in a partial edit path.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
enum Match {
    /// Not yet processed.
    Pending,
    /// Deleted from the source graph, or inserted into the target graph.
    Removed,
    /// Substituted by, or substituting, this vertex of the other graph.
    With(NodeIndex),
}

/// A partial edit path, that resolves a prefix of the source vertices.
#[derive(Debug, Clone)]
struct TreeNode {
    forward: Box<[Match]>,
    inverse: Box<[Match]>,
    cost: f64,
    unused1: Vec<NodeIndex>,
    unused2: Vec<NodeIndex>,
}

impl TreeNode {
    fn is_complete(&self) -> bool {
        self.unused1.is_empty() && self.unused2.is_empty()
    }
}

/// Costs partial edit paths between two graphs.
struct Expansion<'g, V, E> {
    g1: &'g Graph<V, E>,
    g2: &'g Graph<V, E>,
    costs: &'g CostModel,
}

impl<'g, V: Vertex, E: Edge> Expansion<'g, V, E> {
    fn root(&self) -> TreeNode {
        TreeNode {
            forward: vec![Match::Pending; self.g1.node_count()].into(),
            inverse: vec![Match::Pending; self.g2.node_count()].into(),
            cost: 0.,
            unused1: self.g1.node_indices().collect(),
            unused2: self.g2.node_indices().collect(),
        }
    }

    /// The cost of deleting every element of both graphs.
    fn trivial_bound(&self) -> f64 {
        let vertices = |g: &Graph<V, E>| -> f64 {
            g.node_weights().map(|v| v.deletion_cost(self.costs)).sum()
        };

        let edges = |g: &Graph<V, E>| -> f64 {
            g.edge_weights().map(|e| e.deletion_cost(self.costs)).sum()
        };

        vertices(self.g1) + edges(self.g1) + vertices(self.g2) + edges(self.g2)
    }

    /// The cost of removing `v` along with its edges to vertices already resolved.
    fn removal(&self, g: &Graph<V, E>, resolved: &[Match], v: NodeIndex) -> f64 {
        let edges: f64 = g
            .edges(v)
            .filter(|e| resolved[opposite(g, e.id(), v).index()] != Match::Pending)
            .map(|e| e.weight().deletion_cost(self.costs))
            .sum();

        g[v].deletion_cost(self.costs) + edges
    }

    fn delete_remaining(&self, node: &TreeNode) -> TreeNode {
        let mut next = node.clone();
        for v in std::mem::take(&mut next.unused1) {
            next.cost += self.removal(self.g1, &next.forward, v);
            next.forward[v.index()] = Match::Removed;
        }
        next
    }

    fn insert_remaining(&self, node: &TreeNode) -> TreeNode {
        let mut next = node.clone();
        for v in std::mem::take(&mut next.unused2) {
            next.cost += self.removal(self.g2, &next.inverse, v);
            next.inverse[v.index()] = Match::Removed;
        }
        next
    }

    fn delete_first(&self, node: &TreeNode) -> TreeNode {
        let mut next = node.clone();
        let u = next.unused1.remove(0);
        next.cost += self.removal(self.g1, &next.forward, u);
        next.forward[u.index()] = Match::Removed;
        next
    }

    /// Substitutes `u` by `v`, charging every edge whose other endpoint is already resolved.
    fn substitute(&self, node: &TreeNode, u: NodeIndex, v: NodeIndex) -> TreeNode {
        let (g1, g2, costs) = (self.g1, self.g2, self.costs);
        let mut next = node.clone();
        next.unused1.retain(|&w| w != u);
        next.unused2.retain(|&x| x != v);
        next.forward[u.index()] = Match::With(v);
        next.inverse[v.index()] = Match::With(u);
        next.cost += g1[u].distance(&g2[v], costs);

        for e in g1.edges(u) {
            let w = opposite(g1, e.id(), u);
            next.cost += match node.forward[w.index()] {
                Match::Pending => 0.,
                Match::Removed => e.weight().deletion_cost(costs),
                Match::With(x) => match g2.find_edge(v, x) {
                    Some(f) => e.weight().distance(&g2[f], costs),
                    None => e.weight().deletion_cost(costs),
                },
            };
        }

        for f in g2.edges(v) {
            let x = opposite(g2, f.id(), v);
            next.cost += match node.inverse[x.index()] {
                Match::Pending => 0.,
                Match::Removed => f.weight().deletion_cost(costs),
                Match::With(w) if g1.find_edge(u, w).is_none() => f.weight().deletion_cost(costs),
                Match::With(_) => 0.,
            };
        }

        next
    }

    fn successors(&self, node: &TreeNode) -> Vec<TreeNode> {
        match (node.unused1.first(), node.unused2.is_empty()) {
            (None, _) => vec![self.insert_remaining(node)],
            (Some(_), true) => vec![self.delete_remaining(node)],
            (Some(&u), false) => {
                let mut successors: Vec<_> = node
                    .unused2
                    .iter()
                    .map(|&v| self.substitute(node, u, v))
                    .collect();

                successors.push(self.delete_first(node));
                successors
            }
        }
    }
}

/// Costs are compared at a fixed precision, so that rounding noise never reorders the frontier.
fn rounded(cost: f64) -> i64 {
    (cost * 1e5).round() as i64
}

/// Best-first branch and bound over partial edit paths, with a limited beam.
///
/// Partial edit paths are expanded in order of their accumulated cost, and after every
/// expansion only the `width` cheapest are kept. Equally expensive paths are kept in the order
/// they were generated. The search is exact if the beam is unlimited, see [BeamSearch::exact],
/// otherwise the result is an upper bound of the edit distance.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let g1 = from_parts(["A", "B"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge)]);
/// let g2 = from_parts(["B", "C"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge)]);
///
/// let exact = BeamSearch::exact(CostModel::default());
/// assert_eq!(exact.compute_graph_distance(&g1, &g2), Ok(1.));
/// assert_eq!(GraphDistance::<LabeledVertex, PlaceholderEdge>::id(&exact), "BeamSearch_inf");
/// ```
#[derive(Debug, Clone)]
pub struct BeamSearch {
    costs: CostModel,
    width: usize,
    time_limit: Duration,
    bound: Option<f64>,
}

impl BeamSearch {
    /// The default wall-clock budget of a single search.
    pub const TIME_LIMIT: Duration = Duration::from_secs(30);

    /// Keeps at most `width` partial edit paths.
    pub fn new(costs: CostModel, width: usize) -> Self {
        BeamSearch {
            costs,
            width: width.max(1),
            time_limit: Self::TIME_LIMIT,
            bound: None,
        }
    }

    /// An exhaustive search.
    pub fn exact(costs: CostModel) -> Self {
        Self::new(costs, usize::MAX)
    }

    /// Replaces the default wall-clock budget of [BeamSearch::TIME_LIMIT].
    pub fn with_time_limit(self, time_limit: Duration) -> Self {
        BeamSearch { time_limit, ..self }
    }

    /// Discards partial edit paths that cost more than `bound`.
    ///
    /// Defaults to the cost of deleting one graph and inserting the other.
    pub fn with_bound(self, bound: f64) -> Self {
        BeamSearch {
            bound: Some(bound),
            ..self
        }
    }

    /// The maximum number of partial edit paths kept.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the cost of the cheapest edit path found between `g1` and `g2`.
    ///
    /// Fails with [Error::TimedOut] if the time budget is exhausted, or with
    /// [Error::OutOfBound] if every edit path costs more than the bound.
    pub fn edit_distance<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> Result<f64, Error> {
        let expansion = Expansion {
            g1,
            g2,
            costs: &self.costs,
        };

        let bound = self.bound.unwrap_or_else(|| expansion.trivial_bound());
        self.search(&expansion, expansion.root(), bound)
    }

    /// Like [BeamSearch::edit_distance], restricted to edit paths that substitute `v1` by `v2`.
    ///
    /// Fails with [Error::NoSuchVertex] if either anchor is not a vertex of its graph.
    pub fn anchored_edit_distance<V: Vertex, E: Edge>(
        &self,
        (g1, v1): (&Graph<V, E>, NodeIndex),
        (g2, v2): (&Graph<V, E>, NodeIndex),
    ) -> Result<f64, Error> {
        for (g, v) in [(g1, v1), (g2, v2)] {
            if v.index() >= g.node_count() {
                return Err(Error::NoSuchVertex {
                    index: v.index(),
                    vertices: g.node_count(),
                });
            }
        }

        let expansion = Expansion {
            g1,
            g2,
            costs: &self.costs,
        };

        let bound = self.bound.unwrap_or_else(|| expansion.trivial_bound());
        let start = expansion.substitute(&expansion.root(), v1, v2);
        self.search(&expansion, start, bound)
    }

    fn search<V: Vertex, E: Edge>(
        &self,
        expansion: &Expansion<'_, V, E>,
        start: TreeNode,
        bound: f64,
    ) -> Result<f64, Error> {
        let bound = rounded(bound);
        if bound <= 0 {
            return Ok(0.);
        }

        let started = Instant::now();
        let mut sequence = 0u64;
        let mut open = BTreeMap::new();
        open.insert((rounded(start.cost), sequence), start);

        while let Some((_, node)) = open.pop_first() {
            if started.elapsed() >= self.time_limit {
                warn!(width = self.width, open = open.len(), "beam search timed out");
                return Err(Error::TimedOut(self.time_limit));
            }

            if node.is_complete() {
                return Ok(node.cost);
            }

            for child in expansion.successors(&node) {
                let cost = rounded(child.cost);
                if cost <= bound {
                    sequence += 1;
                    open.insert((cost, sequence), child);
                }
            }

            while open.len() > self.width {
                open.pop_last();
            }

            trace!(cost = node.cost, open = open.len(), "expanded");
        }

        Err(Error::OutOfBound(bound as f64 / 1e5))
    }
}

impl<V: Vertex, E: Edge> GraphDistance<V, E> for BeamSearch {
    fn id(&self) -> String {
        match self.width {
            usize::MAX => "BeamSearch_inf".into(),
            width => format!("BeamSearch_{width}"),
        }
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        let cost = self.edit_distance(g1, g2)?;
        debug!(id = %GraphDistance::<V, E>::id(self), cost);
        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labeled, ring, ExactGraphEditDistance, LabeledEdge, LabeledVertex, MockGraph};
    use assert_matches::assert_matches;
    use test_strategy::proptest;

    #[test]
    fn isomorphic_rings_are_zero_apart() {
        for width in [1, 2, usize::MAX] {
            let beam = BeamSearch::new(CostModel::default(), width);
            assert_eq!(beam.edit_distance(&ring(4, "A"), &ring(4, "A")), Ok(0.));
        }
    }

    #[test]
    fn deleting_a_single_edge_graph_costs_three() {
        let g1 = labeled(&["A", "B"], &[(0, 1)]);
        let g2 = labeled(&[], &[]);
        let beam = BeamSearch::exact(CostModel::default());
        assert_eq!(beam.edit_distance(&g1, &g2), Ok(3.));
        assert_eq!(beam.edit_distance(&g2, &g1), Ok(3.));
    }

    #[test]
    fn triangles_differing_in_one_label_are_one_apart() {
        let edges = [(0, 1), (1, 2), (2, 0)];
        let g1 = labeled(&["A", "A", "B"], &edges);
        let g2 = labeled(&["A", "C", "A"], &edges);
        let beam = BeamSearch::exact(CostModel::default());
        assert_eq!(beam.edit_distance(&g1, &g2), Ok(1.));
    }

    #[test]
    fn empty_graphs_are_zero_apart() {
        let g = labeled(&[], &[]);
        let beam = BeamSearch::exact(CostModel::default());
        assert_eq!(beam.edit_distance(&g, &g), Ok(0.));
    }

    #[test]
    fn non_positive_bound_is_trivially_met() {
        let beam = BeamSearch::exact(CostModel::default()).with_bound(0.);
        assert_eq!(beam.edit_distance(&ring(3, "A"), &ring(5, "B")), Ok(0.));
    }

    #[test]
    fn bound_below_the_distance_is_reported() {
        let beam = BeamSearch::exact(CostModel::default()).with_bound(1.);
        assert_matches!(
            beam.edit_distance(&ring(3, "A"), &ring(4, "A")),
            Err(Error::OutOfBound(b)) if b == 1.
        );
    }

    #[test]
    fn exhausted_time_budget_is_reported() {
        let beam = BeamSearch::exact(CostModel::default()).with_time_limit(Duration::ZERO);
        let g1 = ring(6, "A");
        let g2 = labeled(&["A", "B", "A", "B", "A", "B"], &[(0, 1), (2, 3), (4, 5)]);

        assert_matches!(
            beam.edit_distance(&g1, &g2),
            Err(Error::TimedOut(d)) if d == Duration::ZERO
        );
    }

    #[test]
    fn anchored_search_honors_the_anchor() {
        let g1 = labeled(&["A", "B"], &[]);
        let g2 = labeled(&["A", "B"], &[]);
        let beam = BeamSearch::exact(CostModel::default());
        let (a, b) = (NodeIndex::new(0), NodeIndex::new(1));

        assert_eq!(beam.anchored_edit_distance((&g1, a), (&g2, a)), Ok(0.));
        assert_eq!(beam.anchored_edit_distance((&g1, a), (&g2, b)), Ok(2.));
    }

    #[test]
    fn anchors_outside_the_graphs_are_rejected() {
        let g1 = labeled(&["A", "B"], &[(0, 1)]);
        let g2 = labeled(&["A"], &[]);
        let beam = BeamSearch::exact(CostModel::default());
        let (a, b) = (NodeIndex::new(0), NodeIndex::new(1));

        assert_eq!(
            beam.anchored_edit_distance((&g1, b), (&g2, b)),
            Err(Error::NoSuchVertex {
                index: 1,
                vertices: 1
            })
        );

        assert_eq!(
            beam.anchored_edit_distance((&g1, NodeIndex::new(5)), (&g2, a)),
            Err(Error::NoSuchVertex {
                index: 5,
                vertices: 2
            })
        );
    }

    #[test]
    fn ids_name_the_width() {
        let id = |b: &BeamSearch| GraphDistance::<LabeledVertex, LabeledEdge>::id(b);
        assert_eq!(id(&BeamSearch::new(CostModel::default(), 10)), "BeamSearch_10");
        assert_eq!(id(&BeamSearch::exact(CostModel::default())), "BeamSearch_inf");
    }

    #[proptest]
    fn distance_to_self_is_zero(g: MockGraph) {
        let beam = BeamSearch::exact(CostModel::default());
        assert_eq!(beam.edit_distance(&g, &g), Ok(0.));
    }

    #[proptest]
    fn unlimited_beam_is_exact(a: MockGraph, b: MockGraph) {
        let exact = ExactGraphEditDistance::new(CostModel::default());
        let beam = BeamSearch::exact(CostModel::default());
        assert_eq!(
            beam.edit_distance(&a, &b),
            exact.compute_graph_distance(&a, &b)
        );
    }

    #[proptest]
    fn narrow_beam_is_an_upper_bound(a: MockGraph, b: MockGraph) {
        let exact = BeamSearch::exact(CostModel::default()).edit_distance(&a, &b).unwrap();
        let narrow = BeamSearch::new(CostModel::default(), 1).edit_distance(&a, &b).unwrap();
        assert!(narrow >= exact);
    }

    #[proptest]
    fn distance_is_symmetric_under_symmetric_costs(a: MockGraph, b: MockGraph) {
        let beam = BeamSearch::exact(CostModel::default());
        assert_eq!(beam.edit_distance(&a, &b), beam.edit_distance(&b, &a));
    }
}
