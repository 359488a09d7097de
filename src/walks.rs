use crate::bipartite::{padded_matrix, Layout};
use crate::edit_path::natural_edit_path_cost;
use crate::graph::opposite;
use crate::{Assignment, CostModel, Edge, Error, Graph, GraphDistance, JonkerVolgenant};
use crate::{NodeIndex, Solver, Vertex};
use itertools::Itertools;
use pathfinding::matrix::Matrix;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// The number of walks from a vertex, by the label of the vertex they end at.
type Histogram = BTreeMap<String, u64>;

fn product(a: &Matrix<u64>, b: &Matrix<u64>) -> Matrix<u64> {
    let n = a.rows;
    let mut c: Matrix<u64> = Matrix::new(n, n, 0);
    for i in 0..n {
        for k in 0..n {
            let x = a[(i, k)];
            if x == 0 {
                continue;
            }

            for j in 0..n {
                c[(i, j)] = c[(i, j)].saturating_add(x.saturating_mul(b[(k, j)]));
            }
        }
    }

    c
}

/// Raises `m` to the power `k` by repeated squaring.
fn power(mut m: Matrix<u64>, mut k: usize) -> Matrix<u64> {
    let n = m.rows;
    let mut result = Matrix::new(n, n, 0);
    for i in 0..n {
        result[(i, i)] = 1;
    }

    while k > 0 {
        if k % 2 == 1 {
            result = product(&result, &m);
        }

        k /= 2;
        if k > 0 {
            m = product(&m, &m);
        }
    }

    result
}

/// Counts the walks of `length` edges from every vertex, by the label they end at.
fn histograms(
    labels: &[String],
    edges: impl IntoIterator<Item = (usize, usize)>,
    length: usize,
) -> Vec<Histogram> {
    let n = labels.len();
    let mut adjacency = Matrix::new(n, n, 0);
    for (a, b) in edges {
        adjacency[(a, b)] = 1;
        adjacency[(b, a)] = 1;
    }

    let walks = power(adjacency, length);
    (0..n)
        .map(|v| {
            let mut histogram = Histogram::new();
            for (u, label) in labels.iter().enumerate() {
                *histogram.entry(label.clone()).or_default() += walks[(v, u)];
            }

            histogram
        })
        .collect()
}

fn count(histogram: &Histogram, label: &str) -> u64 {
    histogram.get(label).copied().unwrap_or(0)
}

/// Walk histograms of two graphs and of their product graph.
///
/// The product graph has a vertex for every pair of equally labeled vertices, and an edge between
/// two pairs whose vertices are joined by equally labeled edges in both graphs, so its walks are
/// the walks the two graphs have in common.
struct Walks {
    length: usize,
    first: Vec<Histogram>,
    second: Vec<Histogram>,
    shared: HashMap<(usize, usize), Histogram>,
}

impl Walks {
    fn new<V: Vertex, E: Edge>(
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
        length: usize,
        costs: &CostModel,
    ) -> Self {
        let labels1: Vec<String> = g1.node_weights().map(|v| v.label().into_owned()).collect();
        let labels2: Vec<String> = g2.node_weights().map(|v| v.label().into_owned()).collect();
        let endpoints = |g: &Graph<V, E>| {
            g.edge_indices()
                .filter_map(|e| g.edge_endpoints(e))
                .map(|(a, b)| (a.index(), b.index()))
                .collect_vec()
        };

        let pairs: Vec<(NodeIndex, NodeIndex)> = g1
            .node_indices()
            .cartesian_product(g2.node_indices())
            .filter(|&(u, v)| g1[u].distance(&g2[v], costs) == 0.)
            .collect();

        let index: HashMap<_, _> = pairs.iter().enumerate().map(|(i, &p)| (p, i)).collect();

        let mut edges = Vec::new();
        for (x, &(u1, u2)) in pairs.iter().enumerate() {
            for (e1, e2) in g1.edges(u1).cartesian_product(g2.edges(u2).collect_vec()) {
                if e1.weight().distance(e2.weight(), costs) != 0. {
                    continue;
                }

                let w = (opposite(g1, e1.id(), u1), opposite(g2, e2.id(), u2));
                if let Some(&y) = index.get(&w) {
                    edges.push((x, y));
                }
            }
        }

        let labels: Vec<String> = pairs.iter().map(|(u, _)| labels1[u.index()].clone()).collect();
        let shared = histograms(&labels, edges, length);

        Walks {
            length,
            first: histograms(&labels1, endpoints(g1), length),
            second: histograms(&labels2, endpoints(g2), length),
            shared: pairs
                .into_iter()
                .map(|(u, v)| (u.index(), v.index()))
                .zip(shared)
                .collect(),
        }
    }

    /// The cost of substituting vertex `i` of the first graph by vertex `j` of the second.
    ///
    /// Walks of both vertices are paired by the label they end at, discounting walks the two
    /// graphs have in common. Paired walks cost the substitution of their inner elements, the
    /// surplus is matched across labels and the rest is inserted or deleted.
    fn substitution(&self, i: usize, j: usize, relabel: bool, costs: &CostModel) -> f64 {
        let (h1, h2) = (&self.first[i], &self.second[j]);
        let k = self.length as f64;
        let delta = if relabel { 1. } else { 0. };

        let keys = h1.keys().chain(h2.keys()).unique();
        let (mut r12, mut r21, mut paired) = (0, 0, 0);
        for key in keys {
            let (a, b) = (count(h1, key), count(h2, key));
            // a walk common to both graphs shows up squared in the product graph
            let common = match self.shared.get(&(i, j)) {
                Some(h) if h.contains_key(key) => {
                    a.min(b).min((count(h, key) as f64).sqrt() as u64)
                }
                _ => 0,
            };

            let (a, b) = (a - common, b - common);
            paired += a.min(b);
            r12 += a - a.min(b);
            r21 += b - a.min(b);
        }

        let substituted = (delta + k - 1.) * costs.vertex_substitution + k * costs.edge_substitution;
        let relabeled = (delta + k) * costs.vertex_substitution + k * costs.edge_substitution;
        let removed =
            (delta + k) * costs.vertex_insertion_deletion + k * costs.edge_insertion_deletion;

        substituted * paired as f64
            + relabeled * r12.min(r21) as f64
            + removed * r12.abs_diff(r21) as f64
    }

    /// The cost of deleting every walk from a vertex with the given histogram.
    fn removal(&self, histogram: &Histogram, costs: &CostModel) -> f64 {
        let k = self.length as f64;
        let walks: u64 = histogram.values().sum();
        let per_walk = (k + 1.) * costs.vertex_insertion_deletion + k * costs.edge_insertion_deletion;
        per_walk * walks as f64
    }
}

/// A bipartite approximation of the graph edit distance that scores vertex pairs by their walks.
///
/// Every vertex is described by the histogram of the labels its walks of a fixed length end at,
/// and the cost of substituting two vertices estimates the cost of transforming the walks of one
/// into the walks of the other.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let g1 = from_parts(["A", "B", "C"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge), (1, 2, PlaceholderEdge)]);
/// let g2 = from_parts(["A", "B"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge)]);
///
/// let walks = WalkMatching::new(CostModel::default(), 2);
/// assert_eq!(walks.compute_graph_distance(&g1, &g2), Ok(2.));
/// ```
#[derive(Debug, Default, Clone)]
pub struct WalkMatching<S = JonkerVolgenant> {
    costs: CostModel,
    length: usize,
    solver: S,
}

impl WalkMatching {
    /// Compares walks of `length` edges, at least one.
    pub fn new(costs: CostModel, length: usize) -> Self {
        WalkMatching {
            costs,
            length: length.max(1),
            solver: JonkerVolgenant,
        }
    }
}

impl<S: Solver> WalkMatching<S> {
    /// Switches to another assignment [Solver].
    pub fn with_solver<T: Solver>(self, solver: T) -> WalkMatching<T> {
        WalkMatching {
            costs: self.costs,
            length: self.length,
            solver,
        }
    }

    /// Builds the square vertex assignment cost matrix between `g1` and `g2`.
    pub fn cost_matrix<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> Result<Matrix<f64>, Error> {
        let costs = &self.costs;
        let walks = Walks::new(g1, g2, self.length, costs);
        let (v1, v2): (Vec<_>, Vec<_>) = (g1.node_indices().collect(), g2.node_indices().collect());

        padded_matrix(
            v1.len(),
            v2.len(),
            Layout::Square,
            |i, j| {
                let relabel = g1[v1[i]].distance(&g2[v2[j]], costs) != 0.;
                Ok(walks.substitution(i, j, relabel, costs))
            },
            |i| walks.removal(&walks.first[i], costs),
            |j| walks.removal(&walks.second[j], costs),
        )
    }

    /// Solves the vertex [cost matrix][WalkMatching::cost_matrix].
    pub fn assignment<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> Result<Assignment, Error> {
        self.solver.solve(&self.cost_matrix(g1, g2)?)
    }
}

impl<V: Vertex, E: Edge, S: Solver> GraphDistance<V, E> for WalkMatching<S> {
    fn id(&self) -> String {
        format!("WalksMatching_{}", self.length)
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        let assignment = self.assignment(g1, g2)?;
        let rows = &assignment.rows[..g1.node_count()];
        let cost = natural_edit_path_cost(g1, g2, rows, &self.costs)?;
        debug!(id = %GraphDistance::<V, E>::id(self), assignment = assignment.cost, cost);
        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labeled, ExactGraphEditDistance, Hungarian, LabeledEdge, LabeledVertex};
    use crate::MockGraph;
    use test_strategy::proptest;

    #[test]
    fn walks_are_counted_by_their_last_label() {
        let labels = ["A", "B", "A"].map(String::from);
        let h = histograms(&labels, [(0, 1), (1, 2)], 2);

        assert_eq!(h[0], Histogram::from([("A".into(), 2), ("B".into(), 0)]));
        assert_eq!(h[1], Histogram::from([("A".into(), 0), ("B".into(), 2)]));
    }

    #[test]
    fn power_of_zero_is_the_identity() {
        let m = Matrix::new(2, 2, 3);
        assert_eq!(power(m, 0), Matrix::from_rows([[1, 0], [0, 1]]).unwrap());
    }

    #[test]
    fn cost_matrix_charges_unmatched_walks() {
        let g1 = labeled(&["A", "B"], &[(0, 1)]);
        let g2 = labeled(&["A"], &[]);
        let c = WalkMatching::new(CostModel::default(), 1).cost_matrix(&g1, &g2).unwrap();

        assert_eq!((c.rows, c.columns), (3, 3));
        assert_eq!(c[(0, 0)], 2.);
        assert_eq!(c[(1, 0)], 3.);
        assert_eq!(c[(0, 1)], 3.);
        assert_eq!(c[(1, 2)], 3.);
        assert_eq!(c[(2, 0)], 0.);
        assert_eq!(c[(0, 2)], f64::INFINITY);
    }

    #[test]
    fn deleting_an_unmatched_vertex() {
        let g1 = labeled(&["A", "B"], &[(0, 1)]);
        let g2 = labeled(&["A"], &[]);
        let walks = WalkMatching::new(CostModel::default(), 1);
        assert_eq!(walks.compute_graph_distance(&g1, &g2), Ok(2.));
    }

    #[test]
    fn distinctly_labeled_graphs_are_matched_exactly() {
        let g = labeled(&["A", "B", "C", "D"], &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        for length in 1..4 {
            let walks = WalkMatching::new(CostModel::default(), length);
            assert_eq!(walks.compute_graph_distance(&g, &g), Ok(0.));
        }
    }

    #[test]
    fn id_names_the_walk_length() {
        let walks = WalkMatching::new(CostModel::default(), 3);
        assert_eq!(GraphDistance::<LabeledVertex, LabeledEdge>::id(&walks), "WalksMatching_3");
        let walks = WalkMatching::new(CostModel::default(), 0);
        assert_eq!(GraphDistance::<LabeledVertex, LabeledEdge>::id(&walks), "WalksMatching_1");
    }

    #[proptest]
    fn approximation_is_an_upper_bound(a: MockGraph, b: MockGraph) {
        let exact = ExactGraphEditDistance::new(CostModel::default());
        let d = exact.compute_graph_distance(&a, &b).unwrap();
        for length in 1..3 {
            let walks = WalkMatching::new(CostModel::default(), length);
            assert!(walks.compute_graph_distance(&a, &b).unwrap() >= d);
        }
    }

    #[proptest]
    fn solvers_agree_on_assignment_cost(a: MockGraph, b: MockGraph) {
        let jv = WalkMatching::new(CostModel::default(), 2);
        let hungarian = jv.clone().with_solver(Hungarian);
        assert_eq!(
            jv.assignment(&a, &b).unwrap().cost,
            hungarian.assignment(&a, &b).unwrap().cost
        );
    }
}
