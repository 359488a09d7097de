use crate::edit_path::natural_edit_path_cost;
use crate::{Assignment, CostModel, Edge, Error, Graph, GraphDistance, JonkerVolgenant};
use crate::{NodeIndex, Solver, Vertex};
use pathfinding::matrix::Matrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How insertions and deletions are laid out in a cost matrix.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// An `(n+m)×(n+m)` matrix, with one dedicated deletion column per row and one dedicated
    /// insertion row per column.
    #[default]
    Square,

    /// A `max(n,m)×max(n,m)` matrix, where every padding cell holds the insertion or deletion cost
    /// of its element.
    Rectangular,
}

/// Whether a cost matrix estimates an upper or a lower bound of the edit distance.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Edges are charged in full, the assignment induces an edit path.
    #[default]
    Approximation,

    /// Edges are charged half their cost, since each is shared by two vertices, so that the
    /// optimal assignment cost never exceeds the edit distance.
    Branch,
}

impl Mode {
    fn edge_factor(self) -> f64 {
        match self {
            Mode::Approximation => 1.,
            Mode::Branch => 0.5,
        }
    }
}

/// Lays out a padded cost matrix between `n` rows and `m` columns.
pub(crate) fn padded_matrix(
    n: usize,
    m: usize,
    layout: Layout,
    mut substitution: impl FnMut(usize, usize) -> Result<f64, Error>,
    deletion: impl Fn(usize) -> f64,
    insertion: impl Fn(usize) -> f64,
) -> Result<Matrix<f64>, Error> {
    let matrix = match layout {
        Layout::Square => {
            let mut c = Matrix::new(n + m, n + m, f64::INFINITY);
            for i in 0..n {
                for j in 0..m {
                    c[(i, j)] = substitution(i, j)?;
                }

                c[(i, m + i)] = deletion(i);
            }

            for j in 0..m {
                c[(n + j, j)] = insertion(j);
                for i in 0..n {
                    c[(n + j, m + i)] = 0.;
                }
            }

            c
        }

        Layout::Rectangular => {
            let k = n.max(m);
            let mut c = Matrix::new(k, k, 0.);
            for i in 0..k {
                for j in 0..k {
                    c[(i, j)] = match (i < n, j < m) {
                        (true, true) => substitution(i, j)?,
                        (true, false) => deletion(i),
                        (false, true) => insertion(j),
                        (false, false) => 0.,
                    };
                }
            }

            c
        }
    };

    Ok(matrix)
}

/// The bipartite graph matching approximation of the graph edit distance.
///
/// Vertices are matched by solving a single assignment problem, where the cost of substituting a
/// pair of vertices includes the cost of optimally matching their incident edges. The edit path
/// implied by the vertex assignment is an upper bound of the edit distance.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let g1 = from_parts(["A", "B", "A"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge), (1, 2, PlaceholderEdge)]);
/// let g2 = from_parts(["A", "B"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge)]);
///
/// let bipartite = BipartiteMatching::new(CostModel::default());
/// assert_eq!(bipartite.compute_graph_distance(&g1, &g2), Ok(2.));
/// assert!(bipartite.lower_bound(&g1, &g2).unwrap() <= 2.);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BipartiteMatching<S = JonkerVolgenant> {
    costs: CostModel,
    layout: Layout,
    solver: S,
}

impl BipartiteMatching {
    /// Matches vertices in a square [Layout] with the [JonkerVolgenant] solver.
    pub fn new(costs: CostModel) -> Self {
        BipartiteMatching {
            costs,
            layout: Layout::Square,
            solver: JonkerVolgenant,
        }
    }
}

impl<S: Solver> BipartiteMatching<S> {
    /// Switches to another cost matrix [Layout].
    pub fn with_layout(self, layout: Layout) -> Self {
        BipartiteMatching { layout, ..self }
    }

    /// Switches to another assignment [Solver].
    pub fn with_solver<T: Solver>(self, solver: T) -> BipartiteMatching<T> {
        BipartiteMatching {
            costs: self.costs,
            layout: self.layout,
            solver,
        }
    }

    /// The cost of substituting `v1` by `v2`, including the optimal matching of their edges.
    fn substitution<V: Vertex, E: Edge>(
        &self,
        (g1, v1): (&Graph<V, E>, NodeIndex),
        (g2, v2): (&Graph<V, E>, NodeIndex),
        mode: Mode,
    ) -> Result<f64, Error> {
        let f = mode.edge_factor();
        let costs = &self.costs;
        let edges1: Vec<_> = g1.edges(v1).map(|e| e.weight()).collect();
        let edges2: Vec<_> = g2.edges(v2).map(|e| e.weight()).collect();

        let vertex = g1[v1].distance(&g2[v2], costs);
        if edges1.is_empty() && edges2.is_empty() {
            return Ok(vertex);
        }

        let matrix = padded_matrix(
            edges1.len(),
            edges2.len(),
            self.layout,
            |i, j| Ok(f * edges1[i].distance(edges2[j], costs)),
            |i| f * edges1[i].deletion_cost(costs),
            |j| f * edges2[j].deletion_cost(costs),
        )?;

        Ok(vertex + self.solver.solve(&matrix)?.cost)
    }

    /// The cost of deleting `v` along with every edge incident to it.
    fn removal<V: Vertex, E: Edge>(&self, g: &Graph<V, E>, v: NodeIndex, mode: Mode) -> f64 {
        let edges: f64 = g.edges(v).map(|e| e.weight().deletion_cost(&self.costs)).sum();
        g[v].deletion_cost(&self.costs) + mode.edge_factor() * edges
    }

    /// Builds the vertex assignment cost matrix between `g1` and `g2`.
    ///
    /// Rows stand for the vertices of `g1` and columns for the vertices of `g2`, both in their
    /// natural order, followed by padding as per the configured [Layout].
    pub fn cost_matrix<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
        mode: Mode,
    ) -> Result<Matrix<f64>, Error> {
        let vertices1: Vec<_> = g1.node_indices().collect();
        let vertices2: Vec<_> = g2.node_indices().collect();

        padded_matrix(
            vertices1.len(),
            vertices2.len(),
            self.layout,
            |i, j| self.substitution((g1, vertices1[i]), (g2, vertices2[j]), mode),
            |i| self.removal(g1, vertices1[i], mode),
            |j| self.removal(g2, vertices2[j], mode),
        )
    }

    /// Solves the vertex [cost matrix][BipartiteMatching::cost_matrix].
    pub fn assignment<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
        mode: Mode,
    ) -> Result<Assignment, Error> {
        self.solver.solve(&self.cost_matrix(g1, g2, mode)?)
    }

    /// A lower bound of the edit distance between `g1` and `g2`.
    pub fn lower_bound<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> Result<f64, Error> {
        Ok(self.assignment(g1, g2, Mode::Branch)?.cost)
    }
}

impl<V: Vertex, E: Edge, S: Solver> GraphDistance<V, E> for BipartiteMatching<S> {
    fn id(&self) -> String {
        match self.layout {
            Layout::Square => "BipartiteGraphMatching".into(),
            Layout::Rectangular => "BipartiteGraphMatchingFast".into(),
        }
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        let assignment = self.assignment(g1, g2, Mode::Approximation)?;
        let rows = &assignment.rows[..g1.node_count()];
        let cost = natural_edit_path_cost(g1, g2, rows, &self.costs)?;
        debug!(id = %GraphDistance::<V, E>::id(self), assignment = assignment.cost, cost);
        Ok(cost)
    }
}
