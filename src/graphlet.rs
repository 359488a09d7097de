use crate::bipartite::{padded_matrix, Layout};
use crate::edit_path::natural_edit_path_cost;
use crate::{Assignment, BeamSearch, CostModel, Edge, Error, Graph, GraphDistance};
use crate::{JonkerVolgenant, NodeIndex, Solver, Vertex};
use pathfinding::matrix::Matrix;
use pathfinding::prelude::dijkstra_all;
use std::collections::HashMap;
use tracing::debug;

/// The subgraph around `root` that holds every vertex up to `radius` edges away and every edge
/// incident to a vertex less than `radius` edges away, along with the position of `root` in it.
pub fn graphlet<V, E>(
    graph: &Graph<V, E>,
    root: NodeIndex,
    radius: usize,
) -> (Graph<&V, &E>, NodeIndex) {
    let mut depth: HashMap<NodeIndex, usize> =
        dijkstra_all(&root, |&v| graph.neighbors(v).map(|u| (u, 1usize)))
            .into_iter()
            .map(|(v, (_, d))| (v, d))
            .collect();

    depth.insert(root, 0);
    let within = |v: NodeIndex, r: usize| depth.get(&v).is_some_and(|&d| d <= r);

    let subgraph = graph.filter_map(
        |v, w| within(v, radius).then_some(w),
        |e, w| {
            let (a, b) = graph.edge_endpoints(e)?;
            let inner = radius.checked_sub(1)?;
            (within(a, inner) || within(b, inner)).then_some(w)
        },
    );

    let anchor = graph
        .node_indices()
        .take_while(|&v| v != root)
        .filter(|&v| within(v, radius))
        .count();

    (subgraph, NodeIndex::new(anchor))
}

/// A bipartite approximation of the graph edit distance that scores vertex pairs by the edit
/// distance between the graphlets around them.
///
/// The graphlets of two vertices are compared by a [BeamSearch] anchored at the pair itself,
/// which makes every cell of the cost matrix an edit distance of its own, so this is slow on
/// dense graphs or with a large radius.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let g1 = from_parts(["A", "B", "C"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge), (1, 2, PlaceholderEdge)]);
/// let g2 = from_parts(["A", "B"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge)]);
///
/// let graphlets = GraphletMatching::new(CostModel::default(), 1);
/// assert_eq!(graphlets.compute_graph_distance(&g1, &g2), Ok(2.));
/// ```
#[derive(Debug, Clone)]
pub struct GraphletMatching<S = JonkerVolgenant> {
    costs: CostModel,
    radius: usize,
    beam: BeamSearch,
    solver: S,
}

impl GraphletMatching {
    /// The default width of the beam that compares graphlets.
    pub const WIDTH: usize = 1000;

    /// Compares graphlets of `radius` edges around every vertex.
    pub fn new(costs: CostModel, radius: usize) -> Self {
        GraphletMatching {
            costs,
            radius,
            beam: BeamSearch::new(costs, Self::WIDTH),
            solver: JonkerVolgenant,
        }
    }
}

impl<S: Solver> GraphletMatching<S> {
    /// Replaces the [BeamSearch] that compares graphlets.
    pub fn with_beam(self, beam: BeamSearch) -> Self {
        GraphletMatching { beam, ..self }
    }

    /// Switches to another assignment [Solver].
    pub fn with_solver<T: Solver>(self, solver: T) -> GraphletMatching<T> {
        GraphletMatching {
            costs: self.costs,
            radius: self.radius,
            beam: self.beam,
            solver,
        }
    }

    /// Builds the square vertex assignment cost matrix between `g1` and `g2`.
    pub fn cost_matrix<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> Result<Matrix<f64>, Error> {
        let graphlets1: Vec<_> = g1.node_indices().map(|v| graphlet(g1, v, self.radius)).collect();
        let graphlets2: Vec<_> = g2.node_indices().map(|v| graphlet(g2, v, self.radius)).collect();

        let removal = |g: &Graph<&V, &E>| -> f64 {
            let vertices: f64 = g.node_weights().map(|v| v.deletion_cost(&self.costs)).sum();
            let edges: f64 = g.edge_weights().map(|e| e.deletion_cost(&self.costs)).sum();
            vertices + edges
        };

        padded_matrix(
            graphlets1.len(),
            graphlets2.len(),
            Layout::Square,
            |i, j| {
                let (h1, a1) = &graphlets1[i];
                let (h2, a2) = &graphlets2[j];
                self.beam.anchored_edit_distance((h1, *a1), (h2, *a2))
            },
            |i| removal(&graphlets1[i].0),
            |j| removal(&graphlets2[j].0),
        )
    }

    /// Solves the vertex [cost matrix][GraphletMatching::cost_matrix].
    pub fn assignment<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> Result<Assignment, Error> {
        self.solver.solve(&self.cost_matrix(g1, g2)?)
    }
}

impl<V: Vertex, E: Edge, S: Solver> GraphDistance<V, E> for GraphletMatching<S> {
    fn id(&self) -> String {
        format!("SubgraphMatching_{}", self.radius)
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        let assignment = self.assignment(g1, g2)?;
        let rows = &assignment.rows[..g1.node_count()];
        let cost = natural_edit_path_cost(g1, g2, rows, &self.costs)?;
        debug!(id = %GraphDistance::<V, E>::id(self), assignment = assignment.cost, cost);
        Ok(cost)
    }
}
