use crate::edit_path::natural_edit_path_cost;
use crate::{CostModel, Edge, Error, Graph, GraphDistance, Vertex};
use itertools::Itertools;
use tracing::debug;

/// The exact graph edit distance by exhaustive enumeration of vertex assignments.
///
/// Every injective mapping of the vertices of the larger graph into the vertices of the smaller
/// graph or deletion is scored, which takes factorial time and is only viable for tiny graphs.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ExactGraphEditDistance {
    costs: CostModel,
}

impl ExactGraphEditDistance {
    pub fn new(costs: CostModel) -> Self {
        ExactGraphEditDistance { costs }
    }

    fn enumerate<V: Vertex, E: Edge>(
        &self,
        g1: &Graph<V, E>,
        g2: &Graph<V, E>,
    ) -> Result<f64, Error> {
        let (n, m) = (g1.node_count(), g2.node_count());
        if n == 0 {
            return natural_edit_path_cost(g1, g2, &[], &self.costs);
        }

        let mut best = f64::INFINITY;
        for assignment in (0..n + m).permutations(n) {
            best = best.min(natural_edit_path_cost(g1, g2, &assignment, &self.costs)?);
            if best == 0. {
                break;
            }
        }

        Ok(best)
    }
}

impl<V: Vertex, E: Edge> GraphDistance<V, E> for ExactGraphEditDistance {
    fn id(&self) -> String {
        "EXACTGED".into()
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        // enumerating from the larger graph leaves fewer deletions to try
        let cost = if g1.node_count() >= g2.node_count() {
            self.enumerate(g1, g2)?
        } else {
            self.enumerate(g2, g1)?
        };

        debug!(id = "EXACTGED", cost);
        Ok(cost)
    }
}
