use crate::{Error, Graph};
use pathfinding::matrix::Matrix;
use rayon::prelude::*;
use tracing::debug;

/// An abstraction for an algorithm that measures how far apart two graphs are.
pub trait GraphDistance<V, E> {
    /// A stable identifier of the algorithm and its parameters.
    fn id(&self) -> String;

    /// Returns the distance between `g1` and `g2`.
    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error>;
}

impl<V, E, D: GraphDistance<V, E> + ?Sized> GraphDistance<V, E> for &D {
    fn id(&self) -> String {
        (**self).id()
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        (**self).compute_graph_distance(g1, g2)
    }
}

impl<V, E, D: GraphDistance<V, E> + ?Sized> GraphDistance<V, E> for Box<D> {
    fn id(&self) -> String {
        (**self).id()
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        (**self).compute_graph_distance(g1, g2)
    }
}

/// Computes the distance between every ordered pair of `graphs` in parallel.
///
/// The entry at `(i, j)` holds the distance from `graphs[i]` to `graphs[j]`; the diagonal is
/// left at zero without invoking `distance`.
pub fn pairwise_distances<V, E, D>(graphs: &[Graph<V, E>], distance: &D) -> Result<Matrix<f64>, Error>
where
    V: Sync,
    E: Sync,
    D: GraphDistance<V, E> + Sync + ?Sized,
{
    let n = graphs.len();
    debug!(id = %distance.id(), graphs = n, "pairwise distances");

    let cells: Vec<_> = (0..n * n)
        .into_par_iter()
        .map(|k| match (k / n, k % n) {
            (i, j) if i == j => Ok(0.),
            (i, j) => distance.compute_graph_distance(&graphs[i], &graphs[j]),
        })
        .collect::<Result<_, _>>()?;

    let mut matrix = Matrix::new(n, n, 0.);
    for (k, d) in cells.into_iter().enumerate() {
        matrix[(k / n, k % n)] = d;
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labeled, ring, BipartiteMatching, CostModel, LabeledEdge, LabeledVertex};
    use assert_matches::assert_matches;

    struct VertexCountDifference;

    impl GraphDistance<LabeledVertex, LabeledEdge> for VertexCountDifference {
        fn id(&self) -> String {
            "VertexCountDifference".into()
        }

        fn compute_graph_distance(
            &self,
            g1: &Graph<LabeledVertex, LabeledEdge>,
            g2: &Graph<LabeledVertex, LabeledEdge>,
        ) -> Result<f64, Error> {
            if g1.node_count() == 0 || g2.node_count() == 0 {
                Err(Error::Infeasible)
            } else {
                Ok(g1.node_count().abs_diff(g2.node_count()) as f64)
            }
        }
    }

    #[test]
    fn every_ordered_pair_is_measured() {
        let graphs = [ring(3, "A"), ring(4, "A"), ring(6, "A")];
        let d = pairwise_distances(&graphs, &VertexCountDifference).unwrap();

        assert_eq!(d.rows, 3);
        assert_eq!(d[(0, 1)], 1.);
        assert_eq!(d[(2, 0)], 3.);
        assert_eq!(d[(1, 1)], 0.);
    }

    #[test]
    fn first_failure_is_reported() {
        let graphs = [ring(3, "A"), labeled(&[], &[])];
        assert_matches!(
            pairwise_distances(&graphs, &VertexCountDifference),
            Err(Error::Infeasible)
        );
    }

    #[test]
    fn distances_can_be_boxed() {
        let distances: Vec<Box<dyn GraphDistance<LabeledVertex, LabeledEdge> + Sync>> = vec![
            Box::new(VertexCountDifference),
            Box::new(BipartiteMatching::new(CostModel::default())),
        ];

        let graphs = [ring(3, "A"), ring(3, "B")];
        for d in &distances {
            let m = pairwise_distances(&graphs, d).unwrap();
            assert_eq!(m[(0, 1)], m[(1, 0)], "{}", d.id());
        }
    }
}
