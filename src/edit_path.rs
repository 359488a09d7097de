use crate::{CostModel, Edge, Error, Graph, NodeIndex, Vertex};

/// Returns the total cost of the edit path implied by a vertex assignment.
///
/// The `i`-th vertex in `order1` is substituted by the `assignment[i]`-th vertex in `order2`, or
/// deleted if `assignment[i]` is out of bounds for `order2`. Vertices in `order2` that are never
/// targeted are inserted. An edge of `g1` is substituted if both its endpoints are substituted by
/// vertices adjacent in `g2` and deleted otherwise, while edges of `g2` left uncovered are
/// inserted.
///
/// Fails with [Error::AssignmentLength] unless there is exactly one entry per vertex in `order1`.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let g1 = from_parts([LabeledVertex::from("A"), "B".into()], [(0, 1, PlaceholderEdge)]);
/// let g2 = from_parts([LabeledVertex::from("A")], []);
///
/// let order1: Vec<_> = g1.node_indices().collect();
/// let order2: Vec<_> = g2.node_indices().collect();
///
/// // keep A, delete B and the edge
/// let cost = edit_path_cost(&g1, &order1, &g2, &order2, &[0, 1], &CostModel::default());
/// assert_eq!(cost, Ok(2.));
/// ```
pub fn edit_path_cost<V: Vertex, E: Edge>(
    g1: &Graph<V, E>,
    order1: &[NodeIndex],
    g2: &Graph<V, E>,
    order2: &[NodeIndex],
    assignment: &[usize],
    costs: &CostModel,
) -> Result<f64, Error> {
    if assignment.len() != order1.len() {
        return Err(Error::AssignmentLength {
            expected: order1.len(),
            actual: assignment.len(),
        });
    }

    let mut cost = 0.;
    let mut image = vec![None; g1.node_count()];
    let mut targeted = vec![false; g2.node_count()];

    for (&v1, &j) in order1.iter().zip(assignment) {
        match order2.get(j) {
            Some(&v2) => {
                cost += g1[v1].distance(&g2[v2], costs);
                image[v1.index()] = Some(v2);
                targeted[v2.index()] = true;
            }
            None => cost += g1[v1].deletion_cost(costs),
        }
    }

    cost += g2
        .node_indices()
        .filter(|v2| !targeted[v2.index()])
        .map(|v2| g2[v2].deletion_cost(costs))
        .sum::<f64>();

    let mut covered = vec![false; g2.edge_count()];
    for e1 in g1.edge_indices() {
        let substitute = g1.edge_endpoints(e1).and_then(|(a, b)| {
            let (x, y) = (image[a.index()]?, image[b.index()]?);
            g2.find_edge(x, y)
        });

        match substitute {
            Some(e2) => {
                cost += g1[e1].distance(&g2[e2], costs);
                covered[e2.index()] = true;
            }
            None => cost += g1[e1].deletion_cost(costs),
        }
    }

    cost += g2
        .edge_indices()
        .filter(|e2| !covered[e2.index()])
        .map(|e2| g2[e2].deletion_cost(costs))
        .sum::<f64>();

    Ok(cost)
}

/// Like [edit_path_cost], with both graphs in their natural vertex order.
pub(crate) fn natural_edit_path_cost<V: Vertex, E: Edge>(
    g1: &Graph<V, E>,
    g2: &Graph<V, E>,
    assignment: &[usize],
    costs: &CostModel,
) -> Result<f64, Error> {
    let order1: Vec<_> = g1.node_indices().collect();
    let order2: Vec<_> = g2.node_indices().collect();
    edit_path_cost(g1, &order1, g2, &order2, assignment, costs)
}
