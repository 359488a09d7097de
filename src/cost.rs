use serde::{Deserialize, Serialize};

/// The scalar costs of elementary edit operations.
///
/// Substitution costs are charged by the [Vertex][crate::Vertex] and [Edge][crate::Edge]
/// implementations whenever two elements are distinguishable, see
/// [distance][crate::Vertex::distance].
///
/// Every field defaults to `1.0`, so a partial configuration only overrides what it names.
///
/// ```rust
/// use graph_edit_distance::CostModel;
///
/// let costs: CostModel = serde_json::from_str(r#"{ "edge_substitution": 0.5 }"#).unwrap();
/// assert_eq!(costs.edge_substitution, 0.5);
/// assert_eq!(costs.vertex_substitution, 1.0);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostModel {
    /// The cost of inserting or deleting a vertex.
    pub vertex_insertion_deletion: f64,
    /// The cost of relabeling a vertex.
    pub vertex_substitution: f64,
    /// The cost of inserting or deleting an edge.
    pub edge_insertion_deletion: f64,
    /// The cost of relabeling an edge.
    pub edge_substitution: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            vertex_insertion_deletion: 1.,
            vertex_substitution: 1.,
            edge_insertion_deletion: 1.,
            edge_substitution: 1.,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_costs_by_default() {
        let costs = CostModel::default();
        assert_eq!(costs.vertex_insertion_deletion, 1.);
        assert_eq!(costs.vertex_substitution, 1.);
        assert_eq!(costs.edge_insertion_deletion, 1.);
        assert_eq!(costs.edge_substitution, 1.);
    }

    #[test]
    fn partial_configuration_keeps_defaults() {
        let costs: CostModel =
            serde_json::from_str(r#"{ "vertex_insertion_deletion": 3 }"#).unwrap();

        assert_eq!(
            costs,
            CostModel {
                vertex_insertion_deletion: 3.,
                ..CostModel::default()
            }
        );
    }

    #[test]
    fn unknown_options_are_rejected() {
        assert!(serde_json::from_str::<CostModel>(r#"{ "vertex_sub": 2 }"#).is_err());
    }

    #[test]
    fn configuration_round_trips_through_json() {
        let costs = CostModel {
            edge_substitution: 0.25,
            ..CostModel::default()
        };

        let json = serde_json::to_string(&costs).unwrap();
        assert_eq!(serde_json::from_str::<CostModel>(&json).unwrap(), costs);
    }
}
