use crate::graph::{eccentricity, opposite};
use crate::{CanonicalTree, Edge, GraphEncoder, Graph, NodeIndex, Vertex};
use derive_more::Display;
use itertools::Itertools;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// How a [CanonicalTree] grows by one layer.
#[derive(Debug, Display, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Growth {
    /// Breadth-first, every vertex occurs once at its distance from the root, with a parent in
    /// the layer above for every edge it is reached through.
    #[default]
    #[display(fmt = "V1")]
    Breadth,

    /// Like [Growth::Breadth], but vertices of each new layer are also grouped into cliques of
    /// vertices connected through edges internal to the layer.
    #[display(fmt = "V1Plus")]
    BreadthCliques,

    /// Like [Growth::Breadth], but an edge between two vertices in the same layer also yields
    /// a copy of each endpoint in the layer below the other.
    #[display(fmt = "V2")]
    Layered,

    /// Every neighbor of every leaf is added, like the unfolding of the Weisfeiler-Lehman
    /// refinement, up to the eccentricity of the root.
    #[display(fmt = "WL")]
    Unfolding,
}

/// Per-tree bookkeeping of the growth process.
struct Frontier {
    /// The node of the first occurrence of each vertex.
    first: HashMap<NodeIndex, usize>,
    /// The height beyond which the tree must not grow.
    horizon: usize,
}

/// One [CanonicalTree] per graph vertex, refined by growing every tree one layer at a time.
///
/// Trees that stop growing are left out of subsequent refinement steps, and refinement is
/// stable once no tree grows.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let path = from_parts(["A", "B", "C"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge), (1, 2, PlaceholderEdge)]);
///
/// let mut trees = NeighborhoodTrees::new(&path, Growth::Breadth);
/// trees.fully_refine();
/// assert_eq!(trees.trees()[0].height(), 2);
/// assert_eq!(trees.trees()[1].height(), 1);
/// ```
pub struct NeighborhoodTrees<'g, V, E> {
    growth: Growth,
    trees: Vec<CanonicalTree<'g, V, E>>,
    frontiers: Vec<Frontier>,
    unrefined: Vec<usize>,
}

impl<'g, V: Vertex, E: Edge> NeighborhoodTrees<'g, V, E> {
    /// A single-node tree rooted at every vertex of `graph`, in their natural order.
    pub fn new(graph: &'g Graph<V, E>, growth: Growth) -> Self {
        let roots = graph.node_indices();
        let trees: Vec<_> = match growth {
            Growth::BreadthCliques => roots.map(|v| CanonicalTree::with_cliques(graph, v)).collect(),
            _ => roots.map(|v| CanonicalTree::new(graph, v)).collect(),
        };

        let frontiers = graph
            .node_indices()
            .map(|v| Frontier {
                first: HashMap::from([(v, 0)]),
                horizon: match growth {
                    Growth::Unfolding => eccentricity(graph, v),
                    _ => usize::MAX,
                },
            })
            .collect();

        NeighborhoodTrees {
            growth,
            unrefined: (0..trees.len()).collect(),
            trees,
            frontiers,
        }
    }

    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// The tree rooted at each vertex, in their natural order.
    pub fn trees(&self) -> &[CanonicalTree<'g, V, E>] {
        &self.trees
    }

    /// Grows the tree at position `t` by one layer, returning whether it grew.
    fn grow(&mut self, t: usize) -> bool {
        let tree = &mut self.trees[t];
        let frontier = &mut self.frontiers[t];
        let graph = tree.graph();
        let current = tree.height();
        let next = current + 1;

        if current >= frontier.horizon {
            return false;
        }

        let leaves = tree.layer(current).to_vec();
        let mut added: HashMap<NodeIndex, usize> = HashMap::new();
        let mut grew = false;

        for leaf in leaves {
            let v = tree.vertex(leaf);
            for e in graph.edges(v).map(|e| e.id()).sorted() {
                let u = opposite(graph, e, v);

                let reuse = match self.growth {
                    Growth::Breadth | Growth::BreadthCliques => match frontier.first.get(&u) {
                        None => None,
                        Some(&node) if tree.depth(node) == next => Some(Some(node)),
                        Some(_) => continue,
                    },

                    Growth::Layered => match frontier.first.get(&u).map(|&n| tree.depth(n)) {
                        None => None,
                        Some(d) if d == next || d == current => Some(added.get(&u).copied()),
                        Some(_) => continue,
                    },

                    Growth::Unfolding => Some(added.get(&u).copied()),
                };

                match reuse.flatten() {
                    Some(node) => tree.add_parent(node, leaf, e),
                    None => {
                        let node = tree.add_node(leaf, u, e);
                        frontier.first.entry(u).or_insert(node);
                        added.insert(u, node);
                        grew = true;
                    }
                }
            }
        }

        if grew && self.growth == Growth::BreadthCliques {
            tree.build_last_layer_cliques();
        }

        grew
    }
}

impl<'g, V: Vertex, E: Edge> GraphEncoder for NeighborhoodTrees<'g, V, E> {
    fn refine(&mut self) -> bool {
        let unrefined = std::mem::take(&mut self.unrefined);
        let grown: Vec<_> = unrefined.into_iter().filter(|&t| self.grow(t)).collect();
        trace!(growth = %self.growth, grown = grown.len(), "refined");
        self.unrefined = grown;
        !self.unrefined.is_empty()
    }

    /// The sorted encodings of every tree, one per line.
    fn lexicographic_encoding(&self) -> String {
        self.trees
            .iter()
            .map(CanonicalTree::lexicographic_encoding)
            .sorted()
            .map(|encoding| encoding + "\n")
            .collect()
    }
}
