use crate::graph::escape;
use crate::{Edge, EdgeIndex, Graph, NodeIndex, Vertex};
use itertools::Itertools;
use pathfinding::prelude::connected_components;
use std::collections::{BTreeMap, HashMap};

/// A link from a tree node to one of its children.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Child {
    /// The child node.
    pub node: usize,
    /// The graph edge the child was reached through.
    pub edge: EdgeIndex,
}

#[derive(Debug, Clone)]
struct TreeVertex {
    vertex: NodeIndex,
    depth: usize,
    parents: Vec<usize>,
    children: Vec<Child>,
}

/// Vertices of the same layer that are connected through edges internal to that layer.
#[derive(Debug, Default, Clone)]
struct Cliques {
    of: Vec<Option<usize>>,
    sizes: Vec<usize>,
}

/// A rooted, layered neighborhood of a graph vertex.
///
/// Nodes are stored in an arena and refer to graph vertices, so the same vertex may occur more
/// than once. Every node other than the root has at least one parent in the layer immediately
/// above it, and may have more, which makes the tree a layered DAG that shares the subtrees of
/// vertices reachable from several parents.
pub struct CanonicalTree<'g, V, E> {
    graph: &'g Graph<V, E>,
    nodes: Vec<TreeVertex>,
    layers: Vec<Vec<usize>>,
    cliques: Option<Cliques>,
}

impl<'g, V: Vertex, E: Edge> CanonicalTree<'g, V, E> {
    /// A tree consisting of a single root node.
    pub fn new(graph: &'g Graph<V, E>, root: NodeIndex) -> Self {
        CanonicalTree {
            graph,
            nodes: vec![TreeVertex {
                vertex: root,
                depth: 0,
                parents: Vec::new(),
                children: Vec::new(),
            }],
            layers: vec![vec![0]],
            cliques: None,
        }
    }

    /// Like [CanonicalTree::new], but also tracks same-layer cliques, see
    /// [build_last_layer_cliques][CanonicalTree::build_last_layer_cliques].
    pub fn with_cliques(graph: &'g Graph<V, E>, root: NodeIndex) -> Self {
        CanonicalTree {
            cliques: Some(Cliques {
                of: vec![Some(0)],
                sizes: vec![1],
            }),
            ..Self::new(graph, root)
        }
    }

    pub fn graph(&self) -> &'g Graph<V, E> {
        self.graph
    }

    /// The root node.
    pub fn root(&self) -> usize {
        0
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree consists of its root only.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// The depth of the deepest layer.
    pub fn height(&self) -> usize {
        self.layers.len() - 1
    }

    /// The nodes at `depth`, in order of insertion.
    pub fn layer(&self, depth: usize) -> &[usize] {
        self.layers.get(depth).map_or(&[], Vec::as_slice)
    }

    /// The graph vertex `node` stands for.
    pub fn vertex(&self, node: usize) -> NodeIndex {
        self.nodes[node].vertex
    }

    pub fn depth(&self, node: usize) -> usize {
        self.nodes[node].depth
    }

    pub fn parents(&self, node: usize) -> &[usize] {
        &self.nodes[node].parents
    }

    pub fn children(&self, node: usize) -> &[Child] {
        &self.nodes[node].children
    }

    /// Appends a new node for `vertex` to the layer below `parent`.
    pub fn add_node(&mut self, parent: usize, vertex: NodeIndex, edge: EdgeIndex) -> usize {
        let node = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;

        self.nodes.push(TreeVertex {
            vertex,
            depth,
            parents: vec![parent],
            children: Vec::new(),
        });

        self.nodes[parent].children.push(Child { node, edge });

        if self.layers.len() == depth {
            self.layers.push(Vec::new());
        }

        self.layers[depth].push(node);

        if let Some(cliques) = &mut self.cliques {
            cliques.of.push(None);
        }

        node
    }

    /// Links `node` as an additional child of `parent`, which must lie in the layer above it.
    pub fn add_parent(&mut self, node: usize, parent: usize, edge: EdgeIndex) {
        debug_assert_eq!(self.nodes[parent].depth + 1, self.nodes[node].depth);
        self.nodes[node].parents.push(parent);
        self.nodes[parent].children.push(Child { node, edge });
    }

    /// Partitions the deepest layer into cliques of nodes connected through graph edges internal
    /// to that layer.
    ///
    /// Does nothing unless the tree was built [with cliques][CanonicalTree::with_cliques].
    pub fn build_last_layer_cliques(&mut self) {
        let graph = self.graph;
        let layer = self.layer(self.height()).to_vec();
        let Some(cliques) = &mut self.cliques else {
            return;
        };

        let mut occurrences: HashMap<NodeIndex, Vec<usize>> = HashMap::new();
        for &node in &layer {
            occurrences.entry(self.nodes[node].vertex).or_default().push(node);
        }

        let components = connected_components(&layer, |&node| {
            let vertex = self.nodes[node].vertex;
            graph
                .neighbors(vertex)
                .filter_map(|u| occurrences.get(&u))
                .flatten()
                .copied()
                .collect_vec()
        });

        for component in components {
            let clique = cliques.sizes.len();
            cliques.sizes.push(component.len());
            for node in component {
                cliques.of[node] = Some(clique);
            }
        }
    }

    /// A canonical encoding of this tree.
    ///
    /// Layers are encoded from the deepest up. Within a layer, nodes are grouped by their label
    /// and the sorted classes of their children, each distinct group is assigned a class in
    /// lexicographic order, and the layer is written as the list of its groups. Trees with equal
    /// encodings are indistinguishable up to their height.
    pub fn lexicographic_encoding(&self) -> String {
        let mut classes = vec![0; self.nodes.len()];
        let mut layers = Vec::with_capacity(self.layers.len());

        for layer in self.layers.iter().rev() {
            let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for &node in layer {
                groups.entry(self.key(node, &classes)).or_default().push(node);
            }

            let mut encoding = String::new();
            for (class, (key, members)) in groups.into_iter().enumerate() {
                encoding.push_str(&format!(" {class}:({key})"));
                if let Some(cliques) = &self.cliques {
                    let sizes = members
                        .iter()
                        .filter_map(|&node| cliques.of[node])
                        .unique()
                        .map(|clique| cliques.sizes[clique])
                        .sorted();

                    encoding.push_str(&format!("[{}]", sizes.format(", ")));
                }

                for node in members {
                    classes[node] = class;
                }
            }

            layers.push(encoding);
        }

        layers
            .iter()
            .rev()
            .enumerate()
            .map(|(depth, layer)| format!("L{depth}{layer}\n"))
            .collect()
    }

    /// The label of `node` followed by the sorted classes of its children.
    fn key(&self, node: usize, classes: &[usize]) -> String {
        let label = self.graph[self.nodes[node].vertex].label();
        let label = escape(&label);
        let children = &self.nodes[node].children;
        if children.is_empty() {
            return label.into_owned();
        }

        let children = children
            .iter()
            .map(|c| {
                let edge = self.graph[c.edge].label();
                format!("({}){}", escape(&edge), classes[c.node])
            })
            .sorted()
            .join("");

        format!("{label}[{children}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labeled, ring};
    use petgraph::visit::EdgeRef;

    /// Grows the first layer below the root, in order of edge insertion.
    fn star(tree: &mut CanonicalTree<'_, crate::LabeledVertex, crate::LabeledEdge>) {
        let graph = tree.graph();
        let root = tree.vertex(tree.root());
        let edges = graph.edges(root).map(|e| e.id()).sorted();
        for e in edges {
            let other = crate::graph::opposite(graph, e, root);
            tree.add_node(tree.root(), other, e);
        }
    }

    #[test]
    fn single_vertex_tree() {
        let g = labeled(&["A"], &[]);
        let tree = CanonicalTree::new(&g, NodeIndex::new(0));
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.lexicographic_encoding(), "L0 0:(A)\n");
    }

    #[test]
    fn nodes_are_layered() {
        let g = labeled(&["A", "B", "C"], &[(0, 1), (0, 2)]);
        let mut tree = CanonicalTree::new(&g, NodeIndex::new(0));
        star(&mut tree);

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.layer(1), &[1, 2]);
        assert_eq!(tree.depth(2), 1);
        assert_eq!(tree.parents(2), &[0]);
        assert_eq!(tree.vertex(2), NodeIndex::new(2));
        assert!(tree.layer(2).is_empty());
    }

    #[test]
    fn encoding_groups_equal_subtrees() {
        let g = labeled(&["A", "B", "B"], &[(0, 1), (0, 2)]);
        let mut tree = CanonicalTree::new(&g, NodeIndex::new(0));
        star(&mut tree);

        assert_eq!(tree.lexicographic_encoding(), "L0 0:(A[(-)0(-)0])\nL1 0:(B)\n");
    }

    #[test]
    fn encoding_is_independent_of_insertion_order() {
        let g1 = labeled(&["A", "B", "C"], &[(0, 1), (0, 2)]);
        let g2 = labeled(&["A", "C", "B"], &[(0, 1), (0, 2)]);
        let mut t1 = CanonicalTree::new(&g1, NodeIndex::new(0));
        let mut t2 = CanonicalTree::new(&g2, NodeIndex::new(0));
        star(&mut t1);
        star(&mut t2);

        assert_eq!(t1.lexicographic_encoding(), t2.lexicographic_encoding());
    }

    #[test]
    fn labels_never_read_as_structure() {
        let g = labeled(&["R", "B[(-)0]", "B", "C"], &[(0, 1), (0, 2), (2, 3)]);
        let mut tree = CanonicalTree::new(&g, NodeIndex::new(0));
        star(&mut tree);
        tree.add_node(2, NodeIndex::new(3), g.find_edge(2.into(), 3.into()).unwrap());

        assert_eq!(
            tree.lexicographic_encoding(),
            "L0 0:(R[(-)0(-)1])\nL1 0:(B[(-)0]) 1:(B\\[\\(-\\)0\\])\nL2 0:(C)\n"
        );
    }

    #[test]
    fn extra_parents_share_a_subtree() {
        let g = labeled(&["A", "B", "B", "C"], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let mut tree = CanonicalTree::new(&g, NodeIndex::new(0));
        star(&mut tree);

        let c = tree.add_node(1, NodeIndex::new(3), g.find_edge(1.into(), 3.into()).unwrap());
        tree.add_parent(c, 2, g.find_edge(2.into(), 3.into()).unwrap());

        assert_eq!(tree.parents(c), &[1, 2]);
        assert_eq!(tree.children(2), &[Child { node: c, edge: 3.into() }]);
        assert_eq!(
            tree.lexicographic_encoding(),
            "L0 0:(A[(-)0(-)0])\nL1 0:(B[(-)0])\nL2 0:(C)\n"
        );
    }

    #[test]
    fn cliques_join_same_layer_neighbors() {
        let g = ring(3, "A");
        let mut tree = CanonicalTree::with_cliques(&g, NodeIndex::new(0));
        star(&mut tree);
        tree.build_last_layer_cliques();

        assert_eq!(
            tree.lexicographic_encoding(),
            "L0 0:(A[(-)0(-)0])[1]\nL1 0:(A)[2]\n"
        );
    }

    #[test]
    fn disconnected_same_layer_vertices_form_separate_cliques() {
        let g = labeled(&["A", "A", "A"], &[(0, 1), (0, 2)]);
        let mut tree = CanonicalTree::with_cliques(&g, NodeIndex::new(0));
        star(&mut tree);
        tree.build_last_layer_cliques();

        assert_eq!(
            tree.lexicographic_encoding(),
            "L0 0:(A[(-)0(-)0])[1]\nL1 0:(A)[1, 1]\n"
        );
    }

    #[test]
    fn cliques_are_ignored_unless_tracked() {
        let g = ring(3, "A");
        let mut tree = CanonicalTree::new(&g, NodeIndex::new(0));
        star(&mut tree);
        tree.build_last_layer_cliques();

        assert_eq!(tree.lexicographic_encoding(), "L0 0:(A[(-)0(-)0])\nL1 0:(A)\n");
    }
}
