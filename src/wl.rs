use crate::graph::{eccentricity, escape};
use crate::{Edge, Graph, GraphEncoder, Vertex};
use itertools::Itertools;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::{fmt::Display, rc::Rc};
use tracing::trace;

/// The vertex partition of a color refinement, identified by one signature per vertex.
struct Partition<S> {
    signatures: Vec<S>,
    classes: usize,
    stable: bool,
}

impl<S: Eq + Hash + Ord> Partition<S> {
    fn new(signatures: Vec<S>) -> Self {
        let classes = signatures.iter().unique().count();
        Partition {
            stable: classes == signatures.len(),
            signatures,
            classes,
        }
    }

    /// Replaces the partition if `signatures` strictly refines it.
    fn refine<V, E>(
        &mut self,
        graph: &Graph<V, E>,
        combine: impl Fn(&S, Vec<&S>) -> S,
    ) -> bool {
        if self.stable {
            return false;
        }

        let signatures: Vec<S> = graph
            .node_indices()
            .map(|v| {
                let neighbors = graph
                    .neighbors(v)
                    .map(|u| &self.signatures[u.index()])
                    .sorted()
                    .collect();

                combine(&self.signatures[v.index()], neighbors)
            })
            .collect();

        let classes = signatures.iter().unique().count();
        trace!(before = self.classes, after = classes, "refined colors");

        // every new class is contained in an old class, so refinement shows in the count alone
        if classes == self.classes {
            self.stable = true;
            return false;
        }

        self.stable = classes == signatures.len();
        self.signatures = signatures;
        self.classes = classes;
        true
    }

    /// Every distinct signature followed by its multiplicity, in lexicographic order.
    fn encoding(&self) -> String
    where
        S: Display,
    {
        self.signatures
            .iter()
            .sorted()
            .dedup_with_count()
            .map(|(count, signature)| format!("{signature}:{count} "))
            .collect()
    }
}

/// The Weisfeiler-Lehman color refinement.
///
/// Every vertex is initially colored by its label, then repeatedly recolored by its own color
/// and the sorted colors of its neighbors, until the partition of vertices by color stops
/// changing. Colors are kept as strings, so that encodings of different graphs are comparable.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let path = from_parts(["A", "A", "A"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge), (1, 2, PlaceholderEdge)]);
///
/// let mut wl = WeisfeilerLehman::new(&path);
/// assert_eq!(wl.lexicographic_encoding(), "A:3 ");
/// assert!(wl.refine());
/// assert_eq!(wl.lexicographic_encoding(), "A[A,A]:1 A[A]:2 ");
/// assert!(!wl.refine());
/// ```
pub struct WeisfeilerLehman<'g, V, E> {
    graph: &'g Graph<V, E>,
    partition: Partition<Rc<str>>,
}

impl<'g, V: Vertex, E: Edge> WeisfeilerLehman<'g, V, E> {
    pub fn new(graph: &'g Graph<V, E>) -> Self {
        let labels: Vec<Rc<str>> = graph
            .node_weights()
            .map(|v| Rc::from(escape(&v.label())))
            .collect();
        WeisfeilerLehman {
            graph,
            partition: Partition::new(labels),
        }
    }

    /// The number of distinct colors.
    pub fn classes(&self) -> usize {
        self.partition.classes
    }
}

impl<'g, V: Vertex, E: Edge> GraphEncoder for WeisfeilerLehman<'g, V, E> {
    fn refine(&mut self) -> bool {
        self.partition.refine(self.graph, |own: &Rc<str>, neighbors| {
            Rc::from(format!("{own}[{}]", neighbors.iter().join(",")))
        })
    }

    fn lexicographic_encoding(&self) -> String {
        self.partition.encoding()
    }
}

fn digest(value: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Like [WeisfeilerLehman], but colors are compressed to hashes and initially also reflect the
/// eccentricity of each vertex, so that refinement looks ahead to the extent of the graph.
pub struct HashedWeisfeilerLehman<'g, V, E> {
    graph: &'g Graph<V, E>,
    partition: Partition<u64>,
}

impl<'g, V: Vertex, E: Edge> HashedWeisfeilerLehman<'g, V, E> {
    pub fn new(graph: &'g Graph<V, E>) -> Self {
        let colors = graph
            .node_indices()
            .map(|v| digest((graph[v].label(), eccentricity(graph, v))))
            .collect();

        HashedWeisfeilerLehman {
            graph,
            partition: Partition::new(colors),
        }
    }

    /// The number of distinct colors.
    pub fn classes(&self) -> usize {
        self.partition.classes
    }
}

impl<'g, V: Vertex, E: Edge> GraphEncoder for HashedWeisfeilerLehman<'g, V, E> {
    fn refine(&mut self) -> bool {
        self.partition
            .refine(self.graph, |&own, neighbors| digest((own, neighbors)))
    }

    fn lexicographic_encoding(&self) -> String {
        self.partition.encoding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labeled, ring, MockGraph};
    use test_strategy::proptest;

    #[test]
    fn distinct_labels_are_already_stable() {
        let g = labeled(&["A", "B", "C"], &[(0, 1), (1, 2)]);
        let mut wl = WeisfeilerLehman::new(&g);
        assert!(!wl.refine());
        assert_eq!(wl.lexicographic_encoding(), "A:1 B:1 C:1 ");
    }

    #[test]
    fn regular_graphs_are_stable_immediately() {
        let g = ring(5, "A");
        let mut wl = WeisfeilerLehman::new(&g);
        assert!(!wl.refine());
        assert_eq!(wl.classes(), 1);
    }

    #[test]
    fn stability_is_permanent() {
        let g = labeled(&["A", "A", "A", "A"], &[(0, 1), (1, 2), (2, 3)]);
        let mut wl = WeisfeilerLehman::new(&g);
        assert!(wl.refine());
        assert!(!wl.refine());
        assert!(!wl.refine());
        assert_eq!(wl.classes(), 2);
    }

    #[test]
    fn rings_and_triangles_are_indistinguishable() {
        let triangles = labeled(
            &["A"; 6],
            &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)],
        );
        let hexagon = ring(6, "A");

        let mut a = WeisfeilerLehman::new(&triangles);
        let mut b = WeisfeilerLehman::new(&hexagon);
        a.fully_refine();
        b.fully_refine();
        assert_eq!(a.lexicographic_encoding(), b.lexicographic_encoding());
    }

    #[test]
    fn look_ahead_distinguishes_rings_from_triangles() {
        let triangles = labeled(
            &["A"; 6],
            &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)],
        );
        let hexagon = ring(6, "A");

        let a = HashedWeisfeilerLehman::new(&triangles);
        let b = HashedWeisfeilerLehman::new(&hexagon);
        assert_ne!(a.lexicographic_encoding(), b.lexicographic_encoding());
    }

    #[proptest]
    fn refinement_is_monotone_and_terminates(g: MockGraph) {
        let mut wl = WeisfeilerLehman::new(&*g);
        let mut classes = wl.classes();
        let mut steps = 0;
        while wl.refine() {
            assert!(wl.classes() > classes);
            classes = wl.classes();
            steps += 1;
        }

        assert!(steps <= g.node_count());
        assert_eq!(wl.classes(), classes);
    }

    #[proptest]
    fn hashed_refinement_is_monotone_and_terminates(g: MockGraph) {
        let mut wl = HashedWeisfeilerLehman::new(&*g);
        let mut classes = wl.classes();
        let mut steps = 0;
        while wl.refine() {
            assert!(wl.classes() > classes);
            classes = wl.classes();
            steps += 1;
        }

        assert!(steps <= g.node_count());
    }

    #[proptest]
    fn hashing_preserves_the_partition(g: MockGraph) {
        let mut plain = WeisfeilerLehman::new(&*g);
        let mut hashed = HashedWeisfeilerLehman::new(&*g);
        plain.fully_refine();
        hashed.fully_refine();
        assert!(hashed.classes() >= plain.classes());
    }
}
