use crate::bipartite::{padded_matrix, Layout};
use crate::edit_path::natural_edit_path_cost;
use crate::{Assignment, CanonicalTree, Child, CostModel, Edge, Error, Graph, GraphDistance};
use crate::{GraphEncoder, Growth, JonkerVolgenant, NeighborhoodTrees, Solver, Vertex};
use indexmap::IndexSet;
use itertools::Itertools;
use pathfinding::matrix::Matrix;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// The structural signature of a subtree: its root label and the sorted edge labels and
/// signature ids of its children.
type Signature = (String, Vec<(String, usize)>);

/// Distances between subtrees, keyed by the unordered pair of their signature ids.
#[derive(Debug, Default)]
struct Memo {
    signatures: IndexSet<Signature>,
    distances: HashMap<(usize, usize), f64>,
    hits: usize,
    misses: usize,
}

/// A tree along with the per node data the distance computation needs.
///
/// Children are ordered by edge label and then by the content hash of their subtree, so equal
/// subtrees list their children alike wherever they occur.
struct Prepared<'t, 'g, V, E> {
    tree: &'t CanonicalTree<'g, V, E>,
    children: Vec<Vec<Child>>,
    hashes: Vec<u64>,
    deletion: Vec<f64>,
    ids: Vec<usize>,
}

fn digest(value: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// The structure and depth preserving tree edit distance.
///
/// Roots are substituted by roots and the children of substituted nodes are matched by an optimal
/// assignment, so that every edit preserves the depth of the nodes it touches. The cost of
/// matching children is scaled by the layer weight at every level, so with a weight below one
/// deeper differences matter less.
///
/// The cached variant interns the signature of every subtree and remembers the distance between
/// every pair of signatures it resolves, which lets identical subtrees share their work. Both
/// variants compute the same distances.
///
/// ```rust
/// use graph_edit_distance::*;
///
/// let g = from_parts(["A", "B", "C"].map(LabeledVertex::from), [(0, 1, PlaceholderEdge), (0, 2, PlaceholderEdge)]);
///
/// let mut trees = NeighborhoodTrees::new(&g, Growth::Breadth);
/// trees.fully_refine();
///
/// let mut sdted = Sdted::cached(CostModel::default(), 1.);
/// assert_eq!(sdted.distance(Some(&trees.trees()[0]), Some(&trees.trees()[0])), Ok(0.));
/// assert_eq!(sdted.distance(Some(&trees.trees()[1]), None), Ok(5.));
/// ```
pub struct Sdted<S = JonkerVolgenant> {
    costs: CostModel,
    layer_weight: f64,
    solver: S,
    memo: Option<Memo>,
}

impl Sdted {
    /// Remembers the distance between every pair of distinct subtrees.
    pub fn cached(costs: CostModel, layer_weight: f64) -> Self {
        Sdted {
            costs,
            layer_weight,
            solver: JonkerVolgenant,
            memo: Some(Memo::default()),
        }
    }

    /// Recomputes the distance between subtrees every time it is needed.
    pub fn uncached(costs: CostModel, layer_weight: f64) -> Self {
        Sdted {
            costs,
            layer_weight,
            solver: JonkerVolgenant,
            memo: None,
        }
    }
}

impl<S: Solver> Sdted<S> {
    /// Switches to another assignment [Solver].
    pub fn with_solver<T: Solver>(self, solver: T) -> Sdted<T> {
        Sdted {
            costs: self.costs,
            layer_weight: self.layer_weight,
            solver,
            memo: self.memo,
        }
    }

    /// The distance between the trees `t1` and `t2`, where a missing tree is inserted or deleted.
    pub fn distance<V: Vertex, E: Edge>(
        &mut self,
        t1: Option<&CanonicalTree<'_, V, E>>,
        t2: Option<&CanonicalTree<'_, V, E>>,
    ) -> Result<f64, Error> {
        match (t1, t2) {
            (None, None) => Ok(0.),
            (Some(t), None) | (None, Some(t)) => Ok(self.prepare(t).deletion[t.root()]),
            (Some(t1), Some(t2)) => {
                let (p1, p2) = (self.prepare(t1), self.prepare(t2));
                self.subtree_distance(&p1, t1.root(), &p2, t2.root())
            }
        }
    }

    /// Builds the cost matrix between two lists of trees.
    ///
    /// The matrix is square in the length of the longer list and padding cells hold the cost of
    /// deleting the tree in their row or column.
    pub fn cost_matrix<V: Vertex, E: Edge>(
        &mut self,
        trees1: &[CanonicalTree<'_, V, E>],
        trees2: &[CanonicalTree<'_, V, E>],
    ) -> Result<Matrix<f64>, Error> {
        let prepared1: Vec<_> = trees1.iter().map(|t| self.prepare(t)).collect();
        let prepared2: Vec<_> = trees2.iter().map(|t| self.prepare(t)).collect();

        let matrix = padded_matrix(
            trees1.len(),
            trees2.len(),
            Layout::Rectangular,
            |i, j| {
                let (p1, p2) = (&prepared1[i], &prepared2[j]);
                self.subtree_distance(p1, p1.tree.root(), p2, p2.tree.root())
            },
            |i| prepared1[i].deletion[0],
            |j| prepared2[j].deletion[0],
        )?;

        if let Some(memo) = &self.memo {
            debug!(
                hits = memo.hits,
                misses = memo.misses,
                stored = memo.distances.len(),
                signatures = memo.signatures.len(),
                "sdted cache"
            );
        }

        Ok(matrix)
    }

    /// Solves the [cost matrix][Sdted::cost_matrix] between two lists of trees.
    pub fn assignment<V: Vertex, E: Edge>(
        &mut self,
        trees1: &[CanonicalTree<'_, V, E>],
        trees2: &[CanonicalTree<'_, V, E>],
    ) -> Result<Assignment, Error> {
        let matrix = self.cost_matrix(trees1, trees2)?;
        self.solver.solve(&matrix)
    }

    /// Computes the canonical child order, content hashes, deletion costs and, if cached,
    /// signature ids for every node, deepest layer first.
    fn prepare<'t, 'g, V: Vertex, E: Edge>(
        &mut self,
        tree: &'t CanonicalTree<'g, V, E>,
    ) -> Prepared<'t, 'g, V, E> {
        let graph = tree.graph();
        let costs = &self.costs;
        let mut ordered = vec![Vec::new(); tree.len()];
        let mut hashes = vec![0; tree.len()];
        let mut deletion = vec![0.; tree.len()];
        let mut ids = match self.memo {
            Some(_) => vec![0; tree.len()],
            None => Vec::new(),
        };

        for depth in (0..=tree.height()).rev() {
            for &node in tree.layer(depth) {
                let vertex = &graph[tree.vertex(node)];
                let keyed = tree
                    .children(node)
                    .iter()
                    .map(|&c| (graph[c.edge].label().into_owned(), hashes[c.node], c))
                    .sorted_by(|x, y| (&x.0, x.1).cmp(&(&y.0, y.1)))
                    .collect_vec();

                let children: Vec<Child> = keyed.iter().map(|&(_, _, c)| c).collect();
                let below: f64 = children
                    .iter()
                    .map(|c| deletion[c.node] + graph[c.edge].deletion_cost(costs))
                    .sum();

                deletion[node] = vertex.deletion_cost(costs) + self.layer_weight * below;
                hashes[node] = digest((
                    vertex.label(),
                    keyed.iter().map(|(l, h, _)| (l, h)).collect_vec(),
                ));

                if let Some(memo) = &mut self.memo {
                    let children = children
                        .iter()
                        .map(|c| (graph[c.edge].label().into_owned(), ids[c.node]))
                        .sorted()
                        .collect();

                    ids[node] = memo
                        .signatures
                        .insert_full((vertex.label().into_owned(), children))
                        .0;
                }

                ordered[node] = children;
            }
        }

        Prepared {
            tree,
            children: ordered,
            hashes,
            deletion,
            ids,
        }
    }

    /// Looks up the distance between two subtrees, if it is known without computing it.
    fn recall<V, E>(
        &mut self,
        p1: &Prepared<'_, '_, V, E>,
        a: usize,
        p2: &Prepared<'_, '_, V, E>,
        b: usize,
    ) -> Option<f64> {
        let memo = self.memo.as_mut()?;
        let (x, y) = (p1.ids[a], p2.ids[b]);
        if x == y {
            return Some(0.);
        }

        let known = memo.distances.get(&(x.min(y), x.max(y))).copied();
        match known {
            Some(_) => memo.hits += 1,
            None => memo.misses += 1,
        }

        known
    }

    fn remember<V, E>(
        &mut self,
        p1: &Prepared<'_, '_, V, E>,
        a: usize,
        p2: &Prepared<'_, '_, V, E>,
        b: usize,
        distance: f64,
    ) {
        if let Some(memo) = &mut self.memo {
            let (x, y) = (p1.ids[a], p2.ids[b]);
            memo.distances.insert((x.min(y), x.max(y)), distance);
        }
    }

    /// The distance between the subtrees rooted at `r1` and `r2`.
    ///
    /// Pairs of nodes are resolved on an explicit stack, every pair after all pairs of their
    /// children.
    fn subtree_distance<V: Vertex, E: Edge>(
        &mut self,
        p1: &Prepared<'_, '_, V, E>,
        r1: usize,
        p2: &Prepared<'_, '_, V, E>,
        r2: usize,
    ) -> Result<f64, Error> {
        if let Some(distance) = self.recall(p1, r1, p2, r2) {
            return Ok(distance);
        }

        let mut done: HashMap<(usize, usize), f64> = HashMap::new();
        let mut stack = vec![(r1, r2)];

        while let Some(&(a, b)) = stack.last() {
            if done.contains_key(&(a, b)) {
                stack.pop();
                continue;
            }

            let mut pending = false;
            for c1 in &p1.children[a] {
                for c2 in &p2.children[b] {
                    let pair = (c1.node, c2.node);
                    if done.contains_key(&pair) {
                        continue;
                    }

                    match self.recall(p1, c1.node, p2, c2.node) {
                        Some(distance) => {
                            done.insert(pair, distance);
                        }
                        None => {
                            stack.push(pair);
                            pending = true;
                        }
                    }
                }
            }

            if pending {
                continue;
            }

            let distance = self.resolve(p1, a, p2, b, &done)?;
            self.remember(p1, a, p2, b, distance);

            // without a cache, shared subtrees are recomputed for every parent
            if self.memo.is_none() {
                for c1 in &p1.children[a] {
                    for c2 in &p2.children[b] {
                        done.remove(&(c1.node, c2.node));
                    }
                }
            }

            done.insert((a, b), distance);
            stack.pop();
        }

        Ok(done.get(&(r1, r2)).copied().unwrap_or_default())
    }

    /// The distance between nodes `a` and `b`, given the distances between all pairs of their
    /// children.
    ///
    /// The subtree with the lesser content hash supplies the rows of the child matrix, so the
    /// result is the same whichever side a pair is looked up from.
    fn resolve<V: Vertex, E: Edge>(
        &self,
        p1: &Prepared<'_, '_, V, E>,
        a: usize,
        p2: &Prepared<'_, '_, V, E>,
        b: usize,
        done: &HashMap<(usize, usize), f64>,
    ) -> Result<f64, Error> {
        if p2.hashes[b] < p1.hashes[a] {
            self.match_children(p2, b, p1, a, |y, x| done[&(x, y)])
        } else {
            self.match_children(p1, a, p2, b, |x, y| done[&(x, y)])
        }
    }

    fn match_children<V: Vertex, E: Edge>(
        &self,
        p1: &Prepared<'_, '_, V, E>,
        a: usize,
        p2: &Prepared<'_, '_, V, E>,
        b: usize,
        distance: impl Fn(usize, usize) -> f64,
    ) -> Result<f64, Error> {
        let (t1, t2) = (p1.tree, p2.tree);
        let (g1, g2) = (t1.graph(), t2.graph());
        let costs = &self.costs;

        let vertex = g1[t1.vertex(a)].distance(&g2[t2.vertex(b)], costs);
        let (children1, children2) = (&p1.children[a], &p2.children[b]);
        if children1.is_empty() && children2.is_empty() {
            return Ok(vertex);
        }

        let matrix = padded_matrix(
            children1.len(),
            children2.len(),
            Layout::Rectangular,
            |i, j| {
                let (c1, c2) = (children1[i], children2[j]);
                Ok(distance(c1.node, c2.node) + g1[c1.edge].distance(&g2[c2.edge], costs))
            },
            |i| p1.deletion[children1[i].node] + g1[children1[i].edge].deletion_cost(costs),
            |j| p2.deletion[children2[j].node] + g2[children2[j].edge].deletion_cost(costs),
        )?;

        Ok(vertex + self.layer_weight * self.solver.solve(&matrix)?.cost)
    }
}

/// A graph edit distance approximation that matches vertices by the [Sdted] between their
/// neighborhood trees.
///
/// Both graphs are encoded as [NeighborhoodTrees] refined a number of steps, the vertices are
/// assigned by solving the cost matrix of tree distances, and the cost of the edit path implied
/// by that assignment is reported.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SdtedDistance {
    costs: CostModel,
    growth: Growth,
    steps: Option<usize>,
    layer_weight: f64,
    cached: bool,
}

impl SdtedDistance {
    /// Fully refined [Growth::Breadth] trees with unit layer weight and a cache.
    pub fn new(costs: CostModel) -> Self {
        SdtedDistance {
            costs,
            growth: Growth::default(),
            steps: None,
            layer_weight: 1.,
            cached: true,
        }
    }

    pub fn with_growth(self, growth: Growth) -> Self {
        SdtedDistance { growth, ..self }
    }

    /// Limits refinement to `steps`, or refines until stable if `None`.
    pub fn with_steps(self, steps: Option<usize>) -> Self {
        SdtedDistance { steps, ..self }
    }

    pub fn with_layer_weight(self, layer_weight: f64) -> Self {
        SdtedDistance {
            layer_weight,
            ..self
        }
    }

    pub fn with_cache(self, cached: bool) -> Self {
        SdtedDistance { cached, ..self }
    }

    fn sdted(&self) -> Sdted {
        if self.cached {
            Sdted::cached(self.costs, self.layer_weight)
        } else {
            Sdted::uncached(self.costs, self.layer_weight)
        }
    }
}

impl<V: Vertex, E: Edge> GraphDistance<V, E> for SdtedDistance {
    fn id(&self) -> String {
        let steps = self.steps.map_or(-1, |s| s as i64);
        format!(
            "SDTEDbasedDistance{}_{}_{:?}",
            self.growth, steps, self.layer_weight
        )
    }

    fn compute_graph_distance(&self, g1: &Graph<V, E>, g2: &Graph<V, E>) -> Result<f64, Error> {
        let mut trees1 = NeighborhoodTrees::new(g1, self.growth);
        let mut trees2 = NeighborhoodTrees::new(g2, self.growth);
        trees1.refinement_steps(self.steps);
        trees2.refinement_steps(self.steps);

        let assignment = self.sdted().assignment(trees1.trees(), trees2.trees())?;
        let rows = &assignment.rows[..g1.node_count()];
        let cost = natural_edit_path_cost(g1, g2, rows, &self.costs)?;
        debug!(id = %GraphDistance::<V, E>::id(self), assignment = assignment.cost, cost);
        Ok(cost)
    }
}
