//! # Overview
//!
//! This crate measures how far apart two labeled, undirected graphs are by their
//! [graph edit distance][ged], the cost of the cheapest sequence of vertex and edge
//! substitutions, insertions and deletions that transforms one graph into the other.
//!
//! Computing the edit distance exactly is NP-hard, so besides an exhaustive
//! [ExactGraphEditDistance] and a [BeamSearch] that is exact when its beam is unbounded, this
//! crate provides approximations that assign the vertices of one graph to the vertices of the
//! other by solving a single linear assignment problem:
//!
//! * [BipartiteMatching] scores each pair of vertices by their labels and incident edges.
//! * [SdtedDistance] scores each pair of vertices by the structure and depth preserving tree edit
//!   distance between their [neighborhood trees][NeighborhoodTrees].
//! * [WalkMatching] scores each pair of vertices by the labels their walks of a fixed length
//!   reach.
//! * [GraphletMatching] scores each pair of vertices by the edit distance between the subgraphs
//!   around them.
//!
//! Every approximation reports the cost of the edit path implied by its assignment, which is an
//! upper bound of the edit distance.
//!
//! [ged]: https://en.wikipedia.org/wiki/Graph_edit_distance
//!
//! # Example
//!
//! ```rust
//! use graph_edit_distance::*;
//!
//! let costs = CostModel::default();
//!
//! let path = from_parts(
//!     ["C", "C", "O"].map(LabeledVertex::from),
//!     [(0, 1, LabeledEdge::from("-")), (1, 2, LabeledEdge::from("="))],
//! );
//!
//! let triangle = from_parts(
//!     ["C", "C", "O"].map(LabeledVertex::from),
//!     [(0, 1, "-".into()), (1, 2, "=".into()), (2, 0, LabeledEdge::from("-"))],
//! );
//!
//! let exact = ExactGraphEditDistance::new(costs);
//! assert_eq!(exact.compute_graph_distance(&path, &triangle), Ok(1.));
//!
//! let distances: [Box<dyn GraphDistance<LabeledVertex, LabeledEdge>>; 3] = [
//!     Box::new(BipartiteMatching::new(costs)),
//!     Box::new(BeamSearch::new(costs, 10)),
//!     Box::new(SdtedDistance::new(costs).with_growth(Growth::BreadthCliques)),
//! ];
//!
//! for distance in distances {
//!     assert!(distance.compute_graph_distance(&path, &triangle).unwrap() >= 1.);
//! }
//! ```

mod assignment;
mod beam;
mod bipartite;
mod cost;
mod distance;
mod edit_path;
mod encoder;
mod error;
mod exact;
mod graph;
mod graphlet;
mod hungarian;
mod jonker_volgenant;
mod neighborhood;
mod oracle;
mod sdted;
mod tree;
mod walks;
mod wl;

pub use assignment::*;
pub use beam::*;
pub use bipartite::*;
pub use cost::*;
pub use distance::*;
pub use edit_path::*;
pub use encoder::*;
pub use error::*;
pub use exact::*;
pub use graph::*;
pub use graphlet::*;
pub use hungarian::*;
pub use jonker_volgenant::*;
pub use neighborhood::*;
pub use oracle::*;
pub use sdted::*;
pub use tree::*;
pub use walks::*;
pub use wl::*;
