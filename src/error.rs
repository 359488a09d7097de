use std::time::Duration;
use thiserror::Error;

/// The ways a distance computation can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A linear assignment problem was posed on a non-square cost matrix.
    #[error("cost matrix must be square, got {rows}x{columns}")]
    NotSquare { rows: usize, columns: usize },

    /// An assignment does not cover every vertex of the source graph.
    #[error("assignment covers {actual} vertices but the source graph has {expected}")]
    AssignmentLength { expected: usize, actual: usize },

    /// Every perfect matching of the cost matrix includes a forbidden cell.
    #[error("cost matrix admits no finite assignment")]
    Infeasible,

    /// A vertex index does not belong to the graph it was given for.
    #[error("vertex {index} is out of range for a graph of {vertices} vertices")]
    NoSuchVertex { index: usize, vertices: usize },

    /// The search ran out of wall-clock time before reaching a complete edit path.
    #[error("search exceeded its time budget of {0:?}")]
    TimedOut(Duration),

    /// Every complete edit path costs more than the bound the search was given.
    #[error("no edit path costs at most {0}")]
    OutOfBound(f64),

    /// The exact oracle reported a failure.
    #[error("exact oracle failed: {0}")]
    Oracle(String),
}
