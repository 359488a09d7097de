use crate::Error;
use pathfinding::matrix::Matrix;

/// An optimal solution to a linear assignment problem.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Assignment {
    /// The column assigned to each row.
    pub rows: Box<[usize]>,

    /// The sum of the costs of every assigned cell.
    pub cost: f64,
}

impl Assignment {
    /// The row assigned to each column.
    pub fn columns(&self) -> Box<[usize]> {
        let mut columns = vec![0; self.rows.len()];
        for (i, &j) in self.rows.iter().enumerate() {
            columns[j] = i;
        }
        columns.into()
    }
}

/// An abstraction for an exact solver of the linear assignment problem.
///
/// Given a square matrix of non-negative costs, where `f64::INFINITY` marks a forbidden cell,
/// finds a bijection between rows and columns that minimizes the sum of assigned costs.
pub trait Solver {
    /// Solves the assignment problem posed by `costs`.
    ///
    /// Fails with [Error::NotSquare] if `costs` is not square and with [Error::Infeasible] if
    /// every bijection includes a forbidden cell.
    fn solve(&self, costs: &Matrix<f64>) -> Result<Assignment, Error>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn solve(&self, costs: &Matrix<f64>) -> Result<Assignment, Error> {
        (**self).solve(costs)
    }
}

pub(crate) fn dimension(costs: &Matrix<f64>) -> Result<usize, Error> {
    if costs.rows == costs.columns {
        Ok(costs.rows)
    } else {
        Err(Error::NotSquare {
            rows: costs.rows,
            columns: costs.columns,
        })
    }
}

pub(crate) fn total(costs: &Matrix<f64>, rows: &[usize]) -> f64 {
    rows.iter().enumerate().map(|(i, &j)| costs[(i, j)]).sum()
}


#[cfg(test)]
pub(crate) use tests::{brute_force, is_bijection, square};
