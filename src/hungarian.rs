use crate::{assignment, Assignment, Error, Solver};
use pathfinding::matrix::Matrix;

/// The classical Hungarian method, maintaining row and column potentials while growing a
/// shortest alternating path one row at a time.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Hungarian;

impl Solver for Hungarian {
    fn solve(&self, costs: &Matrix<f64>) -> Result<Assignment, Error> {
        let n = assignment::dimension(costs)?;
        if n == 0 {
            return Ok(Assignment::default());
        }

        // Potentials and matches are 1-based, index 0 stands for the virtual root column.
        let mut u = vec![0.; n + 1];
        let mut v = vec![0.; n + 1];
        let mut p = vec![0usize; n + 1];
        let mut way = vec![0usize; n + 1];

        for i in 1..=n {
            p[0] = i;
            let mut j0 = 0;
            let mut minv = vec![f64::INFINITY; n + 1];
            let mut used = vec![false; n + 1];

            loop {
                used[j0] = true;
                let i0 = p[j0];
                let mut delta = f64::INFINITY;
                let mut j1 = 0;

                for j in 1..=n {
                    if !used[j] {
                        let cur = costs[(i0 - 1, j - 1)] - u[i0] - v[j];
                        if cur < minv[j] {
                            minv[j] = cur;
                            way[j] = j0;
                        }

                        if minv[j] < delta {
                            delta = minv[j];
                            j1 = j;
                        }
                    }
                }

                if !delta.is_finite() {
                    return Err(Error::Infeasible);
                }

                for j in 0..=n {
                    if used[j] {
                        u[p[j]] += delta;
                        v[j] -= delta;
                    } else {
                        minv[j] -= delta;
                    }
                }

                j0 = j1;
                if p[j0] == 0 {
                    break;
                }
            }

            while j0 != 0 {
                let j1 = way[j0];
                p[j0] = p[j1];
                j0 = j1;
            }
        }

        let mut rows = vec![0; n];
        for j in 1..=n {
            rows[p[j] - 1] = j - 1;
        }

        Ok(Assignment {
            cost: assignment::total(costs, &rows),
            rows: rows.into(),
        })
    }
}
