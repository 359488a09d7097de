use crate::{assignment, Assignment, Error, Solver};
use pathfinding::matrix::Matrix;
use tracing::trace;

/// The shortest augmenting path algorithm by Jonker and Volgenant.
///
/// Dual prices are initialized by column reduction and two passes of augmenting row reduction,
/// after which every row left unassigned is matched through a Dijkstra-like search for the
/// cheapest alternating path ending at a free column.
///
/// Runs in `O(n³)`, but the reduction phases usually leave very few rows for the last phase.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct JonkerVolgenant;

impl Solver for JonkerVolgenant {
    fn solve(&self, costs: &Matrix<f64>) -> Result<Assignment, Error> {
        let n = assignment::dimension(costs)?;
        if n == 0 {
            return Ok(Assignment::default());
        }

        let c = |i: usize, j: usize| costs[(i, j)];

        let mut v = vec![0.; n];
        let mut rowsol = vec![0; n];
        let mut colsol: Vec<Option<usize>> = vec![None; n];

        // Column reduction, in reverse order.
        let mut matches = vec![0usize; n];
        for j in (0..n).rev() {
            let (imin, min) = (1..n).fold((0, c(0, j)), |(imin, min), i| {
                if c(i, j) < min {
                    (i, c(i, j))
                } else {
                    (imin, min)
                }
            });

            if !min.is_finite() {
                return Err(Error::Infeasible);
            }

            v[j] = min;
            matches[imin] += 1;
            if matches[imin] == 1 {
                rowsol[imin] = j;
                colsol[j] = Some(imin);
            }
        }

        // Reduction transfer from singly assigned rows.
        let mut free = Vec::with_capacity(n);
        for i in 0..n {
            match matches[i] {
                0 => free.push(i),
                1 => {
                    let j1 = rowsol[i];
                    let min = (0..n)
                        .filter(|&j| j != j1)
                        .map(|j| c(i, j) - v[j])
                        .fold(f64::INFINITY, f64::min);

                    if min.is_finite() {
                        v[j1] -= min;
                    }
                }
                _ => {}
            }
        }

        // Augmenting row reduction.
        for _ in 0..2 {
            for i in std::mem::take(&mut free) {
                let (mut j1, mut j2) = (0, 0);
                let mut umin = c(i, 0) - v[0];
                let mut usubmin = f64::INFINITY;
                for j in 1..n {
                    let h = c(i, j) - v[j];
                    if h < usubmin {
                        if h >= umin {
                            usubmin = h;
                            j2 = j;
                        } else {
                            usubmin = umin;
                            umin = h;
                            j2 = j1;
                            j1 = j;
                        }
                    }
                }

                if !umin.is_finite() {
                    return Err(Error::Infeasible);
                }

                let mut i0 = colsol[j1];
                if umin < usubmin {
                    if usubmin.is_finite() {
                        v[j1] -= usubmin - umin;
                    }
                } else if i0.is_some() {
                    j1 = j2;
                    i0 = colsol[j2];
                }

                rowsol[i] = j1;
                colsol[j1] = Some(i);

                // The displaced row is retried in the next pass, or augmented if none is left.
                free.extend(i0);
            }
        }

        trace!(size = n, augmentations = free.len(), "reduced");

        // Augmentation.
        let mut d = vec![0.; n];
        let mut pred = vec![0; n];
        let mut collist: Vec<usize> = (0..n).collect();

        for &freerow in &free {
            for j in 0..n {
                d[j] = c(freerow, j) - v[j];
                pred[j] = freerow;
                collist[j] = j;
            }

            let (mut low, mut up) = (0, 0);
            let mut ready = 0;
            let mut min = 0.;

            let endofpath = 'search: loop {
                if up == low {
                    // Scan for the columns at minimum distance.
                    ready = low;
                    min = d[collist[up]];
                    up += 1;
                    for k in up..n {
                        let j = collist[k];
                        let h = d[j];
                        if h <= min {
                            if h < min {
                                up = low;
                                min = h;
                            }
                            collist.swap(k, up);
                            up += 1;
                        }
                    }

                    if !min.is_finite() {
                        return Err(Error::Infeasible);
                    }

                    if let Some(&j) = collist[low..up].iter().find(|&&j| colsol[j].is_none()) {
                        break 'search j;
                    }
                }

                let j1 = collist[low];
                low += 1;

                let i = colsol[j1].ok_or(Error::Infeasible)?;
                let h = c(i, j1) - v[j1] - min;

                for k in up..n {
                    let j = collist[k];
                    let v2 = c(i, j) - v[j] - h;
                    if v2 < d[j] {
                        pred[j] = i;
                        if v2 == min {
                            if colsol[j].is_none() {
                                break 'search j;
                            }

                            collist.swap(k, up);
                            up += 1;
                        }

                        d[j] = v2;
                    }
                }
            };

            // Update the prices of the columns scanned before the last minimum was found.
            for &j in &collist[..ready] {
                v[j] += d[j] - min;
            }

            let mut j = endofpath;
            loop {
                let i = pred[j];
                colsol[j] = Some(i);
                let next = rowsol[i];
                rowsol[i] = j;
                if i == freerow {
                    break;
                }
                j = next;
            }
        }

        let cost = assignment::total(costs, &rowsol);
        if !cost.is_finite() {
            return Err(Error::Infeasible);
        }

        Ok(Assignment {
            rows: rowsol.into(),
            cost,
        })
    }
}
