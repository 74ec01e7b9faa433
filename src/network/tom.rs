//! Topological overlap dissimilarity
//! R equivalent: TOMdist() / 1 - TOMsimilarity(adjacency) in WGCNA
//!
//! The dominant cost of the pipeline: O(n^2) memory and O(n^3) work over n
//! genes. Rows are independent, so the computation is parallelized across
//! the rayon pool and polls the cancel token once per row.

use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::error::{Result, WgcnaError};
use crate::network::CancelToken;

/// Topological-overlap dissimilarity of a signed adjacency matrix
///
/// For i != j:
///   tom_ij = (l_ij + a_ij) / (min(k_i, k_j) + 1 - a_ij)
/// where l_ij is the shared-neighbor term sum_{u != i,j} a_iu * a_uj and
/// k_i the connectivity of gene i excluding the diagonal. Dissimilarity is
/// 1 - tom, clamped to [0, 1], with a zero diagonal.
pub fn tom_dissimilarity(adjacency: &Array2<f64>, cancel: &CancelToken) -> Result<Array2<f64>> {
    let n = adjacency.nrows();
    debug_assert_eq!(n, adjacency.ncols());

    // Connectivity excluding the unit diagonal
    let connectivity: Vec<f64> = adjacency
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(i, row)| row.iter().enumerate().filter(|&(j, _)| j != i).map(|(_, &a)| a).sum())
        .collect();

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| -> Result<Vec<f64>> {
            if cancel.is_cancelled() {
                return Err(WgcnaError::Cancelled);
            }

            let row_i = adjacency.row(i);
            let mut out = vec![0.0; n];
            for j in 0..n {
                if j == i {
                    continue;
                }
                let a_ij = adjacency[[i, j]];

                // Full dot product includes the u == i and u == j terms,
                // each contributing a_ij under a unit diagonal.
                let dot: f64 = row_i
                    .iter()
                    .zip(adjacency.row(j).iter())
                    .map(|(&x, &y)| x * y)
                    .sum();
                let shared = dot - 2.0 * a_ij;

                let denom = connectivity[i].min(connectivity[j]) + 1.0 - a_ij;
                let tom = if denom > 0.0 {
                    (shared + a_ij) / denom
                } else {
                    0.0
                };

                out[j] = (1.0 - tom).clamp(0.0, 1.0);
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut dissim = Array2::zeros((n, n));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, d) in row.into_iter().enumerate() {
            dissim[[i, j]] = d;
        }
    }

    // Numerical asymmetry from the parallel reduction order is possible in
    // principle; enforce exact symmetry for the clustering stage.
    for i in 0..n {
        for j in (i + 1)..n {
            let v = (dissim[[i, j]] + dissim[[j, i]]) / 2.0;
            dissim[[i, j]] = v;
            dissim[[j, i]] = v;
        }
    }

    Ok(dissim)
}
