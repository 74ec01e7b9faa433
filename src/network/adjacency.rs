//! Gene-gene correlation and signed adjacency matrices
//! R equivalent: WGCNA::adjacency(datExpr, power, type="signed")

use ndarray::Array2;
use rayon::prelude::*;

use crate::config::CorrelationMethod;
use crate::data::ExpressionMatrix;
use crate::stats::{mid_ranks, pearson};

/// Pairwise gene-gene correlation matrix
///
/// Spearman is computed as Pearson on per-gene mid-ranks, so ranking
/// happens once per gene rather than once per pair. Undefined correlations
/// (zero-variance genes) are left as NaN for the adjacency transform to
/// absorb.
pub fn correlation_matrix(expr: &ExpressionMatrix, method: CorrelationMethod) -> Array2<f64> {
    let n_genes = expr.n_genes();

    let profiles: Vec<Vec<f64>> = (0..n_genes)
        .map(|i| {
            let row: Vec<f64> = expr.gene_profile(i).to_vec();
            match method {
                CorrelationMethod::Pearson => row,
                CorrelationMethod::Spearman => mid_ranks(&row),
            }
        })
        .collect();

    let rows: Vec<Vec<f64>> = (0..n_genes)
        .into_par_iter()
        .map(|i| {
            (0..n_genes)
                .map(|j| {
                    if i == j {
                        1.0
                    } else {
                        pearson(&profiles[i], &profiles[j])
                    }
                })
                .collect()
        })
        .collect();

    let mut cor = Array2::zeros((n_genes, n_genes));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, r) in row.into_iter().enumerate() {
            cor[[i, j]] = r;
        }
    }
    cor
}

/// Signed adjacency transform: a_ij = ((1 + r_ij) / 2)^power
///
/// Anti-correlated genes land near 0 instead of being folded onto the
/// co-expressed end as an unsigned network would. The diagonal is 1.
/// Undefined correlations map to adjacency 0 so a degenerate gene is
/// disconnected rather than poisoning downstream matrices.
pub fn signed_adjacency(correlations: &Array2<f64>, power: f64) -> Array2<f64> {
    let n = correlations.nrows();
    let mut adj = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            adj[[i, j]] = if i == j {
                1.0
            } else {
                let r = correlations[[i, j]];
                if r.is_finite() {
                    ((1.0 + r) / 2.0).powf(power).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            };
        }
    }
    adj
}
