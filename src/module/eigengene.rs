//! Module eigengene computation
//! R equivalent: moduleEigengenes() in WGCNA
//!
//! The eigengene of a module is the first principal component of its
//! standardized member-gene expression across samples: one synthetic
//! profile summarizing the module. The principal component comes from an
//! eigendecomposition of the sample-by-sample covariance of the
//! standardized member matrix; its sign is aligned with the module's mean
//! expression profile so a rising module yields a rising eigengene.

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::cluster::ModuleAssignment;
use crate::data::ExpressionMatrix;
use crate::error::{Result, WgcnaError};
use crate::stats::{mean, pearson, sample_sd};

/// Per-module summary expression profiles (modules x samples)
#[derive(Debug, Clone)]
pub struct EigengeneTable {
    modules: Vec<String>,
    sample_ids: Vec<String>,
    values: Array2<f64>,
}

impl EigengeneTable {
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Eigengene values as a view (one row per module)
    pub fn values(&self) -> ndarray::ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Eigengene of one module across samples
    pub fn eigengene(&self, module_idx: usize) -> ndarray::ArrayView1<'_, f64> {
        self.values.row(module_idx)
    }

    /// Row index of a module by label
    pub fn module_index(&self, label: &str) -> Option<usize> {
        self.modules.iter().position(|m| m == label)
    }
}

/// Z-score a gene profile; zero-variance genes map to all zeros
fn standardize(profile: &[f64]) -> Vec<f64> {
    let m = mean(profile);
    let sd = sample_sd(profile);
    if !sd.is_finite() || sd == 0.0 {
        return vec![0.0; profile.len()];
    }
    profile.iter().map(|&v| (v - m) / sd).collect()
}

/// First principal component of the standardized member matrix across
/// samples, via the sample-by-sample covariance eigendecomposition
fn first_principal_component(standardized: &[Vec<f64>], n_samples: usize) -> Vec<f64> {
    let n_members = standardized.len();

    // Sample-by-sample covariance C = X^T X / m
    let mut cov = DMatrix::zeros(n_samples, n_samples);
    for a in 0..n_samples {
        for b in a..n_samples {
            let mut sum = 0.0;
            for row in standardized {
                sum += row[a] * row[b];
            }
            let v = sum / n_members as f64;
            cov[(a, b)] = v;
            cov[(b, a)] = v;
        }
    }

    let eigen = cov.symmetric_eigen();
    let mut best = 0;
    for i in 1..eigen.eigenvalues.len() {
        if eigen.eigenvalues[i] > eigen.eigenvalues[best] {
            best = i;
        }
    }

    eigen.eigenvectors.column(best).iter().copied().collect()
}

/// Compute one eigengene per non-sentinel module
///
/// The returned table has exactly one row per module of `assignment`, in
/// the assignment's (descending size) module order, and one column per
/// sample of `expr`. A single-gene module uses that gene's standardized
/// profile directly.
pub fn module_eigengenes(
    expr: &ExpressionMatrix,
    assignment: &ModuleAssignment,
) -> Result<EigengeneTable> {
    if assignment.gene_ids() != expr.gene_ids() {
        return Err(WgcnaError::InvalidInput {
            reason: "Module assignment does not match the expression matrix genes".to_string(),
        });
    }

    let n_samples = expr.n_samples();
    let modules: Vec<String> = assignment.modules().to_vec();
    let mut values = Array2::zeros((modules.len(), n_samples));

    for (row, label) in modules.iter().enumerate() {
        let members = assignment.module_genes(label);
        debug_assert!(!members.is_empty());

        let standardized: Vec<Vec<f64>> = members
            .iter()
            .map(|&g| standardize(&expr.gene_profile(g).to_vec()))
            .collect();

        let eigengene = if standardized.len() == 1 {
            standardized[0].clone()
        } else {
            first_principal_component(&standardized, n_samples)
        };

        // Align the sign with the module's mean standardized profile
        let mean_profile: Vec<f64> = (0..n_samples)
            .map(|j| standardized.iter().map(|row| row[j]).sum::<f64>() / standardized.len() as f64)
            .collect();
        let orientation = pearson(&eigengene, &mean_profile);
        let flip = orientation.is_finite() && orientation < 0.0;

        for j in 0..n_samples {
            values[[row, j]] = if flip { -eigengene[j] } else { eigengene[j] };
        }
    }

    Ok(EigengeneTable {
        modules,
        sample_ids: expr.sample_ids().to_vec(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i + 1)).collect()
    }

    /// Module of genes all tracking one underlying signal, plus one
    /// anti-correlated gene
    fn signal_expr() -> (ExpressionMatrix, ModuleAssignment) {
        let signal = [1.0, 3.0, 2.0, 5.0, 4.0, 7.0, 6.0, 9.0];
        let n_samples = signal.len();
        let n_genes = 5;
        let mut values = Array2::zeros((n_genes, n_samples));
        for i in 0..4 {
            for j in 0..n_samples {
                values[[i, j]] = (i + 1) as f64 * signal[j] + i as f64;
            }
        }
        // gene 5 mirrors the signal
        for j in 0..n_samples {
            values[[4, j]] = 10.0 - signal[j];
        }

        let expr = ExpressionMatrix::new(values, ids("g", n_genes), ids("s", n_samples)).unwrap();
        let clusters = vec![Some(0); n_genes];
        let asg = ModuleAssignment::from_clusters(expr.gene_ids().to_vec(), &clusters).unwrap();
        (expr, asg)
    }

    #[test]
    fn test_table_shape_one_row_per_module_one_col_per_sample() {
        let (expr, asg) = signal_expr();
        let table = module_eigengenes(&expr, &asg).unwrap();
        assert_eq!(table.n_modules(), 1);
        assert_eq!(table.n_samples(), expr.n_samples());
        assert_eq!(table.sample_ids(), expr.sample_ids());
    }

    #[test]
    fn test_eigengene_tracks_shared_signal() {
        let (expr, asg) = signal_expr();
        let table = module_eigengenes(&expr, &asg).unwrap();

        let signal = vec![1.0, 3.0, 2.0, 5.0, 4.0, 7.0, 6.0, 9.0];
        let eig: Vec<f64> = table.eigengene(0).to_vec();
        let r = pearson(&eig, &signal);
        // Four of five genes rise with the signal; sign alignment keeps the
        // eigengene rising with the majority
        assert!(r > 0.99, "eigengene should track the shared signal, r={}", r);
    }

    #[test]
    fn test_single_gene_module_uses_own_profile() {
        let values = ndarray::array![[2.0, 4.0, 8.0, 6.0]];
        let expr = ExpressionMatrix::new(values, ids("g", 1), ids("s", 4)).unwrap();
        let asg = ModuleAssignment::from_clusters(expr.gene_ids().to_vec(), &[Some(0)]).unwrap();
        let table = module_eigengenes(&expr, &asg).unwrap();

        let profile = vec![2.0, 4.0, 8.0, 6.0];
        let eig: Vec<f64> = table.eigengene(0).to_vec();
        assert!((pearson(&eig, &profile) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_assignment_gives_empty_table() {
        let values = ndarray::array![[2.0, 4.0, 8.0], [1.0, 5.0, 3.0]];
        let expr = ExpressionMatrix::new(values, ids("g", 2), ids("s", 3)).unwrap();
        let asg = ModuleAssignment::from_clusters(expr.gene_ids().to_vec(), &[None, None]).unwrap();
        let table = module_eigengenes(&expr, &asg).unwrap();
        assert_eq!(table.n_modules(), 0);
        assert_eq!(table.n_samples(), 3);
    }

    #[test]
    fn test_two_modules_ordered_like_assignment() {
        let values = ndarray::array![
            [1.0, 2.0, 3.0, 4.0],
            [2.0, 4.0, 6.0, 8.0],
            [9.0, 1.0, 8.0, 2.0],
            [8.0, 2.0, 9.0, 1.0],
            [7.0, 1.5, 8.5, 2.5],
        ];
        let expr = ExpressionMatrix::new(values, ids("g", 5), ids("s", 4)).unwrap();
        // cluster 1 (3 genes) outranks cluster 0 (2 genes)
        let clusters = vec![Some(0), Some(0), Some(1), Some(1), Some(1)];
        let asg = ModuleAssignment::from_clusters(expr.gene_ids().to_vec(), &clusters).unwrap();
        let table = module_eigengenes(&expr, &asg).unwrap();

        assert_eq!(table.modules(), asg.modules());
        assert_eq!(table.n_modules(), 2);
        assert_eq!(table.module_index("turquoise"), Some(0));
    }
}
