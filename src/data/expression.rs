//! Expression matrix representation
//!
//! Genes are rows, samples are columns. Values are expected to be
//! normalized, typically log-transformed expression levels. NaN encodes a
//! missing measurement and is only legal before quality control; the
//! preprocessor guarantees the matrix handed to the network stages is
//! finite everywhere.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Result, WgcnaError};

/// Deduplicate names by appending _1, _2, etc. to duplicates (R auto-renames behavior)
fn deduplicate_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in &names {
        *seen.entry(name.clone()).or_insert(0) += 1;
    }
    if !seen.values().any(|&c| c > 1) {
        return names;
    }
    seen.clear();
    let mut result = Vec::with_capacity(names.len());
    for name in names {
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            result.push(name);
        } else {
            let new_name = format!("{}_{}", name, *count - 1);
            log::warn!("Duplicate gene ID '{}' renamed to '{}'", name, new_name);
            result.push(new_name);
        }
    }
    result
}

/// A gene-by-sample matrix of expression values
/// R equivalent: datExpr (transposed) in the WGCNA tutorials
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    /// Expression data (genes x samples); NaN marks missing values
    values: Array2<f64>,
    /// Gene identifiers
    gene_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
}

impl ExpressionMatrix {
    /// Create a new expression matrix from raw data
    ///
    /// Infinite values are rejected outright; NaN is accepted and treated
    /// as a missing measurement to be handled by the preprocessor.
    pub fn new(
        values: Array2<f64>,
        gene_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = values.dim();

        if gene_ids.len() != n_genes {
            return Err(WgcnaError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(WgcnaError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if values.iter().any(|&x| x.is_infinite()) {
            return Err(WgcnaError::InvalidExpressionMatrix {
                reason: "Expression values must be finite or NaN (missing)".to_string(),
            });
        }

        {
            let mut seen = std::collections::HashSet::new();
            for id in &sample_ids {
                if !seen.insert(id) {
                    return Err(WgcnaError::InvalidExpressionMatrix {
                        reason: format!("Duplicate sample ID '{}'", id),
                    });
                }
            }
        }

        let gene_ids = deduplicate_names(gene_ids);

        Ok(Self {
            values,
            gene_ids,
            sample_ids,
        })
    }

    /// Number of genes (rows)
    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples (columns)
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Expression values as a view
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Gene identifiers
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Sample identifiers
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Expression profile of one gene across samples
    pub fn gene_profile(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(gene_idx)
    }

    /// Index of a gene by identifier
    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|id| id == gene_id)
    }

    /// Index of a sample by identifier
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|id| id == sample_id)
    }

    /// True if the matrix contains no NaN entries
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|x| x.is_finite())
    }

    /// Fraction of missing values per gene
    pub fn gene_missing_rates(&self) -> Vec<f64> {
        let n = self.n_samples() as f64;
        self.values
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|x| x.is_nan()).count() as f64 / n)
            .collect()
    }

    /// Fraction of missing values per sample
    pub fn sample_missing_rates(&self) -> Vec<f64> {
        let n = self.n_genes() as f64;
        self.values
            .axis_iter(Axis(1))
            .map(|col| col.iter().filter(|x| x.is_nan()).count() as f64 / n)
            .collect()
    }

    /// Replace a single value (used by the imputation step)
    pub(crate) fn set_value(&mut self, gene_idx: usize, sample_idx: usize, value: f64) {
        self.values[[gene_idx, sample_idx]] = value;
    }

    /// Subset to specific genes, preserving order of `gene_indices`
    pub fn subset_genes(&self, gene_indices: &[usize]) -> Result<Self> {
        let new_values = self.values.select(Axis(0), gene_indices);
        let new_gene_ids: Vec<String> = gene_indices
            .iter()
            .map(|&i| self.gene_ids[i].clone())
            .collect();

        Self::new(new_values, new_gene_ids, self.sample_ids.clone())
    }

    /// Subset to specific samples, preserving order of `sample_indices`
    pub fn subset_samples(&self, sample_indices: &[usize]) -> Result<Self> {
        let new_values = self.values.select(Axis(1), sample_indices);
        let new_sample_ids: Vec<String> = sample_indices
            .iter()
            .map(|&i| self.sample_ids[i].clone())
            .collect();

        Self::new(new_values, self.gene_ids.clone(), new_sample_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i + 1)).collect()
    }

    #[test]
    fn test_expression_matrix_creation() {
        let values = array![[1.5, 2.0, 3.2], [0.4, 1.1, 2.5]];
        let matrix = ExpressionMatrix::new(values, ids("g", 2), ids("s", 3)).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_samples(), 3);
        assert!(matrix.is_complete());
    }

    #[test]
    fn test_infinite_values_rejected() {
        let values = array![[1.0, f64::INFINITY], [0.5, 1.5]];
        let result = ExpressionMatrix::new(values, ids("g", 2), ids("s", 2));
        assert!(result.is_err());
    }

    #[test]
    fn test_nan_allowed_as_missing() {
        let values = array![[1.0, f64::NAN], [0.5, 1.5]];
        let matrix = ExpressionMatrix::new(values, ids("g", 2), ids("s", 2)).unwrap();
        assert!(!matrix.is_complete());
        assert_eq!(matrix.gene_missing_rates(), vec![0.5, 0.0]);
        assert_eq!(matrix.sample_missing_rates(), vec![0.0, 0.5]);
    }

    #[test]
    fn test_duplicate_gene_ids_renamed() {
        let values = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let gene_ids = vec!["gfap".to_string(), "gfap".to_string(), "mapt".to_string()];
        let matrix = ExpressionMatrix::new(values, gene_ids, ids("s", 2)).unwrap();
        assert_eq!(matrix.gene_ids(), &["gfap", "gfap_1", "mapt"]);
    }

    #[test]
    fn test_duplicate_sample_ids_rejected() {
        let values = array![[1.0, 2.0]];
        let sample_ids = vec!["s1".to_string(), "s1".to_string()];
        let result = ExpressionMatrix::new(values, ids("g", 1), sample_ids);
        assert!(result.is_err());
    }

    #[test]
    fn test_subset_genes() {
        let values = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let matrix = ExpressionMatrix::new(values, ids("g", 3), ids("s", 2)).unwrap();
        let subset = matrix.subset_genes(&[2, 0]).unwrap();
        assert_eq!(subset.gene_ids(), &["g3", "g1"]);
        assert_eq!(subset.values()[[0, 0]], 5.0);
    }
}
