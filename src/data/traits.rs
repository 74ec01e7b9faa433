//! Sample trait table
//!
//! Phenotypic traits per sample, pre-encoded as numeric values (binary or
//! ordinal codes for categorical traits). NaN marks a missing measurement;
//! the trait correlator skips missing entries per trait.

use ndarray::{Array2, ArrayView1};

use crate::error::{Result, WgcnaError};

/// Numeric trait values per sample
/// R equivalent: datTraits in the WGCNA tutorials
#[derive(Debug, Clone)]
pub struct SampleTraits {
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Trait names, in input order
    trait_names: Vec<String>,
    /// Trait values (samples x traits); NaN marks missing
    values: Array2<f64>,
}

impl SampleTraits {
    /// Create a trait table from a samples-by-traits value matrix
    pub fn new(
        sample_ids: Vec<String>,
        trait_names: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        let (n_samples, n_traits) = values.dim();

        if sample_ids.len() != n_samples {
            return Err(WgcnaError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }
        if trait_names.len() != n_traits {
            return Err(WgcnaError::DimensionMismatch {
                expected: format!("{} trait names", n_traits),
                got: format!("{} trait names", trait_names.len()),
            });
        }

        if values.iter().any(|&x| x.is_infinite()) {
            return Err(WgcnaError::InvalidTraits {
                reason: "Trait values must be finite or NaN (missing)".to_string(),
            });
        }

        {
            let mut seen = std::collections::HashSet::new();
            for id in &sample_ids {
                if !seen.insert(id) {
                    return Err(WgcnaError::InvalidTraits {
                        reason: format!("Duplicate sample ID '{}'", id),
                    });
                }
            }
            seen.clear();
            for name in &trait_names {
                if !seen.insert(name) {
                    return Err(WgcnaError::InvalidTraits {
                        reason: format!("Duplicate trait name '{}'", name),
                    });
                }
            }
        }

        Ok(Self {
            sample_ids,
            trait_names,
            values,
        })
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of traits
    pub fn n_traits(&self) -> usize {
        self.trait_names.len()
    }

    /// Sample identifiers
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Trait names in input order
    pub fn trait_names(&self) -> &[String] {
        &self.trait_names
    }

    /// Index of a sample by identifier
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|id| id == sample_id)
    }

    /// Values of one trait across all samples (NaN where missing)
    pub fn trait_values(&self, trait_idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(trait_idx)
    }

    /// A single trait value
    pub fn value(&self, sample_idx: usize, trait_idx: usize) -> f64 {
        self.values[[sample_idx, trait_idx]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_trait_table_creation() {
        let traits = SampleTraits::new(
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            vec!["age".to_string(), "sex".to_string()],
            array![[65.0, 0.0], [72.0, 1.0], [58.0, f64::NAN]],
        )
        .unwrap();

        assert_eq!(traits.n_samples(), 3);
        assert_eq!(traits.n_traits(), 2);
        assert_eq!(traits.value(1, 0), 72.0);
        assert!(traits.value(2, 1).is_nan());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = SampleTraits::new(
            vec!["s1".to_string()],
            vec!["age".to_string()],
            array![[65.0], [72.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_trait_names_rejected() {
        let result = SampleTraits::new(
            vec!["s1".to_string(), "s2".to_string()],
            vec!["age".to_string(), "age".to_string()],
            array![[65.0, 0.0], [72.0, 1.0]],
        );
        assert!(result.is_err());
    }
}
