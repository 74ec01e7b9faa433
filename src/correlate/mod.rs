//! Module-trait correlation
//! R equivalent: cor(MEs, datTraits) + corPvalueStudent() in the WGCNA
//! workflow
//!
//! Correlates each module eigengene against each phenotypic trait over the
//! samples shared by both tables. Traits with too few overlapping
//! observations produce NaN entries rather than failing the run.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::WgcnaParams;
use crate::data::SampleTraits;
use crate::error::Result;
use crate::module::EigengeneTable;
use crate::stats::{correlation, correlation_pvalue};

/// Minimum overlapping observations for a defined correlation
const MIN_OVERLAP: usize = 3;

/// Correlations and significance per (module, trait) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleTraitCorrelation {
    /// Module labels, descending size order
    pub modules: Vec<String>,
    /// Trait names, input order
    pub trait_names: Vec<String>,
    /// Correlation coefficients (modules x traits); NaN where undefined
    pub correlations: Vec<Vec<f64>>,
    /// Two-sided p-values (modules x traits); NaN where undefined
    pub pvalues: Vec<Vec<f64>>,
    /// Modules with at least one trait p-value below the threshold
    pub significant: Vec<String>,
}

impl ModuleTraitCorrelation {
    /// Coefficient for a (module, trait) pair by index
    pub fn correlation(&self, module_idx: usize, trait_idx: usize) -> f64 {
        self.correlations[module_idx][trait_idx]
    }

    pub fn pvalue(&self, module_idx: usize, trait_idx: usize) -> f64 {
        self.pvalues[module_idx][trait_idx]
    }

    pub fn is_significant(&self, module: &str) -> bool {
        self.significant.iter().any(|m| m == module)
    }
}

/// Correlate every module eigengene with every trait
///
/// Samples present in the eigengene table but absent from the trait table
/// are excluded from the tests (and logged); per-trait missing values are
/// skipped pairwise. Fewer than three overlapping observations leave that
/// (module, trait) entry undefined.
pub fn correlate_modules_with_traits(
    eigengenes: &EigengeneTable,
    traits: &SampleTraits,
    params: &WgcnaParams,
) -> Result<ModuleTraitCorrelation> {
    // Map eigengene sample columns onto trait table rows
    let mut shared: Vec<(usize, usize)> = Vec::with_capacity(eigengenes.n_samples());
    let mut unmatched = 0usize;
    for (col, sample_id) in eigengenes.sample_ids().iter().enumerate() {
        match traits.sample_index(sample_id) {
            Some(row) => shared.push((col, row)),
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        log::warn!(
            "{} of {} samples have no trait record and are excluded from trait correlation",
            unmatched,
            eigengenes.n_samples()
        );
    }

    let n_modules = eigengenes.n_modules();
    let n_traits = traits.n_traits();
    let mut correlations = Array2::from_elem((n_modules, n_traits), f64::NAN);
    let mut pvalues = Array2::from_elem((n_modules, n_traits), f64::NAN);

    for m in 0..n_modules {
        let eigengene = eigengenes.eigengene(m);
        for t in 0..n_traits {
            let mut x = Vec::with_capacity(shared.len());
            let mut y = Vec::with_capacity(shared.len());
            for &(col, row) in &shared {
                let trait_value = traits.value(row, t);
                if trait_value.is_finite() {
                    x.push(eigengene[col]);
                    y.push(trait_value);
                }
            }

            if x.len() < MIN_OVERLAP {
                log::warn!(
                    "Trait '{}' has {} overlapping values for module '{}'; correlation undefined",
                    traits.trait_names()[t],
                    x.len(),
                    eigengenes.modules()[m]
                );
                continue;
            }

            let r = correlation(&x, &y, params.trait_correlation);
            correlations[[m, t]] = r;
            pvalues[[m, t]] = correlation_pvalue(r, x.len());
        }
    }

    let significant: Vec<String> = (0..n_modules)
        .filter(|&m| {
            (0..n_traits).any(|t| {
                let p = pvalues[[m, t]];
                p.is_finite() && p < params.significance_threshold
            })
        })
        .map(|m| eigengenes.modules()[m].clone())
        .collect();

    log::info!(
        "Module-trait correlation: {} of {} modules significant at p < {}",
        significant.len(),
        n_modules,
        params.significance_threshold
    );

    Ok(ModuleTraitCorrelation {
        modules: eigengenes.modules().to_vec(),
        trait_names: traits.trait_names().to_vec(),
        correlations: (0..n_modules)
            .map(|m| correlations.row(m).to_vec())
            .collect(),
        pvalues: (0..n_modules).map(|m| pvalues.row(m).to_vec()).collect(),
        significant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ModuleAssignment;
    use crate::config::CorrelationMethod;
    use crate::data::ExpressionMatrix;
    use crate::module::module_eigengenes;
    use ndarray::Array2;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i + 1)).collect()
    }

    const SIGNAL: [f64; 12] = [
        1.0, 3.0, 2.0, 5.0, 4.0, 7.0, 6.0, 9.0, 8.0, 11.0, 10.0, 12.0,
    ];

    fn module_eigengene_table() -> EigengeneTable {
        let n_samples = SIGNAL.len();
        let n_genes = 4;
        let mut values = Array2::zeros((n_genes, n_samples));
        for i in 0..n_genes {
            for j in 0..n_samples {
                values[[i, j]] = (1.0 + i as f64 * 0.2) * SIGNAL[j];
            }
        }
        let expr = ExpressionMatrix::new(values, ids("g", n_genes), ids("s", n_samples)).unwrap();
        let asg =
            ModuleAssignment::from_clusters(expr.gene_ids().to_vec(), &vec![Some(0); n_genes])
                .unwrap();
        module_eigengenes(&expr, &asg).unwrap()
    }

    #[test]
    fn test_trait_equal_to_eigengene_is_significant() {
        let eigengenes = module_eigengene_table();
        // Trait = the eigengene itself
        let eig: Vec<f64> = eigengenes.eigengene(0).to_vec();
        let traits = SampleTraits::new(
            eigengenes.sample_ids().to_vec(),
            vec!["tau_load".to_string()],
            Array2::from_shape_vec((eig.len(), 1), eig).unwrap(),
        )
        .unwrap();

        let result =
            correlate_modules_with_traits(&eigengenes, &traits, &WgcnaParams::default()).unwrap();

        let r = result.correlation(0, 0);
        let p = result.pvalue(0, 0);
        assert!((r - 1.0).abs() < 1e-9, "r should be ~1, got {}", r);
        assert!(p < 1e-9, "p should approach 0, got {}", p);
        assert!(result.is_significant("turquoise"));
    }

    #[test]
    fn test_coefficients_and_pvalues_in_range() {
        let eigengenes = module_eigengene_table();
        let n = eigengenes.n_samples();
        let mut trait_values = Array2::zeros((n, 2));
        for j in 0..n {
            trait_values[[j, 0]] = ((j * 17 + 5) % 7) as f64;
            trait_values[[j, 1]] = if j % 2 == 0 { 0.0 } else { 1.0 };
        }
        let traits = SampleTraits::new(
            eigengenes.sample_ids().to_vec(),
            vec!["lesion_score".to_string(), "sex".to_string()],
            trait_values,
        )
        .unwrap();

        let result =
            correlate_modules_with_traits(&eigengenes, &traits, &WgcnaParams::default()).unwrap();

        for m in 0..result.modules.len() {
            for t in 0..result.trait_names.len() {
                let r = result.correlation(m, t);
                let p = result.pvalue(m, t);
                assert!((-1.0..=1.0).contains(&r));
                assert!((0.0..=1.0).contains(&p));
            }
        }
    }

    #[test]
    fn test_sparse_trait_reported_as_nan() {
        let eigengenes = module_eigengene_table();
        let n = eigengenes.n_samples();
        // Only two observed values
        let mut trait_values = Array2::from_elem((n, 1), f64::NAN);
        trait_values[[0, 0]] = 1.0;
        trait_values[[1, 0]] = 2.0;
        let traits = SampleTraits::new(
            eigengenes.sample_ids().to_vec(),
            vec!["csf_marker".to_string()],
            trait_values,
        )
        .unwrap();

        let result =
            correlate_modules_with_traits(&eigengenes, &traits, &WgcnaParams::default()).unwrap();

        assert!(result.correlation(0, 0).is_nan());
        assert!(result.pvalue(0, 0).is_nan());
        assert!(result.significant.is_empty());
    }

    #[test]
    fn test_samples_without_trait_record_excluded() {
        let eigengenes = module_eigengene_table();
        // Trait table covers only the first 8 samples, in reversed order,
        // with values matching the eigengene so alignment matters
        let eig: Vec<f64> = eigengenes.eigengene(0).to_vec();
        let mut sample_ids: Vec<String> = eigengenes.sample_ids()[..8].to_vec();
        sample_ids.reverse();
        let mut values = Array2::zeros((8, 1));
        for (row, id) in sample_ids.iter().enumerate() {
            let col = eigengenes.sample_ids().iter().position(|s| s == id).unwrap();
            values[[row, 0]] = eig[col];
        }
        let traits =
            SampleTraits::new(sample_ids, vec!["tau_load".to_string()], values).unwrap();

        let result =
            correlate_modules_with_traits(&eigengenes, &traits, &WgcnaParams::default()).unwrap();

        // Correct alignment still recovers the perfect correlation
        assert!((result.correlation(0, 0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_method_selectable() {
        let eigengenes = module_eigengene_table();
        let eig: Vec<f64> = eigengenes.eigengene(0).to_vec();
        let traits = SampleTraits::new(
            eigengenes.sample_ids().to_vec(),
            vec!["tau_load".to_string()],
            Array2::from_shape_vec((eig.len(), 1), eig.iter().map(|v| -v).collect()).unwrap(),
        )
        .unwrap();

        let params = WgcnaParams {
            trait_correlation: CorrelationMethod::Pearson,
            ..Default::default()
        };
        let result = correlate_modules_with_traits(&eigengenes, &traits, &params).unwrap();
        assert!((result.correlation(0, 0) + 1.0).abs() < 1e-9);
        assert!(result.is_significant("turquoise"));
    }
}
