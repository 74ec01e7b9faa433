//! Expression matrix quality control
//!
//! Filters genes without genuine biological variance, drops genes and
//! samples with excessive missingness, and imputes whatever missing values
//! remain. Every dropped row/column is recorded in a [`QcReport`] so the
//! caller can audit the run; nothing is removed silently.
//! R equivalent: goodSamplesGenes() plus the ad-hoc CV filter of the
//! reference pipeline.

use serde::{Deserialize, Serialize};

use crate::config::{ImputationPolicy, WgcnaParams};
use crate::data::ExpressionMatrix;
use crate::error::{Result, WgcnaError};

/// Why a gene was removed during quality control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// High absolute mean but low relative variance; likely technical artifact
    LowRelativeVariance,
    /// Constant expression across samples
    ZeroVariance,
    /// Missing-value fraction above the configured bound
    ExcessMissing,
}

impl DropReason {
    /// Stable label used in the audit table
    pub fn label(&self) -> &'static str {
        match self {
            DropReason::LowRelativeVariance => "low_relative_variance",
            DropReason::ZeroVariance => "zero_variance",
            DropReason::ExcessMissing => "excess_missing",
        }
    }
}

/// Audit record of everything quality control removed or altered
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QcReport {
    /// Dropped genes with the reason for each
    pub dropped_genes: Vec<(String, DropReason)>,
    /// Samples dropped for excessive missingness
    pub dropped_samples: Vec<String>,
    /// Number of missing cells filled by the imputation policy
    pub imputed_values: usize,
}

/// Mean and standard deviation over the observed (non-NaN) entries of a row
fn observed_stats(row: ndarray::ArrayView1<'_, f64>) -> (f64, f64, usize) {
    let observed: Vec<f64> = row.iter().copied().filter(|v| v.is_finite()).collect();
    let n = observed.len();
    if n == 0 {
        return (f64::NAN, f64::NAN, 0);
    }
    let mean = observed.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN, n);
    }
    let ss: f64 = observed.iter().map(|&v| (v - mean) * (v - mean)).sum();
    let sd = (ss / (n - 1) as f64).sqrt();
    (mean, sd, n)
}

/// Run quality control on a raw expression matrix
///
/// Filter order: relative-variance filter, then gene missingness, then
/// sample missingness, then imputation. The returned matrix is guaranteed
/// free of missing values; an empty result in either dimension is a fatal
/// configuration error.
pub fn preprocess(
    expr: &ExpressionMatrix,
    params: &WgcnaParams,
) -> Result<(ExpressionMatrix, QcReport)> {
    let mut report = QcReport::default();

    // Step 1: variance-to-mean filter (NaN-aware statistics). Zero-variance
    // genes are dropped unconditionally; they would yield undefined
    // correlations downstream.
    let mut keep_genes: Vec<usize> = Vec::with_capacity(expr.n_genes());
    for (i, gene_id) in expr.gene_ids().iter().enumerate() {
        let (mean, sd, n_obs) = observed_stats(expr.gene_profile(i));
        if n_obs < 2 {
            // Not enough observations to judge variance; the missingness
            // bound below decides this gene's fate.
            keep_genes.push(i);
            continue;
        }
        if sd == 0.0 {
            report
                .dropped_genes
                .push((gene_id.clone(), DropReason::ZeroVariance));
            continue;
        }
        if mean.abs() > params.mean_floor && sd / mean.abs() < params.min_cv {
            report
                .dropped_genes
                .push((gene_id.clone(), DropReason::LowRelativeVariance));
            continue;
        }
        keep_genes.push(i);
    }

    if keep_genes.is_empty() {
        return Err(WgcnaError::EmptyData {
            reason: "No genes survived the variance filter".to_string(),
        });
    }
    let filtered = expr.subset_genes(&keep_genes)?;

    // Step 2: gene missingness bound
    let gene_missing = filtered.gene_missing_rates();
    let mut keep_genes: Vec<usize> = Vec::with_capacity(filtered.n_genes());
    for (i, gene_id) in filtered.gene_ids().iter().enumerate() {
        if gene_missing[i] > params.max_missing_rate {
            report
                .dropped_genes
                .push((gene_id.clone(), DropReason::ExcessMissing));
        } else {
            keep_genes.push(i);
        }
    }
    if keep_genes.is_empty() {
        return Err(WgcnaError::EmptyData {
            reason: "No genes survived the missingness filter".to_string(),
        });
    }
    let filtered = filtered.subset_genes(&keep_genes)?;

    // Step 3: sample missingness bound, measured over the surviving genes
    let sample_missing = filtered.sample_missing_rates();
    let mut keep_samples: Vec<usize> = Vec::with_capacity(filtered.n_samples());
    for (j, sample_id) in filtered.sample_ids().iter().enumerate() {
        if sample_missing[j] > params.max_missing_rate {
            report.dropped_samples.push(sample_id.clone());
        } else {
            keep_samples.push(j);
        }
    }
    if keep_samples.is_empty() {
        return Err(WgcnaError::EmptyData {
            reason: "No samples survived the missingness filter".to_string(),
        });
    }
    let mut clean = filtered.subset_samples(&keep_samples)?;

    // Step 4: impute whatever missing values remain
    for i in 0..clean.n_genes() {
        let fill = match params.imputation {
            ImputationPolicy::Zero => 0.0,
            ImputationPolicy::GeneMean => observed_stats(clean.gene_profile(i)).0,
        };
        let missing: Vec<usize> = clean
            .gene_profile(i)
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_nan())
            .map(|(j, _)| j)
            .collect();
        for j in missing {
            clean.set_value(i, j, fill);
            report.imputed_values += 1;
        }
    }

    if !report.dropped_genes.is_empty() {
        log::warn!(
            "QC dropped {} of {} genes ({} kept)",
            report.dropped_genes.len(),
            expr.n_genes(),
            clean.n_genes()
        );
    }
    if !report.dropped_samples.is_empty() {
        log::warn!(
            "QC dropped {} of {} samples: {:?}",
            report.dropped_samples.len(),
            expr.n_samples(),
            report.dropped_samples
        );
    }
    if report.imputed_values > 0 {
        log::warn!(
            "Imputed {} missing values ({:?} policy)",
            report.imputed_values,
            params.imputation
        );
    }
    log::info!(
        "QC complete: {} genes x {} samples retained",
        clean.n_genes(),
        clean.n_samples()
    );

    debug_assert!(clean.is_complete());
    Ok((clean, report))
}
