//! Analysis configuration with documented defaults
//!
//! All tunable parameters of the pipeline live in a single [`WgcnaParams`]
//! object. Defaults follow the reference WGCNA workflow; every field can be
//! overridden from the CLI or a JSON parameter file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WgcnaError};

/// Correlation method for gene-gene and eigengene-trait correlations
/// R equivalent: cor() / WGCNA::cor() `method` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

/// Linkage method for agglomerative clustering
/// R equivalent: hclust() `method` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkageMethod {
    /// Mean pairwise dissimilarity between cross-cluster members (WGCNA default)
    Average,
    Complete,
    Single,
}

/// Policy for filling missing expression values that survive the
/// missingness filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputationPolicy {
    /// Replace with 0, matching the reference pipeline
    Zero,
    /// Replace with the gene's mean over observed samples
    GeneMean,
}

/// Candidate soft-thresholding powers scanned by default
/// R equivalent: powerVector = c(1:10, seq(12, 20, 2)) in pickSoftThreshold()
pub fn default_power_candidates() -> Vec<f64> {
    let mut powers: Vec<f64> = (1..=10).map(|p| p as f64).collect();
    powers.extend([12.0, 14.0, 16.0, 18.0, 20.0]);
    powers
}

/// Configurable parameters for a WGCNA run
///
/// Deserializable from JSON with per-field defaults, so a parameter file
/// only needs to name the fields it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WgcnaParams {
    // --- preprocessing (QC) ---
    /// Minimum coefficient of variation (sd / mean). Genes below this with a
    /// mean above `mean_floor` are flagged as low-relative-variance artifacts
    /// and dropped (recorded in the audit report).
    pub min_cv: f64,
    /// Absolute mean expression floor used by the CV filter
    pub mean_floor: f64,
    /// Maximum tolerated fraction of missing values per gene or per sample
    pub max_missing_rate: f64,
    /// Imputation policy for missing values that survive filtering
    pub imputation: ImputationPolicy,

    // --- soft-threshold selection ---
    /// Candidate exponents scanned for scale-free topology
    pub power_candidates: Vec<f64>,
    /// Scale-free model fit cutoff (R-squared). R default in the reference
    /// workflow: 0.90
    pub r2_cutoff: f64,
    /// Power used when no candidate reaches `r2_cutoff`
    pub fallback_power: f64,
    /// Fixed power; when set, the scan is skipped entirely
    pub power: Option<f64>,

    // --- network construction ---
    /// Correlation method for the gene-gene network (Pearson default)
    pub network_correlation: CorrelationMethod,

    // --- module detection ---
    pub linkage: LinkageMethod,
    /// Minimum member count for a non-sentinel module
    pub min_module_size: usize,
    /// Branch-split sensitivity, 0 (conservative) to 4 (aggressive)
    /// R equivalent: deepSplit in cutreeDynamic()
    pub deep_split: u8,
    /// Static cut height as a fraction of the maximum merge height
    pub cut_height_fraction: f64,

    // --- module merging ---
    /// Eigengene dissimilarity below which modules are merged.
    /// 0.3 means modules whose eigengenes correlate above 0.7 are merged.
    pub merge_cut_height: f64,

    // --- trait correlation ---
    /// Correlation method for eigengene-trait tests (Spearman default)
    pub trait_correlation: CorrelationMethod,
    /// P-value threshold for flagging a module as trait-significant
    pub significance_threshold: f64,
}

impl Default for WgcnaParams {
    fn default() -> Self {
        Self {
            min_cv: 0.1,
            mean_floor: 1.0,
            max_missing_rate: 0.5,
            imputation: ImputationPolicy::Zero,
            power_candidates: default_power_candidates(),
            r2_cutoff: 0.90,
            fallback_power: 6.0,
            power: None,
            network_correlation: CorrelationMethod::Pearson,
            linkage: LinkageMethod::Average,
            min_module_size: 20,
            deep_split: 2,
            cut_height_fraction: 0.99,
            merge_cut_height: 0.3,
            trait_correlation: CorrelationMethod::Spearman,
            significance_threshold: 0.05,
        }
    }
}

impl WgcnaParams {
    /// Load parameters from a JSON file; unnamed fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: WgcnaParams = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter ranges; violations are fatal configuration errors
    pub fn validate(&self) -> Result<()> {
        if self.min_module_size == 0 {
            return Err(WgcnaError::InvalidConfig {
                reason: "minimum module size must be positive".to_string(),
            });
        }
        if self.power_candidates.is_empty() {
            return Err(WgcnaError::InvalidConfig {
                reason: "soft-threshold candidate list is empty".to_string(),
            });
        }
        if self.power_candidates.iter().any(|&p| p <= 0.0 || !p.is_finite()) {
            return Err(WgcnaError::InvalidConfig {
                reason: "soft-threshold candidates must be positive finite exponents".to_string(),
            });
        }
        if let Some(p) = self.power {
            if p <= 0.0 || !p.is_finite() {
                return Err(WgcnaError::InvalidConfig {
                    reason: format!("fixed power must be a positive finite exponent, got {}", p),
                });
            }
        }
        if self.fallback_power <= 0.0 {
            return Err(WgcnaError::InvalidConfig {
                reason: "fallback power must be positive".to_string(),
            });
        }
        if !(0.0 < self.r2_cutoff && self.r2_cutoff <= 1.0) {
            return Err(WgcnaError::InvalidConfig {
                reason: format!("scale-free R^2 cutoff must lie in (0, 1], got {}", self.r2_cutoff),
            });
        }
        if !(0.0..1.0).contains(&self.max_missing_rate) {
            return Err(WgcnaError::InvalidConfig {
                reason: format!("max missing rate must lie in [0, 1), got {}", self.max_missing_rate),
            });
        }
        if self.min_cv < 0.0 || self.mean_floor < 0.0 {
            return Err(WgcnaError::InvalidConfig {
                reason: "variance filter thresholds must be non-negative".to_string(),
            });
        }
        if self.deep_split > 4 {
            return Err(WgcnaError::InvalidConfig {
                reason: format!("deep split must lie in 0..=4, got {}", self.deep_split),
            });
        }
        if !(0.0 < self.cut_height_fraction && self.cut_height_fraction <= 1.0) {
            return Err(WgcnaError::InvalidConfig {
                reason: format!(
                    "cut height fraction must lie in (0, 1], got {}",
                    self.cut_height_fraction
                ),
            });
        }
        if !(0.0..1.0).contains(&self.merge_cut_height) {
            return Err(WgcnaError::InvalidConfig {
                reason: format!("merge cut height must lie in [0, 1), got {}", self.merge_cut_height),
            });
        }
        if !(0.0 < self.significance_threshold && self.significance_threshold < 1.0) {
            return Err(WgcnaError::InvalidConfig {
                reason: format!(
                    "significance threshold must lie in (0, 1), got {}",
                    self.significance_threshold
                ),
            });
        }
        Ok(())
    }
}
