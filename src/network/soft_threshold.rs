//! Soft-thresholding power selection via the scale-free topology criterion
//! R equivalent: pickSoftThreshold() in WGCNA

use serde::{Deserialize, Serialize};

use crate::config::WgcnaParams;
use crate::data::ExpressionMatrix;
use crate::error::Result;
use crate::network::{correlation_matrix, CancelToken};
use crate::stats::linear_fit;

/// Fit diagnostics for one candidate power
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerFit {
    pub power: f64,
    /// R-squared of the log-log connectivity fit (scale-free model fit)
    pub scale_free_r2: f64,
    /// Slope of the fit; negative for power-law-like networks
    pub slope: f64,
    pub mean_connectivity: f64,
    pub median_connectivity: f64,
    pub max_connectivity: f64,
}

/// Outcome of the soft-threshold scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSelection {
    /// Chosen soft-thresholding power
    pub power: f64,
    /// True when no candidate reached the R-squared cutoff and the
    /// configured fallback was used instead
    pub fallback_used: bool,
    /// Full diagnostics table, one row per candidate, ascending power
    pub fits: Vec<PowerFit>,
}

/// Connectivity of each gene under |r|^power scaling
///
/// The scan uses the absolute-correlation scaling of the reference
/// workflow; the network itself is built with the signed transform.
fn connectivities(correlations: &ndarray::Array2<f64>, power: f64) -> Vec<f64> {
    let n = correlations.nrows();
    (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i)
                .map(|j| {
                    let r = correlations[[i, j]];
                    if r.is_finite() {
                        r.abs().powf(power)
                    } else {
                        0.0
                    }
                })
                .sum()
        })
        .collect()
}

/// Log-log fit of connectivity against connectivity rank
///
/// Genes are ordered by descending connectivity; the regression runs over
/// (log10 rank, log10 k) for genes with positive connectivity. Returns
/// (r_squared, slope).
fn scale_free_fit(connectivity: &[f64]) -> (f64, f64) {
    let mut sorted: Vec<f64> = connectivity
        .iter()
        .copied()
        .filter(|&k| k > 1e-12)
        .collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());

    if sorted.len() < 3 {
        return (f64::NAN, f64::NAN);
    }

    let log_rank: Vec<f64> = (0..sorted.len()).map(|i| ((i + 1) as f64).log10()).collect();
    let log_k: Vec<f64> = sorted.iter().map(|&k| k.log10()).collect();

    let (slope, _intercept, r2) = linear_fit(&log_rank, &log_k);
    (r2, slope)
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Scan candidate powers and pick the smallest one whose scale-free fit
/// reaches the configured R-squared cutoff
///
/// When no candidate qualifies, the scan does not fail: it falls back to
/// `params.fallback_power` and flags the degradation, leaving the full
/// diagnostics table available for inspection either way.
pub fn pick_soft_threshold(
    expr: &ExpressionMatrix,
    params: &WgcnaParams,
    cancel: &CancelToken,
) -> Result<PowerSelection> {
    let correlations = correlation_matrix(expr, params.network_correlation);

    let mut candidates = params.power_candidates.clone();
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut fits = Vec::with_capacity(candidates.len());
    for &power in &candidates {
        if cancel.is_cancelled() {
            return Err(crate::error::WgcnaError::Cancelled);
        }

        let k = connectivities(&correlations, power);
        let (r2, slope) = scale_free_fit(&k);

        let mut sorted_k = k.clone();
        sorted_k.sort_by(|a, b| a.partial_cmp(b).unwrap());

        fits.push(PowerFit {
            power,
            scale_free_r2: r2,
            slope,
            mean_connectivity: k.iter().sum::<f64>() / k.len().max(1) as f64,
            median_connectivity: median(&sorted_k),
            max_connectivity: sorted_k.last().copied().unwrap_or(f64::NAN),
        });
    }

    let chosen = fits
        .iter()
        .find(|fit| fit.scale_free_r2.is_finite() && fit.scale_free_r2 >= params.r2_cutoff)
        .map(|fit| fit.power);

    let (power, fallback_used) = match chosen {
        Some(p) => (p, false),
        None => {
            log::warn!(
                "No candidate power reached scale-free R^2 >= {}; falling back to power {}",
                params.r2_cutoff,
                params.fallback_power
            );
            (params.fallback_power, true)
        }
    };

    log::info!(
        "Soft-thresholding power: {}{}",
        power,
        if fallback_used { " (fallback)" } else { "" }
    );

    Ok(PowerSelection {
        power,
        fallback_used,
        fits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i + 1)).collect()
    }

    /// Deterministic synthetic matrix: two anti-phased groups plus
    /// gene-specific ripples so no pair is perfectly correlated.
    fn synthetic_expr(n_genes: usize, n_samples: usize) -> ExpressionMatrix {
        let mut values = Array2::zeros((n_genes, n_samples));
        for i in 0..n_genes {
            for j in 0..n_samples {
                let t = j as f64;
                let base = if i % 2 == 0 { t } else { n_samples as f64 - t };
                let ripple = ((i * 7 + 3) as f64 * (t + 1.0)).sin();
                values[[i, j]] = base + 0.35 * ripple;
            }
        }
        ExpressionMatrix::new(values, ids("g", n_genes), ids("s", n_samples)).unwrap()
    }

    #[test]
    fn test_fit_table_is_complete_and_ordered() {
        let expr = synthetic_expr(12, 10);
        let params = WgcnaParams::default();
        let sel = pick_soft_threshold(&expr, &params, &CancelToken::new()).unwrap();

        assert_eq!(sel.fits.len(), params.power_candidates.len());
        for pair in sel.fits.windows(2) {
            assert!(pair[0].power < pair[1].power);
            // Higher power suppresses connectivity
            assert!(pair[1].mean_connectivity <= pair[0].mean_connectivity + 1e-9);
        }
        for fit in &sel.fits {
            if fit.scale_free_r2.is_finite() {
                assert!((0.0..=1.0).contains(&fit.scale_free_r2));
            }
            assert!(fit.mean_connectivity >= 0.0);
            assert!(fit.max_connectivity >= fit.median_connectivity);
        }
    }

    #[test]
    fn test_chosen_power_is_candidate_or_fallback() {
        let expr = synthetic_expr(12, 10);
        let params = WgcnaParams::default();
        let sel = pick_soft_threshold(&expr, &params, &CancelToken::new()).unwrap();

        if sel.fallback_used {
            assert_eq!(sel.power, params.fallback_power);
        } else {
            assert!(params.power_candidates.contains(&sel.power));
            let fit = sel.fits.iter().find(|f| f.power == sel.power).unwrap();
            assert!(fit.scale_free_r2 >= params.r2_cutoff);
            // No smaller candidate qualifies
            for f in sel.fits.iter().take_while(|f| f.power < sel.power) {
                assert!(!(f.scale_free_r2.is_finite() && f.scale_free_r2 >= params.r2_cutoff));
            }
        }
    }

    #[test]
    fn test_unreachable_cutoff_falls_back() {
        let expr = synthetic_expr(12, 10);
        let params = WgcnaParams {
            r2_cutoff: 1.0,
            fallback_power: 6.0,
            ..Default::default()
        };
        let sel = pick_soft_threshold(&expr, &params, &CancelToken::new()).unwrap();
        assert!(sel.fallback_used);
        assert_eq!(sel.power, 6.0);
        assert_eq!(sel.fits.len(), params.power_candidates.len());
    }

    #[test]
    fn test_cancellation_aborts_scan() {
        let expr = synthetic_expr(12, 10);
        let token = CancelToken::new();
        token.cancel();
        let result = pick_soft_threshold(&expr, &WgcnaParams::default(), &token);
        assert!(matches!(result, Err(crate::error::WgcnaError::Cancelled)));
    }
}
