//! Statistical utility functions shared across modules
//!
//! Pearson/Spearman correlation, mid-rank computation, the parametric
//! correlation significance test, and the least-squares fit used by the
//! scale-free topology diagnostic.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::config::CorrelationMethod;

/// Arithmetic mean
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sample standard deviation (n - 1 denominator)
/// R equivalent: sd()
pub fn sample_sd(x: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(x);
    let ss: f64 = x.iter().map(|&v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Pearson correlation coefficient
/// R equivalent: cor(x, y)
///
/// Returns NaN when either vector has zero variance or fewer than two
/// observations; callers decide how to absorb the degeneracy.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }

    let mx = mean(x);
    let my = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }

    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Mid-ranks with ties averaged (1-based)
/// R equivalent: rank(x, ties.method="average")
pub fn mid_ranks(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && x[order[j + 1]] == x[order[i]] {
            j += 1;
        }
        // Tied block [i, j] gets the average of ranks i+1 ..= j+1
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation
/// R equivalent: cor(x, y, method="spearman")
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&mid_ranks(x), &mid_ranks(y))
}

/// Correlation by configured method
pub fn correlation(x: &[f64], y: &[f64], method: CorrelationMethod) -> f64 {
    match method {
        CorrelationMethod::Pearson => pearson(x, y),
        CorrelationMethod::Spearman => spearman(x, y),
    }
}

/// Two-sided p-value for a correlation coefficient via the t approximation
/// R equivalent: corPvalueStudent() in WGCNA
///
/// t = r * sqrt((n - 2) / (1 - r^2)) with n - 2 degrees of freedom. Fewer
/// than 3 observations leave the test undefined (NaN). A coefficient at
/// +/-1 reports p = 0.
pub fn correlation_pvalue(r: f64, n: usize) -> f64 {
    if !r.is_finite() || n < 3 {
        return f64::NAN;
    }

    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom < 1e-12 {
        return 0.0;
    }

    let t = r * (df / denom).sqrt();
    let t_dist = match StudentsT::new(0.0, 1.0, df) {
        Ok(d) => d,
        Err(_) => return f64::NAN,
    };
    2.0 * t_dist.cdf(-t.abs())
}

/// Ordinary least-squares fit of y on x
///
/// Returns (slope, intercept, r_squared).
pub fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n < 2 {
        return (f64::NAN, f64::NAN, f64::NAN);
    }

    let mx = mean(x);
    let my = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        sxy += (x[i] - mx) * (y[i] - my);
        sxx += (x[i] - mx) * (x[i] - mx);
    }

    if sxx <= 0.0 {
        return (f64::NAN, f64::NAN, f64::NAN);
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;

    let r = pearson(x, y);
    let r2 = if r.is_finite() { r * r } else { f64::NAN };

    (slope, intercept, r2)
}
