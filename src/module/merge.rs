//! Merging of modules with highly correlated eigengenes
//! R equivalent: mergeCloseModules() in WGCNA
//!
//! Modules whose eigengenes are nearly collinear describe the same
//! underlying expression program; clustering the eigengene dissimilarity
//! (1 - Pearson) and cutting at the merge height collapses each group into
//! one module, with colors reassigned by descending size. Because merging
//! changes the eigengenes, the step repeats until no pair remains below
//! the threshold, which makes a second invocation on its own output a
//! no-op.

use ndarray::Array2;

use crate::cluster::{hclust, ModuleAssignment};
use crate::config::{LinkageMethod, WgcnaParams};
use crate::data::ExpressionMatrix;
use crate::error::Result;
use crate::module::{module_eigengenes, EigengeneTable};
use crate::stats::pearson;

/// Result of the merge step
#[derive(Debug)]
pub struct MergeOutcome {
    /// Final assignment with colors reassigned by descending size
    pub assignment: ModuleAssignment,
    /// Eigengenes recomputed for the final modules
    pub eigengenes: EigengeneTable,
    /// Number of modules eliminated by merging
    pub n_merged: usize,
    /// Merge rounds executed
    pub iterations: usize,
}

/// Pairwise eigengene dissimilarity, 1 - Pearson correlation
///
/// A degenerate (constant) eigengene yields an undefined correlation; the
/// pair is treated as maximally dissimilar so it never triggers a merge.
fn eigengene_dissimilarity(eigengenes: &EigengeneTable) -> Array2<f64> {
    let k = eigengenes.n_modules();
    let mut dissim = Array2::zeros((k, k));
    for i in 0..k {
        for j in (i + 1)..k {
            let r = pearson(
                &eigengenes.eigengene(i).to_vec(),
                &eigengenes.eigengene(j).to_vec(),
            );
            let d = if r.is_finite() { (1.0 - r).clamp(0.0, 1.0) } else { 1.0 };
            dissim[[i, j]] = d;
            dissim[[j, i]] = d;
        }
    }
    dissim
}

/// Merge modules whose eigengene dissimilarity falls below the configured
/// merge cut height
///
/// Idempotent: applying the step to its own output with the same threshold
/// performs zero further merges.
pub fn merge_close_modules(
    expr: &ExpressionMatrix,
    assignment: ModuleAssignment,
    params: &WgcnaParams,
) -> Result<MergeOutcome> {
    let mut current = assignment;
    let mut n_merged = 0usize;
    let mut iterations = 0usize;
    let max_rounds = current.n_modules().max(1);

    loop {
        let eigengenes = module_eigengenes(expr, &current)?;
        let k = eigengenes.n_modules();
        if k < 2 || iterations >= max_rounds {
            return Ok(MergeOutcome {
                assignment: current,
                eigengenes,
                n_merged,
                iterations,
            });
        }

        let dissim = eigengene_dissimilarity(&eigengenes);
        let mut min_offdiag = f64::INFINITY;
        for i in 0..k {
            for j in (i + 1)..k {
                min_offdiag = min_offdiag.min(dissim[[i, j]]);
            }
        }
        if min_offdiag >= params.merge_cut_height {
            return Ok(MergeOutcome {
                assignment: current,
                eigengenes,
                n_merged,
                iterations,
            });
        }

        // Cluster the eigengenes and cut at the merge height; every group
        // collapses into a single module.
        let dendro = hclust(&dissim, LinkageMethod::Average)?;
        let groups = dendro.cut_at(params.merge_cut_height);

        let module_of_gene: Vec<Option<usize>> = current
            .labels()
            .iter()
            .map(|label| eigengenes.module_index(label))
            .collect();

        let clusters: Vec<Option<usize>> = module_of_gene
            .iter()
            .map(|m| m.map(|idx| groups[idx]))
            .collect();

        let distinct_groups = {
            let mut seen: Vec<usize> = groups.clone();
            seen.sort_unstable();
            seen.dedup();
            seen.len()
        };
        let merged_this_round = k - distinct_groups;
        n_merged += merged_this_round;
        iterations += 1;

        log::info!(
            "Module merge round {}: {} modules -> {}",
            iterations,
            k,
            distinct_groups
        );

        current = ModuleAssignment::from_clusters(current.gene_ids().to_vec(), &clusters)?;
    }
}
