//! rust_wgcna: weighted gene co-expression network analysis in Rust
//!
//! This crate implements the WGCNA core of a transcriptomics pipeline:
//! expression quality control, soft-threshold selection against the
//! scale-free topology criterion, signed adjacency and topological overlap
//! matrices, module detection by hierarchical clustering with dynamic
//! branch cutting, eigengene-based module merging, and module-trait
//! correlation.
//!
//! # Example
//!
//! ```ignore
//! use rust_wgcna::prelude::*;
//!
//! // Load data
//! let expr = read_expression_matrix("expression.tsv")?;
//! let traits = read_trait_table("traits.tsv")?;
//!
//! // Run the full pipeline with default parameters
//! let params = WgcnaParams::default();
//! let outputs = run_wgcna(&expr, &traits, &params, &CancelToken::new())?;
//!
//! // Inspect significant modules
//! for module in &outputs.trait_correlations.significant {
//!     println!("{}", module);
//! }
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod correlate;
pub mod data;
pub mod error;
pub mod io;
pub mod module;
pub mod network;
pub mod preprocess;
pub mod stats;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cluster::{cut_dendrogram, hclust, Dendrogram, ModuleAssignment, UNASSIGNED};
    pub use crate::config::{CorrelationMethod, ImputationPolicy, LinkageMethod, WgcnaParams};
    pub use crate::correlate::{correlate_modules_with_traits, ModuleTraitCorrelation};
    pub use crate::data::{ExpressionMatrix, SampleTraits};
    pub use crate::error::{Result, WgcnaError};
    pub use crate::io::{read_expression_matrix, read_trait_table};
    pub use crate::module::{merge_close_modules, module_eigengenes, EigengeneTable};
    pub use crate::network::{
        correlation_matrix, pick_soft_threshold, signed_adjacency, tom_dissimilarity, CancelToken,
        PowerSelection,
    };
    pub use crate::preprocess::{preprocess, QcReport};
    pub use crate::{run_wgcna, WgcnaOutputs};
}

use prelude::*;

/// Bundle of artifacts produced by a full pipeline run
#[derive(Debug)]
pub struct WgcnaOutputs {
    /// Quality-control audit (dropped genes/samples, imputation count)
    pub qc: QcReport,
    /// Soft-threshold choice and diagnostics table
    pub power: PowerSelection,
    /// Final gene-to-module assignment (after merging)
    pub assignment: ModuleAssignment,
    /// Final module eigengenes
    pub eigengenes: EigengeneTable,
    /// Module-trait correlations and significant-module list
    pub trait_correlations: ModuleTraitCorrelation,
    /// Modules eliminated by the merge step
    pub n_merged: usize,
}

/// Run the complete WGCNA pipeline
/// R equivalent: the blockwiseModules() + trait-correlation section of the
/// reference workflow, run as one block
pub fn run_wgcna(
    expr: &ExpressionMatrix,
    traits: &SampleTraits,
    params: &WgcnaParams,
    cancel: &CancelToken,
) -> Result<WgcnaOutputs> {
    params.validate()?;

    // Stage 1: quality control
    let (clean, qc) = preprocess(expr, params)?;

    // Stage 2: soft-thresholding power
    let power = match params.power {
        Some(p) => {
            log::info!("Using fixed soft-thresholding power {}", p);
            PowerSelection {
                power: p,
                fallback_used: false,
                fits: Vec::new(),
            }
        }
        None => pick_soft_threshold(&clean, params, cancel)?,
    };

    // Stage 3: signed adjacency and topological overlap
    log::info!(
        "Building signed network ({} genes, power {})",
        clean.n_genes(),
        power.power
    );
    let correlations = correlation_matrix(&clean, params.network_correlation);
    if cancel.is_cancelled() {
        return Err(WgcnaError::Cancelled);
    }
    let adjacency = signed_adjacency(&correlations, power.power);
    let dissim = tom_dissimilarity(&adjacency, cancel)?;

    // Stage 4: module detection
    log::info!("Clustering genes ({:?} linkage)", params.linkage);
    let dendrogram = hclust(&dissim, params.linkage)?;
    let detected = cut_dendrogram(&dendrogram, &dissim, clean.gene_ids(), params)?;
    log::info!(
        "Detected {} modules ({} genes unassigned)",
        detected.n_modules(),
        detected.n_unassigned()
    );

    // Stage 5: eigengene-based merging
    let merged = merge_close_modules(&clean, detected, params)?;
    log::info!(
        "{} modules after merging ({} merged away)",
        merged.assignment.n_modules(),
        merged.n_merged
    );

    // Stage 6: trait correlation
    let trait_correlations =
        correlate_modules_with_traits(&merged.eigengenes, traits, params)?;

    Ok(WgcnaOutputs {
        qc,
        power,
        assignment: merged.assignment,
        eigengenes: merged.eigengenes,
        trait_correlations,
        n_merged: merged.n_merged,
    })
}
