//! Command-line interface for rust_wgcna

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_wgcna")]
#[command(author = "SunJu Kim")]
#[command(version)]
#[command(about = "Weighted gene co-expression network analysis in Rust")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full WGCNA pipeline
    #[command(
        about = "Run the full WGCNA pipeline",
        long_about = "Run the full WGCNA pipeline\n\n\
            Performs quality control, soft-threshold selection, signed network\n\
            and topological overlap construction, module detection by dynamic\n\
            tree cutting, eigengene-based module merging, and module-trait\n\
            correlation.",
        after_long_help = "\
Examples:
  # Default parameters
  rust_wgcna run -e expression.tsv -t traits.tsv -o results/gfap

  # Fixed soft power, stricter merge threshold
  rust_wgcna run -e expression.tsv -t traits.tsv -o results/gfap \\
    --power 6 --merge-cut-height 0.25

  # Parameters from a JSON file, Pearson trait correlation
  rust_wgcna run -e expression.tsv -t traits.tsv -o results/gfap \\
    --params params.json --trait-cor-method pearson"
    )]
    Run {
        /// Path to the expression matrix CSV/TSV file
        #[arg(short, long,
            long_help = "Path to the expression matrix file.\n\
                Format: first column = gene IDs, first row = sample IDs.\n\
                Comma and tab delimiters are auto-detected; NA/empty fields\n\
                are treated as missing values.")]
        expression: String,

        /// Path to the sample trait table CSV/TSV file
        #[arg(short, long,
            long_help = "Path to the sample trait table.\n\
                Format: first column = sample IDs (matching expression columns),\n\
                remaining columns = numeric trait values (categorical traits\n\
                pre-encoded as codes).")]
        traits: String,

        /// Output path prefix [default: wgcna]
        #[arg(short, long, default_value = "wgcna",
            long_help = "Prefix for the output tables. The run writes\n\
                <prefix>_modules.tsv, <prefix>_eigengenes.tsv,\n\
                <prefix>_module_trait.tsv, <prefix>_significant_modules.tsv,\n\
                <prefix>_soft_threshold.tsv and <prefix>_qc.tsv.")]
        out_prefix: String,

        /// JSON parameter file (field-by-field overrides of the defaults)
        #[arg(long, value_name = "FILE")]
        params: Option<String>,

        /// Fixed soft-thresholding power (skips the scale-free scan)
        #[arg(long)]
        power: Option<f64>,

        /// Scale-free model fit cutoff [default: 0.9]
        #[arg(long)]
        r2_cutoff: Option<f64>,

        /// Minimum module size [default: 20]
        #[arg(long)]
        min_module_size: Option<usize>,

        /// Branch-split sensitivity 0-4 [default: 2]
        #[arg(long)]
        deep_split: Option<u8>,

        /// Eigengene dissimilarity below which modules merge [default: 0.3]
        #[arg(long)]
        merge_cut_height: Option<f64>,

        /// Gene-gene correlation method [default: pearson]
        #[arg(long, value_name = "METHOD",
            long_help = "Correlation method for the co-expression network.\n\
                pearson:  linear correlation (default)\n\
                spearman: rank correlation")]
        cor_method: Option<String>,

        /// Eigengene-trait correlation method [default: spearman]
        #[arg(long, value_name = "METHOD",
            long_help = "Correlation method for module-trait tests.\n\
                spearman: rank correlation (default)\n\
                pearson:  linear correlation")]
        trait_cor_method: Option<String>,

        /// Clustering linkage [default: average]
        #[arg(long, value_name = "METHOD",
            long_help = "Linkage for hierarchical clustering.\n\
                average:  mean cross-cluster dissimilarity (default)\n\
                complete: maximum cross-cluster dissimilarity\n\
                single:   minimum cross-cluster dissimilarity")]
        linkage: Option<String>,

        /// Significance threshold for module-trait p-values [default: 0.05]
        #[arg(short, long)]
        alpha: Option<f64>,

        /// Missing-value imputation policy [default: zero]
        #[arg(long, value_name = "POLICY",
            long_help = "Imputation for missing values surviving the filters.\n\
                zero:      replace with 0 (reference pipeline behavior)\n\
                gene-mean: replace with the gene's observed mean")]
        impute: Option<String>,

        /// Number of threads (0 = auto) [default: 0]
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Quality-control the expression matrix only
    #[command(
        long_about = "Run quality control only.\n\n\
            Applies the variance and missingness filters, imputes the\n\
            remaining missing values, and writes the clean matrix plus an\n\
            audit table of everything dropped.",
        after_long_help = "\
Examples:
  rust_wgcna qc -e expression.tsv -o clean.tsv --audit qc_audit.tsv
  rust_wgcna qc -e expression.tsv -o clean.tsv --impute gene-mean"
    )]
    Qc {
        /// Path to the expression matrix CSV/TSV file
        #[arg(short, long)]
        expression: String,

        /// Output path for the clean matrix [default: qc_clean.tsv]
        #[arg(short, long, default_value = "qc_clean.tsv")]
        output: String,

        /// Output path for the audit table [default: qc_audit.tsv]
        #[arg(long, default_value = "qc_audit.tsv")]
        audit: String,

        /// JSON parameter file
        #[arg(long, value_name = "FILE")]
        params: Option<String>,

        /// Missing-value imputation policy [default: zero]
        #[arg(long, value_name = "POLICY")]
        impute: Option<String>,
    },

    /// Scan soft-thresholding powers and report scale-free fit diagnostics
    #[command(
        name = "pick-power",
        long_about = "Scan candidate soft-thresholding powers.\n\n\
            Computes the scale-free topology fit and connectivity summary for\n\
            each candidate and reports the smallest power reaching the R^2\n\
            cutoff (or the fallback if none does).",
        after_long_help = "\
Examples:
  rust_wgcna pick-power -e expression.tsv -o soft_threshold.tsv
  rust_wgcna pick-power -e expression.tsv -o fits.tsv --powers 1,2,4,8,12"
    )]
    PickPower {
        /// Path to the expression matrix CSV/TSV file
        #[arg(short, long)]
        expression: String,

        /// Output path for the diagnostics table [default: soft_threshold.tsv]
        #[arg(short, long, default_value = "soft_threshold.tsv")]
        output: String,

        /// Comma-separated candidate powers (default: 1-10 and 12-20 by 2)
        #[arg(long, value_name = "LIST")]
        powers: Option<String>,

        /// Scale-free model fit cutoff [default: 0.9]
        #[arg(long)]
        r2_cutoff: Option<f64>,

        /// Gene-gene correlation method [default: pearson]
        #[arg(long, value_name = "METHOD")]
        cor_method: Option<String>,

        /// Number of threads (0 = auto) [default: 0]
        #[arg(long, default_value = "0")]
        threads: usize,
    },
}
