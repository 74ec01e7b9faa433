//! rust_wgcna command-line interface

use clap::Parser;
use log::{info, LevelFilter};

use rust_wgcna::cli::{Cli, Commands};
use rust_wgcna::io::{
    write_eigengenes, write_expression_matrix, write_module_assignments, write_module_trait_table,
    write_power_fits, write_qc_report, write_significant_modules,
};
use rust_wgcna::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["run", "qc", "pick-power", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        // No subcommand — handle top-level help/version manually
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("rust_wgcna {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            expression,
            traits,
            out_prefix,
            params,
            power,
            r2_cutoff,
            min_module_size,
            deep_split,
            merge_cut_height,
            cor_method,
            trait_cor_method,
            linkage,
            alpha,
            impute,
            threads,
        }) => run_pipeline(
            &expression,
            &traits,
            &out_prefix,
            params.as_deref(),
            power,
            r2_cutoff,
            min_module_size,
            deep_split,
            merge_cut_height,
            cor_method.as_deref(),
            trait_cor_method.as_deref(),
            linkage.as_deref(),
            alpha,
            impute.as_deref(),
            threads,
        ),
        Some(Commands::Qc {
            expression,
            output,
            audit,
            params,
            impute,
        }) => run_qc(&expression, &output, &audit, params.as_deref(), impute.as_deref()),
        Some(Commands::PickPower {
            expression,
            output,
            powers,
            r2_cutoff,
            cor_method,
            threads,
        }) => run_pick_power(
            &expression,
            &output,
            powers.as_deref(),
            r2_cutoff,
            cor_method.as_deref(),
            threads,
        ),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("rust_wgcna v{}", VERSION);
    println!("Run `rust_wgcna -h` for usage or `rust_wgcna --help` for detailed information.");
}

fn print_short_help() {
    println!("rust_wgcna v{}", VERSION);
    println!();
    println!("Usage: rust_wgcna <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run         Run the full WGCNA pipeline");
    println!("  qc          Quality-control the expression matrix only");
    println!("  pick-power  Scan soft-thresholding powers");
    println!();
    println!("Run `rust_wgcna <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("rust_wgcna v{}", VERSION);
    println!("Weighted gene co-expression network analysis in Rust");
    println!();
    println!("Usage: rust_wgcna <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run         Run the full WGCNA pipeline");
    println!("                - QC filters with an audit of dropped genes/samples");
    println!("                - Scale-free soft-threshold selection (or --power)");
    println!("                - Signed adjacency + topological overlap network");
    println!("                - Dynamic tree cut module detection");
    println!("                - Eigengene-based module merging");
    println!("                - Module-trait correlation with significance flags");
    println!("  qc          Quality-control the expression matrix only");
    println!("  pick-power  Scan soft-thresholding powers and report diagnostics");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Examples:");
    println!("  rust_wgcna run -e expression.tsv -t traits.tsv -o results/gfap");
    println!();
    println!("  rust_wgcna run -e expression.tsv -t traits.tsv -o results/gfap \\");
    println!("    --power 6 --merge-cut-height 0.25 --trait-cor-method pearson");
    println!();
    println!("  rust_wgcna pick-power -e expression.tsv -o soft_threshold.tsv");
}

// ---------------------------------------------------------------------------
// Parameter assembly
// ---------------------------------------------------------------------------

fn parse_correlation_method(name: &str) -> Result<CorrelationMethod> {
    match name {
        "pearson" => Ok(CorrelationMethod::Pearson),
        "spearman" => Ok(CorrelationMethod::Spearman),
        _ => Err(WgcnaError::InvalidConfig {
            reason: format!(
                "Unknown correlation method '{}'. Use 'pearson' or 'spearman'.",
                name
            ),
        }),
    }
}

fn parse_linkage(name: &str) -> Result<LinkageMethod> {
    match name {
        "average" => Ok(LinkageMethod::Average),
        "complete" => Ok(LinkageMethod::Complete),
        "single" => Ok(LinkageMethod::Single),
        _ => Err(WgcnaError::InvalidConfig {
            reason: format!(
                "Unknown linkage method '{}'. Use 'average', 'complete' or 'single'.",
                name
            ),
        }),
    }
}

fn parse_imputation(name: &str) -> Result<ImputationPolicy> {
    match name {
        "zero" => Ok(ImputationPolicy::Zero),
        "gene-mean" | "genemean" => Ok(ImputationPolicy::GeneMean),
        _ => Err(WgcnaError::InvalidConfig {
            reason: format!("Unknown imputation policy '{}'. Use 'zero' or 'gene-mean'.", name),
        }),
    }
}

fn base_params(params_file: Option<&str>) -> Result<WgcnaParams> {
    match params_file {
        Some(path) => {
            info!("Loading parameters from: {}", path);
            WgcnaParams::from_json_file(path)
        }
        None => Ok(WgcnaParams::default()),
    }
}

fn configure_threads(threads: usize) {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn run_pipeline(
    expression_path: &str,
    traits_path: &str,
    out_prefix: &str,
    params_file: Option<&str>,
    power: Option<f64>,
    r2_cutoff: Option<f64>,
    min_module_size: Option<usize>,
    deep_split: Option<u8>,
    merge_cut_height: Option<f64>,
    cor_method: Option<&str>,
    trait_cor_method: Option<&str>,
    linkage: Option<&str>,
    alpha: Option<f64>,
    impute: Option<&str>,
    threads: usize,
) -> Result<()> {
    configure_threads(threads);

    let mut params = base_params(params_file)?;
    if power.is_some() {
        params.power = power;
    }
    if let Some(v) = r2_cutoff {
        params.r2_cutoff = v;
    }
    if let Some(v) = min_module_size {
        params.min_module_size = v;
    }
    if let Some(v) = deep_split {
        params.deep_split = v;
    }
    if let Some(v) = merge_cut_height {
        params.merge_cut_height = v;
    }
    if let Some(name) = cor_method {
        params.network_correlation = parse_correlation_method(name)?;
    }
    if let Some(name) = trait_cor_method {
        params.trait_correlation = parse_correlation_method(name)?;
    }
    if let Some(name) = linkage {
        params.linkage = parse_linkage(name)?;
    }
    if let Some(v) = alpha {
        params.significance_threshold = v;
    }
    if let Some(name) = impute {
        params.imputation = parse_imputation(name)?;
    }
    params.validate()?;

    info!("Loading expression matrix from: {}", expression_path);
    let expr = read_expression_matrix(expression_path)?;
    info!("  {} genes, {} samples", expr.n_genes(), expr.n_samples());

    info!("Loading trait table from: {}", traits_path);
    let traits = read_trait_table(traits_path)?;
    info!("  {} samples, {} traits", traits.n_samples(), traits.n_traits());

    let outputs = run_wgcna(&expr, &traits, &params, &CancelToken::new())?;

    let modules_path = format!("{}_modules.tsv", out_prefix);
    info!("Writing module assignments to: {}", modules_path);
    write_module_assignments(&modules_path, &outputs.assignment)?;

    let eigengenes_path = format!("{}_eigengenes.tsv", out_prefix);
    info!("Writing eigengenes to: {}", eigengenes_path);
    write_eigengenes(&eigengenes_path, &outputs.eigengenes)?;

    let mt_path = format!("{}_module_trait.tsv", out_prefix);
    info!("Writing module-trait correlations to: {}", mt_path);
    write_module_trait_table(&mt_path, &outputs.trait_correlations)?;

    let sig_path = format!("{}_significant_modules.tsv", out_prefix);
    write_significant_modules(&sig_path, &outputs.trait_correlations)?;

    if !outputs.power.fits.is_empty() {
        let power_path = format!("{}_soft_threshold.tsv", out_prefix);
        info!("Writing soft-threshold diagnostics to: {}", power_path);
        write_power_fits(&power_path, &outputs.power)?;
    }

    let qc_path = format!("{}_qc.tsv", out_prefix);
    write_qc_report(&qc_path, &outputs.qc)?;

    // Summary
    println!();
    println!(
        "Soft power: {}{}",
        outputs.power.power,
        if outputs.power.fallback_used {
            " (fallback, scale-free fit below cutoff)"
        } else {
            ""
        }
    );
    println!(
        "Modules: {} ({} merged away, {} genes unassigned)",
        outputs.assignment.n_modules(),
        outputs.n_merged,
        outputs.assignment.n_unassigned()
    );
    for module in outputs.assignment.modules() {
        let flag = if outputs.trait_correlations.is_significant(module) {
            "  *trait-significant"
        } else {
            ""
        };
        println!(
            "  {:<16} {:>6} genes{}",
            module,
            outputs.assignment.module_size(module),
            flag
        );
    }

    Ok(())
}

fn run_qc(
    expression_path: &str,
    output_path: &str,
    audit_path: &str,
    params_file: Option<&str>,
    impute: Option<&str>,
) -> Result<()> {
    let mut params = base_params(params_file)?;
    if let Some(name) = impute {
        params.imputation = parse_imputation(name)?;
    }
    params.validate()?;

    info!("Loading expression matrix from: {}", expression_path);
    let expr = read_expression_matrix(expression_path)?;
    info!("  {} genes, {} samples", expr.n_genes(), expr.n_samples());

    let (clean, report) = preprocess(&expr, &params)?;

    info!("Writing clean matrix to: {}", output_path);
    write_expression_matrix(output_path, &clean)?;

    info!("Writing audit table to: {}", audit_path);
    write_qc_report(audit_path, &report)?;

    println!(
        "QC: kept {} of {} genes, {} of {} samples, imputed {} values",
        clean.n_genes(),
        expr.n_genes(),
        clean.n_samples(),
        expr.n_samples(),
        report.imputed_values
    );

    Ok(())
}

fn run_pick_power(
    expression_path: &str,
    output_path: &str,
    powers: Option<&str>,
    r2_cutoff: Option<f64>,
    cor_method: Option<&str>,
    threads: usize,
) -> Result<()> {
    configure_threads(threads);

    let mut params = WgcnaParams::default();
    if let Some(list) = powers {
        let parsed: Result<Vec<f64>> = list
            .split(',')
            .map(|s| {
                s.trim().parse::<f64>().map_err(|_| WgcnaError::InvalidConfig {
                    reason: format!("Invalid power candidate '{}'", s.trim()),
                })
            })
            .collect();
        params.power_candidates = parsed?;
    }
    if let Some(v) = r2_cutoff {
        params.r2_cutoff = v;
    }
    if let Some(name) = cor_method {
        params.network_correlation = parse_correlation_method(name)?;
    }
    params.validate()?;

    info!("Loading expression matrix from: {}", expression_path);
    let expr = read_expression_matrix(expression_path)?;
    info!("  {} genes, {} samples", expr.n_genes(), expr.n_samples());

    let (clean, _) = preprocess(&expr, &params)?;
    let selection = pick_soft_threshold(&clean, &params, &CancelToken::new())?;

    info!("Writing diagnostics to: {}", output_path);
    write_power_fits(output_path, &selection)?;

    println!(
        "Selected power: {}{}",
        selection.power,
        if selection.fallback_used {
            " (fallback, scale-free fit below cutoff)"
        } else {
            ""
        }
    );

    Ok(())
}
