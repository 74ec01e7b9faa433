//! Writers for the analysis output tables
//!
//! All tables are tab-separated with a stable row order: modules by
//! descending size (the assignment's module order), genes in input order
//! within a module, and grey sentinel genes last.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::cluster::{ModuleAssignment, UNASSIGNED};
use crate::correlate::ModuleTraitCorrelation;
use crate::data::ExpressionMatrix;
use crate::error::Result;
use crate::module::EigengeneTable;
use crate::network::PowerSelection;
use crate::preprocess::QcReport;

/// Write the gene-to-module assignment table
/// Columns: gene_id, module, module_size
pub fn write_module_assignments<P: AsRef<Path>>(
    path: P,
    assignment: &ModuleAssignment,
) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "gene_id\tmodule\tmodule_size")?;

    for label in assignment.modules() {
        let size = assignment.module_size(label);
        for gene_idx in assignment.module_genes(label) {
            writeln!(file, "{}\t{}\t{}", assignment.gene_ids()[gene_idx], label, size)?;
        }
    }

    let grey_size = assignment.n_unassigned();
    for gene_idx in assignment.module_genes(UNASSIGNED) {
        writeln!(
            file,
            "{}\t{}\t{}",
            assignment.gene_ids()[gene_idx],
            UNASSIGNED,
            grey_size
        )?;
    }

    Ok(())
}

/// Write the module eigengene table (module x sample)
pub fn write_eigengenes<P: AsRef<Path>>(path: P, eigengenes: &EigengeneTable) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "module\t{}", eigengenes.sample_ids().join("\t"))?;

    for (i, module) in eigengenes.modules().iter().enumerate() {
        let row: Vec<String> = eigengenes
            .eigengene(i)
            .iter()
            .map(|v| format!("{:.6}", v))
            .collect();
        writeln!(file, "{}\t{}", module, row.join("\t"))?;
    }

    Ok(())
}

/// Write the module-trait correlation table in long format
/// Columns: module, trait, correlation, pvalue
pub fn write_module_trait_table<P: AsRef<Path>>(
    path: P,
    table: &ModuleTraitCorrelation,
) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "module\ttrait\tcorrelation\tpvalue")?;

    for (m, module) in table.modules.iter().enumerate() {
        for (t, trait_name) in table.trait_names.iter().enumerate() {
            writeln!(
                file,
                "{}\t{}\t{:.6}\t{:.6e}",
                module,
                trait_name,
                table.correlation(m, t),
                table.pvalue(m, t)
            )?;
        }
    }

    Ok(())
}

/// Write the significant module list, one label per line
pub fn write_significant_modules<P: AsRef<Path>>(
    path: P,
    table: &ModuleTraitCorrelation,
) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "module")?;
    for module in &table.significant {
        writeln!(file, "{}", module)?;
    }
    Ok(())
}

/// Write the soft-threshold diagnostics table
pub fn write_power_fits<P: AsRef<Path>>(path: P, selection: &PowerSelection) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(
        file,
        "power\tscale_free_r2\tslope\tmean_connectivity\tmedian_connectivity\tmax_connectivity\tselected"
    )?;

    for fit in &selection.fits {
        writeln!(
            file,
            "{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}",
            fit.power,
            fit.scale_free_r2,
            fit.slope,
            fit.mean_connectivity,
            fit.median_connectivity,
            fit.max_connectivity,
            if !selection.fallback_used && fit.power == selection.power {
                "*"
            } else {
                ""
            }
        )?;
    }

    Ok(())
}

/// Write the quality-control audit table
/// Columns: kind, id, reason
pub fn write_qc_report<P: AsRef<Path>>(path: P, report: &QcReport) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "kind\tid\treason")?;
    for (gene_id, reason) in &report.dropped_genes {
        writeln!(file, "gene\t{}\t{}", gene_id, reason.label())?;
    }
    for sample_id in &report.dropped_samples {
        writeln!(file, "sample\t{}\texcess_missing", sample_id)?;
    }
    writeln!(file, "imputed_values\t{}\t", report.imputed_values)?;
    Ok(())
}

/// Write an expression matrix (used by the qc subcommand)
pub fn write_expression_matrix<P: AsRef<Path>>(path: P, expr: &ExpressionMatrix) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "gene_id\t{}", expr.sample_ids().join("\t"))?;

    for (i, gene_id) in expr.gene_ids().iter().enumerate() {
        let row: Vec<String> = expr
            .gene_profile(i)
            .iter()
            .map(|v| format!("{:.6}", v))
            .collect();
        writeln!(file, "{}\t{}", gene_id, row.join("\t"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ModuleAssignment;
    use tempfile::NamedTempFile;

    #[test]
    fn test_assignment_table_order() {
        // module of 3 (turquoise), module of 2 (blue), one grey gene
        let clusters = vec![Some(1), Some(0), Some(1), None, Some(0), Some(1)];
        let gene_ids: Vec<String> = (0..6).map(|i| format!("g{}", i + 1)).collect();
        let asg = ModuleAssignment::from_clusters(gene_ids, &clusters).unwrap();

        let file = NamedTempFile::new().unwrap();
        write_module_assignments(file.path(), &asg).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "gene_id\tmodule\tmodule_size");
        // largest module first, genes in input order, grey last
        assert_eq!(lines[1], "g1\tturquoise\t3");
        assert_eq!(lines[2], "g3\tturquoise\t3");
        assert_eq!(lines[3], "g6\tturquoise\t3");
        assert_eq!(lines[4], "g2\tblue\t2");
        assert_eq!(lines[5], "g5\tblue\t2");
        assert_eq!(lines[6], "g4\tgrey\t1");
    }

    #[test]
    fn test_qc_report_roundtrip_content() {
        use crate::preprocess::{DropReason, QcReport};
        let report = QcReport {
            dropped_genes: vec![
                ("g1".to_string(), DropReason::ZeroVariance),
                ("g7".to_string(), DropReason::ExcessMissing),
            ],
            dropped_samples: vec!["s3".to_string()],
            imputed_values: 4,
        };

        let file = NamedTempFile::new().unwrap();
        write_qc_report(file.path(), &report).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();

        assert!(text.contains("gene\tg1\tzero_variance"));
        assert!(text.contains("gene\tg7\texcess_missing"));
        assert!(text.contains("sample\ts3\texcess_missing"));
        assert!(text.contains("imputed_values\t4"));
    }
}
