//! CSV/TSV reading for expression matrices and trait tables
//!
//! Delimiter (comma or tab) is auto-detected from the header line. Empty
//! fields and the usual NA spellings parse as missing values (NaN).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use crate::data::{ExpressionMatrix, SampleTraits};
use crate::error::{Result, WgcnaError};

/// Strip surrounding quotes from a string
fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Parse one numeric field; empty and NA spellings become NaN
fn parse_value(field: &str, context: &str) -> Result<f64> {
    let val = strip_quotes(field);
    if val.is_empty() || val.eq_ignore_ascii_case("na") || val.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    val.parse::<f64>().map_err(|_| WgcnaError::InvalidInput {
        reason: format!("Invalid numeric value '{}' in {}", val, context),
    })
}

/// Read a header line and detect the delimiter
fn read_header(
    lines: &mut std::io::Lines<BufReader<File>>,
    what: &str,
) -> Result<(Vec<String>, char)> {
    let header_line = lines.next().ok_or_else(|| WgcnaError::EmptyData {
        reason: format!("Empty {} file", what),
    })??;

    let delimiter = if header_line.contains('\t') { '\t' } else { ',' };
    let header: Vec<String> = header_line
        .split(delimiter)
        .map(|s| strip_quotes(s.trim()))
        .collect();

    if header.len() < 2 {
        return Err(WgcnaError::InvalidInput {
            reason: format!("Not enough columns in {} header", what),
        });
    }

    Ok((header, delimiter))
}

/// Read an expression matrix from a CSV/TSV file
///
/// Expected format: first column is gene IDs, first row is sample IDs.
pub fn read_expression_matrix<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let (header, delimiter) = read_header(&mut lines, "expression matrix")?;
    let sample_ids: Vec<String> = header[1..].to_vec();
    let n_samples = sample_ids.len();

    let mut gene_ids: Vec<String> = Vec::new();
    let mut data: Vec<f64> = Vec::new();

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != n_samples + 1 {
            return Err(WgcnaError::InvalidExpressionMatrix {
                reason: format!(
                    "Row has {} columns, expected {}",
                    fields.len(),
                    n_samples + 1
                ),
            });
        }

        let gene_id = strip_quotes(fields[0]);
        for field in &fields[1..] {
            data.push(parse_value(field, &format!("gene '{}'", gene_id))?);
        }
        gene_ids.push(gene_id);
    }

    if gene_ids.is_empty() {
        return Err(WgcnaError::EmptyData {
            reason: "No genes found in expression matrix".to_string(),
        });
    }

    let n_genes = gene_ids.len();
    let values = Array2::from_shape_vec((n_genes, n_samples), data).map_err(|e| {
        WgcnaError::InvalidExpressionMatrix {
            reason: format!("Malformed matrix data: {}", e),
        }
    })?;

    ExpressionMatrix::new(values, gene_ids, sample_ids)
}

/// Read a sample trait table from a CSV/TSV file
///
/// Expected format: first column is sample IDs, remaining columns are
/// numeric trait values (categorical traits pre-encoded as codes).
pub fn read_trait_table<P: AsRef<Path>>(path: P) -> Result<SampleTraits> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let (header, delimiter) = read_header(&mut lines, "trait table")?;
    let trait_names: Vec<String> = header[1..].to_vec();
    let n_traits = trait_names.len();

    let mut sample_ids: Vec<String> = Vec::new();
    let mut data: Vec<f64> = Vec::new();

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != n_traits + 1 {
            return Err(WgcnaError::InvalidTraits {
                reason: format!("Row has {} columns, expected {}", fields.len(), n_traits + 1),
            });
        }

        let sample_id = strip_quotes(fields[0]);
        for field in &fields[1..] {
            data.push(parse_value(field, &format!("sample '{}'", sample_id))?);
        }
        sample_ids.push(sample_id);
    }

    if sample_ids.is_empty() {
        return Err(WgcnaError::EmptyData {
            reason: "No samples found in trait table".to_string(),
        });
    }

    let n_samples = sample_ids.len();
    let values = Array2::from_shape_vec((n_samples, n_traits), data).map_err(|e| {
        WgcnaError::InvalidTraits {
            reason: format!("Malformed trait data: {}", e),
        }
    })?;

    SampleTraits::new(sample_ids, trait_names, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_expression_matrix_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene_id\ts1\ts2\ts3").unwrap();
        writeln!(file, "gfap\t5.1\t4.8\t6.2").unwrap();
        writeln!(file, "mapt\t2.2\tNA\t3.0").unwrap();

        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_samples(), 3);
        assert_eq!(matrix.gene_ids(), &["gfap", "mapt"]);
        assert!((matrix.values()[[0, 0]] - 5.1).abs() < 1e-12);
        assert!(matrix.values()[[1, 1]].is_nan());
    }

    #[test]
    fn test_read_expression_matrix_csv_with_quotes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\"gene_id\",\"s1\",\"s2\"").unwrap();
        writeln!(file, "\"gfap\",1.5,2.5").unwrap();

        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.gene_ids(), &["gfap"]);
        assert_eq!(matrix.sample_ids(), &["s1", "s2"]);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene_id\ts1\ts2").unwrap();
        writeln!(file, "gfap\t1.5").unwrap();

        assert!(read_expression_matrix(file.path()).is_err());
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene_id,s1,s2").unwrap();
        writeln!(file, "gfap,1.5,high").unwrap();

        assert!(read_expression_matrix(file.path()).is_err());
    }

    #[test]
    fn test_read_trait_table() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id,age,sex,tau_load").unwrap();
        writeln!(file, "s1,65,0,1.2").unwrap();
        writeln!(file, "s2,72,1,NA").unwrap();

        let traits = read_trait_table(file.path()).unwrap();
        assert_eq!(traits.n_samples(), 2);
        assert_eq!(traits.trait_names(), &["age", "sex", "tau_load"]);
        assert_eq!(traits.value(1, 0), 72.0);
        assert!(traits.value(1, 2).is_nan());
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            read_expression_matrix(file.path()),
            Err(WgcnaError::EmptyData { .. })
        ));
    }
}
