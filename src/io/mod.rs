//! Tabular input/output for expression, trait, and result tables

mod csv;
mod results;

pub use csv::{read_expression_matrix, read_trait_table};
pub use results::{
    write_eigengenes, write_expression_matrix, write_module_assignments, write_module_trait_table,
    write_power_fits, write_qc_report, write_significant_modules,
};
