//! Hierarchical clustering and module detection
//!
//! [`hclust`] builds the dendrogram, [`cut_dendrogram`] segments it into
//! modules, and [`ModuleAssignment`] carries the resulting gene-to-module
//! labeling with WGCNA-style color names.

mod dynamic;
mod hclust;

pub use dynamic::cut_dendrogram;
pub use hclust::{hclust, ClusterId, Dendrogram, Merge};

use std::collections::HashMap;

use crate::error::{Result, WgcnaError};

/// Module color palette, assigned in order of descending module size
/// R equivalent: standardColors() / labels2colors() in WGCNA
pub const MODULE_COLORS: &[&str] = &[
    "turquoise",
    "blue",
    "brown",
    "yellow",
    "green",
    "red",
    "black",
    "pink",
    "magenta",
    "purple",
    "greenyellow",
    "tan",
    "salmon",
    "cyan",
    "midnightblue",
    "lightcyan",
    "grey60",
    "lightgreen",
    "lightyellow",
    "royalblue",
    "darkred",
    "darkgreen",
    "darkturquoise",
    "darkgrey",
    "orange",
    "darkorange",
    "white",
    "skyblue",
    "saddlebrown",
    "steelblue",
    "paleturquoise",
    "violet",
];

/// Sentinel label for genes not assigned to any qualifying module
pub const UNASSIGNED: &str = "grey";

/// Gene-to-module labeling
///
/// Labels are color names ordered by descending module size; the `grey`
/// sentinel marks unassigned genes and is never counted as a module.
#[derive(Debug, Clone)]
pub struct ModuleAssignment {
    gene_ids: Vec<String>,
    labels: Vec<String>,
    /// Non-sentinel module labels in descending size order
    modules: Vec<String>,
}

impl ModuleAssignment {
    /// Build an assignment from raw cluster indices (None = unassigned)
    ///
    /// Clusters are ranked by descending member count, ties broken by the
    /// smallest member gene index, and named from [`MODULE_COLORS`] in that
    /// order; clusters beyond the palette fall back to `module<N>`.
    pub fn from_clusters(gene_ids: Vec<String>, clusters: &[Option<usize>]) -> Result<Self> {
        if gene_ids.len() != clusters.len() {
            return Err(WgcnaError::DimensionMismatch {
                expected: format!("{} cluster assignments", gene_ids.len()),
                got: format!("{}", clusters.len()),
            });
        }

        // cluster id -> (size, first member index)
        let mut info: HashMap<usize, (usize, usize)> = HashMap::new();
        for (gene_idx, cluster) in clusters.iter().enumerate() {
            if let Some(c) = cluster {
                let entry = info.entry(*c).or_insert((0, gene_idx));
                entry.0 += 1;
            }
        }

        let mut ranked: Vec<(usize, (usize, usize))> = info.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

        let mut color_of: HashMap<usize, String> = HashMap::new();
        let mut modules = Vec::with_capacity(ranked.len());
        for (rank, (cluster_id, _)) in ranked.iter().enumerate() {
            let color = if rank < MODULE_COLORS.len() {
                MODULE_COLORS[rank].to_string()
            } else {
                format!("module{}", rank + 1)
            };
            modules.push(color.clone());
            color_of.insert(*cluster_id, color);
        }

        let labels: Vec<String> = clusters
            .iter()
            .map(|c| match c {
                Some(id) => color_of[id].clone(),
                None => UNASSIGNED.to_string(),
            })
            .collect();

        Ok(Self {
            gene_ids,
            labels,
            modules,
        })
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Per-gene module labels, parallel to `gene_ids`
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Non-sentinel module labels in descending size order
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn n_modules(&self) -> usize {
        self.modules.len()
    }

    /// Member gene indices of a module, in input gene order
    pub fn module_genes(&self, label: &str) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.as_str() == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Size of a module by label
    pub fn module_size(&self, label: &str) -> usize {
        self.labels.iter().filter(|l| l.as_str() == label).count()
    }

    /// Number of genes carrying the sentinel label
    pub fn n_unassigned(&self) -> usize {
        self.module_size(UNASSIGNED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("g{}", i + 1)).collect()
    }

    #[test]
    fn test_colors_assigned_by_descending_size() {
        // cluster 7 has 3 members, cluster 2 has 2, one gene unassigned
        let clusters = vec![Some(7), Some(2), Some(7), None, Some(2), Some(7)];
        let asg = ModuleAssignment::from_clusters(ids(6), &clusters).unwrap();

        assert_eq!(asg.modules(), &["turquoise", "blue"]);
        assert_eq!(asg.labels()[0], "turquoise");
        assert_eq!(asg.labels()[1], "blue");
        assert_eq!(asg.labels()[3], UNASSIGNED);
        assert_eq!(asg.module_size("turquoise"), 3);
        assert_eq!(asg.n_unassigned(), 1);
    }

    #[test]
    fn test_size_tie_broken_by_first_member() {
        let clusters = vec![Some(5), Some(9), Some(5), Some(9)];
        let asg = ModuleAssignment::from_clusters(ids(4), &clusters).unwrap();
        // Both size 2; cluster 5 appears first -> turquoise
        assert_eq!(asg.labels()[0], "turquoise");
        assert_eq!(asg.labels()[1], "blue");
    }

    #[test]
    fn test_module_genes_in_input_order() {
        let clusters = vec![Some(1), None, Some(1), Some(1)];
        let asg = ModuleAssignment::from_clusters(ids(4), &clusters).unwrap();
        assert_eq!(asg.module_genes("turquoise"), vec![0, 2, 3]);
    }

    #[test]
    fn test_all_unassigned() {
        let clusters = vec![None, None, None];
        let asg = ModuleAssignment::from_clusters(ids(3), &clusters).unwrap();
        assert_eq!(asg.n_modules(), 0);
        assert_eq!(asg.n_unassigned(), 3);
    }
}
