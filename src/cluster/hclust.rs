//! Agglomerative hierarchical clustering
//! R equivalent: hclust(as.dist(dissim), method="average")
//!
//! Classic stored-matrix agglomeration with Lance-Williams distance
//! updates. The merge order is inherently sequential; ties are broken by
//! the smallest slot pair so repeated runs on identical input produce
//! identical trees.

use ndarray::Array2;

use crate::config::LinkageMethod;
use crate::error::{Result, WgcnaError};

/// Identifier of a dendrogram node: an original gene leaf or a prior merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterId {
    Gene(usize),
    /// Index into [`Dendrogram::merges`]
    Cluster(usize),
}

/// One agglomeration step
#[derive(Debug, Clone)]
pub struct Merge {
    pub left: ClusterId,
    pub right: ClusterId,
    /// Dissimilarity at which the two children join
    pub height: f64,
    /// Number of leaves under this node
    pub size: usize,
}

/// Binary merge tree over genes
#[derive(Debug, Clone)]
pub struct Dendrogram {
    n_genes: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn n_genes(&self) -> usize {
        self.n_genes
    }

    /// Merges in construction order; heights are non-decreasing under
    /// average linkage
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Maximum merge height (NaN for a single-gene tree)
    pub fn max_height(&self) -> f64 {
        self.merges
            .last()
            .map(|m| m.height)
            .unwrap_or(f64::NAN)
    }

    /// Leaf gene indices under a node
    pub fn leaves(&self, id: ClusterId) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match node {
                ClusterId::Gene(g) => out.push(g),
                ClusterId::Cluster(m) => {
                    stack.push(self.merges[m].right);
                    stack.push(self.merges[m].left);
                }
            }
        }
        out
    }

    /// Static cut: group leaves joined by merges strictly below `height`
    /// R equivalent: cutree(h=height) up to label numbering
    ///
    /// Returns one group index per leaf; group indices are assigned in
    /// order of the smallest leaf in each group.
    pub fn cut_at(&self, height: f64) -> Vec<usize> {
        let mut parent: Vec<usize> = (0..self.n_genes).collect();

        fn find(parent: &mut Vec<usize>, mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for merge in &self.merges {
            if merge.height < height {
                let left = self.leaves(merge.left);
                let right = self.leaves(merge.right);
                let a = find(&mut parent, left[0]);
                let b = find(&mut parent, right[0]);
                if a != b {
                    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                    parent[hi] = lo;
                }
            }
        }

        let mut group_of_root: std::collections::HashMap<usize, usize> =
            std::collections::HashMap::new();
        let mut groups = Vec::with_capacity(self.n_genes);
        for leaf in 0..self.n_genes {
            let root = find(&mut parent, leaf);
            let next = group_of_root.len();
            let group = *group_of_root.entry(root).or_insert(next);
            groups.push(group);
        }
        groups
    }
}

/// Build a dendrogram from a symmetric dissimilarity matrix
pub fn hclust(dissim: &Array2<f64>, linkage: LinkageMethod) -> Result<Dendrogram> {
    let n = dissim.nrows();
    if n != dissim.ncols() {
        return Err(WgcnaError::DimensionMismatch {
            expected: format!("square matrix ({} rows)", n),
            got: format!("{} columns", dissim.ncols()),
        });
    }
    if n == 0 {
        return Err(WgcnaError::EmptyData {
            reason: "Cannot cluster an empty dissimilarity matrix".to_string(),
        });
    }

    // Working copy of pairwise distances between active slots
    let mut dist: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| dissim[[i, j]]).collect())
        .collect();

    // Per slot: current node id and leaf count; None once deactivated
    let mut slots: Vec<Option<(ClusterId, usize)>> =
        (0..n).map(|i| Some((ClusterId::Gene(i), 1))).collect();

    let mut merges: Vec<Merge> = Vec::with_capacity(n.saturating_sub(1));

    for _ in 1..n {
        // Closest active pair; ties resolved toward the smallest (i, j)
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if slots[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if slots[j].is_none() {
                    continue;
                }
                let d = dist[i][j];
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((i, j, d));
                }
            }
        }
        let (i, j, height) = best.expect("at least two active clusters remain");

        let (id_i, size_i) = slots[i].unwrap();
        let (id_j, size_j) = slots[j].unwrap();
        let merged_size = size_i + size_j;

        merges.push(Merge {
            left: id_i,
            right: id_j,
            height,
            size: merged_size,
        });

        // Lance-Williams update of distances from the merged cluster
        for k in 0..n {
            if k == i || k == j || slots[k].is_none() {
                continue;
            }
            let d_ik = dist[i][k];
            let d_jk = dist[j][k];
            let d_new = match linkage {
                LinkageMethod::Average => {
                    (size_i as f64 * d_ik + size_j as f64 * d_jk) / merged_size as f64
                }
                LinkageMethod::Complete => d_ik.max(d_jk),
                LinkageMethod::Single => d_ik.min(d_jk),
            };
            dist[i][k] = d_new;
            dist[k][i] = d_new;
        }

        slots[i] = Some((ClusterId::Cluster(merges.len() - 1), merged_size));
        slots[j] = None;
    }

    Ok(Dendrogram {
        n_genes: n,
        merges,
    })
}
