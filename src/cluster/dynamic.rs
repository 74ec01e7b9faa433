//! Dynamic branch cutting
//! R equivalent: cutreeDynamic() in the dynamicTreeCut package
//!
//! Instead of a single global cut height, branches below a high static cut
//! are evaluated individually: a branch becomes a module when its member
//! count and its height profile (core scatter and gap to the joining
//! height, both in normalized height units) pass the shape criteria.
//! Failed branches are absorbed into the nearest qualifying module when
//! they are close enough, otherwise relabeled with the grey sentinel.

use ndarray::Array2;

use crate::cluster::{ModuleAssignment, Dendrogram};
use crate::config::WgcnaParams;
use crate::error::{Result, WgcnaError};

/// Shape-criterion bounds interpolated by the deep-split sensitivity.
/// Convention follows the dynamicTreeCut hybrid defaults: higher deep split
/// tolerates more within-branch scatter and a smaller separating gap,
/// producing more, smaller modules.
const CORE_SCATTER_MIN: f64 = 0.64;
const CORE_SCATTER_MAX: f64 = 0.98;
const GAP_FRACTION: f64 = 0.75;

/// Maximum tolerated mean core scatter and minimum required gap for the
/// given sensitivity (0 conservative ..= 4 aggressive)
fn shape_bounds(deep_split: u8) -> (f64, f64) {
    let dst = f64::from(deep_split.min(4)) / 4.0;
    let max_core_scatter = CORE_SCATTER_MIN + (CORE_SCATTER_MAX - CORE_SCATTER_MIN) * dst;
    let min_gap = (1.0 - max_core_scatter) * GAP_FRACTION;
    (max_core_scatter, min_gap)
}

struct Branch {
    members: Vec<usize>,
    /// Heights of merges internal to the branch
    internal_heights: Vec<f64>,
    /// Height at which the branch first joins anything outside itself
    join_height: f64,
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Segment a dendrogram into modules
///
/// Deterministic: identical dissimilarity and parameters reproduce the
/// identical assignment, with module colors ranked by descending size.
pub fn cut_dendrogram(
    dendro: &Dendrogram,
    dissim: &Array2<f64>,
    gene_ids: &[String],
    params: &WgcnaParams,
) -> Result<ModuleAssignment> {
    let n = dendro.n_genes();
    if n == 0 {
        return Err(WgcnaError::EmptyData {
            reason: "Cannot cut an empty dendrogram".to_string(),
        });
    }
    if gene_ids.len() != n {
        return Err(WgcnaError::DimensionMismatch {
            expected: format!("{} gene IDs", n),
            got: format!("{}", gene_ids.len()),
        });
    }
    if dendro.merges().is_empty() {
        // Single gene: nothing to cluster
        return ModuleAssignment::from_clusters(gene_ids.to_vec(), &vec![None; n]);
    }

    let h_max = dendro.max_height();
    let h_min = dendro.merges()[0].height;
    let cut_height = params.cut_height_fraction * h_max;
    let span = h_max - h_min;
    let scale = |h: f64| if span > 0.0 { (h - h_min) / span } else { 0.0 };

    // Pass 1: maximal branches below the static cut
    let mut parent: Vec<usize> = (0..n).collect();
    for merge in dendro.merges() {
        if merge.height <= cut_height {
            let a = find(&mut parent, dendro.leaves(merge.left)[0]);
            let b = find(&mut parent, dendro.leaves(merge.right)[0]);
            if a != b {
                let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                parent[hi] = lo;
            }
        }
    }

    // Branch indices in order of smallest member gene
    let mut branch_of_root: std::collections::HashMap<usize, usize> =
        std::collections::HashMap::new();
    let mut branches: Vec<Branch> = Vec::new();
    let mut branch_of_gene: Vec<usize> = vec![0; n];
    for gene in 0..n {
        let root = find(&mut parent, gene);
        let next = branches.len();
        let idx = *branch_of_root.entry(root).or_insert_with(|| {
            branches.push(Branch {
                members: Vec::new(),
                internal_heights: Vec::new(),
                join_height: h_max,
            });
            next
        });
        branches[idx].members.push(gene);
        branch_of_gene[gene] = idx;
    }

    for merge in dendro.merges() {
        if merge.height <= cut_height {
            let leaf = dendro.leaves(merge.left)[0];
            let idx = branch_of_gene[find(&mut parent, leaf)];
            branches[idx].internal_heights.push(merge.height);
        }
    }

    // Pass 2: join heights, walking the above-cut merges bottom-up over
    // supergroups of branches. A branch still alone in its supergroup
    // joins the outside world at this merge's height.
    let n_branches = branches.len();
    let mut sg_parent: Vec<usize> = (0..n_branches).collect();
    let mut sg_count: Vec<usize> = vec![1; n_branches];
    let mut joined: Vec<bool> = vec![false; n_branches];

    for merge in dendro.merges() {
        if merge.height > cut_height {
            let left_branch = branch_of_gene[dendro.leaves(merge.left)[0]];
            let right_branch = branch_of_gene[dendro.leaves(merge.right)[0]];
            let a = find(&mut sg_parent, left_branch);
            let b = find(&mut sg_parent, right_branch);
            if a == b {
                continue;
            }
            if sg_count[a] == 1 && !joined[a] {
                branches[a].join_height = merge.height;
                joined[a] = true;
            }
            if sg_count[b] == 1 && !joined[b] {
                branches[b].join_height = merge.height;
                joined[b] = true;
            }
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            sg_parent[hi] = lo;
            sg_count[lo] += sg_count[hi];
        }
    }

    // Qualification: member count plus branch shape
    let (max_core_scatter, min_gap) = shape_bounds(params.deep_split);
    let mut qualifies: Vec<bool> = Vec::with_capacity(n_branches);
    for branch in &branches {
        if branch.members.len() < params.min_module_size {
            qualifies.push(false);
            continue;
        }
        let core_scatter = if branch.internal_heights.is_empty() {
            0.0
        } else {
            branch.internal_heights.iter().map(|&h| scale(h)).sum::<f64>()
                / branch.internal_heights.len() as f64
        };
        let top = branch
            .internal_heights
            .iter()
            .fold(f64::NEG_INFINITY, |a, &h| a.max(scale(h)))
            .max(0.0);
        let gap = scale(branch.join_height) - top;

        qualifies.push(core_scatter <= max_core_scatter && gap >= min_gap);
    }

    let module_branches: Vec<usize> = (0..n_branches).filter(|&b| qualifies[b]).collect();
    log::debug!(
        "Dynamic cut: {} branches below height {:.4}, {} qualify as modules",
        n_branches,
        cut_height,
        module_branches.len()
    );

    // Rescue: a failed branch joins the nearest qualifying module when it
    // sits strictly closer to that module than to the remaining network;
    // otherwise the whole branch takes the grey sentinel.
    let mut cluster_of: Vec<Option<usize>> = vec![None; n];
    for (module_idx, &b) in module_branches.iter().enumerate() {
        for &gene in &branches[b].members {
            cluster_of[gene] = Some(module_idx);
        }
    }

    let mut rescued = 0usize;
    let mut greyed = 0usize;
    for b in 0..n_branches {
        if qualifies[b] {
            continue;
        }
        let in_branch: std::collections::HashSet<usize> =
            branches[b].members.iter().copied().collect();

        let mut nearest: Option<(usize, f64)> = None;
        for (module_idx, &mb) in module_branches.iter().enumerate() {
            let mut total = 0.0;
            for &g in &branches[b].members {
                for &m in &branches[mb].members {
                    total += dissim[[g, m]];
                }
            }
            let mean = total / (branches[b].members.len() * branches[mb].members.len()) as f64;
            if nearest.map_or(true, |(_, best)| mean < best) {
                nearest = Some((module_idx, mean));
            }
        }

        let mut background_total = 0.0;
        let mut background_pairs = 0usize;
        for &g in &branches[b].members {
            for other in 0..n {
                if !in_branch.contains(&other) {
                    background_total += dissim[[g, other]];
                    background_pairs += 1;
                }
            }
        }
        let background_mean = if background_pairs > 0 {
            background_total / background_pairs as f64
        } else {
            f64::INFINITY
        };

        match nearest {
            Some((module_idx, mean)) if mean < background_mean => {
                for &gene in &branches[b].members {
                    cluster_of[gene] = Some(module_idx);
                }
                rescued += branches[b].members.len();
            }
            _ => {
                greyed += branches[b].members.len();
            }
        }
    }
    if rescued > 0 || greyed > 0 {
        log::debug!(
            "Dynamic cut: {} genes absorbed into nearby modules, {} left unassigned",
            rescued,
            greyed
        );
    }

    ModuleAssignment::from_clusters(gene_ids.to_vec(), &cluster_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{hclust, UNASSIGNED};
    use crate::config::LinkageMethod;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("g{}", i + 1)).collect()
    }

    /// Block-structured dissimilarity: two tight groups, far apart.
    /// Small deterministic jitter keeps pairwise values distinct.
    fn two_block_dissim(block: usize) -> Array2<f64> {
        let n = 2 * block;
        let mut d = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let same = (i < block) == (j < block);
                let jitter = ((i * 31 + j * 17) % 13) as f64 * 0.003;
                d[[i, j]] = if same { 0.10 + jitter } else { 0.90 + jitter };
                d[[j, i]] = d[[i, j]];
            }
        }
        // enforce symmetry of the jitter
        for i in 0..n {
            for j in (i + 1)..n {
                let v = (d[[i, j]] + d[[j, i]]) / 2.0;
                d[[i, j]] = v;
                d[[j, i]] = v;
            }
        }
        d
    }

    fn small_params(min_size: usize) -> WgcnaParams {
        WgcnaParams {
            min_module_size: min_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_two_blocks_become_two_modules() {
        let dissim = two_block_dissim(6);
        let dendro = hclust(&dissim, LinkageMethod::Average).unwrap();
        let asg = cut_dendrogram(&dendro, &dissim, &ids(12), &small_params(5)).unwrap();

        assert_eq!(asg.n_modules(), 2);
        assert_eq!(asg.n_unassigned(), 0);
        // Each block is one module; gene 0's block ranks first on ties
        let first = &asg.labels()[0];
        for g in 0..6 {
            assert_eq!(&asg.labels()[g], first);
        }
        let second = &asg.labels()[6];
        assert_ne!(first, second);
        for g in 6..12 {
            assert_eq!(&asg.labels()[g], second);
        }
    }

    #[test]
    fn test_min_size_larger_than_any_cluster_greys_everything() {
        let dissim = two_block_dissim(6);
        let dendro = hclust(&dissim, LinkageMethod::Average).unwrap();
        let asg = cut_dendrogram(&dendro, &dissim, &ids(12), &small_params(100)).unwrap();

        assert_eq!(asg.n_modules(), 0);
        assert_eq!(asg.n_unassigned(), 12);
        assert!(asg.labels().iter().all(|l| l == UNASSIGNED));
    }

    #[test]
    fn test_far_outlier_stays_grey() {
        // Two blocks plus one gene nearly maximally distant from everything
        let block = 6;
        let n = 2 * block + 1;
        let mut d = Array2::zeros((n, n));
        let inner = two_block_dissim(block);
        for i in 0..2 * block {
            for j in 0..2 * block {
                d[[i, j]] = inner[[i, j]];
            }
        }
        let outlier = n - 1;
        for i in 0..2 * block {
            d[[i, outlier]] = 0.995;
            d[[outlier, i]] = 0.995;
        }

        let dendro = hclust(&d, LinkageMethod::Average).unwrap();
        let params = WgcnaParams {
            min_module_size: 5,
            // keep the static cut below the block-vs-block join, which sits
            // close to the outlier's joining height here
            cut_height_fraction: 0.8,
            ..Default::default()
        };
        let asg = cut_dendrogram(&dendro, &d, &ids(n), &params).unwrap();

        assert_eq!(asg.n_modules(), 2);
        assert_eq!(asg.labels()[outlier], UNASSIGNED);
    }

    #[test]
    fn test_nearby_small_branch_absorbed() {
        // Three groups: a core block of 8, two stragglers near it, and a
        // distant block of 6. The straggler branch fails the size test but
        // is much closer to the core module than to the rest of the
        // network, so it is absorbed rather than greyed.
        let n = 16;
        let mut d = Array2::zeros((n, n));
        let group = |i: usize| -> usize {
            if i < 8 {
                0
            } else if i < 10 {
                1
            } else {
                2
            }
        };
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                d[[i, j]] = match (group(i), group(j)) {
                    (0, 0) => 0.10,
                    (1, 1) => 0.15,
                    (2, 2) => 0.10,
                    (0, 1) | (1, 0) => 0.55,
                    _ => 0.95,
                };
            }
        }

        let dendro = hclust(&d, LinkageMethod::Average).unwrap();
        let params = WgcnaParams {
            min_module_size: 5,
            // keep the static cut below the stragglers' join so they form
            // their own branch instead of fusing with the core below cut
            cut_height_fraction: 0.5,
            ..Default::default()
        };
        let asg = cut_dendrogram(&dendro, &d, &ids(n), &params).unwrap();

        assert_eq!(asg.n_modules(), 2);
        assert_eq!(asg.n_unassigned(), 0);
        // Core plus absorbed stragglers
        assert_eq!(asg.module_size("turquoise"), 10);
        assert_eq!(asg.module_size("blue"), 6);
        assert_eq!(asg.labels()[8], "turquoise");
        assert_eq!(asg.labels()[9], "turquoise");
    }

    #[test]
    fn test_determinism() {
        let dissim = two_block_dissim(6);
        let dendro = hclust(&dissim, LinkageMethod::Average).unwrap();
        let a = cut_dendrogram(&dendro, &dissim, &ids(12), &small_params(5)).unwrap();
        let b = cut_dendrogram(&dendro, &dissim, &ids(12), &small_params(5)).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.modules(), b.modules());
    }

    #[test]
    fn test_deep_split_bounds_monotone() {
        let (mcs0, gap0) = shape_bounds(0);
        let (mcs4, gap4) = shape_bounds(4);
        assert!(mcs0 < mcs4);
        assert!(gap0 > gap4);
    }
}
