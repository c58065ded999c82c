#![allow(dead_code)]

use pardbscan::{Clustering, NOISE};
use rand::prelude::*;
use rand::rngs::StdRng;

/// Quadratic reference clustering: core flags and the connected component
/// of every core point in the graph of core pairs within `epsilon`.
pub struct Oracle {
    pub core: Vec<bool>,
    pub component: Vec<usize>,
}

pub fn dist_sqr(points: &[f64], dim: usize, i: usize, j: usize) -> f64 {
    let mut d2 = 0.0;
    for k in 0..dim {
        let d = points[i * dim + k] - points[j * dim + k];
        d2 += d * d;
    }
    d2
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

pub fn brute_force(dim: usize, points: &[f64], epsilon: f64, min_pts: usize) -> Oracle {
    let n = points.len() / dim;
    let eps_sq = epsilon * epsilon;
    let core: Vec<bool> = (0..n)
        .map(|i| (0..n).filter(|&j| dist_sqr(points, dim, i, j) <= eps_sq).count() >= min_pts)
        .collect();

    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in 0..i {
            if core[i] && core[j] && dist_sqr(points, dim, i, j) <= eps_sq {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                parent[a] = b;
            }
        }
    }
    let component = (0..n)
        .map(|i| if core[i] { find(&mut parent, i) } else { usize::MAX })
        .collect();
    Oracle { core, component }
}

/// Checks `result` against the brute-force clustering, returning a
/// description of the first disagreement.
pub fn check(dim: usize, points: &[f64], epsilon: f64, min_pts: usize, result: &Clustering) -> Result<(), String> {
    let n = points.len() / dim;
    let oracle = brute_force(dim, points, epsilon, min_pts);
    if result.core != oracle.core {
        return Err(format!("core flags differ: got {:?}, expected {:?}", result.core, oracle.core));
    }
    if result.labels.len() != n {
        return Err(format!("{} labels for {} points", result.labels.len(), n));
    }

    // Core points: clusters and components must be the same partition.
    let mut label_of = std::collections::HashMap::new();
    let mut component_of = std::collections::HashMap::new();
    for i in (0..n).filter(|&i| oracle.core[i]) {
        let (l, c) = (result.labels[i], oracle.component[i]);
        if l < 0 || l as usize >= result.num_clusters {
            return Err(format!("core point {} has label {}", i, l));
        }
        if *label_of.entry(c).or_insert(l) != l || *component_of.entry(l).or_insert(c) != c {
            return Err(format!("core point {} (label {}) is in the wrong cluster", i, l));
        }
    }
    if label_of.len() != result.num_clusters {
        return Err(format!("{} clusters, expected {}", result.num_clusters, label_of.len()));
    }

    // Border points: a closest core point within epsilon, or noise.
    let eps_sq = epsilon * epsilon;
    for i in (0..n).filter(|&i| !oracle.core[i]) {
        let near: Vec<(f64, usize)> = (0..n)
            .filter(|&j| oracle.core[j])
            .map(|j| (dist_sqr(points, dim, i, j), j))
            .filter(|&(d, _)| d <= eps_sq)
            .collect();
        let label = result.labels[i];
        match near.iter().map(|e| e.0).min_by(|a, b| a.total_cmp(b)) {
            None if label != NOISE => return Err(format!("point {} should be noise, got {}", i, label)),
            None => {}
            Some(best) => {
                if !near.iter().any(|&(d, j)| d == best && result.labels[j] == label) {
                    return Err(format!("border point {} has label {} of no closest core point", i, label));
                }
            }
        }
    }
    Ok(())
}

/// `count` points in `dim` dimensions, drawn around `blobs` random centres
/// in `[0, extent)` with the given spread, plus uniform background noise.
pub fn blobs(dim: usize, count: usize, blobs: usize, extent: f64, spread: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centres: Vec<Vec<f64>> = (0..blobs)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..extent)).collect())
        .collect();
    let mut points = Vec::with_capacity(count * dim);
    for i in 0..count {
        if i % 10 == 0 {
            points.extend((0..dim).map(|_| rng.gen_range(0.0..extent)));
        } else {
            let c = &centres[rng.gen_range(0..blobs)];
            points.extend(c.iter().map(|&x| x + rng.gen_range(-spread..spread)));
        }
    }
    points
}
