//! Exact DBSCAN over a uniform grid.
//!
//! The pipeline runs in four parallel passes, each finishing before the next
//! starts:
//!
//! 1. **Grid**: points are binned into cells of side `epsilon / sqrt(D)`, so
//!    any two points sharing a cell are within `epsilon` of each other.
//! 2. **Core marking**: a point in a cell holding at least `min_pts` points
//!    is core outright; every other point counts its `epsilon` neighbours in
//!    the neighbouring cells, stopping at `min_pts`.
//! 3. **Cell clustering**: cells holding a core point are merged in a
//!    lock-free union-find whenever some pair of their core points lies
//!    within `epsilon` (see [`has_edge`]).
//! 4. **Borders**: each non-core point joins the cluster of its closest core
//!    point within `epsilon`, or stays noise.
//!
//! Labels are then made dense and everything is mapped back to input order.

use crate::bccp::{has_edge, CellTrees};
use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::kdtree::KdTree;
use crate::labels::{relabel, unpermute, unpermute_into};
use crate::point::{points_from_flat, Point};
use crate::union_find::UnionFind;
use crate::util::Timed;
use log::debug;
use rayon::prelude::*;

/// Label of points that belong to no cluster.
pub const NOISE: i32 = -1;

/// Smallest supported dimension.
pub const MIN_DIM: usize = 2;
/// Largest supported dimension.
pub const MAX_DIM: usize = 20;

/// Expands to a `match` on a runtime dimension that calls the const-generic
/// `$func::<D>` for every supported `D`, returning `UnsupportedDimension`
/// from the enclosing function otherwise.
macro_rules! dispatch_dim {
    (@arms $dim:expr, $func:ident $args:tt; $($d:literal)*) => {
        match $dim {
            $($d => $func::<$d> $args,)*
            dim => return Err(unsupported(dim)),
        }
    };
    ($dim:expr, $func:ident $args:tt) => {
        dispatch_dim!(@arms $dim, $func $args; 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20)
    };
}

/// Clustering parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DbscanParams {
    /// Neighbourhood radius.
    pub epsilon: f64,
    /// Points (the point itself included) needed within `epsilon` for a core point.
    pub min_pts: usize,
}

impl DbscanParams {
    pub fn new(epsilon: f64, min_pts: usize) -> Self {
        Self { epsilon, min_pts }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive and finite",
            });
        }
        if self.min_pts == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Result of a clustering run, in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clustering {
    /// Whether each point is a core point.
    pub core: Vec<bool>,
    /// Cluster id in `0..num_clusters` for every point, or [`NOISE`].
    pub labels: Vec<i32>,
    pub num_clusters: usize,
}

impl Clustering {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_noise(&self, i: usize) -> bool {
        self.labels[i] == NOISE
    }

    pub fn num_noise(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Number of points in each cluster, indexed by cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_clusters];
        for &l in self.labels.iter().filter(|&&l| l != NOISE) {
            sizes[l as usize] += 1;
        }
        sizes
    }
}

/// Clusters `n = points.len() / dim` points given as a flat row-major array.
///
/// `dim` must lie in `MIN_DIM..=MAX_DIM`.
///
/// ```
/// use pardbscan::{dbscan, DbscanParams};
///
/// let points = [0.0, 2.0, 1.0, 3.0, 1.5, 2.5, 2.5, 1.5, 4.0, 0.0];
/// let result = dbscan(2, &points, &DbscanParams::new(1.42, 3)).unwrap();
/// assert_eq!(result.core, [false, true, true, false, false]);
/// assert_eq!(result.labels, [0, 0, 0, 0, -1]);
/// ```
pub fn dbscan(dim: usize, points: &[f64], params: &DbscanParams) -> Result<Clustering> {
    params.validate()?;
    check_flat(dim, points)?;
    Ok(dispatch_dim!(dim, cluster_flat(points, params)))
}

/// Like [`dbscan`], but writes core flags and labels into caller-provided
/// slices of length `n`. Returns the number of clusters.
pub fn dbscan_into(
    dim: usize,
    points: &[f64],
    params: &DbscanParams,
    core_out: &mut [bool],
    labels_out: &mut [i32],
) -> Result<usize> {
    params.validate()?;
    check_flat(dim, points)?;
    let n = points.len() / dim;
    for found in [core_out.len(), labels_out.len()] {
        if found != n {
            return Err(Error::OutputLength { expected: n, found });
        }
    }
    Ok(dispatch_dim!(dim, cluster_flat_into(points, params, core_out, labels_out)))
}

/// Clusters points of a compile-time dimension.
pub fn dbscan_points<const D: usize>(points: &[Point<D>], params: &DbscanParams) -> Result<Clustering> {
    params.validate()?;
    if !(MIN_DIM..=MAX_DIM).contains(&D) {
        return Err(unsupported(D));
    }
    check_points(points.par_iter().map(|p| &p.x[..]), points.len())?;
    Ok(run(points, params))
}

/// Integer status of a call: 0 on success, 1 for an unsupported dimension
/// and 2 for any other invalid input.
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(Error::UnsupportedDimension { .. }) => 1,
        Err(_) => 2,
    }
}

/// Distance from every point to its `k`-th nearest neighbour, the point
/// itself counting as the first. Sorting these and looking for the knee is
/// the usual way of picking `epsilon` for `min_pts = k`.
pub fn k_distances(dim: usize, points: &[f64], k: usize) -> Result<Vec<f64>> {
    if k == 0 {
        return Err(Error::InvalidParameter {
            name: "k",
            message: "must be at least 1",
        });
    }
    check_flat(dim, points)?;
    if points.is_empty() {
        return Ok(Vec::new());
    }
    if k > points.len() / dim {
        return Err(Error::InvalidParameter {
            name: "k",
            message: "must not exceed the number of points",
        });
    }
    Ok(dispatch_dim!(dim, k_distances_flat(points, k)))
}

fn unsupported(dim: usize) -> Error {
    Error::UnsupportedDimension {
        dim,
        min: MIN_DIM,
        max: MAX_DIM,
    }
}

fn check_flat(dim: usize, points: &[f64]) -> Result<()> {
    if !(MIN_DIM..=MAX_DIM).contains(&dim) {
        return Err(unsupported(dim));
    }
    if points.len() % dim != 0 {
        return Err(Error::DimensionMismatch { len: points.len(), dim });
    }
    check_points(points.par_chunks_exact(dim), points.len() / dim)
}

fn check_points<'a, I>(coords: I, n: usize) -> Result<()>
where
    I: IndexedParallelIterator<Item = &'a [f64]>,
{
    if n > i32::MAX as usize {
        return Err(Error::TooManyPoints { n });
    }
    match coords.position_first(|c| c.iter().any(|x| !x.is_finite())) {
        Some(index) => Err(Error::NonFiniteCoordinate { index }),
        None => Ok(()),
    }
}

fn cluster_flat<const D: usize>(points: &[f64], params: &DbscanParams) -> Clustering {
    run(&points_from_flat::<D>(points), params)
}

fn cluster_flat_into<const D: usize>(
    points: &[f64],
    params: &DbscanParams,
    core_out: &mut [bool],
    labels_out: &mut [i32],
) -> usize {
    let points = points_from_flat::<D>(points);
    let Some((grid, core, labels, num_clusters)) = run_internal(&points, params) else {
        return 0;
    };
    unpermute_into(&core, grid.order(), core_out);
    unpermute_into(&labels, grid.order(), labels_out);
    num_clusters
}

fn k_distances_flat<const D: usize>(points: &[f64], k: usize) -> Vec<f64> {
    let _t = Timed::debug("k-distances");
    let points = points_from_flat::<D>(points);
    let tree = KdTree::build(&points, true);
    points
        .par_iter()
        .map(|p| tree.knn(&points, &p.x, k).last().map_or(0.0, |&(d, _)| d))
        .collect()
}

/// Clusters validated input.
pub(crate) fn run<const D: usize>(points: &[Point<D>], params: &DbscanParams) -> Clustering {
    match run_internal(points, params) {
        Some((grid, core, labels, num_clusters)) => Clustering {
            core: unpermute(&core, grid.order()),
            labels: unpermute(&labels, grid.order()),
            num_clusters,
        },
        None => Clustering::default(),
    }
}

/// Runs all passes and returns the grid with core flags and dense labels in
/// grid order, or `None` for empty input.
fn run_internal<const D: usize>(
    points: &[Point<D>],
    params: &DbscanParams,
) -> Option<(Grid<D>, Vec<bool>, Vec<i32>, usize)> {
    if points.is_empty() {
        return None;
    }
    let _t = Timed::info("dbscan");
    debug!(
        "dbscan: {} points, dim {}, epsilon {}, min_pts {}",
        points.len(),
        D,
        params.epsilon,
        params.min_pts
    );

    let grid = {
        let _t = Timed::debug("grid");
        Grid::from_points(points, cell_side(params.epsilon, D))
    };
    debug!("grid: {} cells", grid.num_cells());

    let core = {
        let _t = Timed::debug("core marking");
        mark_core(&grid, params)
    };
    debug!("core points: {}", core.par_iter().filter(|&&c| c).count());

    let mut labels = {
        let _t = Timed::debug("cell clustering");
        cluster_cores(&grid, &core, params.epsilon)
    };

    {
        let _t = Timed::debug("borders");
        assign_borders(&grid, &core, &mut labels, params.epsilon);
    }

    let num_clusters = relabel(&mut labels);
    debug!(
        "clusters: {}, noise points: {}",
        num_clusters,
        labels.par_iter().filter(|&&l| l == NOISE).count()
    );
    Some((grid, core, labels, num_clusters))
}

/// Side of the grid cells: the largest `r` near `epsilon / sqrt(dim)` with
/// `dim * r * r <= epsilon * epsilon` in floating point, so that every cell
/// fits inside an `epsilon` ball.
fn cell_side(epsilon: f64, dim: usize) -> f64 {
    let eps_sq = epsilon * epsilon;
    let mut r = epsilon / (dim as f64).sqrt();
    while dim as f64 * r * r > eps_sq {
        r = f64::from_bits(r.to_bits() - 1);
    }
    r
}

/// Core flags in grid order.
fn mark_core<const D: usize>(grid: &Grid<D>, params: &DbscanParams) -> Vec<bool> {
    let eps_sq = params.epsilon * params.epsilon;
    let min_pts = params.min_pts;
    grid.points()
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            let c = grid.point_cell(i);
            if grid.cell(c).len() >= min_pts {
                return true;
            }
            let mut count = 0;
            grid.for_each_neighbor_point(c, |_, q| {
                if p.dist_sqr(q) <= eps_sq {
                    count += 1;
                }
                count >= min_pts
            });
            count >= min_pts
        })
        .collect()
}

/// Labels every core point with the grid offset of its cluster's root cell.
/// Non-core points are left as noise.
fn cluster_cores<const D: usize>(grid: &Grid<D>, core: &[bool], epsilon: f64) -> Vec<i32> {
    let num_cells = grid.num_cells();
    let has_core: Vec<bool> = (0..num_cells)
        .into_par_iter()
        .map(|c| grid.cell(c).range().any(|i| core[i]))
        .collect();

    let uf = UnionFind::new(num_cells);
    let trees = CellTrees::new(num_cells);
    (0..num_cells)
        .into_par_iter()
        .filter(|&i| has_core[i])
        .for_each(|i| {
            grid.for_each_neighbor_cell(i, |j| {
                // The `same` check only skips redundant work; a stale answer is harmless.
                if j < i && has_core[j] && !uf.same(i, j) && has_edge(grid, core, &trees, i, j, epsilon) {
                    uf.link(i, j);
                }
                false
            });
        });
    debug!("cell trees built: {}", trees.built());

    (0..grid.len())
        .into_par_iter()
        .map(|i| {
            if core[i] {
                grid.cell(uf.find(grid.point_cell(i))).start() as i32
            } else {
                NOISE
            }
        })
        .collect()
}

/// Gives each non-core point the label of its closest core point within
/// `epsilon`. Among equally close core points the first one visited wins.
fn assign_borders<const D: usize>(grid: &Grid<D>, core: &[bool], labels: &mut [i32], epsilon: f64) {
    let eps_sq = epsilon * epsilon;
    let core_labels: &[i32] = labels;
    let border: Vec<(usize, i32)> = (0..grid.len())
        .into_par_iter()
        .filter(|&i| !core[i])
        .filter_map(|i| {
            let p = &grid.points()[i];
            let mut best = f64::INFINITY;
            let mut label = NOISE;
            grid.for_each_neighbor_point(grid.point_cell(i), |j, q| {
                if core[j] {
                    let d = p.dist_sqr(q);
                    if d <= eps_sq && d < best {
                        best = d;
                        label = core_labels[j];
                    }
                }
                false
            });
            (label != NOISE).then_some((i, label))
        })
        .collect();

    for (i, label) in border {
        labels[i] = label;
    }
}
