//! Bichromatic closest core pair between two grid cells.
//!
//! Deciding whether two cells are joined in the cell graph only needs to know
//! whether some core point of one lies within `epsilon` of some core point of
//! the other. Small cell pairs are checked exhaustively; larger ones get a
//! k-d tree per cell and a dual-tree branch-and-bound search that prunes any
//! node pair whose bounding boxes are farther apart than the best distance
//! found so far.

use crate::grid::Grid;
use crate::kdtree::{KdTree, NodeId};
use crate::point::Point;
use rayon::prelude::*;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cell pairs with at most this many points combined are compared pairwise.
const EXHAUSTIVE_LIMIT: usize = 32;

/// Node pairs with at least this many points combined are searched in parallel.
const PARALLEL_CUTOFF: usize = 2000;

/// Per-cell k-d trees over the cell's points, built on first use.
pub struct CellTrees<const D: usize> {
    trees: Vec<OnceLock<KdTree<D>>>,
}

impl<const D: usize> CellTrees<D> {
    pub fn new(num_cells: usize) -> Self {
        CellTrees {
            trees: (0..num_cells).map(|_| OnceLock::new()).collect(),
        }
    }

    /// The tree of cell `c`. Concurrent first callers block on a single build.
    pub fn get(&self, grid: &Grid<D>, c: usize) -> &KdTree<D> {
        self.trees[c].get_or_init(|| KdTree::build(grid.cell_points(c), false))
    }

    /// Number of trees built so far.
    pub fn built(&self) -> usize {
        self.trees.iter().filter(|t| t.get().is_some()).count()
    }
}

/// A shared running minimum of non-negative squared distances.
///
/// Non-negative `f64` values order the same way as their bit patterns, so
/// the minimum can be kept with an integer `fetch_min`.
struct AtomicDist(AtomicU64);

impl AtomicDist {
    fn new() -> Self {
        AtomicDist(AtomicU64::new(f64::INFINITY.to_bits()))
    }

    #[inline]
    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn update(&self, d2: f64) {
        debug_assert!(d2 >= 0.0);
        self.0.fetch_min(d2.to_bits(), Ordering::Relaxed);
    }
}

/// One side of a dual-tree search: a cell's tree, its points and their core flags.
struct Side<'a, const D: usize> {
    tree: &'a KdTree<D>,
    points: &'a [Point<D>],
    core: &'a [bool],
}

/// Whether cells `i` and `j` hold a pair of core points within `epsilon`.
///
/// Both paths compare squared distances against `epsilon * epsilon`, the
/// same test core marking and border assignment use.
///
/// `core` is indexed by grid position.
pub fn has_edge<const D: usize>(
    grid: &Grid<D>,
    core: &[bool],
    trees: &CellTrees<D>,
    i: usize,
    j: usize,
    epsilon: f64,
) -> bool {
    let eps_sq = epsilon * epsilon;
    let (ci, cj) = (grid.cell(i), grid.cell(j));
    if ci.len() + cj.len() <= EXHAUSTIVE_LIMIT {
        let points = grid.points();
        for a in ci.range().filter(|&a| core[a]) {
            for b in cj.range().filter(|&b| core[b]) {
                if points[a].dist_sqr(&points[b]) <= eps_sq {
                    return true;
                }
            }
        }
        return false;
    }
    core_dist_sq(grid, core, trees, i, j) <= eps_sq
}

/// Smallest distance between a core point of cell `i` and a core point of
/// cell `j`, or infinity if either cell has no core point.
pub fn core_distance<const D: usize>(
    grid: &Grid<D>,
    core: &[bool],
    trees: &CellTrees<D>,
    i: usize,
    j: usize,
) -> f64 {
    core_dist_sq(grid, core, trees, i, j).sqrt()
}

fn core_dist_sq<const D: usize>(grid: &Grid<D>, core: &[bool], trees: &CellTrees<D>, i: usize, j: usize) -> f64 {
    let a = Side {
        tree: trees.get(grid, i),
        points: grid.cell_points(i),
        core: &core[grid.cell(i).range()],
    };
    let b = Side {
        tree: trees.get(grid, j),
        points: grid.cell_points(j),
        core: &core[grid.cell(j).range()],
    };
    let (Some(ra), Some(rb)) = (a.tree.root(), b.tree.root()) else {
        return f64::INFINITY;
    };

    let best = AtomicDist::new();
    search(&a, ra, &b, rb, &best);
    best.get()
}

fn search<const D: usize>(a: &Side<D>, na: NodeId, b: &Side<D>, nb: NodeId, best: &AtomicDist) {
    if a.tree.node_dist_sq(na, b.tree, nb) > best.get() {
        return;
    }

    let (leaf_a, leaf_b) = (a.tree.is_leaf(na), b.tree.is_leaf(nb));
    if leaf_a && leaf_b {
        for &x in a.tree.items(na) {
            if !a.core[x as usize] {
                continue;
            }
            let px = &a.points[x as usize];
            for &y in b.tree.items(nb) {
                if b.core[y as usize] {
                    best.update(px.dist_sqr(&b.points[y as usize]));
                }
            }
        }
        return;
    }

    // Split whichever sides are internal and visit the closest pairs first.
    let mut pairs = [(0.0, 0, 0); 4];
    let mut count = 0;
    let a_children = if leaf_a { [na, na] } else { [a.tree.left(na), a.tree.right(na)] };
    let b_children = if leaf_b { [nb, nb] } else { [b.tree.left(nb), b.tree.right(nb)] };
    for (ia, &ca) in a_children.iter().enumerate() {
        if leaf_a && ia > 0 {
            break;
        }
        for (ib, &cb) in b_children.iter().enumerate() {
            if leaf_b && ib > 0 {
                break;
            }
            pairs[count] = (a.tree.node_dist_sq(ca, b.tree, cb), ca, cb);
            count += 1;
        }
    }
    let pairs = &mut pairs[..count];
    pairs.sort_unstable_by(|x, y| x.0.total_cmp(&y.0));

    if a.tree.size(na) + b.tree.size(nb) >= PARALLEL_CUTOFF {
        pairs.par_iter().for_each(|&(_, ca, cb)| search(a, ca, b, cb, best));
    } else {
        for &(_, ca, cb) in pairs.iter() {
            search(a, ca, b, cb, best);
        }
    }
}
