use crate::kdtree::KdTree;
use crate::point::{p_min_parallel, Coordinates, Point};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::ops::Range;
use std::sync::OnceLock;

/// Relative slack on the neighbour search radius, absorbing rounding in
/// the cell-centre distances.
const HOP_SLACK: f64 = 1.0000001;

/// One non-empty box of the grid.
///
/// A cell refers to a contiguous run of the grid-ordered point array and is
/// positioned at the geometric centre of its box.
#[derive(Clone, Copy, Debug)]
pub struct Cell<const D: usize> {
    start: u32,
    len: u32,
    center: Point<D>,
    key: [i64; D],
}

impl<const D: usize> Cell<D> {
    /// Offset of the cell's first point in the grid-ordered point array.
    pub fn start(&self) -> usize {
        self.start as usize
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grid-order positions of the cell's points.
    pub fn range(&self) -> Range<usize> {
        self.start()..self.start() + self.len()
    }

    pub fn center(&self) -> &Point<D> {
        &self.center
    }

    /// Integer grid coordinate of the cell.
    pub fn key(&self) -> &[i64; D] {
        &self.key
    }
}

impl<const D: usize> Coordinates<D> for Cell<D> {
    #[inline]
    fn coordinate(&self) -> &[f64; D] {
        &self.center.x
    }
}

/// A uniform grid of axis-aligned cubes of side `r` over a point set.
///
/// Construction sorts the points by cell so that every cell occupies a
/// contiguous run of [`Grid::points`]; [`Grid::order`] records where each
/// point came from. Only non-empty cells are materialised. A k-d tree over
/// the cell centres answers "which cells lie near this one", and each cell's
/// answer is computed once and cached.
pub struct Grid<const D: usize> {
    r: f64,
    p_min: Point<D>,
    points: Vec<Point<D>>,
    order: Vec<u32>,
    point_cells: Vec<u32>,
    cells: Vec<Cell<D>>,
    table: FxHashMap<[i64; D], u32>,
    tree: KdTree<D>,
    neighbor_cache: Vec<OnceLock<Vec<u32>>>,
}

impl<const D: usize> Grid<D> {
    /// Builds the grid over `points` with cell side `r`, anchored at `p_min`.
    ///
    /// `p_min` does not have to be the minimum corner of the points; cells
    /// below it simply get negative keys.
    ///
    /// # Panics
    ///
    /// Panics if more than `n + 1` cells would be created, which can only
    /// happen through a broken cell assignment.
    pub fn new(points: &[Point<D>], p_min: Point<D>, r: f64) -> Self {
        let count = points.len();
        assert!(count < u32::MAX as usize, "too many points for a grid: {}", count);
        let capacity = count + 1;

        let keys: Vec<[i64; D]> = points.par_iter().map(|p| quantize(p, &p_min, r)).collect();

        // Stable, so points keep their input order within a cell.
        let mut order: Vec<u32> = (0..count as u32).collect();
        order.par_sort_by(|&a, &b| keys[a as usize].cmp(&keys[b as usize]));

        let sorted: Vec<Point<D>> = order.par_iter().map(|&i| points[i as usize]).collect();
        let sorted_keys: Vec<[i64; D]> = order.par_iter().map(|&i| keys[i as usize]).collect();

        // A cell starts wherever the key changes.
        let starts: Vec<u32> = (0..count)
            .into_par_iter()
            .filter(|&i| i == 0 || sorted_keys[i] != sorted_keys[i - 1])
            .map(|i| i as u32)
            .collect();

        let num_cells = starts.len();
        assert!(
            num_cells <= capacity,
            "grid insert exceeded cell capacity ({} > {})",
            num_cells,
            capacity
        );

        let cells: Vec<Cell<D>> = (0..num_cells)
            .into_par_iter()
            .map(|c| {
                let start = starts[c];
                let end = starts.get(c + 1).copied().unwrap_or(count as u32);
                let key = sorted_keys[start as usize];
                Cell {
                    start,
                    len: end - start,
                    center: cell_center(&key, &p_min, r),
                    key,
                }
            })
            .collect();

        let point_cells: Vec<u32> = cells
            .par_iter()
            .enumerate()
            .flat_map_iter(|(c, cell)| std::iter::repeat(c as u32).take(cell.len()))
            .collect();

        let mut table = FxHashMap::default();
        table.reserve(num_cells);
        for (c, cell) in cells.iter().enumerate() {
            table.insert(cell.key, c as u32);
        }

        let tree = KdTree::build(&cells, true);
        let neighbor_cache = (0..num_cells).map(|_| OnceLock::new()).collect();

        Grid {
            r,
            p_min,
            points: sorted,
            order,
            point_cells,
            cells,
            table,
            tree,
            neighbor_cache,
        }
    }

    /// Builds the grid anchored at the minimum corner of `points`.
    pub fn from_points(points: &[Point<D>], r: f64) -> Self {
        let p_min = p_min_parallel(points).unwrap_or(Point::new([0.0; D]));
        Self::new(points, p_min, r)
    }

    /// Cell side length.
    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn p_min(&self) -> &Point<D> {
        &self.p_min
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Points in grid order.
    pub fn points(&self) -> &[Point<D>] {
        &self.points
    }

    /// `order()[i]` is the input index of the point at grid position `i`.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    pub fn cells(&self) -> &[Cell<D>] {
        &self.cells
    }

    #[inline]
    pub fn cell(&self, c: usize) -> &Cell<D> {
        &self.cells[c]
    }

    /// Cell index of the point at grid position `i`.
    #[inline]
    pub fn point_cell(&self, i: usize) -> usize {
        self.point_cells[i] as usize
    }

    #[inline]
    pub fn cell_points(&self, c: usize) -> &[Point<D>] {
        &self.points[self.cells[c].range()]
    }

    /// The cell whose box contains `coord`, if it holds any points.
    pub fn cell_containing(&self, coord: &[f64; D]) -> Option<usize> {
        let key = quantize(&Point::new(*coord), &self.p_min, self.r);
        self.table.get(&key).map(|&c| c as usize)
    }

    /// Radius around a cell centre enclosing the centre of every cell that
    /// can hold a point within `r * sqrt(D)` of a point in that cell.
    ///
    /// Two cells with key offset `k` are more than
    /// `r * sqrt(sum(max(|k_i| - 1, 0)^2))` apart, which has to stay below
    /// `r * sqrt(D)`. With integer offsets
    /// the farthest such centre is at `r * sqrt(4D - 3)`: offset 2 on `D - 1`
    /// axes and 1 on the last.
    pub fn hop_radius(&self) -> f64 {
        self.r * ((4 * D - 3) as f64).sqrt() * HOP_SLACK
    }

    /// Neighbouring cells of cell `c`, itself included.
    ///
    /// The first call for a cell runs the range search and caches the result;
    /// concurrent first callers wait for that one search instead of repeating it.
    pub fn neighbor_cells(&self, c: usize) -> &[u32] {
        self.neighbor_cache[c].get_or_init(|| {
            self.tree
                .range_neighbors(&self.cells, &self.cells[c].center.x, self.hop_radius())
        })
    }

    /// Whether the neighbour list of cell `c` has been computed yet.
    pub fn is_cached(&self, c: usize) -> bool {
        self.neighbor_cache[c].get().is_some()
    }

    /// Calls `f(cell)` for every neighbouring cell of `c` until it returns `true`.
    pub fn for_each_neighbor_cell<F>(&self, c: usize, mut f: F)
    where
        F: FnMut(usize) -> bool,
    {
        for &nbr in self.neighbor_cells(c) {
            if f(nbr as usize) {
                break;
            }
        }
    }

    /// Calls `f(position, point)` for every point in the neighbouring cells of
    /// `c` until it returns `true`. Positions are in grid order.
    pub fn for_each_neighbor_point<F>(&self, c: usize, mut f: F)
    where
        F: FnMut(usize, &Point<D>) -> bool,
    {
        for &nbr in self.neighbor_cells(c) {
            for i in self.cells[nbr as usize].range() {
                if f(i, &self.points[i]) {
                    return;
                }
            }
        }
    }
}

#[inline]
fn quantize<const D: usize>(p: &Point<D>, p_min: &Point<D>, r: f64) -> [i64; D] {
    let mut key = [0i64; D];
    for i in 0..D {
        key[i] = ((p.x[i] - p_min.x[i]) / r).floor() as i64;
    }
    key
}

fn cell_center<const D: usize>(key: &[i64; D], p_min: &Point<D>, r: f64) -> Point<D> {
    let mut x = [0.0; D];
    for i in 0..D {
        x[i] = p_min.x[i] + r / 2.0 + key[i] as f64 * r;
    }
    Point::new(x)
}
