use rayon::prelude::*;

/// A point in `D`-dimensional Euclidean space.
///
/// Points are immutable once created. The first coordinate set to `f64::MAX`
/// marks an empty point, used for unset slots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<const D: usize> {
    pub x: [f64; D],
}

/// Objects with a position, indexable by a [`KdTree`](crate::KdTree).
pub trait Coordinates<const D: usize> {
    fn coordinate(&self) -> &[f64; D];
}

impl<const D: usize> Coordinates<D> for Point<D> {
    #[inline]
    fn coordinate(&self) -> &[f64; D] {
        &self.x
    }
}

impl<const D: usize> Default for Point<D> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<const D: usize> Point<D> {
    const EMPTY_VALUE: f64 = f64::MAX;

    /// The empty point.
    pub const EMPTY: Self = Self { x: [Self::EMPTY_VALUE; D] };

    pub fn new(x: [f64; D]) -> Self {
        Self { x }
    }

    /// Builds a point from the first `D` values of `coords`.
    pub fn from_slice(coords: &[f64]) -> Self {
        let mut x = [0.0; D];
        x.copy_from_slice(&coords[..D]);
        Self { x }
    }

    pub fn is_empty(&self) -> bool {
        D == 0 || self.x[0] == Self::EMPTY_VALUE
    }

    #[inline]
    pub fn dist_sqr(&self, other: &Point<D>) -> f64 {
        let mut d2 = 0.0;
        for i in 0..D {
            let d = self.x[i] - other.x[i];
            d2 += d * d;
        }
        d2
    }

    #[inline]
    pub fn dist(&self, other: &Point<D>) -> f64 {
        self.dist_sqr(other).sqrt()
    }

    /// Component-wise minimum with `other`.
    pub fn min_coords(&self, other: &[f64; D]) -> Self {
        let mut x = self.x;
        for i in 0..D {
            x[i] = x[i].min(other[i]);
        }
        Self { x }
    }

    /// Component-wise maximum with `other`.
    pub fn max_coords(&self, other: &[f64; D]) -> Self {
        let mut x = self.x;
        for i in 0..D {
            x[i] = x[i].max(other[i]);
        }
        Self { x }
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.x[i]
    }
}

/// Reinterprets a flat row-major coordinate array as points.
pub fn points_from_flat<const D: usize>(flat: &[f64]) -> Vec<Point<D>> {
    flat.par_chunks_exact(D).map(Point::from_slice).collect()
}

/// Global per-dimension minimum of `points`, reduced in parallel.
///
/// Returns `None` for an empty slice.
pub fn p_min_parallel<const D: usize>(points: &[Point<D>]) -> Option<Point<D>> {
    let first = *points.first()?;
    Some(
        points
            .par_iter()
            .fold(|| first, |acc, p| acc.min_coords(&p.x))
            .reduce(|| first, |a, b| a.min_coords(&b.x)),
    )
}
