/// Generic bounding box for N-dimensional space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox<const D: usize> {
    pub min: [f64; D],
    pub max: [f64; D],
}

/// Relation of a query box to another box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxRelation {
    /// The query box fully contains the other box.
    Include,
    /// The boxes intersect without containment.
    Overlap,
    /// The boxes are disjoint.
    Exclude,
}

impl<const D: usize> BoundingBox<D> {
    pub fn new(min: [f64; D], max: [f64; D]) -> Self {
        Self { min, max }
    }

    /// An inverted box that any `extend` call will overwrite.
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; D],
            max: [f64::NEG_INFINITY; D],
        }
    }

    /// Smallest box enclosing every coordinate yielded by `coords`.
    pub fn from_points<'a, I>(coords: I) -> Self
    where
        I: IntoIterator<Item = &'a [f64; D]>,
    {
        let mut b = Self::empty();
        for c in coords {
            b.extend(c);
        }
        b
    }

    pub fn extend(&mut self, c: &[f64; D]) {
        for i in 0..D {
            if c[i] < self.min[i] { self.min[i] = c[i]; }
            if c[i] > self.max[i] { self.max[i] = c[i]; }
        }
    }

    pub fn contains(&self, c: &[f64; D]) -> bool {
        (0..D).all(|i| c[i] >= self.min[i] && c[i] <= self.max[i])
    }

    /// Axis with the largest extent; the first one wins on ties.
    pub fn widest_axis(&self) -> usize {
        let mut axis = 0;
        let mut widest = f64::NEG_INFINITY;
        for i in 0..D {
            let w = self.max[i] - self.min[i];
            if w > widest {
                widest = w;
                axis = i;
            }
        }
        axis
    }

    /// How `self`, taken as the query box, relates to `other`.
    pub fn relation(&self, other: &BoundingBox<D>) -> BoxRelation {
        let mut include = true;
        for i in 0..D {
            if self.max[i] < other.min[i] || self.min[i] > other.max[i] {
                return BoxRelation::Exclude;
            }
            if self.max[i] < other.max[i] || self.min[i] > other.min[i] {
                include = false;
            }
        }
        if include { BoxRelation::Include } else { BoxRelation::Overlap }
    }

    /// Lower bound on the squared distance between any point of `self` and
    /// any point of `other`.
    pub fn dist_sq(&self, other: &BoundingBox<D>) -> f64 {
        let mut d2 = 0.0;
        for i in 0..D {
            let gap = (self.min[i] - other.max[i]).max(other.min[i] - self.max[i]);
            if gap > 0.0 {
                d2 += gap * gap;
            }
        }
        d2
    }

    /// Squared distance from `c` to the closest point of the box.
    pub fn dist_sq_to(&self, c: &[f64; D]) -> f64 {
        let mut d2 = 0.0;
        for i in 0..D {
            let v = c[i];
            if v < self.min[i] { d2 += (self.min[i] - v).powi(2); }
            else if v > self.max[i] { d2 += (v - self.max[i]).powi(2); }
        }
        d2
    }
}
