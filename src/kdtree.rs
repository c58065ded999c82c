use crate::bounds::{BoundingBox, BoxRelation};
use crate::kbuffer::KBuffer;
use crate::point::Coordinates;

/// Index of a node in the tree's arena.
pub type NodeId = u32;

const NONE: u32 = u32::MAX;

/// Maximum number of items stored in a leaf.
pub const LEAF_SIZE: usize = 16;

/// Subtrees with more items than this are built with `rayon::join`.
const PARALLEL_CUTOFF: usize = 2000;

#[derive(Clone, Copy, Debug)]
struct KdNode<const D: usize> {
    bbox: BoundingBox<D>,
    // Items: indices[start..end]
    start: u32,
    end: u32,
    left: u32, // NONE if leaf
    right: u32,
    sibling: u32, // NONE for the root
}

impl<const D: usize> Default for KdNode<D> {
    fn default() -> Self {
        KdNode {
            bbox: BoundingBox::empty(),
            start: 0,
            end: 0,
            left: NONE,
            right: NONE,
            sibling: NONE,
        }
    }
}

/// A balanced k-d tree over a fixed slice of positioned objects.
///
/// The tree does not own the objects, it stores a permutation of their
/// indices. Every node covers a contiguous range of that permutation and
/// caches its bounding box. Nodes live in a single arena of `2n - 1` slots:
/// a node at slot `p` whose left child holds `m` items has its left child at
/// `p + 1` and its right child at `p + 2m`. Queries take the same object
/// slice the tree was built from.
pub struct KdTree<const D: usize> {
    nodes: Vec<KdNode<D>>,
    indices: Vec<u32>,
}

impl<const D: usize> KdTree<D> {
    /// Builds a tree with the default leaf size.
    pub fn build<T: Coordinates<D> + Sync>(items: &[T], parallel: bool) -> Self {
        Self::build_with_leaf_size(items, LEAF_SIZE, parallel)
    }

    pub fn build_with_leaf_size<T: Coordinates<D> + Sync>(items: &[T], leaf_size: usize, parallel: bool) -> Self {
        assert!(leaf_size >= 1, "leaf size must be at least 1");
        let count = items.len();
        assert!(count < NONE as usize, "too many items for a kd-tree: {}", count);

        let mut indices: Vec<u32> = (0..count as u32).collect();
        if count == 0 {
            return KdTree { nodes: Vec::new(), indices };
        }

        let mut nodes = vec![KdNode::default(); 2 * count - 1];
        build_recursive(&mut nodes, &mut indices, 0, 0, NONE, items, leaf_size, parallel);
        KdTree { nodes, indices }
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() { None } else { Some(0) }
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes[node as usize].left == NONE
    }

    #[inline]
    pub fn left(&self, node: NodeId) -> NodeId {
        self.nodes[node as usize].left
    }

    #[inline]
    pub fn right(&self, node: NodeId) -> NodeId {
        self.nodes[node as usize].right
    }

    pub fn sibling(&self, node: NodeId) -> Option<NodeId> {
        let s = self.nodes[node as usize].sibling;
        if s == NONE { None } else { Some(s) }
    }

    #[inline]
    pub fn bbox(&self, node: NodeId) -> &BoundingBox<D> {
        &self.nodes[node as usize].bbox
    }

    /// Indices (into the build slice) of the items under `node`.
    #[inline]
    pub fn items(&self, node: NodeId) -> &[u32] {
        let n = &self.nodes[node as usize];
        &self.indices[n.start as usize..n.end as usize]
    }

    #[inline]
    pub fn size(&self, node: NodeId) -> usize {
        let n = &self.nodes[node as usize];
        (n.end - n.start) as usize
    }

    /// Squared bounding box distance between `node` of this tree and
    /// `other_node` of `other`.
    #[inline]
    pub fn node_dist_sq(&self, node: NodeId, other: &KdTree<D>, other_node: NodeId) -> f64 {
        self.bbox(node).dist_sq(other.bbox(other_node))
    }

    /// All items within distance `r` of `center`.
    pub fn range_neighbors<T: Coordinates<D>>(&self, items: &[T], center: &[f64; D], r: f64) -> Vec<u32> {
        let mut found = Vec::new();
        self.range_visit(items, center, r, |idx, _| {
            found.push(idx);
            false
        });
        found
    }

    /// Calls `visitor(index, distance)` for every item within distance `r` of
    /// `center`. Returning `true` from the visitor stops the search.
    pub fn range_visit<T, F>(&self, items: &[T], center: &[f64; D], r: f64, mut visitor: F)
    where
        T: Coordinates<D>,
        F: FnMut(u32, f64) -> bool,
    {
        if let Some(root) = self.root() {
            self.range_from(root, items, center, r, &mut visitor);
        }
    }

    fn range_from<T, F>(&self, node: NodeId, items: &[T], center: &[f64; D], r: f64, visitor: &mut F) -> bool
    where
        T: Coordinates<D>,
        F: FnMut(u32, f64) -> bool,
    {
        let mut query = BoundingBox::new(*center, *center);
        for i in 0..D {
            query.min[i] -= r;
            query.max[i] += r;
        }
        self.range_recursive(node, items, center, r, &query, visitor)
    }

    fn range_recursive<T, F>(
        &self,
        node: NodeId,
        items: &[T],
        center: &[f64; D],
        r: f64,
        query: &BoundingBox<D>,
        visitor: &mut F,
    ) -> bool
    where
        T: Coordinates<D>,
        F: FnMut(u32, f64) -> bool,
    {
        match query.relation(self.bbox(node)) {
            BoxRelation::Exclude => false,
            BoxRelation::Overlap if !self.is_leaf(node) => {
                self.range_recursive(self.left(node), items, center, r, query, visitor)
                    || self.range_recursive(self.right(node), items, center, r, query, visitor)
            }
            _ => {
                for &idx in self.items(node) {
                    let d = dist(center, items[idx as usize].coordinate());
                    if d <= r && visitor(idx, d) {
                        return true;
                    }
                }
                false
            }
        }
    }

    /// The `k` nearest items to `query` as `(distance, index)`, closest first.
    ///
    /// Descends to the leaf nearest the query, then widens outwards through
    /// the siblings on the way back up: a sibling is taken whole while fewer
    /// than `k` candidates are known, otherwise it is range searched with the
    /// current k-th distance.
    pub fn knn<T: Coordinates<D>>(&self, items: &[T], query: &[f64; D], k: usize) -> Vec<(f64, u32)> {
        let k = k.min(self.len());
        let Some(root) = self.root() else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        let mut buf = KBuffer::new(k);
        self.knn_recursive(root, items, query, &mut buf);
        buf.into_sorted()
    }

    fn knn_recursive<T: Coordinates<D>>(&self, node: NodeId, items: &[T], query: &[f64; D], buf: &mut KBuffer<u32>) {
        if self.is_leaf(node) {
            for &idx in self.items(node) {
                buf.insert(dist(query, items[idx as usize].coordinate()), idx);
            }
        } else {
            let (l, r) = (self.left(node), self.right(node));
            let next = if self.bbox(l).dist_sq_to(query) <= self.bbox(r).dist_sq_to(query) { l } else { r };
            self.knn_recursive(next, items, query, buf);
        }

        let Some(sib) = self.sibling(node) else {
            return;
        };
        if !buf.has_k() {
            for &idx in self.items(sib) {
                buf.insert(dist(query, items[idx as usize].coordinate()), idx);
            }
        } else {
            let (radius, _) = buf.keep_k();
            self.range_from(sib, items, query, radius, &mut |idx, d| {
                buf.insert(d, idx);
                false
            });
        }
    }
}

#[inline]
fn dist<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    let mut d2 = 0.0;
    for i in 0..D {
        let d = a[i] - b[i];
        d2 += d * d;
    }
    d2.sqrt()
}

#[allow(clippy::too_many_arguments)]
fn build_recursive<T: Coordinates<D> + Sync, const D: usize>(
    nodes: &mut [KdNode<D>],
    indices: &mut [u32],
    slot: u32,
    start: u32,
    sibling: u32,
    items: &[T],
    leaf_size: usize,
    parallel: bool,
) {
    let count = indices.len();
    let bbox = BoundingBox::from_points(indices.iter().map(|&i| items[i as usize].coordinate()));

    let (node, rest) = nodes
        .split_first_mut()
        .expect("arena holds 2n - 1 slots for every subtree");
    *node = KdNode {
        bbox,
        start,
        end: start + count as u32,
        left: NONE,
        right: NONE,
        sibling,
    };

    // Leaf condition: small number of items
    if count <= leaf_size {
        return;
    }

    // Spatial median on the widest axis
    let axis = bbox.widest_axis();
    let split_val = (bbox.min[axis] + bbox.max[axis]) / 2.0;
    let mut median = split_items(indices, items, axis, split_val);
    if median == 0 || median == count {
        median = count.div_ceil(2);
    }

    let left = slot + 1;
    let right = slot + 2 * median as u32;
    node.left = left;
    node.right = right;

    let (left_nodes, right_nodes) = rest.split_at_mut(2 * median - 1);
    let (left_items, right_items) = indices.split_at_mut(median);
    let right_start = start + median as u32;

    if parallel && count > PARALLEL_CUTOFF {
        rayon::join(
            || build_recursive(left_nodes, left_items, left, start, right, items, leaf_size, parallel),
            || build_recursive(right_nodes, right_items, right, right_start, left, items, leaf_size, parallel),
        );
    } else {
        build_recursive(left_nodes, left_items, left, start, right, items, leaf_size, parallel);
        build_recursive(right_nodes, right_items, right, right_start, left, items, leaf_size, parallel);
    }
}

/// Partitions `indices` so that items with coordinate `< split_val` on `axis`
/// come first, returning the size of that group.
fn split_items<T: Coordinates<D>, const D: usize>(indices: &mut [u32], items: &[T], axis: usize, split_val: f64) -> usize {
    assert!(indices.len() >= 2, "kd-tree asked to split a singleton node");
    let mut lo = 0;
    let mut hi = indices.len();
    while lo < hi {
        if items[indices[lo] as usize].coordinate()[axis] < split_val {
            lo += 1;
        } else {
            hi -= 1;
            indices.swap(lo, hi);
        }
    }
    lo
}
