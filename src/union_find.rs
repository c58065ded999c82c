use std::sync::atomic::{AtomicU32, Ordering};

const NONE: u32 = u32::MAX;

/// Lock-free disjoint sets over `0..n`, safe to `find` and `link` from many threads.
///
/// Roots are always hooked under a higher index, so parent pointers only
/// ever increase and `find` cannot loop. A root is claimed through a
/// compare-and-swap on its hook slot before its parent is set, so two
/// threads never hook the same root.
pub struct UnionFind {
    parents: Vec<AtomicU32>,
    hooks: Vec<AtomicU32>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        assert!(n < NONE as usize, "too many elements for union-find: {}", n);
        UnionFind {
            parents: (0..n).map(|_| AtomicU32::new(NONE)).collect(),
            hooks: (0..n).map(|_| AtomicU32::new(NONE)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Representative of `i`'s set.
    pub fn find(&self, i: usize) -> usize {
        let mut root = i as u32;
        loop {
            let p = self.parents[root as usize].load(Ordering::Acquire);
            if p == NONE {
                break;
            }
            root = p;
        }

        // Point the path straight at the root. Another thread may have moved
        // an entry past `root` already; fetch_max keeps the higher ancestor.
        let mut cur = i as u32;
        while cur != root {
            let next = self.parents[cur as usize].load(Ordering::Acquire);
            if next >= root {
                break;
            }
            self.parents[cur as usize].fetch_max(root, Ordering::AcqRel);
            cur = next;
        }
        root as usize
    }

    /// Merges the sets of `u` and `v`.
    pub fn link(&self, u: usize, v: usize) {
        let (mut u, mut v) = (u, v);
        loop {
            u = self.find(u);
            v = self.find(v);
            if u == v {
                return;
            }
            if u > v {
                std::mem::swap(&mut u, &mut v);
            }
            if self.hooks[u].load(Ordering::Acquire) == NONE
                && self.hooks[u]
                    .compare_exchange(NONE, u as u32, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                self.parents[u].store(v as u32, Ordering::Release);
                return;
            }
        }
    }

    pub fn same(&self, u: usize, v: usize) -> bool {
        self.find(u) == self.find(v)
    }
}
