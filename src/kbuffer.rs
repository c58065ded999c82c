/// A buffer keeping the `k` smallest entries by cost.
///
/// Entries are appended until the buffer holds `2k` of them, at which point
/// it is compacted back down to the `k` smallest. The retained entries are
/// not kept sorted; call [`KBuffer::into_sorted`] for that.
#[derive(Clone, Debug)]
pub struct KBuffer<T> {
    k: usize,
    elems: Vec<(f64, T)>,
}

impl<T: Copy> KBuffer<T> {
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "KBuffer requires k > 0");
        Self {
            k,
            elems: Vec::with_capacity(2 * k),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn has_k(&self) -> bool {
        self.elems.len() >= self.k
    }

    pub fn reset(&mut self) {
        self.elems.clear();
    }

    pub fn insert(&mut self, cost: f64, entry: T) {
        if self.elems.len() == 2 * self.k {
            self.keep_k();
            // Anything not cheaper than the current k-th entry can never make it back in.
            if cost >= self.elems[self.k - 1].0 {
                return;
            }
        }
        self.elems.push((cost, entry));
    }

    /// Compacts to the `k` smallest entries and returns the k-th smallest.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `k` entries have been inserted.
    pub fn keep_k(&mut self) -> (f64, T) {
        assert!(
            self.has_k(),
            "keep_k called on a buffer with {} of {} entries",
            self.elems.len(),
            self.k
        );
        let k = self.k;
        self.elems
            .select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
        self.elems.truncate(k);
        // Selection leaves the k-th smallest in the last retained slot.
        self.elems[k - 1]
    }

    /// The retained entries (at most `k`) in ascending cost order.
    pub fn into_sorted(mut self) -> Vec<(f64, T)> {
        if self.has_k() {
            self.keep_k();
        }
        self.elems.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        self.elems
    }
}
