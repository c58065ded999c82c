use crate::dbscan::NOISE;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Rewrites cluster labels to dense ids `0..k` and returns `k`.
///
/// Ids are handed out in increasing order of the old labels. [`NOISE`]
/// stays noise. Relabelling an already dense labelling leaves it unchanged.
pub fn relabel(labels: &mut [i32]) -> usize {
    let mut sorted = labels.to_vec();
    sorted.par_sort_unstable();

    let mut dense: FxHashMap<i32, i32> = FxHashMap::default();
    let mut next = 0;
    for (i, &l) in sorted.iter().enumerate() {
        if l != NOISE && (i == 0 || sorted[i - 1] != l) {
            dense.insert(l, next);
            next += 1;
        }
    }

    labels.par_iter_mut().for_each(|l| {
        if *l != NOISE {
            let old = *l;
            *l = dense[&old];
        }
    });
    next as usize
}

/// Scatters `values`, stored in grid order, back into input order:
/// `out[order[i]] = values[i]`.
pub fn unpermute_into<T: Copy>(values: &[T], order: &[u32], out: &mut [T]) {
    assert_eq!(values.len(), order.len());
    assert_eq!(out.len(), order.len());
    for (&v, &o) in values.iter().zip(order) {
        out[o as usize] = v;
    }
}

pub fn unpermute<T: Copy + Default>(values: &[T], order: &[u32]) -> Vec<T> {
    let mut out = vec![T::default(); values.len()];
    unpermute_into(values, order, &mut out);
    out
}
