use crate::dbscan::{self as engine, Clustering, DbscanParams};
use js_sys::Array;
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_rayon::init_thread_pool;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn init_threads(n: usize) -> js_sys::Promise {
    init_thread_pool(n)
}

#[wasm_bindgen(typescript_custom_section)]
const TS_CONSTANTS_NOISE: &'static str = r#"
export const NOISE = -1;
"#;

/// Outcome of a clustering run, in input order.
#[wasm_bindgen]
pub struct DbscanResult {
    inner: Clustering,
}

#[wasm_bindgen]
impl DbscanResult {
    /// Cluster id per point, `-1` for noise.
    #[wasm_bindgen(getter)]
    pub fn labels(&self) -> Vec<i32> {
        self.inner.labels.clone()
    }

    /// 1 for core points, 0 otherwise.
    #[wasm_bindgen(getter)]
    pub fn core(&self) -> Vec<u8> {
        self.inner.core.iter().map(|&c| c as u8).collect()
    }

    #[wasm_bindgen(getter = numClusters)]
    pub fn num_clusters(&self) -> usize {
        self.inner.num_clusters
    }

    #[wasm_bindgen(getter = clusterSizes)]
    pub fn cluster_sizes(&self) -> Vec<u32> {
        self.inner.cluster_sizes().into_iter().map(|s| s as u32).collect()
    }
}

/// Clusters a flat row-major coordinate array of dimension `dim`.
#[wasm_bindgen]
pub fn dbscan(dim: usize, points: &[f64], epsilon: f64, min_pts: usize) -> Result<DbscanResult, JsError> {
    let inner = engine::dbscan(dim, points, &DbscanParams::new(epsilon, min_pts))?;
    Ok(DbscanResult { inner })
}

/// Clusters an array of coordinate arrays, all of the same length.
#[wasm_bindgen(js_name = dbscanArrays)]
pub fn dbscan_arrays(points: &Array, epsilon: f64, min_pts: usize) -> Result<DbscanResult, JsError> {
    let (dim, flat) = flatten_js_points(points)?;
    dbscan(dim, &flat, epsilon, min_pts)
}

/// Distance from each point to its `k`-th nearest neighbour, itself included.
#[wasm_bindgen(js_name = kDistances)]
pub fn k_distances(dim: usize, points: &[f64], k: usize) -> Result<Vec<f64>, JsError> {
    Ok(engine::k_distances(dim, points, k)?)
}

fn flatten_js_points(points: &Array) -> Result<(usize, Vec<f64>), JsError> {
    let Some(first) = points.get(0).dyn_ref::<Array>().map(Array::length) else {
        return Ok((engine::MIN_DIM, Vec::new()));
    };
    let dim = first as usize;
    let mut flat = Vec::with_capacity(dim * points.length() as usize);
    for (i, val) in points.iter().enumerate() {
        let arr = val
            .dyn_ref::<Array>()
            .filter(|a| a.length() as usize == dim)
            .ok_or_else(|| JsError::new(&format!("point {} is not an array of {} numbers", i, dim)))?;
        for v in arr.iter() {
            let x = v
                .as_f64()
                .ok_or_else(|| JsError::new(&format!("point {} has a non-numeric coordinate", i)))?;
            flat.push(x);
        }
    }
    Ok((dim, flat))
}
