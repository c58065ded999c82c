mod common;

use pardbscan::{dbscan, dbscan_points, points_from_flat, DbscanParams};
use rayon::ThreadPoolBuilder;

fn run_and_check(dim: usize, points: &[f64], epsilon: f64, min_pts: usize) {
    let _ = env_logger::builder().is_test(true).try_init();
    let res = dbscan(dim, points, &DbscanParams::new(epsilon, min_pts)).unwrap();
    if let Err(e) = common::check(dim, points, epsilon, min_pts, &res) {
        panic!("dim {}, epsilon {}, min_pts {}: {}", dim, epsilon, min_pts, e);
    }
}

#[test]
fn test_matches_brute_force_2d() {
    let points = common::blobs(2, 600, 5, 20.0, 1.5, 1);
    for &(eps, min_pts) in &[(0.3, 3), (0.5, 5), (1.0, 10), (2.5, 4)] {
        run_and_check(2, &points, eps, min_pts);
    }
}

#[test]
fn test_matches_brute_force_3d() {
    let points = common::blobs(3, 500, 4, 10.0, 1.0, 2);
    for &(eps, min_pts) in &[(0.4, 3), (0.8, 6), (1.5, 12)] {
        run_and_check(3, &points, eps, min_pts);
    }
}

#[test]
fn test_matches_brute_force_5d() {
    let points = common::blobs(5, 400, 3, 5.0, 1.0, 3);
    for &(eps, min_pts) in &[(0.6, 2), (1.0, 4), (2.0, 8)] {
        run_and_check(5, &points, eps, min_pts);
    }
}

#[test]
fn test_matches_brute_force_high_dim() {
    let points = common::blobs(12, 200, 2, 4.0, 1.0, 4);
    run_and_check(12, &points, 2.0, 3);
}

#[test]
fn test_dense_cells_use_trees() {
    // Tight blobs put hundreds of points in a cell, past the exhaustive pair check.
    let points = common::blobs(2, 3000, 6, 12.0, 0.6, 5);
    for &(eps, min_pts) in &[(0.5, 20), (1.0, 60)] {
        run_and_check(2, &points, eps, min_pts);
    }
}

#[test]
fn test_min_pts_one() {
    // Every point is core; clusters are the connected components.
    let points = common::blobs(3, 300, 4, 10.0, 0.5, 6);
    run_and_check(3, &points, 0.7, 1);
}

#[test]
fn test_same_result_on_any_thread_count() {
    let points = common::blobs(3, 4000, 8, 20.0, 1.0, 7);
    let params = DbscanParams::new(0.8, 8);
    let reference = ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| dbscan(3, &points, &params).unwrap());
    for threads in [2, 4, 8] {
        let pool = ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        let res = pool.install(|| dbscan(3, &points, &params).unwrap());
        assert_eq!(res, reference, "{} threads", threads);
    }
}

#[test]
fn test_typed_and_flat_agree() {
    let flat = common::blobs(4, 500, 3, 8.0, 1.0, 8);
    let params = DbscanParams::new(1.0, 5);
    let typed = dbscan_points(&points_from_flat::<4>(&flat), &params).unwrap();
    assert_eq!(typed, dbscan(4, &flat, &params).unwrap());
}
