//! # pardbscan
//!
//! `pardbscan` is a Rust library for exact parallel DBSCAN clustering in 2 to 20
//! dimensions, designed to be used in Rust as well as compiled to WebAssembly
//! (WASM). Points are binned into a uniform grid whose cells are small enough
//! that every cell is a clique, so most of the work happens between cells
//! instead of between points.
//!
//! ## Features
//!
//! - **Parallel**: every phase runs on the `rayon` thread pool; scope it with
//!   `ThreadPool::install` to control the thread count.
//! - **Grid + k-d tree**: non-empty cells are indexed by a k-d tree over their
//!   centres, and each cell's neighbour list is computed once and cached.
//! - **Closest core pairs**: cells are merged through a lock-free union-find
//!   when a dual-tree search finds two core points within `epsilon`.
//! - **WASM-first**: the [`wasm`] module exposes the clustering to JavaScript.
//!
//! ## Main Interface
//!
//! [`dbscan`] takes a flat coordinate array and a runtime dimension;
//! [`dbscan_points`] takes typed [`Point`]s. Both return a [`Clustering`]
//! with core flags and dense cluster labels in input order.

mod bccp;
mod bounds;
mod dbscan;
mod error;
mod grid;
mod kbuffer;
mod kdtree;
mod labels;
mod point;
mod union_find;
mod util;
pub mod wasm;

pub use bccp::core_distance;
pub use bccp::has_edge;
pub use bccp::CellTrees;
pub use bounds::BoundingBox;
pub use bounds::BoxRelation;
pub use dbscan::dbscan;
pub use dbscan::dbscan_into;
pub use dbscan::dbscan_points;
pub use dbscan::k_distances;
pub use dbscan::status_code;
pub use dbscan::Clustering;
pub use dbscan::DbscanParams;
pub use dbscan::MAX_DIM;
pub use dbscan::MIN_DIM;
pub use dbscan::NOISE;
pub use error::Error;
pub use error::Result;
pub use grid::Cell;
pub use grid::Grid;
pub use kbuffer::KBuffer;
pub use kdtree::KdTree;
pub use kdtree::NodeId;
pub use labels::relabel;
pub use labels::unpermute;
pub use point::points_from_flat;
pub use point::Coordinates;
pub use point::Point;
pub use union_find::UnionFind;
