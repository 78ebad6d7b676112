// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_cull --heading-base-level=0

//! Understory Cull: uniform-grid visibility culling for 2D scenes.
//!
//! Understory Cull answers "which objects intersect the viewport" for a large,
//! mutable set of axis-aligned objects, so a renderer can skip everything else.
//!
//! - Buckets objects into fixed-size grid cells; an object spanning several
//!   cells sits in each of them.
//! - Re-indexes only objects that moved, and only when their covered cell
//!   range actually changed.
//! - Culls with either a precise AABB test on bucket members or a coarser,
//!   cheaper bucket-only pass.
//!
//! The culler does not own scene objects. Callers describe them through the
//! [`Cullable`] and [`Scene`] traits; the culler keeps its own per-object
//! spatial state in a side table keyed by object id and writes each object's
//! `visible` flag during a cull pass.
//!
//! ## Registration
//!
//! - [`GridCuller::register_object`] tracks a single object, optionally as
//!   static (never re-indexed).
//! - [`GridCuller::register_container`] tracks all current and future children
//!   of a scene container. The culler subscribes to the container's child
//!   changes and applies them on every refresh, or directly through
//!   [`GridCuller::child_added`] / [`GridCuller::child_removed`].
//!
//! ## Culling
//!
//! [`GridCuller::cull`] refreshes moved objects, hides every tracked object and
//! shows the ones found for the viewport. [`GridCuller::cull_with`] also runs a
//! caller callback on each object about to become visible.
//! [`GridCuller::query`], [`GridCuller::query_any`] and
//! [`GridCuller::neighbors`] read the grid without touching visibility.
//!
//! ## Boundary convention
//!
//! Cell membership is closed: a box whose max edge lies exactly on a cell
//! boundary also sits in the next cell. The precise test is open on every
//! side: a box that only touches the viewport's edge is culled. In particular
//! a point, or any zero-width or zero-height box, lying exactly on a viewport
//! edge is not visible with the precise test; it is only shown by the
//! bucket-only pass, whose cells are closed.
//!
//! # Example
//!
//! ```rust
//! use understory_cull::{CullerConfig, GridCuller};
//!
//! let config = CullerConfig::new().with_cell_size(128.0);
//! let culler: GridCuller<u32, u32> = GridCuller::new(config).unwrap();
//! assert_eq!(culler.bucket_count(), 0);
//!
//! assert!(GridCuller::<u32, u32>::new(config.with_cell_size(0.0)).is_err());
//! ```
//!
//! ## Features
//!
//! - `std` *(default)*: enables `std` support in `kurbo`, `tracing` and `thiserror`.
//! - `libm`: use `kurbo` with `libm` for `no_std` targets.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for coordinates. Cell coordinates saturate at the
//! `i32` range.
//!
//! ### Cost
//!
//! An object is placed in every cell its box covers, so registering or
//! moving a box that spans `n` cells costs `O(n)` time and memory. Keep the
//! cell size in proportion to typical object sizes: a box a billion units
//! wide over 100-unit cells would occupy billions of buckets. A query or
//! cull walks the smaller of the covered cell range and the bucket map, so a
//! huge viewport costs at most one pass over the occupied cells.

#![no_std]

extern crate alloc;

mod config;
mod culler;
mod error;
mod grid;
mod scene;
mod stats;
mod types;

#[cfg(test)]
mod test_scene;

pub use config::CullerConfig;
pub use culler::{CullReport, GridCuller, RefreshReport};
pub use error::CullError;
pub use scene::{ChildEvent, Cullable, Scene, Subscription};
pub use stats::GridStats;
pub use types::{CellKey, CellRange};
