// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only diagnostics over the bucket map.
//!
//! These walk every bucket (or every cell of a region), so keep them out of
//! per-frame code.

use core::fmt;
use core::hash::Hash;

use kurbo::Rect;

use crate::grid::Grid;
use crate::types::CellRange;

/// Snapshot of the grid's occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridStats {
    /// Number of tracked objects.
    pub objects: usize,
    /// Number of non-empty buckets.
    pub buckets: usize,
    /// Sum of all bucket sizes; an object spanning `n` cells counts `n` times.
    pub placements: usize,
    /// Size of the largest bucket.
    pub largest_bucket: usize,
    /// Mean bucket size, `0.0` when there are no buckets.
    pub average_bucket_size: f64,
    /// Non-empty buckets visited by the most recent cull.
    pub last_buckets: usize,
    /// Cell bounds of all non-empty buckets.
    pub world_bounds: Option<CellRange>,
}

impl fmt::Display for GridStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects in {} buckets ({} placements, avg {:.2}, largest {}), last cull visited {}",
            self.objects,
            self.buckets,
            self.placements,
            self.average_bucket_size,
            self.largest_bucket,
            self.last_buckets,
        )?;
        if let Some(b) = self.world_bounds {
            write!(f, ", cells ({}, {})..=({}, {})", b.x0, b.y0, b.x1, b.y1)?;
        }
        Ok(())
    }
}

impl<K: Copy + Eq + Hash> Grid<K> {
    pub(crate) fn bucket_count(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn placements(&self) -> usize {
        self.cells.values().map(|b| b.members.len()).sum()
    }

    pub(crate) fn largest_bucket(&self) -> usize {
        self.cells
            .values()
            .map(|b| b.members.len())
            .max()
            .unwrap_or(0)
    }

    #[allow(
        clippy::cast_precision_loss,
        reason = "Bucket counts far below 2^52 are exact in f64."
    )]
    pub(crate) fn average_bucket_size(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.placements() as f64 / self.cells.len() as f64
    }

    pub(crate) fn world_bounds(&self) -> Option<CellRange> {
        let mut keys = self.cells.keys().copied();
        let first = keys.next()?;
        let mut bounds = CellRange::new(first.x, first.y, first.x, first.y);
        for key in keys {
            bounds.include(key);
        }
        Some(bounds)
    }

    /// Fraction of the cells covering `rect` that hold at least one object.
    #[allow(
        clippy::cast_precision_loss,
        reason = "Ratio of cell counts; precision loss on astronomically large regions is acceptable."
    )]
    pub(crate) fn sparseness(&self, rect: Rect) -> f64 {
        let range = CellRange::covering(rect, self.cell_width, self.cell_height);
        let total = range.cell_count();
        // Walk whichever side is smaller.
        let occupied = if (self.cells.len() as u64) < total {
            self.cells.keys().filter(|k| range.contains(**k)).count() as u64
        } else {
            range.iter().filter(|k| self.cells.contains_key(k)).count() as u64
        };
        occupied as f64 / total as f64
    }

    pub(crate) fn stats(&self, last_buckets: usize) -> GridStats {
        GridStats {
            objects: self.states.len(),
            buckets: self.bucket_count(),
            placements: self.placements(),
            largest_bucket: self.largest_bucket(),
            average_bucket_size: self.average_bucket_size(),
            last_buckets,
            world_bounds: self.world_bounds(),
        }
    }
}
