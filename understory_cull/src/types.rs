// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid coordinates and the geometry helpers shared by the culler.

use core::fmt;

use kurbo::{Point, Rect, Vec2};

/// Integer coordinates of one grid cell.
///
/// A world-space point `(x, y)` belongs to cell
/// `(floor(x / cell_width), floor(y / cell_height))`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl CellKey {
    /// Create a key from cell coordinates.
    #[inline(always)]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangle of cells, `x0..=x1` by `y0..=y1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// First column.
    pub x0: i32,
    /// First row.
    pub y0: i32,
    /// Last column (inclusive).
    pub x1: i32,
    /// Last row (inclusive).
    pub y1: i32,
}

impl CellRange {
    /// Create a range from its corner cells. Corners are reordered if needed.
    #[inline]
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// The cells covered by `rect` on a grid of `cell_width` by `cell_height`.
    ///
    /// Both edges map through the same floor, so a max edge lying exactly on a
    /// cell boundary reaches into the next cell.
    pub fn covering(rect: Rect, cell_width: f64, cell_height: f64) -> Self {
        let rect = rect.abs();
        Self::new(
            cell_coord(rect.x0, cell_width),
            cell_coord(rect.y0, cell_height),
            cell_coord(rect.x1, cell_width),
            cell_coord(rect.y1, cell_height),
        )
    }

    /// Whether the range contains the cell.
    #[inline]
    pub fn contains(&self, key: CellKey) -> bool {
        self.x0 <= key.x && key.x <= self.x1 && self.y0 <= key.y && key.y <= self.y1
    }

    /// Number of cells in the range.
    #[inline]
    pub fn cell_count(&self) -> u64 {
        let w = (i64::from(self.x1) - i64::from(self.x0) + 1).unsigned_abs();
        let h = (i64::from(self.y1) - i64::from(self.y0) + 1).unsigned_abs();
        w.saturating_mul(h)
    }

    /// Grow the range to include `key`.
    #[inline]
    pub fn include(&mut self, key: CellKey) {
        self.x0 = self.x0.min(key.x);
        self.y0 = self.y0.min(key.y);
        self.x1 = self.x1.max(key.x);
        self.y1 = self.y1.max(key.y);
    }

    /// Iterate the cells in row-major order (rows outer, columns inner).
    pub fn iter(&self) -> impl Iterator<Item = CellKey> + use<> {
        let Self { x0, y0, x1, y1 } = *self;
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| CellKey::new(x, y)))
    }
}

/// Map a world coordinate to a cell coordinate along one axis.
///
/// Rounds towards -∞ without relying on `std` float intrinsics. Values outside
/// the `i32` range saturate.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Grid cell indices are intentionally i32; out-of-range values are saturated."
)]
#[inline]
pub(crate) fn cell_coord(value: f64, cell_size: f64) -> i32 {
    debug_assert!(cell_size > 0.0, "cell size must be strictly positive");
    let t = value / cell_size;
    let coord = t as i32;

    // The cast truncated towards zero.
    if t < 0.0 && f64::from(coord) > t {
        coord.saturating_sub(1)
    } else {
        coord
    }
}

/// World-space AABB of an object placed at `position`, scaled by `scale` around `pivot`.
///
/// The origin is `position + (local.origin - pivot) * scale` and the size is
/// `local.size * scale`. Negative scale mirrors the box; the result is always
/// normalized.
pub(crate) fn world_aabb(position: Point, scale: Vec2, pivot: Point, local: Rect) -> Rect {
    let x0 = position.x + (local.x0 - pivot.x) * scale.x;
    let y0 = position.y + (local.y0 - pivot.y) * scale.y;
    let w = local.width() * scale.x;
    let h = local.height() * scale.y;
    Rect::new(x0, y0, x0 + w, y0 + h).abs()
}

/// Precise visibility test: strict on all four edges.
///
/// A box that only touches the query rectangle along an edge does not
/// intersect it.
#[inline]
pub(crate) fn intersects(aabb: &Rect, query: &Rect) -> bool {
    aabb.x1 > query.x0 && aabb.x0 < query.x1 && aabb.y1 > query.y0 && aabb.y0 < query.y1
}
