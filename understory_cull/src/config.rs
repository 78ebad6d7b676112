// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Culler configuration.

use crate::error::CullError;

/// Construction-time settings for a [`GridCuller`][crate::GridCuller].
///
/// The cell size cannot be changed once the culler exists.
///
/// ```rust
/// use understory_cull::CullerConfig;
///
/// let config = CullerConfig::new().with_cell_size(256.0).simple_test(false);
/// assert_eq!(config.cell_width, 256.0);
/// assert_eq!(config.cell_height, 256.0);
/// assert!(!config.simple_test);
/// assert!(config.dirty_test);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullerConfig {
    /// Width of one grid cell in world units.
    pub cell_width: f64,
    /// Height of one grid cell in world units.
    pub cell_height: f64,
    /// Test each bucket member's AABB against the viewport during a cull.
    ///
    /// When off, whole buckets are accepted, which is cheaper but coarser.
    pub simple_test: bool,
    /// Only re-index objects whose dirty flag is set.
    ///
    /// When off, every non-static object is re-indexed on each refresh.
    pub dirty_test: bool,
}

impl Default for CullerConfig {
    fn default() -> Self {
        Self {
            cell_width: 1000.0,
            cell_height: 1000.0,
            simple_test: true,
            dirty_test: true,
        }
    }
}

impl CullerConfig {
    /// The default configuration: 1000x1000 cells, both tests enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use square cells of `size`.
    pub fn with_cell_size(self, size: f64) -> Self {
        self.with_cell_dims(size, size)
    }

    /// Use cells of `width` by `height`.
    pub fn with_cell_dims(mut self, width: f64, height: f64) -> Self {
        self.cell_width = width;
        self.cell_height = height;
        self
    }

    /// Enable or disable the precise AABB test.
    pub fn simple_test(mut self, enabled: bool) -> Self {
        self.simple_test = enabled;
        self
    }

    /// Enable or disable dirty-flag tracking.
    pub fn dirty_test(mut self, enabled: bool) -> Self {
        self.dirty_test = enabled;
        self
    }

    /// Check that both cell dimensions are finite and strictly positive.
    pub fn validate(&self) -> Result<(), CullError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.cell_width) && ok(self.cell_height) {
            Ok(())
        } else {
            Err(CullError::InvalidCellSize {
                width: self.cell_width,
                height: self.cell_height,
            })
        }
    }
}
