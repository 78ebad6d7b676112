// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid of buckets plus the per-object spatial side table.
//!
//! Every tracked id owns a [`SpatialState`] recording its cached world AABB,
//! the cell range it was last indexed with, and the keys of the buckets it
//! sits in. Buckets and states always agree: an id is in bucket `k` exactly
//! when `k` is in its state's key list.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;
use core::ops::ControlFlow;

use hashbrown::{HashMap, HashSet};
use kurbo::Rect;
use smallvec::SmallVec;

use crate::types::{CellKey, CellRange, intersects};

#[derive(Clone, Debug)]
pub(crate) struct SpatialState {
    pub(crate) aabb: Rect,
    pub(crate) is_static: bool,
    // `None` until first indexed.
    pub(crate) range: Option<CellRange>,
    pub(crate) cells: SmallVec<[CellKey; 4]>,
}

#[derive(Clone, Debug)]
pub(crate) struct Bucket<K> {
    pub(crate) members: SmallVec<[K; 8]>,
}

impl<K> Default for Bucket<K> {
    fn default() -> Self {
        Self {
            members: SmallVec::new(),
        }
    }
}

/// Bucket map keyed by cell, with the side table of spatial states.
pub(crate) struct Grid<K> {
    pub(crate) cell_width: f64,
    pub(crate) cell_height: f64,
    pub(crate) cells: HashMap<CellKey, Bucket<K>>,
    pub(crate) states: HashMap<K, SpatialState>,
}

impl<K: Debug> Debug for Grid<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Grid")
            .field("cell_width", &self.cell_width)
            .field("cell_height", &self.cell_height)
            .field("tracked", &self.states.len())
            .field("buckets", &self.cells.len())
            .finish_non_exhaustive()
    }
}

impl<K: Copy + Eq + Hash> Grid<K> {
    pub(crate) fn new(cell_width: f64, cell_height: f64) -> Self {
        debug_assert!(
            cell_width > 0.0 && cell_height > 0.0,
            "cell dimensions must be strictly positive"
        );
        Self {
            cell_width,
            cell_height,
            cells: HashMap::new(),
            states: HashMap::new(),
        }
    }

    /// Start tracking `id` with an empty state. Returns `false` if already tracked.
    pub(crate) fn track(&mut self, id: K, is_static: bool) -> bool {
        if self.states.contains_key(&id) {
            return false;
        }
        self.states.insert(
            id,
            SpatialState {
                aabb: Rect::ZERO,
                is_static,
                range: None,
                cells: SmallVec::new(),
            },
        );
        true
    }

    pub(crate) fn contains(&self, id: K) -> bool {
        self.states.contains_key(&id)
    }

    pub(crate) fn state(&self, id: K) -> Option<&SpatialState> {
        self.states.get(&id)
    }

    /// Cache a new AABB for `id` and move it between buckets if its cell range changed.
    ///
    /// Returns `true` when bucket membership changed.
    pub(crate) fn update(&mut self, id: K, aabb: Rect) -> bool {
        let range = CellRange::covering(aabb, self.cell_width, self.cell_height);
        let Some(state) = self.states.get_mut(&id) else {
            return false;
        };
        state.aabb = aabb;
        if state.range == Some(range) {
            return false;
        }

        remove_from_cells(&mut self.cells, id, &state.cells);
        state.cells.clear();
        for key in range.iter() {
            self.cells.entry(key).or_default().members.push(id);
            state.cells.push(key);
        }
        state.range = Some(range);
        true
    }

    /// Stop tracking `id` and purge it from every bucket.
    pub(crate) fn untrack(&mut self, id: K) -> Option<SpatialState> {
        let state = self.states.remove(&id)?;
        remove_from_cells(&mut self.cells, id, &state.cells);
        Some(state)
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
        self.states.clear();
    }

    /// Walk the buckets overlapping `rect` in row-major order.
    ///
    /// With `precise` set, only ids whose cached AABB intersects `rect` are
    /// reported; otherwise every bucket member is. Each id is reported once.
    /// Completes with the number of non-empty buckets visited.
    ///
    /// A `rect` covering more cells than there are buckets walks the bucket
    /// map instead of the covered range, so the cost is bounded by the number
    /// of occupied cells.
    pub(crate) fn visit_rect<B, F>(
        &self,
        rect: Rect,
        precise: bool,
        mut f: F,
    ) -> ControlFlow<B, usize>
    where
        F: FnMut(K) -> ControlFlow<B>,
    {
        let rect = rect.abs();
        let range = CellRange::covering(rect, self.cell_width, self.cell_height);
        let mut seen: HashSet<K> = HashSet::new();
        let mut buckets = 0;

        let mut visit = |key: CellKey| -> ControlFlow<B> {
            let Some(bucket) = self.cells.get(&key) else {
                return ControlFlow::Continue(());
            };
            buckets += 1;
            for &id in &bucket.members {
                if !seen.insert(id) {
                    continue;
                }
                if precise {
                    let Some(state) = self.states.get(&id) else {
                        debug_assert!(false, "grid invariant violated: bucket member untracked");
                        continue;
                    };
                    if !intersects(&state.aabb, &rect) {
                        continue;
                    }
                }
                f(id)?;
            }
            ControlFlow::Continue(())
        };

        if range.cell_count() > self.cells.len() as u64 {
            let mut keys: Vec<CellKey> = self
                .cells
                .keys()
                .copied()
                .filter(|&key| range.contains(key))
                .collect();
            keys.sort_unstable_by_key(|key| (key.y, key.x));
            for key in keys {
                visit(key)?;
            }
        } else {
            for key in range.iter() {
                visit(key)?;
            }
        }
        ControlFlow::Continue(buckets)
    }

    /// Every member of every bucket `id` occupies, `id` included, duplicates kept.
    pub(crate) fn neighbors(&self, id: K) -> Vec<K> {
        let Some(state) = self.states.get(&id) else {
            return Vec::new();
        };
        state
            .cells
            .iter()
            .filter_map(|key| self.cells.get(key))
            .flat_map(|bucket| bucket.members.iter().copied())
            .collect()
    }

    /// Check that buckets and spatial states agree in both directions.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let forward = self.states.iter().all(|(id, state)| {
            state.cells.iter().all(|key| {
                self.cells
                    .get(key)
                    .is_some_and(|b| b.members.iter().filter(|&&m| m == *id).count() == 1)
            })
        });
        let backward = self.cells.iter().all(|(key, bucket)| {
            !bucket.members.is_empty()
                && bucket.members.iter().all(|id| {
                    self.states
                        .get(id)
                        .is_some_and(|s| s.cells.contains(key))
                })
        });
        forward && backward
    }
}

fn remove_from_cells<K: Copy + Eq>(
    cells: &mut HashMap<CellKey, Bucket<K>>,
    id: K,
    keys: &[CellKey],
) {
    for key in keys {
        let Some(bucket) = cells.get_mut(key) else {
            debug_assert!(false, "grid invariant violated: missing bucket {key}");
            continue;
        };
        if let Some(pos) = bucket.members.iter().position(|&m| m == id) {
            // Keep bucket order stable.
            bucket.members.remove(pos);
        } else {
            debug_assert!(false, "grid invariant violated: id not found in bucket {key}");
        }
        if bucket.members.is_empty() {
            cells.remove(key);
        }
    }
}
