// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traits describing the caller's objects and containers.
//!
//! The culler never owns scene objects. It reads their transforms and writes
//! their `visible`/`dirty` flags through [`Scene`], and keeps its own per-object
//! spatial state in a side table keyed by [`Scene::ObjectId`].

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use kurbo::{Point, Rect, Vec2};

/// Contract every tracked object fulfills.
pub trait Cullable {
    /// World position of the object's pivot.
    fn position(&self) -> Point;

    /// Scale applied to the local bounds around the pivot.
    fn scale(&self) -> Vec2 {
        Vec2::new(1.0, 1.0)
    }

    /// Pivot in local coordinates.
    fn pivot(&self) -> Point {
        Point::ORIGIN
    }

    /// Intrinsic (untransformed) bounds in local coordinates.
    fn local_bounds(&self) -> Rect;

    /// Whether the transform changed since the culler last saw it.
    fn is_dirty(&self) -> bool;

    /// Set or clear the dirty flag.
    fn set_dirty(&mut self, dirty: bool);

    /// Written by every cull pass.
    fn set_visible(&mut self, visible: bool);
}

/// Handle for a child-change subscription on a container.
///
/// Created by the scene in [`Scene::subscribe`], retained by the culler and
/// handed back in [`Scene::unsubscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

impl Subscription {
    /// Wrap a scene-defined subscription number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The scene-defined subscription number.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Structural change of a container.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChildEvent<K> {
    /// A child was appended to the container.
    Added(K),
    /// A child was removed from the container.
    Removed(K),
}

/// Object store and container source used by [`GridCuller`][crate::GridCuller].
///
/// Scenes without containers can leave the container methods at their
/// defaults and use [`core::convert::Infallible`] as `ContainerId`.
pub trait Scene {
    /// Identity of an object.
    type ObjectId: Copy + Eq + Hash + Debug;
    /// Identity of a container.
    type ContainerId: Copy + Eq + Hash + Debug;
    /// Concrete object type.
    type Object: Cullable;

    /// Look up an object.
    fn object(&self, id: Self::ObjectId) -> Option<&Self::Object>;

    /// Look up an object mutably.
    fn object_mut(&mut self, id: Self::ObjectId) -> Option<&mut Self::Object>;

    /// Visit the current children of `container` in order.
    fn visit_children<F: FnMut(Self::ObjectId)>(&self, container: Self::ContainerId, f: F) {
        let _ = (container, f);
    }

    /// Start recording child changes of `container`.
    ///
    /// Returns `None` when the container does not exist or cannot be observed,
    /// in which case only its current children are tracked.
    fn subscribe(&mut self, container: Self::ContainerId) -> Option<Subscription> {
        let _ = container;
        None
    }

    /// Stop recording child changes for `subscription`.
    fn unsubscribe(&mut self, container: Self::ContainerId, subscription: Subscription) {
        let _ = (container, subscription);
    }

    /// Move pending child changes recorded for `subscription` into `out`, oldest first.
    fn drain_child_events(
        &mut self,
        container: Self::ContainerId,
        subscription: Subscription,
        out: &mut Vec<ChildEvent<Self::ObjectId>>,
    ) {
        let _ = (container, subscription, out);
    }
}
