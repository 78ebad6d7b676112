// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `GridCuller` API: registration, refresh, culling and queries.

use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt::Debug;
use core::hash::Hash;
use core::ops::ControlFlow;

use hashbrown::HashSet;
use kurbo::Rect;

use crate::config::CullerConfig;
use crate::error::CullError;
use crate::grid::Grid;
use crate::scene::{ChildEvent, Cullable, Scene, Subscription};
use crate::stats::GridStats;
use crate::types::{CellKey, CellRange, world_aabb};

/// Counts from one [`GridCuller::refresh`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Objects whose AABB was recomputed.
    pub updated: usize,
    /// Objects whose cell range changed and were moved between buckets.
    pub moved: usize,
}

/// Counts from one cull pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CullReport {
    /// Non-empty buckets visited.
    pub buckets: usize,
    /// Objects marked visible.
    pub visible: usize,
    /// Tracked objects the pass touched.
    pub total: usize,
}

impl CullReport {
    /// Objects marked invisible.
    pub fn culled(&self) -> usize {
        self.total.saturating_sub(self.visible)
    }
}

#[derive(Clone, Debug)]
struct TrackedContainer<K, C> {
    id: C,
    is_static: bool,
    subscription: Option<Subscription>,
    // Snapshot of the children, kept current by child notifications.
    children: Vec<K>,
}

/// Visibility culler over a uniform grid of buckets.
///
/// `K` is the scene's object id and `C` its container id. Objects enter the
/// culler individually through [`register_object`](Self::register_object) or
/// in bulk as the children of a container through
/// [`register_container`](Self::register_container). Each cull pass
/// re-indexes objects that moved, hides every tracked object, and shows the
/// ones found in the buckets covering the viewport.
///
/// ## Example
///
/// ```rust
/// use core::convert::Infallible;
/// use kurbo::{Point, Rect};
/// use understory_cull::{Cullable, CullerConfig, GridCuller, Scene};
///
/// struct Sprite {
///     pos: Point,
///     size: (f64, f64),
///     dirty: bool,
///     visible: bool,
/// }
///
/// impl Cullable for Sprite {
///     fn position(&self) -> Point { self.pos }
///     fn local_bounds(&self) -> Rect { Rect::new(0.0, 0.0, self.size.0, self.size.1) }
///     fn is_dirty(&self) -> bool { self.dirty }
///     fn set_dirty(&mut self, dirty: bool) { self.dirty = dirty; }
///     fn set_visible(&mut self, visible: bool) { self.visible = visible; }
/// }
///
/// struct Sprites(Vec<Sprite>);
///
/// impl Scene for Sprites {
///     type ObjectId = usize;
///     type ContainerId = Infallible;
///     type Object = Sprite;
///     fn object(&self, id: usize) -> Option<&Sprite> { self.0.get(id) }
///     fn object_mut(&mut self, id: usize) -> Option<&mut Sprite> { self.0.get_mut(id) }
/// }
///
/// let sprite = |x, y| Sprite {
///     pos: Point::new(x, y),
///     size: (20.0, 20.0),
///     dirty: false,
///     visible: false,
/// };
/// let mut scene = Sprites(vec![sprite(10.0, 10.0), sprite(150.0, 10.0)]);
///
/// let mut culler = GridCuller::new(CullerConfig::new().with_cell_size(100.0)).unwrap();
/// culler.register_object(&mut scene, 0, false).unwrap();
/// culler.register_object(&mut scene, 1, false).unwrap();
///
/// let report = culler.cull(&mut scene, Rect::new(0.0, 0.0, 60.0, 60.0), false);
/// assert_eq!(report.visible, 1);
/// assert!(scene.0[0].visible);
/// assert!(!scene.0[1].visible);
/// ```
pub struct GridCuller<K, C> {
    config: CullerConfig,
    grid: Grid<K>,
    objects: Vec<K>,
    containers: Vec<TrackedContainer<K, C>>,
    last_buckets: usize,
    // Scratch buffer for draining child events.
    events: Vec<ChildEvent<K>>,
}

impl<K: Debug, C: Debug> Debug for GridCuller<K, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridCuller")
            .field("config", &self.config)
            .field("grid", &self.grid)
            .field("objects", &self.objects.len())
            .field("containers", &self.containers.len())
            .field("last_buckets", &self.last_buckets)
            .finish_non_exhaustive()
    }
}

impl<K, C> Default for GridCuller<K, C>
where
    K: Copy + Eq + Hash + Debug,
    C: Copy + Eq + Debug,
{
    fn default() -> Self {
        Self::with_valid_config(CullerConfig::default())
    }
}

impl<K, C> GridCuller<K, C>
where
    K: Copy + Eq + Hash + Debug,
    C: Copy + Eq + Debug,
{
    /// Create an empty culler, rejecting non-positive or non-finite cell sizes.
    pub fn new(config: CullerConfig) -> Result<Self, CullError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: CullerConfig) -> Self {
        Self {
            config,
            grid: Grid::new(config.cell_width, config.cell_height),
            objects: Vec::new(),
            containers: Vec::new(),
            last_buckets: 0,
            events: Vec::new(),
        }
    }

    /// The configuration this culler was built with.
    pub fn config(&self) -> &CullerConfig {
        &self.config
    }

    /// Track a single object and index it immediately.
    ///
    /// With dirty tracking enabled the object's dirty flag is set, so the next
    /// refresh looks at it once more. A static object is never re-indexed by
    /// [`refresh`](Self::refresh). Returns `id` for chaining.
    pub fn register_object<S>(
        &mut self,
        scene: &mut S,
        id: K,
        is_static: bool,
    ) -> Result<K, CullError>
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        if self.grid.contains(id) {
            return Err(CullError::AlreadyRegistered);
        }
        let object = scene.object_mut(id).ok_or(CullError::UnknownObject)?;
        if self.config.dirty_test {
            object.set_dirty(true);
        }
        let aabb = object_aabb(object);
        self.grid.track(id, is_static);
        self.grid.update(id, aabb);
        self.objects.push(id);
        tracing::debug!(?id, is_static, "registered object");
        Ok(id)
    }

    /// Stop tracking an individually registered object.
    ///
    /// Returns [`CullError::NotRegistered`] for ids that were never registered
    /// individually, including container children.
    pub fn unregister_object(&mut self, id: K) -> Result<(), CullError> {
        let pos = self
            .objects
            .iter()
            .position(|&o| o == id)
            .ok_or(CullError::NotRegistered)?;
        self.objects.remove(pos);
        self.grid.untrack(id);
        tracing::debug!(?id, "unregistered object");
        Ok(())
    }

    /// Track every current and future child of `container`.
    ///
    /// The current children are indexed immediately and the culler subscribes
    /// to the container's child changes. Children of a static container are
    /// never re-indexed by [`refresh`](Self::refresh).
    ///
    /// Nothing is modified if any child is unknown to the scene or already
    /// tracked.
    pub fn register_container<S>(
        &mut self,
        scene: &mut S,
        container: C,
        is_static: bool,
    ) -> Result<(), CullError>
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        if self.container_index(container).is_some() {
            return Err(CullError::ContainerAlreadyRegistered);
        }
        let mut children = Vec::new();
        scene.visit_children(container, |child| children.push(child));

        let mut unique: HashSet<K> = HashSet::with_capacity(children.len());
        for &child in &children {
            if self.grid.contains(child) || !unique.insert(child) {
                return Err(CullError::AlreadyRegistered);
            }
            if scene.object(child).is_none() {
                return Err(CullError::UnknownObject);
            }
        }

        for &child in &children {
            if let Some(object) = scene.object(child) {
                let aabb = object_aabb(object);
                self.grid.track(child, is_static);
                self.grid.update(child, aabb);
            }
        }
        let subscription = scene.subscribe(container);
        tracing::debug!(
            ?container,
            children = children.len(),
            is_static,
            subscribed = subscription.is_some(),
            "registered container"
        );
        self.containers.push(TrackedContainer {
            id: container,
            is_static,
            subscription,
            children,
        });
        Ok(())
    }

    /// Stop tracking `container` and all of its children, and release the subscription.
    pub fn unregister_container<S>(&mut self, scene: &mut S, container: C) -> Result<(), CullError>
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        let pos = self
            .container_index(container)
            .ok_or(CullError::ContainerNotRegistered)?;
        let tracked = self.containers.remove(pos);
        for &child in &tracked.children {
            self.grid.untrack(child);
        }
        if let Some(subscription) = tracked.subscription {
            scene.unsubscribe(container, subscription);
        }
        tracing::debug!(
            ?container,
            children = tracked.children.len(),
            "unregistered container"
        );
        Ok(())
    }

    /// Notification: `child` was added to a registered container.
    ///
    /// Scenes that push notifications call this directly; queued events are
    /// applied by [`sync_containers`](Self::sync_containers).
    pub fn child_added<S>(&mut self, scene: &S, container: C, child: K) -> Result<(), CullError>
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        let pos = self
            .container_index(container)
            .ok_or(CullError::ContainerNotRegistered)?;
        if self.grid.contains(child) {
            return Err(CullError::AlreadyRegistered);
        }
        let object = scene.object(child).ok_or(CullError::UnknownObject)?;
        let aabb = object_aabb(object);
        let tracked = &mut self.containers[pos];
        self.grid.track(child, tracked.is_static);
        self.grid.update(child, aabb);
        tracked.children.push(child);
        Ok(())
    }

    /// Notification: `child` was removed from a registered container.
    pub fn child_removed(&mut self, container: C, child: K) -> Result<(), CullError> {
        let pos = self
            .container_index(container)
            .ok_or(CullError::ContainerNotRegistered)?;
        let children = &mut self.containers[pos].children;
        let at = children
            .iter()
            .position(|&c| c == child)
            .ok_or(CullError::NotRegistered)?;
        children.remove(at);
        self.grid.untrack(child);
        Ok(())
    }

    /// Apply child changes queued by the scene for every subscribed container.
    ///
    /// Containers are drained in registration order. An addition of a child
    /// still held by another container is retried once every queue has been
    /// applied, so a child moved between two registered containers stays
    /// tracked whichever container drains first. Events that still cannot be
    /// applied (for example a child registered individually) are logged and
    /// skipped. Returns the number of events applied.
    pub fn sync_containers<S>(&mut self, scene: &mut S) -> usize
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        let mut applied = 0;
        let mut deferred: Vec<(C, K)> = Vec::new();
        let mut events = core::mem::take(&mut self.events);
        for i in 0..self.containers.len() {
            let TrackedContainer {
                id, subscription, ..
            } = self.containers[i];
            let Some(subscription) = subscription else {
                continue;
            };
            events.clear();
            scene.drain_child_events(id, subscription, &mut events);
            for &event in &events {
                let result = match event {
                    ChildEvent::Added(child) => self.child_added(scene, id, child),
                    ChildEvent::Removed(child) => self.child_removed(id, child),
                };
                match (event, result) {
                    (_, Ok(())) => applied += 1,
                    (ChildEvent::Added(child), Err(CullError::AlreadyRegistered)) => {
                        deferred.push((id, child));
                    }
                    (_, Err(err)) => {
                        tracing::warn!(container = ?id, ?event, %err, "skipping child event");
                    }
                }
            }
        }
        events.clear();
        self.events = events;

        for (id, child) in deferred {
            match self.child_added(scene, id, child) {
                Ok(()) => applied += 1,
                Err(err) => {
                    tracing::warn!(container = ?id, ?child, %err, "skipping child addition");
                }
            }
        }
        applied
    }

    /// Re-index one tracked object from its current transform.
    ///
    /// Ignores the static hint and the dirty flag. Returns `true` when the
    /// object moved to a different set of cells.
    pub fn update_object<S>(&mut self, scene: &S, id: K) -> Result<bool, CullError>
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        if !self.grid.contains(id) {
            return Err(CullError::NotRegistered);
        }
        let object = scene.object(id).ok_or(CullError::UnknownObject)?;
        Ok(self.grid.update(id, object_aabb(object)))
    }

    /// Apply queued container changes, then re-index objects that may have moved.
    ///
    /// With dirty tracking on, only objects whose dirty flag is set are
    /// re-indexed and their flag is cleared. Otherwise every object is.
    /// Static objects and children of static containers are skipped either way.
    pub fn refresh<S>(&mut self, scene: &mut S) -> RefreshReport
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        self.sync_containers(scene);
        let dirty_test = self.config.dirty_test;
        let mut report = RefreshReport::default();

        for &id in &self.objects {
            if self.grid.state(id).is_some_and(|s| s.is_static) {
                continue;
            }
            reindex(&mut self.grid, scene, id, dirty_test, &mut report);
        }
        for container in self.containers.iter().filter(|c| !c.is_static) {
            for &id in &container.children {
                reindex(&mut self.grid, scene, id, dirty_test, &mut report);
            }
        }
        tracing::trace!(updated = report.updated, moved = report.moved, "refresh");
        report
    }

    /// Run a cull pass against the viewport `rect`.
    ///
    /// Unless `skip_refresh` is set, [`refresh`](Self::refresh) runs first.
    /// Afterwards exactly the tracked objects found for `rect` are visible:
    /// those whose AABB intersects it with the simple test on, or every member
    /// of a bucket covering it with the simple test off.
    pub fn cull<S>(&mut self, scene: &mut S, rect: Rect, skip_refresh: bool) -> CullReport
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        match self.cull_with(scene, rect, skip_refresh, |_, _| Ok::<(), Infallible>(())) {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    /// Like [`cull`](Self::cull), calling `f` for every object about to be
    /// shown, before any visibility flag is set.
    ///
    /// If `f` fails, the error is returned unchanged and every tracked object
    /// is left invisible.
    pub fn cull_with<S, E, F>(
        &mut self,
        scene: &mut S,
        rect: Rect,
        skip_refresh: bool,
        mut f: F,
    ) -> Result<CullReport, E>
    where
        S: Scene<ObjectId = K, ContainerId = C>,
        F: FnMut(K, &mut S::Object) -> Result<(), E>,
    {
        if skip_refresh {
            self.sync_containers(scene);
        } else {
            self.refresh(scene);
        }

        let mut total = 0;
        for id in self.tracked() {
            if let Some(object) = scene.object_mut(id) {
                object.set_visible(false);
                total += 1;
            }
        }

        let mut found = Vec::new();
        let buckets = self.collect(rect, self.config.simple_test, &mut found);
        self.last_buckets = buckets;

        found.retain(|&id| scene.object(id).is_some());
        for &id in &found {
            if let Some(object) = scene.object_mut(id) {
                f(id, object)?;
            }
        }
        for &id in &found {
            if let Some(object) = scene.object_mut(id) {
                object.set_visible(true);
            }
        }

        let report = CullReport {
            buckets,
            visible: found.len(),
            total,
        };
        tracing::trace!(
            buckets = report.buckets,
            visible = report.visible,
            total = report.total,
            "cull"
        );
        Ok(report)
    }

    /// Objects found for `rect`, without touching visibility.
    ///
    /// Order follows the cell traversal (rows outer, columns inner) and then
    /// bucket order. Each object appears once.
    pub fn query(&self, rect: Rect, simple_test: bool) -> Vec<K> {
        let mut out = Vec::new();
        self.collect(rect, simple_test, &mut out);
        out
    }

    /// Visit the objects [`query`](Self::query) would return (does not allocate result storage).
    pub fn visit<F: FnMut(K)>(&self, rect: Rect, simple_test: bool, mut f: F) {
        let _ = self.grid.visit_rect::<Infallible, _>(rect, simple_test, |id| {
            f(id);
            ControlFlow::Continue(())
        });
    }

    /// Returns `true` as soon as `f` returns `true` for a found object.
    pub fn query_any<F: FnMut(K) -> bool>(&self, rect: Rect, simple_test: bool, mut f: F) -> bool {
        match self.try_query_any(rect, simple_test, |id| Ok::<bool, Infallible>(f(id))) {
            Ok(hit) => hit,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`query_any`](Self::query_any); the first error is returned unchanged.
    pub fn try_query_any<E, F>(&self, rect: Rect, simple_test: bool, mut f: F) -> Result<bool, E>
    where
        F: FnMut(K) -> Result<bool, E>,
    {
        let flow = self.grid.visit_rect(rect, simple_test, |id| match f(id) {
            Ok(false) => ControlFlow::Continue(()),
            Ok(true) => ControlFlow::Break(Ok(())),
            Err(err) => ControlFlow::Break(Err(err)),
        });
        match flow {
            ControlFlow::Continue(_) => Ok(false),
            ControlFlow::Break(Ok(())) => Ok(true),
            ControlFlow::Break(Err(err)) => Err(err),
        }
    }

    /// Members of every bucket `id` occupies, `id` itself included.
    ///
    /// Objects sharing several cells with `id` appear once per shared cell.
    /// Untracked ids have no neighbors.
    pub fn neighbors(&self, id: K) -> Vec<K> {
        self.grid.neighbors(id)
    }

    /// Whether `id` is tracked, individually or as a container child.
    pub fn contains(&self, id: K) -> bool {
        self.grid.contains(id)
    }

    /// Number of tracked objects.
    pub fn len(&self) -> usize {
        self.grid.states.len()
    }

    /// Whether no object is tracked.
    pub fn is_empty(&self) -> bool {
        self.grid.states.is_empty()
    }

    /// Number of individually registered objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of registered containers.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Whether `id` is exempt from refresh, or `None` if untracked.
    pub fn is_static(&self, id: K) -> Option<bool> {
        self.grid.state(id).map(|s| s.is_static)
    }

    /// The cached world-space AABB of `id`.
    pub fn bounds(&self, id: K) -> Option<Rect> {
        self.grid.state(id).map(|s| s.aabb)
    }

    /// The cells `id` occupies, in row-major order.
    pub fn cells(&self, id: K) -> Option<&[CellKey]> {
        self.grid.state(id).map(|s| s.cells.as_slice())
    }

    /// The tracked children of a registered container.
    pub fn children(&self, container: C) -> Option<&[K]> {
        self.container_index(container)
            .map(|i| self.containers[i].children.as_slice())
    }

    /// The subscription retained for a registered container.
    pub fn subscription(&self, container: C) -> Option<Subscription> {
        self.container_index(container)
            .and_then(|i| self.containers[i].subscription)
    }

    /// Every tracked id: individual objects first, then container children.
    pub fn tracked(&self) -> impl Iterator<Item = K> + '_ {
        self.objects.iter().copied().chain(
            self.containers
                .iter()
                .flat_map(|c| c.children.iter().copied()),
        )
    }

    /// Non-empty buckets visited by the most recent cull pass.
    pub fn last_buckets(&self) -> usize {
        self.last_buckets
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.grid.bucket_count()
    }

    /// Mean number of objects per non-empty bucket.
    pub fn average_bucket_size(&self) -> f64 {
        self.grid.average_bucket_size()
    }

    /// Size of the largest bucket.
    pub fn largest_bucket(&self) -> usize {
        self.grid.largest_bucket()
    }

    /// Cell bounds of all non-empty buckets, or `None` when empty.
    pub fn world_bounds(&self) -> Option<CellRange> {
        self.grid.world_bounds()
    }

    /// Fraction of the cells covering `rect` that hold at least one object.
    pub fn sparseness(&self, rect: Rect) -> f64 {
        self.grid.sparseness(rect)
    }

    /// Aggregate occupancy statistics.
    pub fn stats(&self) -> GridStats {
        self.grid.stats(self.last_buckets)
    }

    /// Stop tracking everything and release every container subscription.
    pub fn clear<S>(&mut self, scene: &mut S)
    where
        S: Scene<ObjectId = K, ContainerId = C>,
    {
        for container in self.containers.drain(..) {
            if let Some(subscription) = container.subscription {
                scene.unsubscribe(container.id, subscription);
            }
        }
        self.objects.clear();
        self.grid.clear();
        self.last_buckets = 0;
    }

    fn container_index(&self, container: C) -> Option<usize> {
        self.containers.iter().position(|c| c.id == container)
    }

    fn collect(&self, rect: Rect, simple_test: bool, out: &mut Vec<K>) -> usize {
        match self.grid.visit_rect::<Infallible, _>(rect, simple_test, |id| {
            out.push(id);
            ControlFlow::Continue(())
        }) {
            ControlFlow::Continue(buckets) => buckets,
            ControlFlow::Break(never) => match never {},
        }
    }
}

fn object_aabb<O: Cullable>(object: &O) -> Rect {
    world_aabb(
        object.position(),
        object.scale(),
        object.pivot(),
        object.local_bounds(),
    )
}

fn reindex<K, S>(
    grid: &mut Grid<K>,
    scene: &mut S,
    id: K,
    dirty_test: bool,
    report: &mut RefreshReport,
) where
    K: Copy + Eq + Hash + Debug,
    S: Scene<ObjectId = K>,
{
    let Some(object) = scene.object_mut(id) else {
        tracing::warn!(?id, "tracked object is missing from the scene");
        return;
    };
    if dirty_test {
        if !object.is_dirty() {
            return;
        }
        object.set_dirty(false);
    }
    report.updated += 1;
    if grid.update(id, object_aabb(object)) {
        report.moved += 1;
    }
}
