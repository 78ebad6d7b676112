// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal scene used by unit tests: a slot store of sprites plus groups that
//! queue child events per subscription.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Vec2};

use crate::scene::{ChildEvent, Cullable, Scene, Subscription};

#[derive(Clone, Debug)]
pub(crate) struct Sprite {
    pub(crate) position: Point,
    pub(crate) scale: Vec2,
    pub(crate) pivot: Point,
    pub(crate) local: Rect,
    pub(crate) dirty: bool,
    pub(crate) visible: bool,
}

impl Cullable for Sprite {
    fn position(&self) -> Point {
        self.position
    }

    fn scale(&self) -> Vec2 {
        self.scale
    }

    fn pivot(&self) -> Point {
        self.pivot
    }

    fn local_bounds(&self) -> Rect {
        self.local
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

#[derive(Debug, Default)]
struct Group {
    children: Vec<u32>,
    subscribers: Vec<(Subscription, Vec<ChildEvent<u32>>)>,
}

impl Group {
    fn notify(&mut self, event: ChildEvent<u32>) {
        for (_, queue) in &mut self.subscribers {
            queue.push(event);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TestScene {
    sprites: Vec<Option<Sprite>>,
    groups: Vec<Group>,
    next_subscription: u64,
}

fn slot(id: u32) -> usize {
    id as usize
}

fn next_id(len: usize) -> u32 {
    u32::try_from(len).expect("test scenes stay small")
}

impl TestScene {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawn a sprite whose world AABB is `(x, y, x + w, y + h)`.
    pub(crate) fn spawn(&mut self, x: f64, y: f64, w: f64, h: f64) -> u32 {
        let id = next_id(self.sprites.len());
        self.sprites.push(Some(Sprite {
            position: Point::new(x, y),
            scale: Vec2::new(1.0, 1.0),
            pivot: Point::ORIGIN,
            local: Rect::new(0.0, 0.0, w, h),
            dirty: false,
            visible: false,
        }));
        id
    }

    /// Drop a sprite from the scene without telling anyone.
    pub(crate) fn despawn(&mut self, id: u32) {
        self.sprites[slot(id)] = None;
    }

    pub(crate) fn sprite(&self, id: u32) -> &Sprite {
        self.sprites[slot(id)].as_ref().expect("live sprite")
    }

    pub(crate) fn sprite_mut(&mut self, id: u32) -> &mut Sprite {
        self.sprites[slot(id)].as_mut().expect("live sprite")
    }

    /// Move a sprite and flag it dirty, as a scene graph would.
    pub(crate) fn move_to(&mut self, id: u32, x: f64, y: f64) {
        let s = self.sprite_mut(id);
        s.position = Point::new(x, y);
        s.dirty = true;
    }

    pub(crate) fn group(&mut self) -> u32 {
        let id = next_id(self.groups.len());
        self.groups.push(Group::default());
        id
    }

    pub(crate) fn add_child(&mut self, group: u32, child: u32) {
        let g = &mut self.groups[slot(group)];
        g.children.push(child);
        g.notify(ChildEvent::Added(child));
    }

    pub(crate) fn remove_child(&mut self, group: u32, child: u32) {
        let g = &mut self.groups[slot(group)];
        g.children.retain(|&c| c != child);
        g.notify(ChildEvent::Removed(child));
    }

    pub(crate) fn subscriber_count(&self, group: u32) -> usize {
        self.groups[slot(group)].subscribers.len()
    }

    /// Ids of live sprites whose visible flag is set, ascending.
    pub(crate) fn visible(&self) -> Vec<u32> {
        self.sprites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_ref().is_some_and(|s| s.visible))
            .map(|(i, _)| next_id(i))
            .collect()
    }
}

impl Scene for TestScene {
    type ObjectId = u32;
    type ContainerId = u32;
    type Object = Sprite;

    fn object(&self, id: u32) -> Option<&Sprite> {
        self.sprites.get(slot(id))?.as_ref()
    }

    fn object_mut(&mut self, id: u32) -> Option<&mut Sprite> {
        self.sprites.get_mut(slot(id))?.as_mut()
    }

    fn visit_children<F: FnMut(u32)>(&self, container: u32, mut f: F) {
        if let Some(g) = self.groups.get(slot(container)) {
            for &c in &g.children {
                f(c);
            }
        }
    }

    fn subscribe(&mut self, container: u32) -> Option<Subscription> {
        let g = self.groups.get_mut(slot(container))?;
        self.next_subscription += 1;
        let sub = Subscription::new(self.next_subscription);
        g.subscribers.push((sub, Vec::new()));
        Some(sub)
    }

    fn unsubscribe(&mut self, container: u32, subscription: Subscription) {
        if let Some(g) = self.groups.get_mut(slot(container)) {
            g.subscribers.retain(|(s, _)| *s != subscription);
        }
    }

    fn drain_child_events(
        &mut self,
        container: u32,
        subscription: Subscription,
        out: &mut Vec<ChildEvent<u32>>,
    ) {
        let Some(g) = self.groups.get_mut(slot(container)) else {
            return;
        };
        if let Some((_, queue)) = g.subscribers.iter_mut().find(|(s, _)| *s == subscription) {
            out.append(queue);
        }
    }
}
