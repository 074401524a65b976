//! Stacking order of scene objects.
//!
//! A doubly linked list keyed by shape id. Moving to the front or back and
//! stepping one layer forward or backward are all constant time; positional
//! insertion walks the list.

use crate::shapes::ShapeId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    prev: Option<ShapeId>,
    next: Option<ShapeId>,
}

/// Back-to-front ordering. `head` is the bottommost object, `tail` the topmost.
#[derive(Debug, Clone, Default)]
pub struct ZOrder {
    links: HashMap<ShapeId, Link>,
    head: Option<ShapeId>,
    tail: Option<ShapeId>,
}

impl ZOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.links.contains_key(&id)
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.head = None;
        self.tail = None;
    }

    /// Place on top. Ids already present are moved instead.
    pub fn push_front(&mut self, id: ShapeId) {
        self.unlink(id);
        self.link_after(id, self.tail);
    }

    /// Place at the bottom.
    pub fn push_back(&mut self, id: ShapeId) {
        self.unlink(id);
        self.link_after(id, None);
    }

    /// Insert at a back-to-front position (clamped to the list length).
    pub fn insert_at(&mut self, index: usize, id: ShapeId) {
        self.unlink(id);
        let anchor = if index == 0 {
            None
        } else {
            self.iter().nth(index - 1).or(self.tail)
        };
        self.link_after(id, anchor);
    }

    pub fn remove(&mut self, id: ShapeId) -> bool {
        self.unlink(id)
    }

    pub fn is_front(&self, id: ShapeId) -> bool {
        self.tail == Some(id)
    }

    pub fn is_back(&self, id: ShapeId) -> bool {
        self.head == Some(id)
    }

    /// Swap with the object directly above. Returns false at the top.
    pub fn move_forward(&mut self, id: ShapeId) -> bool {
        let Some(next) = self.links.get(&id).and_then(|l| l.next) else {
            return false;
        };
        self.unlink(id);
        self.link_after(id, Some(next));
        true
    }

    /// Swap with the object directly below. Returns false at the bottom.
    pub fn move_backward(&mut self, id: ShapeId) -> bool {
        let Some(prev) = self.links.get(&id).and_then(|l| l.prev) else {
            return false;
        };
        let anchor = self.links.get(&prev).and_then(|l| l.prev);
        self.unlink(id);
        self.link_after(id, anchor);
        true
    }

    pub fn move_to_front(&mut self, id: ShapeId) -> bool {
        if !self.contains(id) || self.is_front(id) {
            return false;
        }
        self.push_front(id);
        true
    }

    pub fn move_to_back(&mut self, id: ShapeId) -> bool {
        if !self.contains(id) || self.is_back(id) {
            return false;
        }
        self.push_back(id);
        true
    }

    /// Back-to-front position of `id`.
    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.iter().position(|other| other == id)
    }

    /// Iterate back to front.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            order: self,
            cursor: self.head,
        }
    }

    fn unlink(&mut self, id: ShapeId) -> bool {
        let Some(link) = self.links.remove(&id) else {
            return false;
        };
        match link.prev.and_then(|p| self.links.get_mut(&p)) {
            Some(prev) => prev.next = link.next,
            None => self.head = link.next,
        }
        match link.next.and_then(|n| self.links.get_mut(&n)) {
            Some(next) => next.prev = link.prev,
            None => self.tail = link.prev,
        }
        true
    }

    /// Link `id` directly above `anchor`, or at the bottom when `anchor` is None.
    fn link_after(&mut self, id: ShapeId, anchor: Option<ShapeId>) {
        let next = match anchor {
            Some(a) => self.links.get(&a).and_then(|l| l.next),
            None => self.head,
        };
        self.links.insert(id, Link { prev: anchor, next });
        match anchor.and_then(|a| self.links.get_mut(&a)) {
            Some(link) => link.next = Some(id),
            None => self.head = Some(id),
        }
        match next.and_then(|n| self.links.get_mut(&n)) {
            Some(link) => link.prev = Some(id),
            None => self.tail = Some(id),
        }
    }
}

pub struct Iter<'a> {
    order: &'a ZOrder,
    cursor: Option<ShapeId>,
}

impl Iterator for Iter<'_> {
    type Item = ShapeId;

    fn next(&mut self) -> Option<ShapeId> {
        let current = self.cursor?;
        self.cursor = self.order.links.get(&current).and_then(|l| l.next);
        Some(current)
    }
}

impl FromIterator<ShapeId> for ZOrder {
    fn from_iter<I: IntoIterator<Item = ShapeId>>(iter: I) -> Self {
        let mut order = ZOrder::new();
        for id in iter {
            order.push_front(id);
        }
        order
    }
}
