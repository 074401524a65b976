//! The live object list of one page.

use crate::shapes::{Shape, ShapeId};
use crate::zorder::ZOrder;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A complete, self-contained serialization of a scene, back to front.
///
/// Decorative editor helpers are never part of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneSnapshot {
    pub objects: Vec<Shape>,
}

impl SceneSnapshot {
    pub fn new(objects: Vec<Shape>) -> Self {
        Self { objects }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Shapes keyed by id plus their stacking order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    shapes: HashMap<ShapeId, Shape>,
    order: ZOrder,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &SceneSnapshot) -> Self {
        let mut scene = Self::new();
        scene.load(snapshot);
        scene
    }

    /// Replace every object, decorative helpers included, with `snapshot`.
    pub fn load(&mut self, snapshot: &SceneSnapshot) {
        self.shapes.clear();
        self.order.clear();
        for shape in &snapshot.objects {
            self.add(shape.clone());
        }
    }

    /// Serialize the committed (non-decorative) objects.
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            objects: self
                .iter()
                .filter(|s| !s.is_decorative())
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Add on top of the stack. An existing object with the same id is replaced.
    pub fn add(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        self.order.push_front(id);
        self.shapes.insert(id, shape);
        id
    }

    /// Insert at a back-to-front position.
    pub fn insert_at(&mut self, index: usize, shape: Shape) -> ShapeId {
        let id = shape.id();
        self.order.insert_at(index, id);
        self.shapes.insert(id, shape);
        id
    }

    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        self.order.remove(id);
        self.shapes.remove(&id)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// Shapes back to front.
    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.order.iter().filter_map(|id| self.shapes.get(&id))
    }

    pub fn ids(&self) -> Vec<ShapeId> {
        self.order.iter().collect()
    }

    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.order.index_of(id)
    }

    pub fn bring_to_front(&mut self, id: ShapeId) -> bool {
        self.order.move_to_front(id)
    }

    pub fn send_to_back(&mut self, id: ShapeId) -> bool {
        self.order.move_to_back(id)
    }

    pub fn bring_forward(&mut self, id: ShapeId) -> bool {
        self.order.move_forward(id)
    }

    pub fn send_backward(&mut self, id: ShapeId) -> bool {
        self.order.move_backward(id)
    }

    /// Topmost interactive shape under `point`.
    pub fn shape_at(&self, point: Point, tolerance: f64) -> Option<ShapeId> {
        let ids = self.ids();
        ids.into_iter().rev().find(|id| {
            self.shapes
                .get(id)
                .is_some_and(|s| s.is_interactive() && s.hit_test(point, tolerance))
        })
    }

    /// Union of the bounds of all non-decorative shapes.
    pub fn bounds(&self) -> Option<Rect> {
        self.iter()
            .filter(|s| !s.is_decorative())
            .map(Shape::bounds)
            .reduce(|a, b| a.union(b))
    }
}
