//! Group shape for combining multiple shapes.

use super::{Shape, ShapeId, ShapeMeta, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A group of shapes manipulated as a single unit. Groups nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) id: ShapeId,
    /// Children in bottom-to-top order.
    pub children: Vec<Shape>,
    /// Unused for drawing; kept so every object carries a style.
    #[serde(default)]
    style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Group {
    pub fn new(children: Vec<Shape>) -> Self {
        Self {
            id: Uuid::new_v4(),
            children,
            style: ShapeStyle::default(),
            meta: ShapeMeta::default(),
        }
    }

    pub fn children(&self) -> &[Shape] {
        &self.children
    }

    /// Dissolve this group and return its children.
    pub fn ungroup(self) -> Vec<Shape> {
        self.children
    }

    /// Find a shape by ID within this group (including nested groups).
    pub fn find_shape(&self, id: ShapeId) -> Option<&Shape> {
        for child in &self.children {
            if child.id() == id {
                return Some(child);
            }
            if let Shape::Group(group) = child {
                if let Some(found) = group.find_shape(id) {
                    return Some(found);
                }
            }
        }
        None
    }
}

impl ShapeTrait for Group {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let mut iter = self.children.iter().map(Shape::bounds);
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(first, |acc, b| acc.union(b))
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.children
            .iter()
            .any(|child| child.hit_test(point, tolerance))
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for child in &self.children {
            path.extend(child.world_path());
        }
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn meta(&self) -> &ShapeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ShapeMeta {
        &mut self.meta
    }

    fn transform(&mut self, affine: Affine) {
        for child in &mut self.children {
            child.transform(affine);
        }
    }
}
