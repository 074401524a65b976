//! Ellipse shape.

use super::{ShapeId, ShapeMeta, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Ellipse as KurboEllipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub(crate) id: ShapeId,
    pub center: Point,
    pub radius_x: f64,
    pub radius_y: f64,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Ellipse {
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius_x,
            radius_y,
            rotation: 0.0,
            style: ShapeStyle::default(),
            meta: ShapeMeta::default(),
        }
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Self::new(center, radius, radius)
    }

    /// Create an ellipse inscribed in a bounding rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }

    pub fn as_kurbo(&self) -> KurboEllipse {
        KurboEllipse::new(self.center, (self.radius_x, self.radius_y), 0.0)
    }
}

impl ShapeTrait for Ellipse {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.center.x + self.radius_x,
            self.center.y + self.radius_y,
        )
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let half_sw = self.style.stroke_width / 2.0;
        let dx_outer = (point.x - self.center.x) / (self.radius_x + tolerance + half_sw);
        let dy_outer = (point.y - self.center.y) / (self.radius_y + tolerance + half_sw);
        if dx_outer * dx_outer + dy_outer * dy_outer > 1.0 {
            return false;
        }
        if self.style.fill_color.is_some() {
            return true;
        }
        // Outline only: reject if inside inner ellipse
        let inner_rx = (self.radius_x - tolerance - half_sw).max(0.0);
        let inner_ry = (self.radius_y - tolerance - half_sw).max(0.0);
        if inner_rx < f64::EPSILON || inner_ry < f64::EPSILON {
            return true;
        }
        let dx_inner = (point.x - self.center.x) / inner_rx;
        let dy_inner = (point.y - self.center.y) / inner_ry;
        dx_inner * dx_inner + dy_inner * dy_inner > 1.0
    }

    fn to_path(&self) -> BezPath {
        self.as_kurbo().to_path(0.1)
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
        let rect = affine.transform_rect_bbox(self.bounds());
        self.center = rect.center();
        self.radius_x = rect.width() / 2.0;
        self.radius_y = rect.height() / 2.0;
    }
}
