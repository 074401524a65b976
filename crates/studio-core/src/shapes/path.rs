//! Free-form vector path stored as SVG path data.

use super::{AssetError, AssetResult, ShapeId, ShapeMeta, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, ParamCurveNearest, PathEl, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vector path. `data` is an SVG path string such as `M 10 10 L 50 10`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub(crate) id: ShapeId,
    pub data: String,
    pub style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Path {
    /// Parse SVG path data. Rejects strings kurbo cannot read.
    pub fn from_svg(data: &str) -> AssetResult<Self> {
        BezPath::from_svg(data).map_err(|e| AssetError::InvalidPathData(e.to_string()))?;
        Ok(Self::with_data(data.trim().to_string()))
    }

    /// Open polyline through `points`, written as `M x y L x y ...`.
    pub fn from_points(points: &[Point]) -> Self {
        let data = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let cmd = if i == 0 { 'M' } else { 'L' };
                format!("{cmd} {} {}", p.x, p.y)
            })
            .collect::<Vec<_>>()
            .join(" ");
        Self::with_data(data)
    }

    fn with_data(data: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            style: ShapeStyle::default(),
            meta: ShapeMeta::default(),
        }
    }

    /// Parsed geometry. Data that no longer parses yields an empty path.
    pub fn bez_path(&self) -> BezPath {
        BezPath::from_svg(&self.data).unwrap_or_default()
    }

    /// Anchor points of the path (end points of every segment).
    pub fn anchors(&self) -> Vec<Point> {
        self.bez_path()
            .elements()
            .iter()
            .filter_map(|el| match el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(*p),
                PathEl::QuadTo(_, p) => Some(*p),
                PathEl::CurveTo(_, _, p) => Some(*p),
                PathEl::ClosePath => None,
            })
            .collect()
    }
}

impl ShapeTrait for Path {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let path = self.bez_path();
        if path.elements().is_empty() {
            Rect::ZERO
        } else {
            path.bounding_box()
        }
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let path = self.bez_path();
        if self.style.fill_color.is_some() && path.winding(point) != 0 {
            return true;
        }
        let reach = tolerance + self.style.stroke_width / 2.0;
        path.segments()
            .any(|seg| seg.nearest(point, 0.1).distance_sq.sqrt() <= reach)
    }

    fn to_path(&self) -> BezPath {
        self.bez_path()
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
        let path = affine * self.bez_path();
        self.data = path.to_svg();
    }
}
