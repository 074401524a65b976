//! Text shape.

use super::{ShapeId, ShapeMeta, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontWeight {
    Light,
    #[default]
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A block of text. Layout is approximated from font metrics; exact
/// glyph shaping is left to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Top-left corner of the text box.
    pub position: Point,
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
    pub font_family: String,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub align: TextAlign,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    /// Fill color carries the glyph color.
    pub style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Text {
    pub const DEFAULT_FONT_SIZE: f64 = 24.0;
    pub const DEFAULT_FONT_FAMILY: &'static str = "Inter";

    /// Average glyph advance as a fraction of the font size.
    const ADVANCE_RATIO: f64 = 0.6;
    const LINE_HEIGHT: f64 = 1.2;

    pub fn new(position: Point, content: impl Into<String>) -> Self {
        let style = ShapeStyle {
            fill_color: Some(super::SerializableColor::black()),
            stroke_width: 0.0,
            ..ShapeStyle::default()
        };
        Self {
            id: Uuid::new_v4(),
            position,
            content: content.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_family: Self::DEFAULT_FONT_FAMILY.to_string(),
            font_weight: FontWeight::default(),
            italic: false,
            align: TextAlign::default(),
            rotation: 0.0,
            style,
            meta: ShapeMeta::default(),
        }
    }

    pub fn with_font(mut self, family: impl Into<String>, size: f64) -> Self {
        self.font_family = family.into();
        self.font_size = size;
        self
    }

    /// Approximate (width, height) of the laid-out text.
    pub fn approx_size(&self) -> (f64, f64) {
        let lines: Vec<&str> = self.content.split('\n').collect();
        let longest = lines
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        let width = longest as f64 * self.font_size * Self::ADVANCE_RATIO;
        let height = lines.len() as f64 * self.font_size * Self::LINE_HEIGHT;
        (width, height)
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let (w, h) = self.approx_size();
        Rect::from_origin_size(self.position, (w, h))
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.bounds().to_path(0.1)
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
        let before = self.bounds();
        let after = affine.transform_rect_bbox(before);
        self.position = after.origin();
        if before.height() > 0.0 {
            let factor = after.height() / before.height();
            if (factor - 1.0).abs() > f64::EPSILON {
                self.font_size *= factor;
            }
        }
    }
}
