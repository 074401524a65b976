//! Scene objects placed on a page.

mod ellipse;
mod group;
mod image;
mod line;
mod path;
mod polygon;
mod rectangle;
mod text;

pub use ellipse::Ellipse;
pub use group::Group;
pub use image::{Image, ImageFilters, ImageFormat, ImageSource};
pub use line::Line;
pub use path::Path;
pub use polygon::Polygon;
pub use rectangle::Rectangle;
pub use text::{FontWeight, Text, TextAlign};

use kurbo::{Affine, BezPath, Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while importing external assets into a scene.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unsupported image format")]
    UnsupportedFormat,
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("invalid path data: {0}")]
    InvalidPathData(String),
}

/// Result type for asset imports.
pub type AssetResult<T> = Result<T, AssetError>;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke color.
    pub stroke_color: SerializableColor,
    /// Stroke width.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn scale_alpha(color: SerializableColor, opacity: f64) -> Color {
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)) as u8;
    Color::from_rgba8(color.r, color.g, color.b, alpha)
}

impl ShapeStyle {
    /// A stroke-less style with a solid fill.
    pub fn filled(color: SerializableColor) -> Self {
        Self {
            stroke_color: color,
            stroke_width: 0.0,
            fill_color: Some(color),
            opacity: 1.0,
        }
    }

    /// Get the stroke color as a peniko Color.
    pub fn stroke(&self) -> Color {
        self.stroke_color.into()
    }

    /// Get the stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Color {
        scale_alpha(self.stroke_color, self.opacity)
    }

    /// Get the fill color as a peniko Color.
    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(|c| c.into())
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill_color.map(|c| scale_alpha(c, self.opacity))
    }

    pub fn set_stroke(&mut self, color: Color) {
        self.stroke_color = color.into();
    }

    pub fn set_fill(&mut self, color: Option<Color>) {
        self.fill_color = color.map(|c| c.into());
    }

    /// Set opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 2.0,
            fill_color: None,
            opacity: 1.0,
        }
    }
}

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// A clip region attached to a shape.
///
/// The region is stored in absolute page coordinates and does not follow
/// later transforms of the clipped shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRegion {
    pub shape: Box<Shape>,
    /// Keep what lies outside the region instead of inside.
    #[serde(default)]
    pub inverted: bool,
}

impl ClipRegion {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape: Box::new(shape),
            inverted: false,
        }
    }

    /// The clip outline in page coordinates.
    pub fn path(&self) -> BezPath {
        self.shape.world_path()
    }

    /// Whether a page point survives the clip.
    pub fn admits(&self, point: Point) -> bool {
        let inside = kurbo::Shape::winding(&self.path(), point) != 0;
        inside != self.inverted
    }
}

/// Editor flags carried by every scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipRegion>,
    /// Can be picked and dragged.
    #[serde(default = "default_true")]
    pub interactive: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Editor-only helper (mask overlays, tool previews). Never snapshotted,
    /// exported or used as a snap target.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub decorative: bool,
}

impl Default for ShapeMeta {
    fn default() -> Self {
        Self {
            clip: None,
            interactive: true,
            visible: true,
            decorative: false,
        }
    }
}

impl ShapeMeta {
    pub fn decorative() -> Self {
        Self {
            decorative: true,
            ..Self::default()
        }
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (point - (a + seg * t)).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Bounding rectangle of a point set.
pub(crate) fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in world coordinates (ignoring rotation).
    fn bounds(&self) -> Rect;

    /// Check if a point (in world coordinates) hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Outline in local coordinates, before rotation.
    fn to_path(&self) -> BezPath;

    fn style(&self) -> &ShapeStyle;

    fn style_mut(&mut self) -> &mut ShapeStyle;

    fn meta(&self) -> &ShapeMeta;

    fn meta_mut(&mut self) -> &mut ShapeMeta;

    /// Apply a transform to this shape's geometry.
    fn transform(&mut self, affine: Affine);
}

/// Enum wrapper for all shape types (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Polygon(Polygon),
    Line(Line),
    Path(Path),
    Text(Text),
    Image(Image),
    Group(Group),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Rectangle(s) => s.id(),
            Shape::Ellipse(s) => s.id(),
            Shape::Polygon(s) => s.id(),
            Shape::Line(s) => s.id(),
            Shape::Path(s) => s.id(),
            Shape::Text(s) => s.id(),
            Shape::Image(s) => s.id(),
            Shape::Group(s) => s.id(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rectangle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
            Shape::Polygon(s) => s.bounds(),
            Shape::Line(s) => s.bounds(),
            Shape::Path(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
            Shape::Image(s) => s.bounds(),
            Shape::Group(s) => s.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let meta = self.meta();
        if !meta.visible {
            return false;
        }
        if meta.clip.as_ref().is_some_and(|clip| !clip.admits(point)) {
            return false;
        }
        let local = self.to_local(point);
        match self {
            Shape::Rectangle(s) => s.hit_test(local, tolerance),
            Shape::Ellipse(s) => s.hit_test(local, tolerance),
            Shape::Polygon(s) => s.hit_test(local, tolerance),
            Shape::Line(s) => s.hit_test(local, tolerance),
            Shape::Path(s) => s.hit_test(local, tolerance),
            Shape::Text(s) => s.hit_test(local, tolerance),
            Shape::Image(s) => s.hit_test(local, tolerance),
            Shape::Group(s) => s.hit_test(local, tolerance),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Rectangle(s) => s.to_path(),
            Shape::Ellipse(s) => s.to_path(),
            Shape::Polygon(s) => s.to_path(),
            Shape::Line(s) => s.to_path(),
            Shape::Path(s) => s.to_path(),
            Shape::Text(s) => s.to_path(),
            Shape::Image(s) => s.to_path(),
            Shape::Group(s) => s.to_path(),
        }
    }

    /// Outline in page coordinates, with rotation applied.
    pub fn world_path(&self) -> BezPath {
        self.rotation_affine() * self.to_path()
    }

    pub fn style(&self) -> &ShapeStyle {
        match self {
            Shape::Rectangle(s) => s.style(),
            Shape::Ellipse(s) => s.style(),
            Shape::Polygon(s) => s.style(),
            Shape::Line(s) => s.style(),
            Shape::Path(s) => s.style(),
            Shape::Text(s) => s.style(),
            Shape::Image(s) => s.style(),
            Shape::Group(s) => s.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        match self {
            Shape::Rectangle(s) => s.style_mut(),
            Shape::Ellipse(s) => s.style_mut(),
            Shape::Polygon(s) => s.style_mut(),
            Shape::Line(s) => s.style_mut(),
            Shape::Path(s) => s.style_mut(),
            Shape::Text(s) => s.style_mut(),
            Shape::Image(s) => s.style_mut(),
            Shape::Group(s) => s.style_mut(),
        }
    }

    pub fn meta(&self) -> &ShapeMeta {
        match self {
            Shape::Rectangle(s) => s.meta(),
            Shape::Ellipse(s) => s.meta(),
            Shape::Polygon(s) => s.meta(),
            Shape::Line(s) => s.meta(),
            Shape::Path(s) => s.meta(),
            Shape::Text(s) => s.meta(),
            Shape::Image(s) => s.meta(),
            Shape::Group(s) => s.meta(),
        }
    }

    pub fn meta_mut(&mut self) -> &mut ShapeMeta {
        match self {
            Shape::Rectangle(s) => s.meta_mut(),
            Shape::Ellipse(s) => s.meta_mut(),
            Shape::Polygon(s) => s.meta_mut(),
            Shape::Line(s) => s.meta_mut(),
            Shape::Path(s) => s.meta_mut(),
            Shape::Text(s) => s.meta_mut(),
            Shape::Image(s) => s.meta_mut(),
            Shape::Group(s) => s.meta_mut(),
        }
    }

    /// Transform geometry. An attached clip region stays where it is.
    pub fn transform(&mut self, affine: Affine) {
        match self {
            Shape::Rectangle(s) => s.transform(affine),
            Shape::Ellipse(s) => s.transform(affine),
            Shape::Polygon(s) => s.transform(affine),
            Shape::Line(s) => s.transform(affine),
            Shape::Path(s) => s.transform(affine),
            Shape::Text(s) => s.transform(affine),
            Shape::Image(s) => s.transform(affine),
            Shape::Group(s) => s.transform(affine),
        }
    }

    pub fn is_decorative(&self) -> bool {
        self.meta().decorative
    }

    pub fn is_interactive(&self) -> bool {
        let meta = self.meta();
        meta.interactive && meta.visible
    }

    pub fn clip(&self) -> Option<&ClipRegion> {
        self.meta().clip.as_ref()
    }

    /// Get the group if this shape is a group.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut Image> {
        match self {
            Shape::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Regenerate the shape's ID (and nested group children).
    pub fn regenerate_id(&mut self) {
        let new_id = Uuid::new_v4();
        match self {
            Shape::Rectangle(s) => s.id = new_id,
            Shape::Ellipse(s) => s.id = new_id,
            Shape::Polygon(s) => s.id = new_id,
            Shape::Line(s) => s.id = new_id,
            Shape::Path(s) => s.id = new_id,
            Shape::Text(s) => s.id = new_id,
            Shape::Image(s) => s.id = new_id,
            Shape::Group(s) => {
                s.id = new_id;
                for child in &mut s.children {
                    child.regenerate_id();
                }
            }
        }
    }

    /// Get the rotation angle in radians (0 for shapes that don't rotate).
    pub fn rotation(&self) -> f64 {
        match self {
            Shape::Rectangle(r) => r.rotation,
            Shape::Ellipse(e) => e.rotation,
            Shape::Text(t) => t.rotation,
            Shape::Image(i) => i.rotation,
            _ => 0.0,
        }
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        match self {
            Shape::Rectangle(r) => r.rotation = rotation,
            Shape::Ellipse(e) => e.rotation = rotation,
            Shape::Text(t) => t.rotation = rotation,
            Shape::Image(i) => i.rotation = rotation,
            Shape::Polygon(_) | Shape::Line(_) | Shape::Path(_) | Shape::Group(_) => {}
        }
    }

    /// Polygon, line, path and group geometry is rotated by baking the
    /// transform into their points.
    pub fn rotate(&mut self, angle: f64) {
        if self.rotation_is_baked() {
            let center = self.bounds().center();
            self.transform(Affine::rotate_about(angle, center));
        } else {
            let rotation = self.rotation() + angle;
            self.set_rotation(rotation);
        }
    }

    fn rotation_is_baked(&self) -> bool {
        matches!(
            self,
            Shape::Polygon(_) | Shape::Line(_) | Shape::Path(_) | Shape::Group(_)
        )
    }

    /// Rotation about the bounds center, as applied by [`Shape::world_path`].
    pub fn rotation_affine(&self) -> Affine {
        let rotation = self.rotation();
        if rotation == 0.0 {
            Affine::IDENTITY
        } else {
            Affine::rotate_about(rotation, self.bounds().center())
        }
    }

    fn to_local(&self, point: Point) -> Point {
        let rotation = self.rotation();
        if rotation == 0.0 {
            point
        } else {
            Affine::rotate_about(-rotation, self.bounds().center()) * point
        }
    }
}
