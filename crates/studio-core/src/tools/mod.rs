//! Drawing tools.

mod path;

pub use path::PathTool;

use crate::shapes::{Ellipse, Line, Polygon, Rectangle, Shape, ShapeMeta, ShapeStyle, Text};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Drags shorter than this on both axes create nothing.
const MIN_DRAG_SIZE: f64 = 1.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Rectangle,
    Ellipse,
    Polygon,
    Line,
    Text,
    /// Click-by-click vector path, see [`PathTool`].
    Path,
}

impl ToolKind {
    /// Tools that create a shape from a press-drag-release gesture.
    pub fn is_drag_create(self) -> bool {
        matches!(
            self,
            ToolKind::Rectangle
                | ToolKind::Ellipse
                | ToolKind::Polygon
                | ToolKind::Line
                | ToolKind::Text
        )
    }
}

/// State of a drag-create interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Active { start: Point, current: Point },
}

/// Manages the current tool and its drag state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    pub current_tool: ToolKind,
    pub state: ToolState,
    /// Style applied to new shapes.
    pub current_style: ShapeStyle,
    /// Corner radius for new rectangles (0 = sharp corners).
    pub corner_radius: f64,
    /// Vertex count for new polygons.
    pub polygon_sides: usize,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            current_style: ShapeStyle::default(),
            corner_radius: 0.0,
            polygon_sides: 6,
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Begin a drag-create interaction.
    pub fn begin(&mut self, point: Point) {
        self.state = ToolState::Active {
            start: point,
            current: point,
        };
    }

    pub fn update(&mut self, point: Point) {
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = point;
        }
    }

    /// End the interaction and return the created shape, if any.
    pub fn end(&mut self, point: Point) -> Option<Shape> {
        let ToolState::Active { start, .. } = self.state else {
            return None;
        };
        self.state = ToolState::Idle;
        self.create_shape(start, point)
    }

    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// Decorative preview of the shape being dragged out.
    pub fn preview_shape(&self) -> Option<Shape> {
        let ToolState::Active { start, current } = self.state else {
            return None;
        };
        let mut shape = self.create_shape(start, current)?;
        *shape.meta_mut() = ShapeMeta::decorative();
        Some(shape)
    }

    fn create_shape(&self, start: Point, end: Point) -> Option<Shape> {
        let rect = Rect::from_points(start, end);
        let too_small = rect.width() < MIN_DRAG_SIZE && rect.height() < MIN_DRAG_SIZE;

        let mut shape = match self.current_tool {
            ToolKind::Rectangle if !too_small => {
                let mut r = Rectangle::from_rect(rect);
                r.corner_radius = self.corner_radius;
                Shape::Rectangle(r)
            }
            ToolKind::Ellipse if !too_small => Shape::Ellipse(Ellipse::from_rect(rect)),
            ToolKind::Polygon if !too_small => {
                Shape::Polygon(Polygon::in_rect(rect, self.polygon_sides))
            }
            ToolKind::Line if !too_small => Shape::Line(Line::new(start, end)),
            ToolKind::Text => {
                // Text keeps its own glyph style; only the color follows the tool.
                let mut text = Text::new(start, "Text");
                text.style.fill_color = Some(self.current_style.stroke_color);
                text.style.opacity = self.current_style.opacity;
                return Some(Shape::Text(text));
            }
            _ => return None,
        };
        *shape.style_mut() = self.current_style.clone();
        Some(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_interaction() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Rectangle);
        assert!(!tm.is_active());

        tm.begin(Point::new(0.0, 0.0));
        assert!(tm.is_active());
        tm.update(Point::new(50.0, 50.0));

        let preview = tm.preview_shape().unwrap();
        assert!(preview.is_decorative());
        assert_eq!(preview.bounds(), Rect::new(0.0, 0.0, 50.0, 50.0));

        let shape = tm.end(Point::new(100.0, 40.0)).unwrap();
        assert!(!shape.is_decorative());
        assert_eq!(shape.bounds(), Rect::new(0.0, 0.0, 100.0, 40.0));
        assert!(!tm.is_active());
    }

    #[test]
    fn test_click_without_drag_creates_nothing() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Ellipse);
        tm.begin(Point::new(10.0, 10.0));
        assert!(tm.end(Point::new(10.2, 10.0)).is_none());
    }

    #[test]
    fn test_text_created_on_click() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Text);
        tm.begin(Point::new(10.0, 10.0));
        let shape = tm.end(Point::new(10.0, 10.0)).unwrap();
        assert!(matches!(shape, Shape::Text(_)));
    }

    #[test]
    fn test_polygon_uses_configured_sides() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Polygon);
        tm.polygon_sides = 5;
        tm.begin(Point::new(0.0, 0.0));
        match tm.end(Point::new(100.0, 100.0)) {
            Some(Shape::Polygon(p)) => assert_eq!(p.points.len(), 5),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_select_and_path_create_nothing() {
        let mut tm = ToolManager::new();
        for tool in [ToolKind::Select, ToolKind::Path] {
            tm.set_tool(tool);
            tm.begin(Point::new(0.0, 0.0));
            assert!(tm.end(Point::new(100.0, 100.0)).is_none());
        }
    }

    #[test]
    fn test_cancel_interaction() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Line);
        tm.begin(Point::new(0.0, 0.0));
        tm.cancel();
        assert!(!tm.is_active());
        assert!(tm.preview_shape().is_none());
    }
}
