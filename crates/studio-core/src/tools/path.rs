//! Click-by-click vector path authoring.

use crate::document::{EditError, EditResult};
use crate::shapes::{Ellipse, Path, SerializableColor, Shape, ShapeMeta, ShapeStyle};
use kurbo::Point;

/// Radius of the point markers drawn in the preview.
const MARKER_RADIUS: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq)]
enum PathToolState {
    #[default]
    Idle,
    Collecting { points: Vec<Point> },
}

/// Accumulates clicked points and turns them into a [`Path`].
///
/// The tool itself never touches the scene; its preview is a separate set
/// of decorative shapes rebuilt on every request.
#[derive(Debug, Clone, Default)]
pub struct PathTool {
    state: PathToolState,
    pub style: ShapeStyle,
}

impl PathTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, PathToolState::Collecting { .. })
    }

    pub fn points(&self) -> &[Point] {
        match &self.state {
            PathToolState::Idle => &[],
            PathToolState::Collecting { points } => points,
        }
    }

    /// Append a point, starting a new path when idle.
    pub fn add_point(&mut self, point: Point) {
        match &mut self.state {
            PathToolState::Idle => {
                self.state = PathToolState::Collecting {
                    points: vec![point],
                };
            }
            PathToolState::Collecting { points } => points.push(point),
        }
    }

    /// Build the path and return to idle.
    ///
    /// With fewer than two points nothing changes and the points collected
    /// so far are kept.
    pub fn finish(&mut self) -> EditResult<Path> {
        let count = self.points().len();
        if count < 2 {
            return Err(EditError::TooFewPoints(count));
        }
        let PathToolState::Collecting { points } = std::mem::take(&mut self.state) else {
            return Err(EditError::TooFewPoints(0));
        };
        let mut path = Path::from_points(&points);
        path.style = self.style.clone();
        log::debug!("Finished path with {} points", points.len());
        Ok(path)
    }

    pub fn cancel(&mut self) {
        self.state = PathToolState::Idle;
    }

    /// Connecting segments plus a marker per point, all decorative.
    pub fn preview(&self) -> Vec<Shape> {
        let points = self.points();
        let mut shapes = Vec::with_capacity(points.len() + 1);
        if points.len() >= 2 {
            let mut line = Path::from_points(points);
            line.style = self.style.clone();
            line.meta = ShapeMeta::decorative();
            shapes.push(Shape::Path(line));
        }
        for p in points {
            let mut marker = Ellipse::circle(*p, MARKER_RADIUS);
            marker.style = ShapeStyle::filled(SerializableColor::new(0, 120, 255, 255));
            marker.meta = ShapeMeta::decorative();
            shapes.push(Shape::Ellipse(marker));
        }
        shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_and_finishes() {
        let mut tool = PathTool::new();
        assert!(!tool.is_collecting());
        tool.add_point(Point::new(10.0, 10.0));
        tool.add_point(Point::new(50.0, 10.0));
        tool.add_point(Point::new(50.0, 50.0));
        assert!(tool.is_collecting());

        let path = tool.finish().unwrap();
        assert_eq!(path.data, "M 10 10 L 50 10 L 50 50");
        assert!(!tool.is_collecting());
        assert!(tool.points().is_empty());
    }

    #[test]
    fn test_single_point_is_rejected_without_losing_it() {
        let mut tool = PathTool::new();
        tool.add_point(Point::new(10.0, 10.0));
        assert_eq!(tool.finish().map(|p| p.data), Err(EditError::TooFewPoints(1)));
        assert_eq!(tool.points(), &[Point::new(10.0, 10.0)]);

        let mut idle = PathTool::new();
        assert_eq!(idle.finish().map(|p| p.data), Err(EditError::TooFewPoints(0)));
    }

    #[test]
    fn test_preview_is_decorative() {
        let mut tool = PathTool::new();
        assert!(tool.preview().is_empty());
        tool.add_point(Point::new(0.0, 0.0));
        assert_eq!(tool.preview().len(), 1);
        tool.add_point(Point::new(10.0, 0.0));
        let preview = tool.preview();
        assert_eq!(preview.len(), 3);
        assert!(preview.iter().all(Shape::is_decorative));
        assert!(matches!(preview[0], Shape::Path(_)));
    }

    #[test]
    fn test_cancel_discards_points() {
        let mut tool = PathTool::new();
        tool.add_point(Point::new(0.0, 0.0));
        tool.add_point(Point::new(1.0, 1.0));
        tool.cancel();
        assert!(!tool.is_collecting());
        assert!(tool.preview().is_empty());
    }
}
