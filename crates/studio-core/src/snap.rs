//! Alignment snapping and guide lines for dragged objects.
//!
//! Each axis is solved independently. The moving box offers three
//! candidates per axis (leading edge, center, trailing edge) and so does
//! every target box. The closest pair within the threshold wins. When two
//! candidates are equally close the one evaluated last wins, and the grid
//! is always evaluated after objects, so a grid line beats an object edge
//! at the same distance.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Grid size for snapping (matches the visual grid).
pub const GRID_SIZE: f64 = 20.0;

/// Distance within which a candidate snaps, in page pixels.
pub const SNAP_THRESHOLD: f64 = 8.0;

const ALIGN_EPSILON: f64 = 1e-6;

/// What the dragged object aligns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapMode {
    /// No snapping.
    None,
    Grid,
    /// Other objects' edges and centers.
    #[default]
    Shapes,
    /// Both grid and objects.
    All,
}

impl SnapMode {
    pub fn snaps_to_grid(self) -> bool {
        matches!(self, SnapMode::Grid | SnapMode::All)
    }

    pub fn snaps_to_shapes(self) -> bool {
        matches!(self, SnapMode::Shapes | SnapMode::All)
    }

    pub fn is_enabled(self) -> bool {
        self != SnapMode::None
    }
}

/// Snap a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuideAxis {
    /// A vertical line at some x.
    Vertical,
    /// A horizontal line at some y.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuideSource {
    Object,
    Grid,
}

/// An alignment line to draw while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub axis: GuideAxis,
    pub position: f64,
    pub source: GuideSource,
}

/// How far to nudge the dragged object, plus the guides to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapOutcome {
    pub offset: Vec2,
    pub guides: Vec<Guide>,
}

impl SnapOutcome {
    pub fn is_snapped(&self) -> bool {
        !self.guides.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisMatch {
    distance: f64,
    delta: f64,
    source: GuideSource,
}

fn x_candidates(r: Rect) -> [f64; 3] {
    [r.x0, r.center().x, r.x1]
}

fn y_candidates(r: Rect) -> [f64; 3] {
    [r.y0, r.center().y, r.y1]
}

/// Stateful snapping for one drag gesture.
#[derive(Debug, Clone)]
pub struct SnapEngine {
    pub mode: SnapMode,
    pub threshold: f64,
    pub grid_size: f64,
    guides: Vec<Guide>,
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self::new(SnapMode::default())
    }
}

impl SnapEngine {
    pub fn new(mode: SnapMode) -> Self {
        Self {
            mode,
            threshold: SNAP_THRESHOLD,
            grid_size: GRID_SIZE,
            guides: Vec::new(),
        }
    }

    /// Guides from the most recent [`SnapEngine::snap_drag`].
    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }

    /// Drop all guides (drag ended or was cancelled).
    pub fn clear_guides(&mut self) {
        self.guides.clear();
    }

    /// Snap the proposed bounds of a dragged object against `targets`.
    ///
    /// `targets` must already exclude the moving object, hidden objects and
    /// decorative helpers.
    pub fn snap_drag(&mut self, moving: Rect, targets: &[Rect]) -> SnapOutcome {
        let outcome = self.compute(moving, targets);
        self.guides = outcome.guides.clone();
        outcome
    }

    fn compute(&self, moving: Rect, targets: &[Rect]) -> SnapOutcome {
        if !self.mode.is_enabled() {
            return SnapOutcome::default();
        }
        let object_targets: &[Rect] = if self.mode.snaps_to_shapes() {
            targets
        } else {
            &[]
        };

        let mx = x_candidates(moving);
        let my = y_candidates(moving);
        let tx: Vec<[f64; 3]> = object_targets.iter().map(|r| x_candidates(*r)).collect();
        let ty: Vec<[f64; 3]> = object_targets.iter().map(|r| y_candidates(*r)).collect();

        let x_match = self.best_match(mx, &tx);
        let y_match = self.best_match(my, &ty);

        let mut outcome = SnapOutcome::default();
        if let Some(m) = x_match {
            outcome.offset.x = m.delta;
            self.collect_guides(mx, &tx, m, GuideAxis::Vertical, &mut outcome.guides);
        }
        if let Some(m) = y_match {
            outcome.offset.y = m.delta;
            self.collect_guides(my, &ty, m, GuideAxis::Horizontal, &mut outcome.guides);
        }
        outcome
    }

    fn best_match(&self, moving: [f64; 3], targets: &[[f64; 3]]) -> Option<AxisMatch> {
        let mut best: Option<AxisMatch> = None;
        let mut consider = |distance: f64, delta: f64, source: GuideSource| {
            if distance <= self.threshold && best.is_none_or(|b| distance <= b.distance) {
                best = Some(AxisMatch {
                    distance,
                    delta,
                    source,
                });
            }
        };

        for target in targets {
            for t in target {
                for m in moving {
                    consider((t - m).abs(), t - m, GuideSource::Object);
                }
            }
        }

        if self.mode.snaps_to_grid() && self.grid_size > 0.0 {
            let lead = moving[0];
            let line = (lead / self.grid_size).round() * self.grid_size;
            consider((line - lead).abs(), line - lead, GuideSource::Grid);
        }
        best
    }

    /// Every coordinate the snapped box now lines up with becomes a guide.
    fn collect_guides(
        &self,
        moving: [f64; 3],
        targets: &[[f64; 3]],
        winner: AxisMatch,
        axis: GuideAxis,
        out: &mut Vec<Guide>,
    ) {
        let shifted = moving.map(|m| m + winner.delta);
        let mut push = |position: f64, source: GuideSource| {
            let duplicate = out
                .iter()
                .any(|g| g.axis == axis && (g.position - position).abs() < ALIGN_EPSILON);
            if !duplicate {
                out.push(Guide {
                    axis,
                    position,
                    source,
                });
            }
        };

        if winner.source == GuideSource::Grid {
            push(shifted[0], GuideSource::Grid);
        }
        for target in targets {
            for t in target {
                if shifted.iter().any(|s| (s - t).abs() < ALIGN_EPSILON) {
                    push(*t, GuideSource::Object);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(mode: SnapMode) -> SnapEngine {
        SnapEngine::new(mode)
    }

    #[test]
    fn test_snap_mode_targets() {
        assert!(SnapMode::All.snaps_to_grid() && SnapMode::All.snaps_to_shapes());
        assert!(!SnapMode::Shapes.snaps_to_grid());
    }

    #[test]
    fn test_left_edge_within_threshold_snaps() {
        let mut snap = engine(SnapMode::Shapes);
        let static_box = Rect::new(100.0, 0.0, 200.0, 50.0);
        let moving = Rect::new(104.0, 300.0, 164.0, 340.0);

        let outcome = snap.snap_drag(moving, &[static_box]);
        assert_eq!(outcome.offset, Vec2::new(-4.0, 0.0));
        assert!(outcome.guides.contains(&Guide {
            axis: GuideAxis::Vertical,
            position: 100.0,
            source: GuideSource::Object,
        }));
        assert!(!outcome.guides.iter().any(|g| g.axis == GuideAxis::Horizontal));
        assert_eq!(snap.guides(), outcome.guides.as_slice());
    }

    #[test]
    fn test_outside_threshold_does_not_snap() {
        let mut snap = engine(SnapMode::Shapes);
        let static_box = Rect::new(100.0, 0.0, 200.0, 50.0);
        let moving = Rect::new(130.0, 300.0, 190.0, 340.0);

        let outcome = snap.snap_drag(moving, &[static_box]);
        assert_eq!(outcome.offset, Vec2::ZERO);
        assert!(outcome.guides.is_empty());
    }

    #[test]
    fn test_closest_candidate_wins() {
        let mut snap = engine(SnapMode::Shapes);
        let a = Rect::new(100.0, 500.0, 160.0, 510.0);
        let b = Rect::new(0.0, 600.0, 103.0, 610.0);
        // Left edge 105: 5px from a.x0, 2px from b.x1.
        let moving = Rect::new(105.0, 0.0, 125.0, 20.0);
        let outcome = snap.snap_drag(moving, &[a, b]);
        assert_eq!(outcome.offset.x, -2.0);
    }

    #[test]
    fn test_centers_align() {
        let mut snap = engine(SnapMode::Shapes);
        let target = Rect::new(0.0, 0.0, 100.0, 100.0);
        let moving = Rect::new(300.0, 43.0, 340.0, 53.0);
        let outcome = snap.snap_drag(moving, &[target]);
        assert_eq!(outcome.offset.y, 2.0);
        assert!(outcome.guides.iter().any(|g| g.axis == GuideAxis::Horizontal && g.position == 50.0));
    }

    #[test]
    fn test_grid_wins_tie_with_object() {
        let mut snap = engine(SnapMode::All);
        // The object edge at 107 is 3px right of the moving right edge and
        // the grid line at 100 is 3px left of its left edge; grid goes last.
        let target = Rect::new(107.0, 500.0, 150.0, 501.0);
        let moving = Rect::new(103.0, 7.0, 104.0, 8.0);
        let outcome = snap.snap_drag(moving, &[target]);
        assert_eq!(outcome.offset.x, -3.0);
        assert!(outcome.guides.iter().any(|g| g.source == GuideSource::Grid
            && g.axis == GuideAxis::Vertical
            && g.position == 100.0));
    }

    #[test]
    fn test_grid_only_mode_ignores_objects() {
        let mut snap = engine(SnapMode::Grid);
        let target = Rect::new(31.0, 0.0, 40.0, 10.0);
        let moving = Rect::new(33.0, 57.0, 43.0, 67.0);
        let outcome = snap.snap_drag(moving, &[target]);
        assert_eq!(outcome.offset, Vec2::new(7.0, 3.0));
        assert!(outcome.guides.iter().all(|g| g.source == GuideSource::Grid));
    }

    #[test]
    fn test_disabled_and_clear() {
        let mut snap = engine(SnapMode::None);
        let outcome = snap.snap_drag(Rect::new(1.0, 1.0, 2.0, 2.0), &[Rect::new(0.0, 0.0, 1.0, 1.0)]);
        assert!(!outcome.is_snapped());

        snap.mode = SnapMode::Shapes;
        snap.snap_drag(Rect::new(1.0, 1.0, 2.0, 2.0), &[Rect::new(0.0, 0.0, 1.0, 1.0)]);
        assert!(!snap.guides().is_empty());
        snap.clear_guides();
        assert!(snap.guides().is_empty());
    }

    #[test]
    fn test_snap_point_to_grid() {
        assert_eq!(snap_to_grid(Point::new(29.0, 31.0), 20.0), Point::new(20.0, 40.0));
    }
}
