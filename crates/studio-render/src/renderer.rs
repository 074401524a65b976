//! Renderer trait abstraction and the display list every backend draws from.

use kurbo::{Affine, BezPath, Rect, Size};
use peniko::Color;
use studio_core::canvas::Canvas;
use studio_core::document::Decorations;
use studio_core::scene::Scene;
use studio_core::shapes::{ClipRegion, Shape, ShapeId};
use studio_core::snap::Guide;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// No grid (plain page).
    None,
    /// Full grid lines.
    #[default]
    Lines,
    /// Only dots at intersections.
    Dots,
}

/// Context for a single render.
pub struct RenderContext<'a> {
    /// The scene to render.
    pub scene: &'a Scene,
    /// Page size in page units.
    pub page_size: Size,
    /// Output pixels per page unit.
    pub scale: f64,
    pub background_color: Color,
    pub grid_style: GridStyle,
    pub grid_size: f64,
    /// Editor decorations to draw. Hidden decorations also hide decorative
    /// objects such as the mask overlay.
    pub decorations: Decorations,
    /// Alignment guides from an active drag.
    pub guides: &'a [Guide],
    /// In-progress tool previews, drawn above the scene.
    pub overlays: Vec<Shape>,
    pub guide_color: Color,
}

impl<'a> RenderContext<'a> {
    /// Create a context for a bare scene with no editor decorations.
    pub fn new(scene: &'a Scene, page_size: Size) -> Self {
        Self {
            scene,
            page_size,
            scale: 1.0,
            background_color: Color::from_rgba8(255, 255, 255, 255),
            grid_style: GridStyle::Lines,
            grid_size: studio_core::snap::GRID_SIZE,
            decorations: Decorations::HIDDEN,
            guides: &[],
            overlays: Vec::new(),
            guide_color: Color::from_rgba8(236, 72, 153, 255), // Pink
        }
    }

    /// Create a context showing everything the editor shows for the active
    /// page of `canvas`.
    pub fn for_canvas(canvas: &'a Canvas) -> Self {
        let mut ctx = Self::new(canvas.scene(), canvas.document.active_page().size());
        ctx.grid_size = canvas.snap.grid_size;
        ctx.decorations = canvas.document.decorations;
        ctx.guides = canvas.guides();
        ctx.overlays = canvas.overlay_shapes();
        ctx
    }

    /// Set output pixels per page unit.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    pub fn with_decorations(mut self, decorations: Decorations) -> Self {
        self.decorations = decorations;
        self
    }

    /// Output size in whole pixels, at least 1x1.
    pub fn output_size(&self) -> (u32, u32) {
        let px = |v: f64| (v * self.scale).ceil().max(1.0) as u32;
        (px(self.page_size.width), px(self.page_size.height))
    }

    /// Display list for this render: the scene, plus decorative objects and
    /// overlays when guides are shown.
    pub fn display_list(&self) -> Vec<DisplayItem> {
        let with_decorative = self.decorations.guides;
        let mut items = build_display_list(self.scene, with_decorative);
        if with_decorative {
            for overlay in &self.overlays {
                push_items(&mut items, overlay, Affine::IDENTITY, &[], true);
            }
        }
        items
    }
}

/// A clip outline in page coordinates.
#[derive(Debug, Clone)]
pub struct ClipPath {
    pub path: BezPath,
    pub inverted: bool,
}

impl ClipPath {
    fn from_region(region: &ClipRegion, parent: Affine) -> Self {
        Self {
            path: parent * region.path(),
            inverted: region.inverted,
        }
    }
}

/// One flattened, paint-ready object.
#[derive(Debug, Clone)]
pub struct DisplayItem {
    pub id: ShapeId,
    /// Outline in page coordinates.
    pub path: BezPath,
    pub fill: Option<Color>,
    /// Stroke color and width.
    pub stroke: Option<(Color, f64)>,
    /// Every clip that applies, outermost group first.
    pub clips: Vec<ClipPath>,
}

impl DisplayItem {
    pub fn bounds(&self) -> Rect {
        let bounds = kurbo::Shape::bounding_box(&self.path);
        match self.stroke {
            Some((_, width)) => bounds.inflate(width / 2.0, width / 2.0),
            None => bounds,
        }
    }
}

/// Flatten a scene back to front, expanding groups into their children.
///
/// Hidden objects are skipped, and so are decorative ones unless asked for.
pub fn build_display_list(scene: &Scene, with_decorative: bool) -> Vec<DisplayItem> {
    let mut items = Vec::new();
    for shape in scene.iter() {
        push_items(&mut items, shape, Affine::IDENTITY, &[], with_decorative);
    }
    items
}

fn push_items(
    items: &mut Vec<DisplayItem>,
    shape: &Shape,
    parent: Affine,
    parent_clips: &[ClipPath],
    with_decorative: bool,
) {
    let meta = shape.meta();
    if !meta.visible || (meta.decorative && !with_decorative) {
        return;
    }
    let mut clips = parent_clips.to_vec();
    if let Some(region) = &meta.clip {
        clips.push(ClipPath::from_region(region, parent));
    }

    if let Shape::Group(group) = shape {
        let transform = parent * shape.rotation_affine();
        for child in group.children() {
            push_items(items, child, transform, &clips, with_decorative);
        }
        return;
    }

    let style = shape.style();
    let (fill, stroke) = match shape {
        // Text is drawn as a block in the text color; glyphs are the host's job.
        Shape::Text(_) => {
            let color = style.stroke_with_opacity();
            (Some(color.multiply_alpha(0.6)), None)
        }
        Shape::Image(_) => (
            Some(Color::from_rgba8(200, 200, 200, 255).multiply_alpha(style.opacity as f32)),
            Some((Color::from_rgba8(100, 100, 100, 255), 1.0)),
        ),
        _ => {
            let stroke = (style.stroke_width > 0.0)
                .then(|| (style.stroke_with_opacity(), style.stroke_width));
            (style.fill_with_opacity(), stroke)
        }
    };

    items.push(DisplayItem {
        id: shape.id(),
        path: parent * shape.world_path(),
        fill,
        stroke,
        clips,
    });
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Output of one render.
    type Output;

    fn render(&mut self, ctx: &RenderContext<'_>) -> RenderResult<Self::Output>;
}
