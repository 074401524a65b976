//! CPU rasterizer used for document thumbnails.
//!
//! Coverage is point-sampled at pixel centers, which is plenty for a
//! 200px preview and keeps the renderer free of GPU state.

use crate::renderer::{
    ClipPath, DisplayItem, GridStyle, RenderContext, RenderResult, Renderer, RendererError,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kurbo::{PathEl, Point, Rect, Shape as _};
use peniko::Color;
use studio_core::shapes::point_to_segment_dist;
use studio_core::snap::GuideAxis;
use studio_core::thumbnail::{ThumbnailError, ThumbnailRequest, Thumbnailer};

/// Longest side of a thumbnail, in pixels.
pub const THUMBNAIL_MAX_SIZE: f64 = 200.0;

/// An RGBA8 image, unpremultiplied, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let rgba = background.to_rgba8();
        let data = [rgba.r, rgba.g, rgba.b, rgba.a]
            .into_iter()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Source-over blend of `color` onto one pixel.
    fn blend(&mut self, x: u32, y: u32, color: Color) {
        let src = color.to_rgba8();
        if src.a == 0 {
            return;
        }
        let i = self.offset(x, y);
        let sa = src.a as f64 / 255.0;
        let da = self.data[i + 3] as f64 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        for (k, s) in [src.r, src.g, src.b].into_iter().enumerate() {
            let d = self.data[i + k] as f64;
            let value = (s as f64 * sa + d * da * (1.0 - sa)) / out_a;
            self.data[i + k] = value.round().clamp(0.0, 255.0) as u8;
        }
        self.data[i + 3] = (out_a * 255.0).round() as u8;
    }

    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| RendererError::Encode(e.to_string()))?;
            writer
                .write_image_data(&self.data)
                .map_err(|e| RendererError::Encode(e.to_string()))?;
        }
        Ok(buf)
    }
}

/// A display item with its stroke flattened to line segments.
struct Prepared<'a> {
    item: &'a DisplayItem,
    segments: Vec<(Point, Point)>,
    bounds: Rect,
}

impl<'a> Prepared<'a> {
    fn new(item: &'a DisplayItem, tolerance: f64) -> Self {
        let mut segments = Vec::new();
        if item.stroke.is_some() {
            let (mut start, mut last) = (Point::ZERO, Point::ZERO);
            kurbo::flatten(item.path.iter(), tolerance, |el| match el {
                PathEl::MoveTo(p) => {
                    start = p;
                    last = p;
                }
                PathEl::LineTo(p) => {
                    segments.push((last, p));
                    last = p;
                }
                PathEl::ClosePath => {
                    segments.push((last, start));
                    last = start;
                }
                _ => {}
            });
        }
        Self {
            item,
            segments,
            bounds: item.bounds(),
        }
    }

    /// Paint at a page point, if any.
    fn sample(&self, point: Point) -> Option<Color> {
        if !self.bounds.contains(point) || !admitted(&self.item.clips, point) {
            return None;
        }
        if let Some((color, width)) = self.item.stroke {
            let half = width / 2.0;
            if self
                .segments
                .iter()
                .any(|(a, b)| point_to_segment_dist(point, *a, *b) <= half)
            {
                return Some(color);
            }
        }
        match self.item.fill {
            Some(color) if self.item.path.winding(point) != 0 => Some(color),
            _ => None,
        }
    }
}

fn admitted(clips: &[ClipPath], point: Point) -> bool {
    clips
        .iter()
        .all(|clip| (clip.path.winding(point) != 0) != clip.inverted)
}

/// Whether the pixel span `[px, px + 1)` contains a grid line.
fn crosses_grid(px: u32, scale: f64, grid_size: f64) -> bool {
    let lo = px as f64 / scale;
    let hi = (px + 1) as f64 / scale;
    (lo / grid_size).ceil() * grid_size < hi
}

/// Renders a page into a [`Pixmap`].
#[derive(Debug, Default)]
pub struct RasterRenderer;

impl RasterRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_grid(&self, pixmap: &mut Pixmap, ctx: &RenderContext<'_>) {
        if ctx.grid_style == GridStyle::None || ctx.grid_size <= 0.0 {
            return;
        }
        let color = match ctx.grid_style {
            GridStyle::Dots => Color::from_rgba8(160, 160, 160, 180),
            _ => Color::from_rgba8(200, 200, 200, 100),
        };
        for y in 0..pixmap.height() {
            let on_row = crosses_grid(y, ctx.scale, ctx.grid_size);
            for x in 0..pixmap.width() {
                let on_col = crosses_grid(x, ctx.scale, ctx.grid_size);
                let draw = match ctx.grid_style {
                    GridStyle::Dots => on_row && on_col,
                    _ => on_row || on_col,
                };
                if draw {
                    pixmap.blend(x, y, color);
                }
            }
        }
    }

    fn render_guides(&self, pixmap: &mut Pixmap, ctx: &RenderContext<'_>) {
        for guide in ctx.guides {
            let px = (guide.position * ctx.scale).floor();
            match guide.axis {
                GuideAxis::Vertical if px >= 0.0 && px < pixmap.width() as f64 => {
                    for y in 0..pixmap.height() {
                        pixmap.blend(px as u32, y, ctx.guide_color);
                    }
                }
                GuideAxis::Horizontal if px >= 0.0 && px < pixmap.height() as f64 => {
                    for x in 0..pixmap.width() {
                        pixmap.blend(x, px as u32, ctx.guide_color);
                    }
                }
                _ => {}
            }
        }
    }
}

impl Renderer for RasterRenderer {
    type Output = Pixmap;

    fn render(&mut self, ctx: &RenderContext<'_>) -> RenderResult<Pixmap> {
        if !(ctx.scale.is_finite() && ctx.scale > 0.0) {
            return Err(RendererError::RenderFailed(format!(
                "invalid scale {}",
                ctx.scale
            )));
        }
        let (width, height) = ctx.output_size();
        let mut pixmap = Pixmap::new(width, height, ctx.background_color);

        if ctx.decorations.grid {
            self.render_grid(&mut pixmap, ctx);
        }

        let items = ctx.display_list();
        let tolerance = 0.25 / ctx.scale;
        for prepared in items.iter().map(|item| Prepared::new(item, tolerance)) {
            let b = prepared.bounds;
            let x0 = (b.x0 * ctx.scale).floor().max(0.0) as u32;
            let y0 = (b.y0 * ctx.scale).floor().max(0.0) as u32;
            let x1 = ((b.x1 * ctx.scale).ceil().max(0.0) as u32).min(width);
            let y1 = ((b.y1 * ctx.scale).ceil().max(0.0) as u32).min(height);
            for y in y0..y1 {
                for x in x0..x1 {
                    let point = Point::new(
                        (x as f64 + 0.5) / ctx.scale,
                        (y as f64 + 0.5) / ctx.scale,
                    );
                    if let Some(color) = prepared.sample(point) {
                        pixmap.blend(x, y, color);
                    }
                }
            }
        }

        if ctx.decorations.guides {
            self.render_guides(&mut pixmap, ctx);
        }
        log::trace!("Rasterized {} items at {}x{}", items.len(), width, height);
        Ok(pixmap)
    }
}

/// Captures page previews as PNG data URLs.
#[derive(Debug, Clone)]
pub struct RasterThumbnailer {
    pub max_size: f64,
    pub background: Color,
}

impl Default for RasterThumbnailer {
    fn default() -> Self {
        Self {
            max_size: THUMBNAIL_MAX_SIZE,
            background: Color::from_rgba8(255, 255, 255, 255),
        }
    }
}

impl Thumbnailer for RasterThumbnailer {
    fn capture(&self, request: &ThumbnailRequest<'_>) -> Result<String, ThumbnailError> {
        let size = request.page_size;
        if !(size.width > 0.0 && size.height > 0.0) {
            return Err(ThumbnailError::EmptyPage(size));
        }
        let scale = self.max_size / size.width.max(size.height);
        let ctx = RenderContext::new(request.scene, size)
            .with_scale(scale)
            .with_background(self.background)
            .with_decorations(request.decorations);

        let png = RasterRenderer::new()
            .render(&ctx)
            .and_then(|pixmap| pixmap.encode_png())
            .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use studio_core::document::Decorations;
    use studio_core::scene::Scene;
    use studio_core::shapes::{ClipRegion, Rectangle, SerializableColor, Shape};

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];

    fn red_rect(x: f64, y: f64, w: f64, h: f64) -> Shape {
        let mut r = Rectangle::new(Point::new(x, y), w, h);
        r.style = studio_core::shapes::ShapeStyle::filled(SerializableColor::new(255, 0, 0, 255));
        Shape::Rectangle(r)
    }

    fn render(scene: &Scene, decorations: Decorations) -> Pixmap {
        let ctx =
            RenderContext::new(scene, Size::new(40.0, 40.0)).with_decorations(decorations);
        RasterRenderer::new().render(&ctx).unwrap()
    }

    #[test]
    fn test_fills_shape_interior() {
        let mut scene = Scene::new();
        scene.add(red_rect(10.0, 10.0, 20.0, 20.0));
        let pixmap = render(&scene, Decorations::HIDDEN);
        assert_eq!((pixmap.width(), pixmap.height()), (40, 40));
        assert_eq!(pixmap.pixel(20, 20), RED);
        assert_eq!(pixmap.pixel(5, 5), WHITE);
    }

    #[test]
    fn test_inverted_clip_cuts_a_hole() {
        let mut scene = Scene::new();
        let mut shape = red_rect(0.0, 0.0, 40.0, 40.0);
        let mut region = ClipRegion::new(red_rect(10.0, 10.0, 20.0, 20.0));
        region.inverted = true;
        shape.meta_mut().clip = Some(region);
        scene.add(shape);

        let pixmap = render(&scene, Decorations::HIDDEN);
        assert_eq!(pixmap.pixel(20, 20), WHITE);
        assert_eq!(pixmap.pixel(2, 2), RED);
    }

    #[test]
    fn test_grid_only_when_shown() {
        let scene = Scene::new();
        let shown = render(&scene, Decorations::default());
        let hidden = render(&scene, Decorations::HIDDEN);
        assert_ne!(shown.pixel(20, 5), WHITE);
        assert_eq!(hidden.pixel(20, 5), WHITE);
        assert_eq!(shown.pixel(5, 5), WHITE);
    }

    #[test]
    fn test_dot_grid_marks_only_intersections() {
        let scene = Scene::new();
        let ctx = RenderContext::new(&scene, Size::new(40.0, 40.0))
            .with_decorations(Decorations::default())
            .with_grid(GridStyle::Dots);
        let pixmap = RasterRenderer::new().render(&ctx).unwrap();
        assert_ne!(pixmap.pixel(20, 20), WHITE);
        assert_eq!(pixmap.pixel(20, 5), WHITE);
    }

    #[test]
    fn test_half_transparent_blend() {
        let mut pixmap = Pixmap::new(1, 1, Color::from_rgba8(255, 255, 255, 255));
        pixmap.blend(0, 0, Color::from_rgba8(0, 0, 0, 128));
        let [r, g, b, a] = pixmap.pixel(0, 0);
        assert!((126..=128).contains(&r) && r == g && g == b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_thumbnail_is_png_data_url() {
        let mut scene = Scene::new();
        scene.add(red_rect(0.0, 0.0, 100.0, 100.0));
        let request = ThumbnailRequest {
            scene: &scene,
            page_size: Size::new(800.0, 400.0),
            decorations: Decorations::HIDDEN,
        };
        let url = RasterThumbnailer::default().capture(&request).unwrap();
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR width and height, big endian.
        assert_eq!(&bytes[16..24], &[0, 0, 0, 200, 0, 0, 0, 100]);
    }

    #[test]
    fn test_empty_page_is_rejected() {
        let scene = Scene::new();
        let request = ThumbnailRequest {
            scene: &scene,
            page_size: Size::new(0.0, 100.0),
            decorations: Decorations::HIDDEN,
        };
        assert!(matches!(
            RasterThumbnailer::default().capture(&request),
            Err(ThumbnailError::EmptyPage(_))
        ));
    }
}
