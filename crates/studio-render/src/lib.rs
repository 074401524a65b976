//! Studio Render Library
//!
//! Display lists for the Studio canvas and a CPU rasterizer that produces
//! document thumbnails.

mod raster;
mod renderer;

pub use raster::{Pixmap, RasterRenderer, RasterThumbnailer, THUMBNAIL_MAX_SIZE};
pub use renderer::{
    ClipPath, DisplayItem, GridStyle, RenderContext, RenderResult, Renderer, RendererError,
    build_display_list,
};
