//! Thumbnail capture contract used by saves.
//!
//! Rendering lives outside this crate; saves only need something that can
//! turn a scene into a data URL.

use crate::document::Decorations;
use crate::scene::Scene;
use kurbo::Size;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("nothing to render: page is {0:?}")]
    EmptyPage(Size),
    #[error("encoding failed: {0}")]
    Encode(String),
}

pub struct ThumbnailRequest<'a> {
    pub scene: &'a Scene,
    pub page_size: Size,
    /// Which editor decorations are visible at capture time.
    pub decorations: Decorations,
}

pub trait Thumbnailer {
    /// Render a small preview and return it as a `data:` URL.
    fn capture(&self, request: &ThumbnailRequest<'_>) -> Result<String, ThumbnailError>;
}
