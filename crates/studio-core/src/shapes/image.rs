//! Raster image placed on a page.

use super::{AssetError, AssetResult, ShapeId, ShapeMeta, ShapeStyle, ShapeTrait};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image format for embedded image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        // RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }

    fn decoder_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

/// Where the pixels come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Remote or data URL, resolved by the host.
    Url { url: String },
    /// Bytes embedded in the document.
    Embedded {
        format: ImageFormat,
        data_base64: String,
    },
}

/// Adjustment filters, each in `[-1, 1]` except `blur` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageFilters {
    #[serde(default)]
    pub brightness: f64,
    #[serde(default)]
    pub contrast: f64,
    #[serde(default)]
    pub saturation: f64,
    #[serde(default)]
    pub blur: f64,
}

impl ImageFilters {
    pub fn clamped(self) -> Self {
        Self {
            brightness: self.brightness.clamp(-1.0, 1.0),
            contrast: self.contrast.clamp(-1.0, 1.0),
            saturation: self.saturation.clamp(-1.0, 1.0),
            blur: self.blur.clamp(0.0, 1.0),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Intrinsic pixel size, when known.
    #[serde(default)]
    pub source_size: Option<(u32, u32)>,
    pub source: ImageSource,
    #[serde(default)]
    pub filters: ImageFilters,
    #[serde(default)]
    pub rotation: f64,
    /// Stroke draws an optional border.
    pub style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Image {
    /// An image referenced by URL and displayed at the given size.
    pub fn from_url(position: Point, url: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            source_size: None,
            source: ImageSource::Url { url: url.into() },
            filters: ImageFilters::default(),
            rotation: 0.0,
            style: ShapeStyle {
                stroke_width: 0.0,
                ..ShapeStyle::default()
            },
            meta: ShapeMeta::default(),
        }
    }

    /// Sniff and decode uploaded bytes, embedding them at their pixel size.
    pub fn from_bytes(position: Point, data: &[u8]) -> AssetResult<Self> {
        let format = ImageFormat::from_magic_bytes(data).ok_or(AssetError::UnsupportedFormat)?;
        let decoded = image::load_from_memory_with_format(data, format.decoder_format())
            .map_err(|e| AssetError::Decode(e.to_string()))?;
        let (w, h) = (decoded.width(), decoded.height());
        log::debug!("Imported {:?} image {}x{}", format, w, h);

        let mut img = Self::from_url(position, String::new(), w as f64, h as f64);
        img.source_size = Some((w, h));
        img.source = ImageSource::Embedded {
            format,
            data_base64: STANDARD.encode(data),
        };
        Ok(img)
    }

    /// Scale to fit within max dimensions while preserving aspect ratio.
    pub fn fit_within(mut self, max_width: f64, max_height: f64) -> Self {
        if self.width <= 0.0 || self.height <= 0.0 {
            return self;
        }
        let aspect = self.width / self.height;
        if aspect > max_width / max_height {
            self.width = max_width;
            self.height = max_width / aspect;
        } else {
            self.height = max_height;
            self.width = max_height * aspect;
        }
        self
    }

    /// Raw embedded bytes, if any.
    pub fn data(&self) -> Option<Vec<u8>> {
        match &self.source {
            ImageSource::Embedded { data_base64, .. } => STANDARD.decode(data_base64).ok(),
            ImageSource::Url { .. } => None,
        }
    }

    /// URL suitable for an `<img>`-style consumer.
    pub fn href(&self) -> String {
        match &self.source {
            ImageSource::Url { url } => url.clone(),
            ImageSource::Embedded {
                format,
                data_base64,
            } => format!("data:{};base64,{}", format.mime_type(), data_base64),
        }
    }

    pub fn set_filters(&mut self, filters: ImageFilters) {
        self.filters = filters.clamped();
    }

    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

impl ShapeTrait for Image {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.as_rect().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
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
        let rect = affine.transform_rect_bbox(self.as_rect());
        self.position = rect.origin();
        self.width = rect.width();
        self.height = rect.height();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let mut out = Vec::new();
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("gif"), None);
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), None);
    }

    #[test]
    fn test_from_bytes_decodes_dimensions() {
        let img = Image::from_bytes(Point::new(5.0, 5.0), &tiny_png()).unwrap();
        assert_eq!(img.source_size, Some((3, 2)));
        assert_eq!(img.bounds(), Rect::new(5.0, 5.0, 8.0, 7.0));
        assert!(img.href().starts_with("data:image/png;base64,"));
        assert_eq!(img.data(), Some(tiny_png()));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            Image::from_bytes(Point::ZERO, b"not an image"),
            Err(AssetError::UnsupportedFormat)
        ));
        let mut truncated = tiny_png();
        truncated.truncate(12);
        assert!(matches!(
            Image::from_bytes(Point::ZERO, &truncated),
            Err(AssetError::Decode(_))
        ));
    }

    #[test]
    fn test_fit_within() {
        let img = Image::from_url(Point::ZERO, "https://example.com/a.png", 1000.0, 500.0);
        let fitted = img.fit_within(400.0, 400.0);
        assert!((fitted.width - 400.0).abs() < 0.01);
        assert!((fitted.height - 200.0).abs() < 0.01);
    }

    #[test]
    fn test_filters_are_clamped() {
        let mut img = Image::from_url(Point::ZERO, "u", 10.0, 10.0);
        img.set_filters(ImageFilters {
            brightness: 2.0,
            contrast: -3.0,
            saturation: 0.5,
            blur: -1.0,
        });
        assert_eq!(img.filters.brightness, 1.0);
        assert_eq!(img.filters.contrast, -1.0);
        assert_eq!(img.filters.saturation, 0.5);
        assert_eq!(img.filters.blur, 0.0);
    }
}
