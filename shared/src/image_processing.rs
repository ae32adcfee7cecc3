use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::config::PlaceholderConfig;

pub const MAX_PLACEHOLDER_DIMENSION: u32 = 2048;
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SCALE: u32 = 2;
const GLYPH_ADVANCE: u32 = (GLYPH_WIDTH + 1) * GLYPH_SCALE;
/// Layouts are authored against this canvas height and scaled from it.
const REFERENCE_HEIGHT: u32 = 200;

/// 1×1 transparent PNG, used only if the encoder itself fails.
const FALLBACK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error("png encoding failed: width={width}, height={height}, reason={reason}")]
    PngEncode {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("invalid placeholder colour: {0}")]
    Colour(#[from] crate::config::ConfigError),
}

/// Where an upload image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    EnteredUrl,
    StoredPicture,
    Placeholder,
}

/// A file-like image ready to be attached to a multipart upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub file_name: String,
    pub media_type: String,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
    pub source: ImageSource,
}

impl ImagePayload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Wraps bytes fetched from `url`. Returns `None` for an empty body.
    ///
    /// `response_type` wins when it names an image type; otherwise the media
    /// type is derived from the URL's file extension.
    pub fn from_fetched(
        url: &Url,
        bytes: Vec<u8>,
        response_type: Option<&str>,
        file_stem: &str,
        source: ImageSource,
    ) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let extension = url_extension(url);
        let media_type = response_type
            .map(str::to_string)
            .unwrap_or_else(|| media_type_for_extension(&extension));
        Some(Self {
            file_name: format!("{file_stem}.{extension}"),
            media_type,
            bytes,
            source,
        })
    }
}

// Keep image bytes out of logs.
impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .field("source", &self.source)
            .finish()
    }
}

/// The text drawn onto a placeholder and where, as `(line, baseline)` pairs
/// on a 200px-high canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderLabel {
    pub file_name: &'static str,
    pub lines: &'static [(&'static str, u32)],
}

impl PlaceholderLabel {
    pub const NO_IMAGE: Self = Self {
        file_name: "default.png",
        lines: &[("No Image", 100)],
    };

    pub const REPLACEMENT_USER: Self = Self {
        file_name: "placeholder.png",
        lines: &[("Replacement", 90), ("User", 120)],
    };

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|(line, _)| *line)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builds a solid-fill PNG with `label` drawn across it. Never fails: a bad
/// config falls back to the defaults, and a failing encoder falls back to a
/// fixed 1×1 image.
pub fn placeholder_image(config: &PlaceholderConfig, label: PlaceholderLabel) -> ImagePayload {
    let bytes = render_placeholder(config, label)
        .or_else(|e| {
            warn!(error = %e, "placeholder config rejected, using defaults");
            render_placeholder(&PlaceholderConfig::default(), label)
        })
        .unwrap_or_else(|e| {
            error!(error = %e, "placeholder encoding failed");
            FALLBACK_PNG.to_vec()
        });

    ImagePayload {
        file_name: label.file_name.to_string(),
        media_type: "image/png".to_string(),
        bytes,
        source: ImageSource::Placeholder,
    }
}

fn render_placeholder(
    config: &PlaceholderConfig,
    label: PlaceholderLabel,
) -> Result<Vec<u8>, PlaceholderError> {
    let width = config.width.clamp(1, MAX_PLACEHOLDER_DIMENSION);
    let height = config.height.clamp(1, MAX_PLACEHOLDER_DIMENSION);
    let fill = Rgb(config.fill_rgb()?);
    let ink = Rgb(config.ink_rgb()?);

    let mut canvas = RgbImage::from_pixel(width, height, fill);
    for (line, baseline) in label.lines {
        let baseline = baseline * height / REFERENCE_HEIGHT;
        draw_line(&mut canvas, line, baseline, ink);
    }

    encode_png(&canvas)
}

/// Draws `text` horizontally centred with its bottom edge on `baseline`.
fn draw_line(canvas: &mut RgbImage, text: &str, baseline: u32, ink: Rgb<u8>) {
    let glyph_count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    let line_width = glyph_count
        .saturating_mul(GLYPH_ADVANCE)
        .saturating_sub(GLYPH_SCALE);
    let left = canvas.width().saturating_sub(line_width) / 2;
    let top = baseline.saturating_sub(GLYPH_HEIGHT * GLYPH_SCALE);

    for (index, c) in (0u32..).zip(text.chars()) {
        let Some(rows) = glyph(c) else { continue };
        let origin_x = left + index * GLYPH_ADVANCE;
        for (row, bits) in (0u32..).zip(rows.iter()) {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..GLYPH_SCALE {
                    for dx in 0..GLYPH_SCALE {
                        let x = origin_x + col * GLYPH_SCALE + dx;
                        let y = top + row * GLYPH_SCALE + dy;
                        if x < canvas.width() && y < canvas.height() {
                            canvas.put_pixel(x, y, ink);
                        }
                    }
                }
            }
        }
    }
}

fn encode_png(canvas: &RgbImage) -> Result<Vec<u8>, PlaceholderError> {
    let (width, height) = canvas.dimensions();
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(canvas.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| PlaceholderError::PngEncode {
            width,
            height,
            reason: e.to_string(),
        })?;
    Ok(buffer)
}

/// 5×7 bitmap glyphs; letters render in upper case, anything else is blank.
fn glyph(c: char) -> Option<&'static [u8; 7]> {
    static GLYPHS: [[u8; 7]; 26] = [
        [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
    ];

    let upper = c.to_ascii_uppercase();
    if !upper.is_ascii_uppercase() {
        return None;
    }
    GLYPHS.get(usize::from(upper as u8 - b'A'))
}

/// File extension of the last path segment of `url`, lower-cased, or
/// [`DEFAULT_IMAGE_EXTENSION`] when there is none.
pub fn url_extension(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(Iterator::last)
        .unwrap_or_default();

    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_IMAGE_EXTENSION.to_string(),
    }
}

pub fn media_type_for_extension(extension: &str) -> String {
    match extension {
        "jpg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn placeholder_is_a_decodable_png_of_configured_size() {
        let payload = placeholder_image(&PlaceholderConfig::default(), PlaceholderLabel::NO_IMAGE);

        assert_eq!(payload.file_name, "default.png");
        assert_eq!(payload.media_type, "image/png");
        assert_eq!(payload.source, ImageSource::Placeholder);
        let decoded = image::load_from_memory(&payload.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (200, 200));
    }

    #[test]
    fn placeholder_has_fill_and_label_ink() {
        let config = PlaceholderConfig::default();
        let payload = placeholder_image(&config, PlaceholderLabel::REPLACEMENT_USER);
        let decoded = image::load_from_memory(&payload.bytes).unwrap().to_rgb8();

        assert_eq!(decoded.get_pixel(0, 0), &Rgb([0xe9, 0xec, 0xef]));
        let inked = decoded
            .pixels()
            .filter(|p| **p == Rgb([0x6c, 0x75, 0x7d]))
            .count();
        assert!(inked > 0, "label should leave ink on the canvas");
        assert_eq!(payload.file_name, "placeholder.png");
    }

    #[test]
    fn placeholder_survives_bad_config() {
        let config = PlaceholderConfig {
            width: 0,
            height: 50_000,
            fill: "not-a-colour".into(),
            ..PlaceholderConfig::default()
        };
        let payload = placeholder_image(&config, PlaceholderLabel::NO_IMAGE);
        let decoded = image::load_from_memory(&payload.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (200, 200));
    }

    #[test]
    fn placeholder_clamps_dimensions() {
        let config = PlaceholderConfig {
            width: 0,
            height: 10,
            ..PlaceholderConfig::default()
        };
        let payload = placeholder_image(&config, PlaceholderLabel::NO_IMAGE);
        let decoded = image::load_from_memory(&payload.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (1, 10));
    }

    #[test]
    fn fallback_png_has_signature() {
        assert_eq!(&FALLBACK_PNG[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn label_text_joins_lines() {
        assert_eq!(PlaceholderLabel::REPLACEMENT_USER.text(), "Replacement User");
        assert_eq!(PlaceholderLabel::NO_IMAGE.text(), "No Image");
    }

    #[test]
    fn extension_from_url() {
        let extension = |raw: &str| url_extension(&Url::parse(raw).unwrap());
        assert_eq!(extension("https://cdn.example.com/a/photo.JPG"), "jpg");
        assert_eq!(extension("https://cdn.example.com/p.webp?size=2#x"), "webp");
        assert_eq!(extension("https://cdn.example.com/dir.png/avatar"), "png");
        assert_eq!(extension("https://cdn.example.com"), "png");
        assert_eq!(extension("https://cdn.example.com/.hidden"), "png");
        assert_eq!(extension("https://cdn.example.com/a.b-c"), "png");
    }

    #[test]
    fn media_type_normalises_jpg() {
        assert_eq!(media_type_for_extension("jpg"), "image/jpeg");
        assert_eq!(media_type_for_extension("jpeg"), "image/jpeg");
        assert_eq!(media_type_for_extension("png"), "image/png");
    }

    #[test]
    fn fetched_payload_prefers_response_type() {
        let url = Url::parse("https://x.example/pic.jpg").unwrap();
        let payload = ImagePayload::from_fetched(
            &url,
            vec![1, 2],
            Some("image/webp"),
            "image",
            ImageSource::EnteredUrl,
        )
        .unwrap();
        assert_eq!(payload.media_type, "image/webp");
        assert_eq!(payload.file_name, "image.jpg");

        let payload = ImagePayload::from_fetched(
            &url,
            vec![1, 2],
            None,
            "existing-image",
            ImageSource::StoredPicture,
        )
        .unwrap();
        assert_eq!(payload.media_type, "image/jpeg");
        assert_eq!(payload.file_name, "existing-image.jpg");
    }

    #[test]
    fn fetched_payload_rejects_empty_body() {
        assert!(ImagePayload::from_fetched(
            &Url::parse("https://x.example/pic.png").unwrap(),
            Vec::new(),
            None,
            "image",
            ImageSource::EnteredUrl,
        )
        .is_none());
    }

    #[test]
    fn payload_debug_hides_bytes() {
        let payload = placeholder_image(&PlaceholderConfig::default(), PlaceholderLabel::NO_IMAGE);
        let debug = format!("{payload:?}");
        assert!(debug.contains("len"));
        assert!(!debug.contains("bytes"));
    }
}
