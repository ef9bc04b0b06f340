//! Drawing detections onto the source image

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::domain::detection::{Detection, DetectionError, DetectionRules};
use crate::domain::DomainError;

const FAIL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const OK_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 2;
const CAPTION_FONT_SIZE: f32 = 18.0;
const JPEG_QUALITY: u8 = 90;

/// Draws boxes and, when a font is available, `<label> <conf>` captions
pub struct Annotator {
    font: Option<FontVec>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("captions", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    /// Boxes only
    pub fn without_captions() -> Self {
        Self { font: None }
    }

    /// Load a TTF/OTF font for captions
    pub fn with_font_file(path: &Path) -> Result<Self, DomainError> {
        let data = std::fs::read(path).map_err(|e| {
            DomainError::configuration(format!("Failed to read font {}: {}", path.display(), e))
        })?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            DomainError::configuration(format!("Invalid font {}: {}", path.display(), e))
        })?;
        Ok(Self { font: Some(font) })
    }

    pub fn from_optional_font(path: Option<&Path>) -> Result<Self, DomainError> {
        match path {
            Some(path) => Self::with_font_file(path),
            None => Ok(Self::without_captions()),
        }
    }

    pub fn draw(&self, image: &mut RgbImage, detections: &[Detection], rules: &DetectionRules) {
        for detection in detections {
            let color = if rules.is_fail_label(&detection.label) {
                FAIL_COLOR
            } else {
                OK_COLOR
            };

            let x = detection.x1.floor() as i32;
            let y = detection.y1.floor() as i32;
            let width = (detection.x2 - detection.x1).round() as i32;
            let height = (detection.y2 - detection.y1).round() as i32;

            for inset in 0..BOX_THICKNESS {
                let w = width - 2 * inset;
                let h = height - 2 * inset;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(x + inset, y + inset).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(image, rect, color);
            }

            if let Some(font) = &self.font {
                let caption = format!("{} {:.2}", detection.label, detection.confidence);
                let scale = PxScale::from(CAPTION_FONT_SIZE);
                let (text_w, text_h) = text_size(scale, font, &caption);
                let caption_y = (y - text_h as i32 - 2).max(0);

                if text_w > 0 && text_h > 0 {
                    let background = Rect::at(x.max(0), caption_y).of_size(text_w + 4, text_h + 2);
                    draw_filled_rect_mut(image, background, color);
                }
                draw_text_mut(image, TEXT_COLOR, x.max(0) + 2, caption_y, scale, font, &caption);
            }
        }
    }
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, DetectionError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    image
        .write_with_encoder(encoder)
        .map_err(|e| DetectionError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}
