//! Image preprocessing for YOLO-style detectors
//!
//! Images are letterboxed: scaled to fit a square input while preserving the
//! aspect ratio, then centered on a gray canvas.

use image::{imageops, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Gray used for letterbox padding
pub const PAD_VALUE: u8 = 114;

/// Geometry of a letterbox transform, used to map boxes back to the source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    pub fn new(source_width: u32, source_height: u32, target: u32) -> Self {
        if source_width == 0 || source_height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                source_width,
                source_height,
            };
        }

        let scale = (target as f32 / source_width as f32).min(target as f32 / source_height as f32);
        let (new_w, new_h) = scaled_size(source_width, source_height, scale);

        Self {
            scale,
            pad_x: ((target - new_w) / 2) as f32,
            pad_y: ((target - new_h) / 2) as f32,
            source_width,
            source_height,
        }
    }

    /// Map a point in model input space back to source pixels, clamped to the image
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        let sx = (x - self.pad_x) / self.scale;
        let sy = (y - self.pad_y) / self.scale;
        (
            sx.clamp(0.0, self.source_width as f32),
            sy.clamp(0.0, self.source_height as f32),
        )
    }
}

fn scaled_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
    (
        ((width as f32 * scale).round() as u32).max(1),
        ((height as f32 * scale).round() as u32).max(1),
    )
}

/// Resize `image` into a `target` x `target` canvas
pub fn letterbox(image: &DynamicImage, target: u32) -> (RgbImage, Letterbox) {
    let (width, height) = image.dimensions();
    let geometry = Letterbox::new(width, height, target);
    let mut canvas = RgbImage::from_pixel(target, target, Rgb([PAD_VALUE; 3]));

    if width == 0 || height == 0 {
        return (canvas, geometry);
    }

    let (new_w, new_h) = scaled_size(width, height, geometry.scale);
    let resized = imageops::resize(&image.to_rgb8(), new_w, new_h, imageops::FilterType::Triangle);
    imageops::replace(
        &mut canvas,
        &resized,
        geometry.pad_x as i64,
        geometry.pad_y as i64,
    );

    (canvas, geometry)
}

/// Convert an RGB image to a normalized `[1, 3, H, W]` tensor
pub fn to_nchw_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_wide_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1280, 640, Rgb([255, 0, 0])));
        let (canvas, geometry) = letterbox(&img, 640);

        assert_eq!(canvas.dimensions(), (640, 640));
        assert_eq!(geometry.scale, 0.5);
        assert_eq!(geometry.pad_x, 0.0);
        assert_eq!(geometry.pad_y, 160.0);

        // Padding above, content in the middle
        assert_eq!(canvas.get_pixel(320, 10), &Rgb([PAD_VALUE; 3]));
        let center = canvas.get_pixel(320, 320);
        assert!(center[0] > 250 && center[1] < 5 && center[2] < 5);
    }

    #[test]
    fn test_letterbox_tall_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(300, 600));
        let (_, geometry) = letterbox(&img, 640);

        assert!((geometry.scale - 640.0 / 600.0).abs() < 1e-6);
        assert_eq!(geometry.pad_y, 0.0);
        assert_eq!(geometry.pad_x, 160.0);
    }

    #[test]
    fn test_to_source_inverts_letterbox() {
        let geometry = Letterbox::new(1280, 640, 640);

        let (x, y) = geometry.to_source(320.0, 320.0);
        assert!((x - 640.0).abs() < 1e-3);
        assert!((y - 320.0).abs() < 1e-3);

        // Points in the padding clamp to the image edge
        assert_eq!(geometry.to_source(0.0, 0.0), (0.0, 0.0));
        assert_eq!(geometry.to_source(640.0, 640.0), (1280.0, 640.0));
    }

    #[test]
    fn test_tensor_shape_and_normalization() {
        let img = RgbImage::from_pixel(4, 2, Rgb([255, 0, 51]));
        let tensor = to_nchw_tensor(&img);

        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        assert_eq!(tensor[[0, 0, 1, 3]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 0]], 0.0);
        assert!((tensor[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
    }
}
