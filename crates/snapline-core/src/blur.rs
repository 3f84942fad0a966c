//! Optional Gaussian pre-smoothing.
//!
//! Noisy images produce many tiny gradients that the path happily
//! zig-zags through. A light blur before energy computation keeps the
//! boundary on the dominant edge.

use image::GrayImage;

/// Largest sigma applied. The kernel spans about `6 * sigma` taps, so
/// anything wider than this only costs time.
pub const MAX_SIGMA: f32 = 64.0;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive and NaN sigma values return the image unchanged, since
/// `imageproc` panics on `sigma <= 0.0`. Larger values, infinity
/// included, are clamped to [`MAX_SIGMA`].
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma.is_nan() || sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma.min(MAX_SIGMA))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn zero_sigma_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur(&img, 0.0), img);
        assert_eq!(gaussian_blur(&img, -2.0), img);
        assert_eq!(gaussian_blur(&img, f32::NAN), img);
    }

    #[test]
    fn oversized_sigma_is_clamped() {
        let img = sharp_edge_image();
        let widest = gaussian_blur(&img, MAX_SIGMA);
        assert_eq!(gaussian_blur(&img, f32::INFINITY), widest);
        assert_eq!(gaussian_blur(&img, 1e30), widest);
    }

    #[test]
    fn blur_softens_the_boundary() {
        let img = sharp_edge_image();
        let blurred = gaussian_blur(&img, 1.5);
        let left = blurred.get_pixel(4, 5).0[0];
        let right = blurred.get_pixel(5, 5).0[0];
        assert!(left > 0, "expected dark side to brighten, got {left}");
        assert!(right < 255, "expected bright side to darken, got {right}");
    }
}
