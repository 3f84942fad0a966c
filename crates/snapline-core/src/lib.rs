//! snapline-core: Intelligent-scissors boundary tracing (sans-IO).
//!
//! Traces an object boundary through user-placed anchor points by
//! running Dijkstra's algorithm over the image's pixel lattice, with
//! edges made cheap where the image gradient is strong:
//!
//! grayscale -> optional blur -> energy -> weighted graph ->
//! per-anchor-pair shortest paths -> stitched boundary.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and images and returns structured data. File handling
//! lives in the `snapline` CLI.
//!
//! For interactive use see [`session::Tracer`], which keeps the search
//! from the last anchor alive while the cursor moves.

pub mod blur;
pub mod diagnostics;
pub mod energy;
pub mod graph;
pub mod grayscale;
pub mod mask;
pub mod search;
pub mod session;
pub mod types;

use std::borrow::Cow;

pub use energy::{Energy, EnergyField, EnergyKind, GradientEnergy};
pub use graph::{GraphConfig, WeightedGridGraph};
pub use search::{PathEngine, SearchOutcome, SearchStats, Stitched};
pub use session::Tracer;
pub use types::{
    Coord, Dimensions, GrayImage, Path, RgbaImage, SnaplineError, TraceConfig, TraceResult,
};

/// Trace a boundary through `anchors` on an encoded image.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and returns the stitched
/// boundary together with the image dimensions, which export serializers
/// need for their coordinate space (e.g. SVG `viewBox`).
///
/// # Steps
///
/// 1. Decode image and convert to grayscale
/// 2. Optional Gaussian blur
/// 3. Per-pixel energy ([`TraceConfig::energy`])
/// 4. Weighted graph construction
/// 5. Shortest path per consecutive anchor pair, stitched
///
/// Fewer than two anchors give an empty path. An anchor pair whose
/// segment is unreachable is skipped and its index reported in
/// [`TraceResult::gaps`].
///
/// # Errors
///
/// Returns [`SnaplineError::InvalidConfig`] if `config` fails validation.
/// Returns [`SnaplineError::NotClosable`] if `config.close` is set with
/// fewer than three anchors.
/// Returns [`SnaplineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`SnaplineError::ImageDecode`] if the image cannot be decoded.
/// Returns [`SnaplineError::EmptyImage`] if the image has no pixels.
/// Returns [`SnaplineError::OutOfRange`] if an anchor lies outside the
/// image.
pub fn trace(
    image_bytes: &[u8],
    anchors: &[Coord],
    config: &TraceConfig,
) -> Result<TraceResult, SnaplineError> {
    config.validate()?;
    boundary_anchors(anchors, config.close)?;
    let gray = grayscale::decode_and_grayscale(image_bytes)?;
    trace_image(&gray, anchors, config)
}

/// Trace a boundary through `anchors` on an already decoded grayscale
/// image.
///
/// # Errors
///
/// Same as [`trace`], minus the decoding errors.
pub fn trace_image(
    image: &GrayImage,
    anchors: &[Coord],
    config: &TraceConfig,
) -> Result<TraceResult, SnaplineError> {
    config.validate()?;
    let route = boundary_anchors(anchors, config.close)?;

    let blurred = blur::gaussian_blur(image, config.blur_sigma);
    let field = config.energy.compute(&blurred);
    let graph = WeightedGridGraph::construct(&field, &config.graph)?;
    let stitched = PathEngine::new(&graph).stitch_anchors_detailed(&route)?;

    Ok(TraceResult {
        path: stitched.path,
        gaps: stitched.gaps,
        dimensions: graph.dimensions(),
    })
}

/// Anchors to search through: `anchors` as given, or with the first
/// anchor appended when closing.
pub(crate) fn boundary_anchors(
    anchors: &[Coord],
    close: bool,
) -> Result<Cow<'_, [Coord]>, SnaplineError> {
    if !close {
        return Ok(Cow::Borrowed(anchors));
    }
    match anchors {
        [first, _, _, ..] => {
            let mut route = anchors.to_vec();
            route.push(*first);
            Ok(Cow::Owned(route))
        }
        _ => Err(SnaplineError::NotClosable(anchors.len())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Dark square (value 30) on a light background (value 220).
    fn square_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                image::Luma([30])
            } else {
                image::Luma([220])
            }
        })
    }

    fn encode_png(img: &GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn boundary_anchors_appends_first_when_closing() {
        let a = [Coord::new(0, 0), Coord::new(1, 0), Coord::new(1, 1)];
        assert_eq!(boundary_anchors(&a, false).unwrap().as_ref(), &a);
        let closed = boundary_anchors(&a, true).unwrap();
        assert_eq!(closed.len(), 4);
        assert_eq!(closed[3], a[0]);
        assert!(matches!(
            boundary_anchors(&a[..2], true),
            Err(SnaplineError::NotClosable(2))
        ));
    }

    /// Flat image with one row of alternating intensities: every
    /// horizontal step along that row crosses a strong gradient.
    fn ridge_image(width: u32, height: u32, row: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if y != row {
                image::Luma([100])
            } else if x % 2 == 0 {
                image::Luma([0])
            } else {
                image::Luma([200])
            }
        })
    }

    #[test]
    fn trace_stays_on_the_ridge() {
        let anchors = [Coord::new(0, 4), Coord::new(19, 4)];
        let result = trace_image(&ridge_image(20, 9, 4), &anchors, &TraceConfig::default()).unwrap();

        assert!(result.gaps.is_empty());
        assert_eq!(result.dimensions, Dimensions { width: 20, height: 9 });
        assert_eq!(result.path.len(), 20);
        assert!(
            result.path.coords().iter().all(|c| c.y == 4),
            "path left the ridge: {:?}",
            result.path
        );
    }

    #[test]
    fn closed_trace_returns_to_start() {
        let anchors = [Coord::new(4, 4), Coord::new(14, 4), Coord::new(14, 14), Coord::new(4, 14)];
        let config = TraceConfig {
            close: true,
            ..TraceConfig::default()
        };
        let result = trace_image(&square_image(), &anchors, &config).unwrap();
        assert!(result.path.is_closed());
        assert!(result.path.is_connected());
    }

    #[test]
    fn bytes_and_image_entry_points_agree() {
        let img = square_image();
        let anchors = [Coord::new(4, 4), Coord::new(14, 14)];
        let config = TraceConfig {
            blur_sigma: 1.0,
            energy: EnergyKind::Sobel,
            ..TraceConfig::default()
        };
        let from_bytes = trace(&encode_png(&img), &anchors, &config).unwrap();
        let from_image = trace_image(&img, &anchors, &config).unwrap();
        assert_eq!(from_bytes, from_image);
    }

    #[test]
    fn fewer_than_two_anchors_is_empty() {
        let img = square_image();
        for anchors in [&[][..], &[Coord::new(3, 3)][..]] {
            let result = trace_image(&img, anchors, &TraceConfig::default()).unwrap();
            assert!(result.path.is_empty());
            assert!(result.gaps.is_empty());
        }
    }

    #[test]
    fn out_of_range_anchor_is_an_error() {
        let anchors = [Coord::new(0, 0), Coord::new(20, 3)];
        let err = trace_image(&square_image(), &anchors, &TraceConfig::default()).unwrap_err();
        assert!(matches!(err, SnaplineError::OutOfRange { .. }));
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let config = TraceConfig {
            blur_sigma: -1.0,
            ..TraceConfig::default()
        };
        let err = trace(&[], &[], &config).unwrap_err();
        assert!(matches!(err, SnaplineError::InvalidConfig(_)));
    }

    #[test]
    fn infinite_blur_is_rejected_not_applied() {
        let config = TraceConfig {
            blur_sigma: f32::INFINITY,
            ..TraceConfig::default()
        };
        let anchors = [Coord::new(4, 4), Coord::new(14, 4)];
        let err = trace_image(&square_image(), &anchors, &config).unwrap_err();
        assert!(matches!(err, SnaplineError::InvalidConfig(_)));
    }

    #[test]
    fn closing_with_two_anchors_fails() {
        let config = TraceConfig {
            close: true,
            ..TraceConfig::default()
        };
        let anchors = [Coord::new(4, 4), Coord::new(14, 4)];
        let err = trace(&encode_png(&square_image()), &anchors, &config).unwrap_err();
        assert!(matches!(err, SnaplineError::NotClosable(2)));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        let err = trace(&[], &[], &TraceConfig::default()).unwrap_err();
        assert!(matches!(err, SnaplineError::EmptyInput));
    }
}
