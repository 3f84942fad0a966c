//! Selection mask: turn a traced boundary into a pixel selection.
//!
//! The boundary is treated as a polygon over pixel centres. Its interior
//! is filled with `imageproc`'s polygon rasteriser and the boundary
//! pixels themselves are always part of the selection, so a thin
//! boundary never loses its own outline to rounding.

use image::imageops;
use image::{GrayImage, Luma, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::types::{Coord, Dimensions, Path};

/// Mask value for selected pixels.
pub const SELECTED: u8 = 255;

/// Rasterise `path` into a `dimensions`-sized mask.
///
/// Selected pixels are [`SELECTED`], everything else is 0. The polygon is
/// implicitly closed from the last coordinate back to the first, so an
/// open boundary selects the region its chord would enclose. Coordinates
/// outside `dimensions` are clipped.
#[must_use = "returns the selection mask"]
pub fn selection_mask(path: &Path, dimensions: Dimensions) -> GrayImage {
    let mut mask = GrayImage::new(dimensions.width, dimensions.height);
    if dimensions.is_empty() {
        return mask;
    }

    let polygon = polygon_points(path.coords());
    // The rasteriser rejects fewer than three vertices and a repeated
    // closing vertex.
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, &polygon, Luma([SELECTED]));
    }

    for &c in path.coords() {
        if dimensions.contains(c) {
            mask.put_pixel(c.x, c.y, Luma([SELECTED]));
        }
    }
    mask
}

/// Crop `image` to the bounding box of `path`, with every pixel outside
/// the selection made fully transparent.
///
/// Returns `None` if `path` is empty or lies entirely outside the image.
#[must_use = "returns the cropped selection"]
pub fn crop_to_selection(image: &RgbaImage, path: &Path) -> Option<RgbaImage> {
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    let (min, max) = bounding_box(path, dimensions)?;
    let mask = selection_mask(path, dimensions);

    let width = max.x - min.x + 1;
    let height = max.y - min.y + 1;
    let mut cropped = imageops::crop_imm(image, min.x, min.y, width, height).to_image();
    for (x, y, pixel) in cropped.enumerate_pixels_mut() {
        if mask.get_pixel(min.x + x, min.y + y).0[0] != SELECTED {
            pixel.0[3] = 0;
        }
    }
    Some(cropped)
}

/// Inclusive bounding box of the in-range coordinates of `path`.
fn bounding_box(path: &Path, dimensions: Dimensions) -> Option<(Coord, Coord)> {
    let mut inside = path.coords().iter().filter(|c| dimensions.contains(**c));
    let first = *inside.next()?;
    Some(inside.fold((first, first), |(lo, hi), c| {
        (
            Coord::new(lo.x.min(c.x), lo.y.min(c.y)),
            Coord::new(hi.x.max(c.x), hi.y.max(c.y)),
        )
    }))
}

/// Polygon vertices for the rasteriser: consecutive duplicates and the
/// closing vertex removed.
fn polygon_points(coords: &[Coord]) -> Vec<Point<i32>> {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(coords.len());
    for c in coords {
        let (Ok(x), Ok(y)) = (i32::try_from(c.x), i32::try_from(c.y)) else {
            continue;
        };
        let p = Point::new(x, y);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Connected boundary of the square `[lo, hi] x [lo, hi]`, closed.
    fn square(lo: u32, hi: u32) -> Path {
        let mut coords = Vec::new();
        coords.extend((lo..hi).map(|x| Coord::new(x, lo)));
        coords.extend((lo..hi).map(|y| Coord::new(hi, y)));
        coords.extend((lo + 1..=hi).rev().map(|x| Coord::new(x, hi)));
        coords.extend((lo + 1..=hi).rev().map(|y| Coord::new(lo, y)));
        coords.push(Coord::new(lo, lo));
        Path::new(coords)
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn square_fixture_is_a_closed_boundary() {
        let path = square(2, 6);
        assert!(path.is_closed());
        assert!(path.is_connected());
    }

    #[test]
    fn square_selects_interior_and_outline() {
        let mask = selection_mask(&square(2, 6), dims(10, 10));
        assert_eq!(mask.dimensions(), (10, 10));
        assert_eq!(mask.get_pixel(4, 4).0[0], SELECTED);
        assert_eq!(mask.get_pixel(2, 2).0[0], SELECTED);
        assert_eq!(mask.get_pixel(6, 3).0[0], SELECTED);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(8, 8).0[0], 0);
        assert_eq!(mask.get_pixel(4, 7).0[0], 0);
    }

    #[test]
    fn short_paths_select_only_their_pixels() {
        let path = Path::new(vec![Coord::new(1, 1), Coord::new(2, 1)]);
        let mask = selection_mask(&path, dims(4, 4));
        let selected = mask.pixels().filter(|p| p.0[0] == SELECTED).count();
        assert_eq!(selected, 2);

        let empty = selection_mask(&Path::default(), dims(4, 4));
        assert!(empty.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn out_of_range_coordinates_are_clipped() {
        let path = Path::new(vec![Coord::new(0, 0), Coord::new(9, 9)]);
        let mask = selection_mask(&path, dims(3, 3));
        assert_eq!(mask.get_pixel(0, 0).0[0], SELECTED);
        assert_eq!(mask.pixels().filter(|p| p.0[0] == SELECTED).count(), 1);
    }

    #[test]
    fn polygon_points_drop_repeats() {
        let coords = [
            Coord::new(0, 0),
            Coord::new(0, 0),
            Coord::new(3, 0),
            Coord::new(0, 3),
            Coord::new(0, 0),
        ];
        let points = polygon_points(&coords);
        assert_eq!(
            points,
            vec![Point::new(0, 0), Point::new(3, 0), Point::new(0, 3)]
        );
    }

    #[test]
    fn crop_covers_the_bounding_box() {
        let image = RgbaImage::from_pixel(10, 10, image::Rgba([200, 10, 10, 255]));
        let cropped = crop_to_selection(&image, &square(2, 6)).unwrap();
        assert_eq!(cropped.dimensions(), (5, 5));
        assert_eq!(cropped.get_pixel(2, 2).0, [200, 10, 10, 255]);
        assert_eq!(cropped.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn crop_clears_pixels_outside_the_selection() {
        let image = RgbaImage::from_pixel(10, 10, image::Rgba([0, 0, 255, 255]));
        let triangle = Path::new(vec![
            Coord::new(0, 0),
            Coord::new(9, 0),
            Coord::new(0, 9),
            Coord::new(0, 0),
        ]);
        let cropped = crop_to_selection(&image, &triangle).unwrap();
        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(cropped.get_pixel(1, 1).0[3], 255);
        assert_eq!(cropped.get_pixel(9, 9).0[3], 0);
        // Colour channels are kept; only alpha changes.
        assert_eq!(cropped.get_pixel(9, 9).0[2], 255);
    }

    #[test]
    fn crop_of_nothing_is_none() {
        let image = RgbaImage::new(4, 4);
        assert!(crop_to_selection(&image, &Path::default()).is_none());
        let outside = Path::new(vec![Coord::new(10, 10), Coord::new(11, 10)]);
        assert!(crop_to_selection(&image, &outside).is_none());
    }
}
