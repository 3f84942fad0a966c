//! Shared types for the snapline boundary tracer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::energy::EnergyKind;
use crate::graph::GraphConfig;

/// Re-export `GrayImage` so downstream crates can hand decoded rasters
/// to the tracer without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` for the selection/crop helpers.
pub use image::RgbaImage;

/// A lattice coordinate: one pixel of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if `other` is one of the four lattice neighbours.
    #[must_use]
    pub const fn is_adjacent(self, other: Self) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl From<(u32, u32)> for Coord {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Returns `true` if `coord` lies inside `[0, width) x [0, height)`.
    #[must_use]
    pub const fn contains(self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An ordered sequence of lattice coordinates.
///
/// Paths produced by the search engine have consecutive entries that are
/// 4-neighbours. An empty path is the normal "no route" outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path(Vec<Coord>);

impl Path {
    /// Create a new path from a vector of coordinates.
    #[must_use]
    pub const fn new(coords: Vec<Coord>) -> Self {
        Self(coords)
    }

    /// Returns `true` if the path has no coordinates.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of coordinates in the path.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first coordinate, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Coord> {
        self.0.first()
    }

    /// Returns the last coordinate, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Coord> {
        self.0.last()
    }

    /// Returns a slice of all coordinates.
    #[must_use]
    pub fn coords(&self) -> &[Coord] {
        &self.0
    }

    /// Consumes the path and returns the underlying vector.
    #[must_use]
    pub fn into_coords(self) -> Vec<Coord> {
        self.0
    }

    /// Returns `true` if the path ends where it starts and encloses
    /// something (at least one step away and back).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.len() > 2 && self.0.first() == self.0.last()
    }

    /// Returns `true` if every consecutive pair is 4-adjacent.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.0.windows(2).all(|w| w[0].is_adjacent(w[1]))
    }
}

impl From<Vec<Coord>> for Path {
    fn from(coords: Vec<Coord>) -> Self {
        Self(coords)
    }
}

/// Configuration for [`crate::trace`].
///
/// Fields are public; call [`validate`](Self::validate) (done by every
/// entry point) to reject values the tracer cannot honour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Gaussian blur sigma applied before energy computation.
    /// Zero disables the blur.
    pub blur_sigma: f32,

    /// Which per-pixel energy function drives the edge costs.
    pub energy: EnergyKind,

    /// Weighted graph construction options.
    pub graph: GraphConfig,

    /// Whether to close the boundary back to the first anchor.
    pub close: bool,
}

impl TraceConfig {
    /// Default blur sigma (no smoothing).
    pub const DEFAULT_BLUR_SIGMA: f32 = 0.0;

    /// Default energy function.
    pub const DEFAULT_ENERGY: EnergyKind = EnergyKind::ForwardDifference;

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::InvalidConfig`] for a blur sigma outside
    /// `0..=`[`MAX_SIGMA`](crate::blur::MAX_SIGMA) (NaN and infinity
    /// included), or an invalid sentinel override.
    pub fn validate(&self) -> Result<(), SnaplineError> {
        if !(0.0..=crate::blur::MAX_SIGMA).contains(&self.blur_sigma) {
            return Err(SnaplineError::InvalidConfig(format!(
                "blur_sigma must be in 0..={}, got {}",
                crate::blur::MAX_SIGMA,
                self.blur_sigma
            )));
        }
        self.graph.validate()
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            energy: Self::DEFAULT_ENERGY,
            graph: GraphConfig::default(),
            close: false,
        }
    }
}

/// Result of tracing a boundary through a set of anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    /// The stitched boundary, anchor to anchor.
    pub path: Path,

    /// Indices of anchor pairs whose segment was unreachable and was
    /// left out of `path`.
    pub gaps: Vec<usize>,

    /// Dimensions of the source image in pixels.
    pub dimensions: Dimensions,
}

/// Errors produced by the tracer.
#[derive(Debug, thiserror::Error)]
pub enum SnaplineError {
    /// An anchor or target lies outside the lattice.
    #[error("coordinate {coord} is outside the {dimensions} image")]
    OutOfRange {
        /// The offending coordinate.
        coord: Coord,
        /// Lattice dimensions it was checked against.
        dimensions: Dimensions,
    },

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image (or energy field) has a zero-sized axis.
    #[error("image has no pixels")]
    EmptyImage,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Configuration is invalid.
    #[error("invalid trace configuration: {0}")]
    InvalidConfig(String),

    /// A boundary needs at least three anchors to be closed.
    #[error("closing a boundary needs at least 3 anchors, got {0}")]
    NotClosable(usize),
}
