//! Weighted 4-connected lattice built from pixel energies.
//!
//! Every pixel is a vertex. Each vertex stores the cost of the edge to
//! its right neighbour and the edge to the neighbour below it in two
//! flat arrays indexed by `y * width + x`. Edges are undirected: moving
//! left from `idx` uses `right_weights[idx - 1]`, moving up uses
//! `bottom_weights[idx - width]`.
//!
//! An edge costs `1 / energy` along its axis, so strong gradients are
//! cheap to travel. Flat regions (zero energy) and the border slots that
//! have no neighbour get the *sentinel* cost: a large finite value that
//! discourages, without forbidding, crossing them.
//!
//! # Sentinel
//!
//! The sentinel is derived per graph as
//! `max(SENTINEL_FLOOR, 2 * size * max_finite_weight)`. Any simple path
//! has fewer than `size` edges, so a single sentinel edge always costs
//! more than a whole path of finite edges, regardless of image size.
//!
//! Every edge cost, the sentinel included, is capped at
//! [`max_sentinel(size)`](max_sentinel) so that summing `size` of them
//! stays finite. Near that cap (energies around `1e-300`) the dominance
//! above no longer holds and construction logs a warning.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::energy::EnergyField;
use crate::types::{Coord, Dimensions, SnaplineError};

/// Lower bound for the derived sentinel cost.
pub const SENTINEL_FLOOR: f64 = 1e9;

/// Largest edge cost a `size`-vertex lattice can hold: `size` such
/// edges, doubled, still sum to at most `f64::MAX`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn max_sentinel(size: usize) -> f64 {
    f64::MAX / (2.0 * size.max(1) as f64)
}

/// Options for [`WeightedGridGraph::construct`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Fixed sentinel cost. `None` derives it from the image size and
    /// the largest finite weight.
    pub sentinel: Option<f64>,
}

impl GraphConfig {
    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::InvalidConfig`] if a sentinel override is
    /// not finite and strictly positive.
    pub fn validate(&self) -> Result<(), SnaplineError> {
        match self.sentinel {
            Some(s) if !(s.is_finite() && s > 0.0) => Err(SnaplineError::InvalidConfig(format!(
                "sentinel must be finite and > 0, got {s}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Read-only edge costs of a `width x height` lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedGridGraph {
    width: u32,
    height: u32,
    right_weights: Vec<f64>,
    bottom_weights: Vec<f64>,
    sentinel: f64,
    max_finite_weight: f64,
}

impl WeightedGridGraph {
    /// Build the graph from an energy field.
    ///
    /// Queries every pixel's energy once, in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::EmptyImage`] if the field has a zero-sized
    /// axis, or [`SnaplineError::InvalidConfig`] for a bad sentinel
    /// override, including one above [`max_sentinel`] for this size.
    pub fn construct<E>(energy: &E, config: &GraphConfig) -> Result<Self, SnaplineError>
    where
        E: EnergyField + ?Sized,
    {
        config.validate()?;
        let dimensions = energy.dimensions();
        if dimensions.is_empty() {
            return Err(SnaplineError::EmptyImage);
        }
        let Dimensions { width, height } = dimensions;
        let size = dimensions.pixel_count();
        let cap = max_sentinel(size);
        if let Some(s) = config.sentinel.filter(|s| *s > cap) {
            return Err(SnaplineError::InvalidConfig(format!(
                "sentinel {s:e} exceeds {cap:e}, the largest cost a {dimensions} graph can sum"
            )));
        }

        // Missing weights are parked as infinity until the sentinel is
        // known, then replaced in a second pass.
        let mut right_weights = Vec::with_capacity(size);
        let mut bottom_weights = Vec::with_capacity(size);
        let mut max_finite_weight: f64 = 0.0;

        for y in 0..height {
            for x in 0..width {
                let e = energy.energy(x, y);
                let right = if x + 1 < width {
                    axis_weight(e.x, cap)
                } else {
                    None
                };
                let bottom = if y + 1 < height {
                    axis_weight(e.y, cap)
                } else {
                    None
                };
                for w in right.iter().chain(bottom.iter()) {
                    max_finite_weight = max_finite_weight.max(*w);
                }
                right_weights.push(right.unwrap_or(f64::INFINITY));
                bottom_weights.push(bottom.unwrap_or(f64::INFINITY));
            }
        }

        let derived = derive_sentinel(size, max_finite_weight);
        let sentinel = match config.sentinel {
            Some(s) => {
                if s < derived {
                    warn!(
                        "sentinel override {s:e} is below the derived bound {derived:e}; \
                         paths may cross flat regions or the border"
                    );
                }
                s
            }
            None if derived > cap => {
                warn!(
                    "weights up to {max_finite_weight:e} leave no room for a sentinel below {cap:e}; \
                     capped, paths may cross flat regions or the border"
                );
                cap
            }
            None => derived,
        };

        for w in right_weights.iter_mut().chain(bottom_weights.iter_mut()) {
            if w.is_infinite() {
                *w = sentinel;
            }
        }

        debug!(
            "constructed {dimensions} grid graph: sentinel={sentinel:e}, max finite weight={max_finite_weight:e}"
        );

        Ok(Self {
            width,
            height,
            right_weights,
            bottom_weights,
            sentinel,
            max_finite_weight,
        })
    }

    /// Graph with the given edge costs, bypassing construction.
    ///
    /// Lets tests cut the lattice with infinite edges that `construct`
    /// never produces.
    #[cfg(test)]
    pub(crate) fn from_weights(
        width: u32,
        height: u32,
        right_weights: Vec<f64>,
        bottom_weights: Vec<f64>,
    ) -> Self {
        assert_eq!(right_weights.len(), width as usize * height as usize);
        assert_eq!(bottom_weights.len(), right_weights.len());
        let max_finite_weight = right_weights
            .iter()
            .chain(&bottom_weights)
            .copied()
            .filter(|w| w.is_finite())
            .fold(0.0, f64::max);
        Self {
            width,
            height,
            right_weights,
            bottom_weights,
            sentinel: SENTINEL_FLOOR,
            max_finite_weight,
        }
    }

    /// Lattice width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Lattice height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Lattice dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.right_weights.len()
    }

    /// Always `false`: construction rejects empty lattices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.right_weights.is_empty()
    }

    /// Cost standing in for "effectively impassable".
    #[must_use]
    pub const fn sentinel(&self) -> f64 {
        self.sentinel
    }

    /// Largest non-sentinel edge cost (0.0 if every edge is a sentinel).
    #[must_use]
    pub const fn max_finite_weight(&self) -> f64 {
        self.max_finite_weight
    }

    /// All right-edge costs, row-major.
    #[must_use]
    pub fn right_weights(&self) -> &[f64] {
        &self.right_weights
    }

    /// All bottom-edge costs, row-major.
    #[must_use]
    pub fn bottom_weights(&self) -> &[f64] {
        &self.bottom_weights
    }

    /// Returns `true` if `coord` lies inside the lattice.
    #[must_use]
    pub const fn contains(&self, coord: Coord) -> bool {
        self.dimensions().contains(coord)
    }

    /// Flat index of `coord`, or `None` outside the lattice.
    #[must_use]
    pub const fn index(&self, coord: Coord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.y as usize * self.width as usize + coord.x as usize)
        } else {
            None
        }
    }

    /// Flat index of `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::OutOfRange`] outside the lattice.
    pub fn checked_index(&self, coord: Coord) -> Result<usize, SnaplineError> {
        self.index(coord).ok_or(SnaplineError::OutOfRange {
            coord,
            dimensions: self.dimensions(),
        })
    }

    /// Coordinate of flat index `idx`.
    ///
    /// `idx` must be below [`len`](Self::len).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn coord(&self, idx: usize) -> Coord {
        let w = self.width as usize;
        // Both quotients fit: idx < width * height with u32 axes.
        Coord::new((idx % w) as u32, (idx / w) as u32)
    }

    /// Cost of the undirected edge between `u` and `v`, or `None` if
    /// they are not 4-neighbours inside the lattice.
    #[must_use]
    pub fn edge_cost(&self, u: usize, v: usize) -> Option<f64> {
        let (lo, hi) = if u < v { (u, v) } else { (v, u) };
        if hi >= self.len() {
            return None;
        }
        let w = self.width as usize;
        if hi == lo + 1 && lo % w + 1 < w {
            Some(self.right_weights[lo])
        } else if hi == lo + w {
            Some(self.bottom_weights[lo])
        } else {
            None
        }
    }

    /// Existing neighbours of `idx` with the cost of reaching them, in
    /// left, right, up, down order.
    ///
    /// `idx` must be below [`len`](Self::len); larger indices panic.
    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let w = self.width as usize;
        let h = self.height as usize;
        let (x, y) = (idx % w, idx / w);

        let left = (x > 0).then(|| (idx - 1, self.right_weights[idx - 1]));
        let right = (x + 1 < w).then(|| (idx + 1, self.right_weights[idx]));
        let up = (y > 0).then(|| (idx - w, self.bottom_weights[idx - w]));
        let down = (y + 1 < h).then(|| (idx + w, self.bottom_weights[idx]));

        [left, right, up, down].into_iter().flatten()
    }

    /// Summed edge cost along `coords`, or `None` if the sequence leaves
    /// the lattice or takes a step that is not between 4-neighbours.
    #[must_use]
    pub fn path_cost(&self, coords: &[Coord]) -> Option<f64> {
        coords.windows(2).try_fold(0.0, |acc, pair| {
            let u = self.index(pair[0])?;
            let v = self.index(pair[1])?;
            Some(acc + self.edge_cost(u, v)?)
        })
    }

    /// Number of edge slots (including the border slots) holding the
    /// sentinel cost.
    #[must_use]
    pub fn sentinel_slot_count(&self) -> usize {
        self.right_weights
            .iter()
            .chain(&self.bottom_weights)
            .filter(|w| **w >= self.sentinel)
            .count()
    }
}

/// `1 / energy` clamped to `cap`, or `None` when that is not a strictly
/// positive finite cost (zero, negative, NaN or infinite energy).
fn axis_weight(energy: f64, cap: f64) -> Option<f64> {
    if energy > 0.0 {
        let w = energy.recip();
        (w.is_finite() && w > 0.0).then(|| w.min(cap))
    } else {
        None
    }
}

#[allow(clippy::cast_precision_loss)]
fn derive_sentinel(size: usize, max_finite_weight: f64) -> f64 {
    (2.0 * size as f64 * max_finite_weight).max(SENTINEL_FLOOR)
}
