//! Single-source shortest paths over a [`WeightedGridGraph`].
//!
//! [`PathEngine`] runs Dijkstra from one anchor with a lazy
//! decrease-key binary heap: improving a vertex pushes a fresh entry and
//! entries whose key no longer matches the distance array are discarded
//! when popped. The engine owns its distance/parent buffers and reuses
//! them across calls; the graph is only borrowed, so several engines can
//! search the same graph independently.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::graph::WeightedGridGraph;
use crate::types::{Coord, Path, SnaplineError};

/// Distance of a vertex the last search never reached.
pub const UNREACHED: f64 = f64::MAX;

fn is_reached(dist: f64) -> bool {
    dist < UNREACHED
}

/// Heap entry; ordered so the max-heap pops the smallest cost first,
/// ties broken by the smaller index.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    cost: f64,
    idx: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Work counters for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Vertices popped with a current key (labels made final).
    pub settled: usize,
    /// Successful relaxations (each pushes a heap entry).
    pub relaxations: usize,
    /// Outdated heap entries discarded on pop.
    pub stale_pops: usize,
}

impl SearchStats {
    /// Field-wise sum.
    #[must_use]
    pub const fn merged(self, other: Self) -> Self {
        Self {
            settled: self.settled + other.settled,
            relaxations: self.relaxations + other.relaxations,
            stale_pops: self.stale_pops + other.stale_pops,
        }
    }
}

/// Summary of a [`PathEngine::shortest_path`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Search origin.
    pub start: Coord,
    /// Early-exit target, if one was given.
    pub stop: Option<Coord>,
    /// Whether the search stopped because it settled `stop`.
    pub reached_stop: bool,
    /// Work counters.
    pub stats: SearchStats,
}

/// One anchor-to-anchor leg of a stitched boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    /// Anchor the segment starts from.
    pub from: Coord,
    /// Anchor the segment ends at.
    pub to: Coord,
    /// Total edge cost, `None` if `to` was unreachable.
    pub cost: Option<f64>,
    /// Work counters of the segment's search.
    pub stats: SearchStats,
}

/// A stitched boundary together with per-segment details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stitched {
    /// The concatenated path; shared anchors appear once.
    pub path: Path,
    /// Indices (into the anchor pairs) of segments that were unreachable
    /// and contributed nothing to `path`.
    pub gaps: Vec<usize>,
    /// One entry per consecutive anchor pair.
    pub segments: Vec<SegmentSummary>,
}

impl Stitched {
    /// Returns `true` if every segment was reachable.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Total cost of the reachable segments.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.segments.iter().filter_map(|s| s.cost).sum()
    }

    /// Work counters summed over all segments.
    #[must_use]
    pub fn stats(&self) -> SearchStats {
        self.segments
            .iter()
            .fold(SearchStats::default(), |acc, s| acc.merged(s.stats))
    }
}

/// Append `segment` to `out`, dropping its first coordinate unless it is
/// the first segment of the boundary.
pub(crate) fn append_segment(out: &mut Vec<Coord>, segment: Path, first: bool) {
    let skip = usize::from(!first);
    out.extend(segment.into_coords().into_iter().skip(skip));
}

/// Dijkstra search state over a borrowed graph.
///
/// Distances and parents describe the most recent
/// [`shortest_path`](Self::shortest_path) call only; every call starts
/// from a clean slate.
#[derive(Debug, Clone)]
pub struct PathEngine<'g> {
    graph: &'g WeightedGridGraph,
    dist: Vec<f64>,
    parent: Vec<Option<usize>>,
    heap: BinaryHeap<QueueEntry>,
    start: Option<usize>,
}

impl<'g> PathEngine<'g> {
    /// Allocate search buffers sized to `graph`.
    #[must_use]
    pub fn new(graph: &'g WeightedGridGraph) -> Self {
        Self {
            graph,
            dist: vec![UNREACHED; graph.len()],
            parent: vec![None; graph.len()],
            heap: BinaryHeap::new(),
            start: None,
        }
    }

    /// The graph being searched.
    #[must_use]
    pub const fn graph(&self) -> &'g WeightedGridGraph {
        self.graph
    }

    /// Origin of the last search, if any.
    #[must_use]
    pub fn start(&self) -> Option<Coord> {
        self.start.map(|idx| self.graph.coord(idx))
    }

    /// Compute shortest distances from `start`.
    ///
    /// With `stop`, the search ends as soon as `stop` is settled: its
    /// distance and every parent on its path are final at that point,
    /// other vertices may hold provisional labels. Without `stop`, every
    /// vertex ends with its final distance.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::OutOfRange`] if `start` or `stop` lies
    /// outside the lattice. The previous search's results are left
    /// untouched in that case.
    pub fn shortest_path(
        &mut self,
        start: Coord,
        stop: Option<Coord>,
    ) -> Result<SearchOutcome, SnaplineError> {
        let graph = self.graph;
        let start_idx = graph.checked_index(start)?;
        let stop_idx = stop.map(|c| graph.checked_index(c)).transpose()?;

        self.dist.fill(UNREACHED);
        self.parent.fill(None);
        self.heap.clear();
        self.start = Some(start_idx);

        self.dist[start_idx] = 0.0;
        self.heap.push(QueueEntry {
            cost: 0.0,
            idx: start_idx,
        });

        let mut stats = SearchStats::default();
        let mut reached_stop = false;

        while let Some(QueueEntry { cost, idx: u }) = self.heap.pop() {
            if cost > self.dist[u] {
                stats.stale_pops += 1;
                continue;
            }
            stats.settled += 1;

            if Some(u) == stop_idx {
                reached_stop = true;
                break;
            }

            for (v, weight) in graph.neighbors(u) {
                let candidate = cost + weight;
                if candidate < self.dist[v] {
                    self.dist[v] = candidate;
                    self.parent[v] = Some(u);
                    self.heap.push(QueueEntry {
                        cost: candidate,
                        idx: v,
                    });
                    stats.relaxations += 1;
                }
            }
        }

        debug!(
            "search from {start} (stop {stop:?}): settled={} relaxations={} stale={} reached_stop={reached_stop}",
            stats.settled, stats.relaxations, stats.stale_pops,
        );

        Ok(SearchOutcome {
            start,
            stop,
            reached_stop,
            stats,
        })
    }

    /// Distance from the last search's start to `coord`.
    ///
    /// `None` if `coord` is outside the lattice or was not reached.
    #[must_use]
    pub fn distance(&self, coord: Coord) -> Option<f64> {
        let d = self.dist[self.graph.index(coord)?];
        is_reached(d).then_some(d)
    }

    /// Predecessor of `coord` on its best known path.
    ///
    /// `None` for the start, unreached vertices and out-of-range input.
    #[must_use]
    pub fn parent(&self, coord: Coord) -> Option<Coord> {
        let p = self.parent[self.graph.index(coord)?]?;
        Some(self.graph.coord(p))
    }

    /// Walk parents from `target` back to the last search's start.
    ///
    /// Returns the path in start-to-target order. An out-of-range or
    /// unreached `target` yields an empty path; that is the normal
    /// "no route" outcome, not an error.
    #[must_use]
    pub fn reconstruct_path(&self, target: Coord) -> Path {
        let Some(mut current) = self.graph.index(target) else {
            return Path::default();
        };
        if !is_reached(self.dist[current]) {
            return Path::default();
        }

        // Each relaxation strictly lowers a distance, so the parent
        // chain is acyclic and ends at the start.
        let mut coords = vec![self.graph.coord(current)];
        while let Some(p) = self.parent[current] {
            coords.push(self.graph.coord(p));
            current = p;
        }
        coords.reverse();
        Path::new(coords)
    }

    /// Shortest path through `anchors` in order.
    ///
    /// See [`stitch_anchors_detailed`](Self::stitch_anchors_detailed).
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::OutOfRange`] if any anchor lies outside
    /// the lattice.
    pub fn stitch_anchors(&mut self, anchors: &[Coord]) -> Result<Path, SnaplineError> {
        self.stitch_anchors_detailed(anchors).map(|s| s.path)
    }

    /// Shortest path through `anchors` in order, with per-segment details.
    ///
    /// Fewer than two anchors give an empty result. Each consecutive pair
    /// is searched with early exit; every segment after the first drops
    /// its first coordinate so shared anchors appear once. A segment whose
    /// target is unreachable is skipped and recorded in
    /// [`Stitched::gaps`] rather than failing the whole boundary.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::OutOfRange`] if any anchor lies outside
    /// the lattice. All anchors are checked before any search runs.
    pub fn stitch_anchors_detailed(&mut self, anchors: &[Coord]) -> Result<Stitched, SnaplineError> {
        let mut stitched = Stitched::default();
        if anchors.len() < 2 {
            return Ok(stitched);
        }
        for &anchor in anchors {
            self.graph.checked_index(anchor)?;
        }

        let mut coords = Vec::new();
        for (i, pair) in anchors.windows(2).enumerate() {
            let (from, to) = (pair[0], pair[1]);
            let outcome = self.shortest_path(from, Some(to))?;
            let segment = self.reconstruct_path(to);
            let cost = self.distance(to);

            if segment.is_empty() {
                warn!("segment {i} from {from} to {to} is unreachable; skipping");
                stitched.gaps.push(i);
            } else {
                trace!("segment {i} from {from} to {to}: {} coords", segment.len());
                append_segment(&mut coords, segment, i == 0);
            }

            stitched.segments.push(SegmentSummary {
                from,
                to,
                cost,
                stats: outcome.stats,
            });
        }

        stitched.path = Path::new(coords);
        Ok(stitched)
    }
}
