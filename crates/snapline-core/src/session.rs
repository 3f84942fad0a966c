//! Interactive tracing session ("live wire").
//!
//! A [`Tracer`] holds the committed anchors and the segments between
//! them. While the user moves the cursor, [`Tracer::preview`] shows the
//! path from the last anchor to the cursor; the full search from that
//! anchor runs once and every subsequent cursor position is answered by
//! walking parent pointers only.

use crate::graph::WeightedGridGraph;
use crate::search::{PathEngine, append_segment};
use crate::types::{Coord, Path, SnaplineError};

/// Anchor list plus the committed boundary segments.
#[derive(Debug, Clone)]
pub struct Tracer<'g> {
    engine: PathEngine<'g>,
    anchors: Vec<Coord>,
    /// `segments[i]` joins `anchors[i]` to `anchors[i + 1]`; when closed,
    /// the extra last segment joins the last anchor to the first.
    segments: Vec<Path>,
    /// Anchor the engine currently holds a complete search from.
    settled_from: Option<Coord>,
    closed: bool,
}

impl<'g> Tracer<'g> {
    /// Start an empty session on `graph`.
    #[must_use]
    pub fn new(graph: &'g WeightedGridGraph) -> Self {
        Self {
            engine: PathEngine::new(graph),
            anchors: Vec::new(),
            segments: Vec::new(),
            settled_from: None,
            closed: false,
        }
    }

    /// Committed anchors in order.
    #[must_use]
    pub fn anchors(&self) -> &[Coord] {
        &self.anchors
    }

    /// Whether [`close`](Self::close) has joined the boundary.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Commit an anchor, routing the segment from the previous one.
    ///
    /// Adding to a closed boundary reopens it first.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::OutOfRange`] if `anchor` lies outside the
    /// image; the session is unchanged.
    pub fn add_anchor(&mut self, anchor: Coord) -> Result<(), SnaplineError> {
        self.engine.graph().checked_index(anchor)?;
        if self.closed {
            self.reopen();
        }
        if let Some(&last) = self.anchors.last() {
            let segment = self.route(last, anchor)?;
            self.segments.push(segment);
        }
        self.anchors.push(anchor);
        Ok(())
    }

    /// Live-wire path from the last anchor to `cursor`.
    ///
    /// Empty when there is no anchor yet, when the boundary is closed, or
    /// when `cursor` lies outside the image (the pointer left the picture).
    ///
    /// # Errors
    ///
    /// Propagates search errors; with a committed (in-range) anchor there
    /// are none in practice.
    pub fn preview(&mut self, cursor: Coord) -> Result<Path, SnaplineError> {
        let Some(&last) = self.anchors.last() else {
            return Ok(Path::default());
        };
        if self.closed {
            return Ok(Path::default());
        }
        if self.settled_from != Some(last) {
            self.engine.shortest_path(last, None)?;
            self.settled_from = Some(last);
        }
        Ok(self.engine.reconstruct_path(cursor))
    }

    /// Join the last anchor back to the first.
    ///
    /// Closing an already closed boundary does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SnaplineError::NotClosable`] with fewer than three anchors.
    pub fn close(&mut self) -> Result<(), SnaplineError> {
        if self.closed {
            return Ok(());
        }
        let (Some(&first), Some(&last)) = (self.anchors.first(), self.anchors.last()) else {
            return Err(SnaplineError::NotClosable(0));
        };
        if self.anchors.len() < 3 {
            return Err(SnaplineError::NotClosable(self.anchors.len()));
        }
        let segment = self.route(last, first)?;
        self.segments.push(segment);
        self.closed = true;
        Ok(())
    }

    /// Undo the last action: reopen a closed boundary, otherwise drop the
    /// last anchor and its segment. Returns `false` if there was nothing
    /// to undo.
    pub fn undo(&mut self) -> bool {
        if self.closed {
            self.reopen();
            return true;
        }
        if self.anchors.pop().is_none() {
            return false;
        }
        self.segments.truncate(self.anchors.len().saturating_sub(1));
        true
    }

    /// Discard every anchor.
    pub fn clear(&mut self) {
        self.anchors.clear();
        self.segments.clear();
        self.closed = false;
    }

    /// The committed boundary: all segments stitched, shared anchors once.
    #[must_use]
    pub fn path(&self) -> Path {
        let mut coords = Vec::with_capacity(self.segments.iter().map(Path::len).sum());
        if self.segments.is_empty() {
            coords.extend(self.anchors.first());
        }
        for (i, segment) in self.segments.iter().enumerate() {
            append_segment(&mut coords, segment.clone(), i == 0);
        }
        Path::new(coords)
    }

    fn reopen(&mut self) {
        self.segments.truncate(self.anchors.len().saturating_sub(1));
        self.closed = false;
    }

    /// Shortest path `from -> to`, reusing a complete search from `from`
    /// when the engine holds one.
    fn route(&mut self, from: Coord, to: Coord) -> Result<Path, SnaplineError> {
        if self.settled_from != Some(from) {
            self.engine.shortest_path(from, Some(to))?;
            // An early-exit search is not reusable for previews.
            self.settled_from = None;
        }
        Ok(self.engine.reconstruct_path(to))
    }
}
