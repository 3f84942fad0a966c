//! Trace diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`trace_with_diagnostics`] runs the same stages as [`crate::trace`]
//! and records, per stage, how long it took and what it produced. The
//! numbers are meant for tuning (blur sigma, energy function, sentinel)
//! and for spotting where the time goes on large images.
//!
//! Timestamps come from an injected [`Clock`] so this crate stays free
//! of platform time; the CLI supplies one backed by
//! [`std::time::Instant`].
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::WeightedGridGraph;
use crate::search::PathEngine;
use crate::types::{Coord, Dimensions, SnaplineError, TraceConfig, TraceResult};
use crate::{blur, boundary_anchors, grayscale};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceDiagnostics {
    /// Image decoding and grayscale conversion.
    pub decode: StageDiagnostics,
    /// Gaussian pre-smoothing (a no-op copy when sigma is zero).
    pub blur: StageDiagnostics,
    /// Per-pixel energy computation.
    pub energy: StageDiagnostics,
    /// Weighted graph construction.
    pub graph: StageDiagnostics,
    /// Per-segment shortest-path searches and stitching.
    pub search: StageDiagnostics,
    /// Wall-clock duration of the whole trace (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: TraceSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
    },
    /// Gaussian blur metrics.
    Blur {
        /// Sigma used; zero means the stage was skipped.
        sigma: f32,
    },
    /// Energy computation metrics.
    Energy {
        /// Name of the energy function.
        kind: String,
        /// Largest per-axis energy in the image.
        max_energy: f64,
        /// Pixels with zero energy on both axes.
        flat_pixel_count: usize,
    },
    /// Graph construction metrics.
    Graph {
        /// Number of nodes (pixels).
        node_count: usize,
        /// Largest finite edge weight.
        max_finite_weight: f64,
        /// Weight assigned to zero-energy edges.
        sentinel: f64,
        /// Edge slots holding the sentinel.
        sentinel_edge_count: usize,
    },
    /// Search and stitching metrics.
    Search {
        /// Anchors searched through (including the closing anchor).
        anchor_count: usize,
        /// Anchor pairs searched.
        segment_count: usize,
        /// Segments skipped as unreachable.
        gap_count: usize,
        /// Nodes settled over all searches.
        settled: usize,
        /// Successful relaxations over all searches.
        relaxations: usize,
        /// Outdated queue entries discarded over all searches.
        stale_pops: usize,
        /// Total edge cost of the stitched boundary.
        total_cost: f64,
    },
}

/// High-level summary counts for the entire trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: usize,
    /// Anchors supplied by the caller.
    pub anchor_count: usize,
    /// Coordinates in the final boundary.
    pub final_point_count: usize,
}

impl TraceDiagnostics {
    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Decode", &self.decode),
            ("Blur", &self.blur),
            ("Energy", &self.energy),
            ("Graph", &self.graph),
            ("Search", &self.search),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Trace Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Anchors: {}  |  Boundary points: {}",
            self.summary.anchor_count, self.summary.final_point_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Blur { sigma } => {
            if *sigma > 0.0 {
                format!("sigma={sigma:.2}")
            } else {
                "skipped".to_string()
            }
        }
        StageMetrics::Energy {
            kind,
            max_energy,
            flat_pixel_count,
        } => format!("{kind} max={max_energy:.1} flat={flat_pixel_count}"),
        StageMetrics::Graph {
            node_count,
            max_finite_weight,
            sentinel,
            sentinel_edge_count,
        } => format!(
            "{node_count} nodes, max_w={max_finite_weight:.3} sentinel={sentinel:.3e} ({sentinel_edge_count} edges)",
        ),
        StageMetrics::Search {
            anchor_count,
            segment_count,
            gap_count,
            settled,
            relaxations,
            stale_pops,
            total_cost,
        } => format!(
            "{anchor_count} anchors, {segment_count} segs ({gap_count} gaps), settled={settled} relax={relaxations} stale={stale_pops} cost={total_cost:.3}",
        ),
    }
}

/// Run [`crate::trace`] with per-stage timing and metrics.
///
/// # Errors
///
/// Same as [`crate::trace`].
pub fn trace_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    anchors: &[Coord],
    config: &TraceConfig,
    clock: &C,
) -> Result<(TraceResult, TraceDiagnostics), SnaplineError> {
    config.validate()?;
    let route = boundary_anchors(anchors, config.close)?;
    let total_start = clock.now();

    let t = clock.now();
    let gray = grayscale::decode_and_grayscale(image_bytes)?;
    let dimensions = Dimensions {
        width: gray.width(),
        height: gray.height(),
    };
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
        },
    };

    let t = clock.now();
    let blurred = blur::gaussian_blur(&gray, config.blur_sigma);
    let blur = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Blur {
            sigma: config.blur_sigma,
        },
    };

    let t = clock.now();
    let field = config.energy.compute(&blurred);
    let energy = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Energy {
            kind: config.energy.name().to_string(),
            max_energy: field.max_component(),
            flat_pixel_count: field.flat_pixel_count(),
        },
    };

    let t = clock.now();
    let graph = WeightedGridGraph::construct(&field, &config.graph)?;
    let graph_stage = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Graph {
            node_count: graph.len(),
            max_finite_weight: graph.max_finite_weight(),
            sentinel: graph.sentinel(),
            sentinel_edge_count: graph.sentinel_slot_count(),
        },
    };

    let t = clock.now();
    let stitched = PathEngine::new(&graph).stitch_anchors_detailed(&route)?;
    let stats = stitched.stats();
    let search = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Search {
            anchor_count: route.len(),
            segment_count: stitched.segments.len(),
            gap_count: stitched.gaps.len(),
            settled: stats.settled,
            relaxations: stats.relaxations,
            stale_pops: stats.stale_pops,
            total_cost: stitched.total_cost(),
        },
    };

    let summary = TraceSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: dimensions.pixel_count(),
        anchor_count: anchors.len(),
        final_point_count: stitched.path.len(),
    };
    let diagnostics = TraceDiagnostics {
        decode,
        blur,
        energy,
        graph: graph_stage,
        search,
        total_duration: clock.elapsed(&total_start),
        summary,
    };
    let result = TraceResult {
        path: stitched.path,
        gaps: stitched.gaps,
        dimensions,
    };
    Ok((result, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Deterministic clock: every reading advances time by one millisecond.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get() + 1;
            self.0.set(t);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn step_png() -> Vec<u8> {
        let img = image::GrayImage::from_fn(12, 8, |x, _| {
            if x < 6 {
                image::Luma([20])
            } else {
                image::Luma([220])
            }
        });
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

    fn sample() -> TraceDiagnostics {
        let stage = |ms, metrics| StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        };
        TraceDiagnostics {
            decode: stage(
                4,
                StageMetrics::Decode {
                    input_bytes: 1000,
                    width: 100,
                    height: 80,
                },
            ),
            blur: stage(0, StageMetrics::Blur { sigma: 0.0 }),
            energy: stage(
                3,
                StageMetrics::Energy {
                    kind: "sobel".to_string(),
                    max_energy: 1020.0,
                    flat_pixel_count: 10,
                },
            ),
            graph: stage(
                2,
                StageMetrics::Graph {
                    node_count: 8000,
                    max_finite_weight: 1.0,
                    sentinel: 1e9,
                    sentinel_edge_count: 20,
                },
            ),
            search: stage(
                11,
                StageMetrics::Search {
                    anchor_count: 3,
                    segment_count: 2,
                    gap_count: 0,
                    settled: 500,
                    relaxations: 900,
                    stale_pops: 40,
                    total_cost: 12.5,
                },
            ),
            total_duration: Duration::from_millis(20),
            summary: TraceSummary {
                image_width: 100,
                image_height: 80,
                pixel_count: 8000,
                anchor_count: 3,
                final_point_count: 57,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample().report();
        assert!(report.contains("Trace Diagnostics Report"));
        for name in ["Decode", "Blur", "Energy", "Graph", "Search"] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("skipped"));
        assert!(report.contains("sobel"));
        assert!(report.contains("Boundary points: 57"));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.02).abs() < 1e-12);
        assert!((json["search"]["duration"].as_f64().unwrap() - 0.011).abs() < 1e-12);

        let back: TraceDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_duration, Duration::from_millis(20));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<TraceDiagnostics>(json).is_err());
    }

    #[test]
    fn instrumented_trace_matches_plain_trace() {
        let png = step_png();
        let anchors = [Coord::new(1, 1), Coord::new(10, 1), Coord::new(5, 7)];
        let config = TraceConfig::default();

        let clock = TickClock(Cell::new(0));
        let (result, diag) = trace_with_diagnostics(&png, &anchors, &config, &clock).unwrap();
        assert_eq!(result, crate::trace(&png, &anchors, &config).unwrap());

        assert_eq!(diag.summary.image_width, 12);
        assert_eq!(diag.summary.anchor_count, 3);
        assert_eq!(diag.summary.final_point_count, result.path.len());
        assert!(diag.total_duration >= diag.search.duration);
        let StageMetrics::Search {
            segment_count,
            gap_count,
            settled,
            ..
        } = diag.search.metrics
        else {
            panic!("search stage has the wrong metrics");
        };
        assert_eq!(segment_count, 2);
        assert_eq!(gap_count, 0);
        assert!(settled > 0);
    }

    #[test]
    fn closing_counts_the_extra_segment() {
        let png = step_png();
        let anchors = [Coord::new(1, 1), Coord::new(10, 1), Coord::new(5, 7)];
        let config = TraceConfig {
            close: true,
            ..TraceConfig::default()
        };
        let clock = TickClock(Cell::new(0));
        let (result, diag) = trace_with_diagnostics(&png, &anchors, &config, &clock).unwrap();
        assert!(result.path.is_closed());
        let StageMetrics::Search {
            anchor_count,
            segment_count,
            ..
        } = diag.search.metrics
        else {
            panic!("search stage has the wrong metrics");
        };
        assert_eq!(anchor_count, 4);
        assert_eq!(segment_count, 3);
    }

    #[test]
    fn errors_propagate() {
        let clock = TickClock(Cell::new(0));
        let err = trace_with_diagnostics(&[], &[], &TraceConfig::default(), &clock).unwrap_err();
        assert!(matches!(err, SnaplineError::EmptyInput));
    }
}
