//! snapline: trace an edge-hugging boundary through anchor points.
//!
//! Runs the tracer on an image file, printing per-stage diagnostics,
//! and optionally writes the boundary as SVG and the selected region as
//! a transparent PNG crop.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin snapline -- photo.png \
//!     --anchor 120,40 --anchor 300,60 --anchor 260,310 --close \
//!     --svg outline.svg --crop cutout.png
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser, ValueEnum};
use snapline_core::diagnostics::{Clock, TraceDiagnostics};
use snapline_core::{Coord, EnergyKind, GraphConfig, TraceConfig, TraceResult};

/// Intelligent-scissors boundary tracing.
///
/// Finds the cheapest pixel path between consecutive anchors, where
/// crossing a strong image gradient is cheap, and prints per-stage
/// timing and count diagnostics.
#[derive(Parser)]
#[command(name = "snapline", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Anchor pixel as `X,Y`; repeat for each anchor, in order.
    #[arg(long = "anchor", value_name = "X,Y", value_parser = parse_anchor, action = ArgAction::Append)]
    anchors: Vec<Coord>,

    /// Close the boundary back to the first anchor (needs 3+ anchors).
    #[arg(long)]
    close: bool,

    /// Gaussian blur sigma applied before energy computation (0 disables).
    #[arg(long, default_value_t = TraceConfig::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Per-pixel energy function.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_ENERGY)]
    energy: Energy,

    /// Weight for edges with zero energy (default: derived from the image).
    #[arg(long)]
    sentinel: Option<f64>,

    /// Full trace config as a JSON string.
    ///
    /// When provided, the individual config flags (`--close`,
    /// `--blur-sigma`, `--energy`, `--sentinel`) are ignored. The JSON
    /// must be a valid `TraceConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Write the boundary as SVG to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write the selected region as a transparent PNG (closed boundaries only).
    #[arg(long)]
    crop: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Log verbosity on stderr (`-v` debug, `-vv` trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Energy function selection.
#[derive(Clone, Copy, ValueEnum)]
enum Energy {
    /// Absolute difference to the right and bottom neighbours.
    ForwardDifference,
    /// Absolute Sobel responses.
    Sobel,
}

const fn energy_from_core(kind: EnergyKind) -> Energy {
    match kind {
        EnergyKind::ForwardDifference => Energy::ForwardDifference,
        EnergyKind::Sobel => Energy::Sobel,
    }
}

/// The CLI default energy, derived from [`TraceConfig::DEFAULT_ENERGY`]
/// so the two cannot silently diverge.
const CLI_DEFAULT_ENERGY: Energy = energy_from_core(TraceConfig::DEFAULT_ENERGY);

/// Parse an `X,Y` anchor.
fn parse_anchor(s: &str) -> Result<Coord, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x
        .trim()
        .parse()
        .map_err(|e| format!("invalid X in {s:?}: {e}"))?;
    let y = y
        .trim()
        .parse()
        .map_err(|e| format!("invalid Y in {s:?}: {e}"))?;
    Ok(Coord::new(x, y))
}

/// Build a [`TraceConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<TraceConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(TraceConfig {
        blur_sigma: cli.blur_sigma,
        energy: match cli.energy {
            Energy::ForwardDifference => EnergyKind::ForwardDifference,
            Energy::Sobel => EnergyKind::Sobel,
        },
        graph: GraphConfig {
            sentinel: cli.sentinel,
        },
        close: cli.close,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Anchors: {}", format_anchors(&cli.anchors));
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match snapline_core::diagnostics::trace_with_diagnostics(
            &image_bytes,
            &cli.anchors,
            &config,
            &StdClock,
        ) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                if !result.gaps.is_empty() {
                    eprintln!("Warning: unreachable segments skipped: {:?}", result.gaps);
                }

                // Write outputs on the first run only.
                if run == 0 {
                    if let Some(ref svg_path) = cli.svg {
                        write_svg(&cli, &config, &result, svg_path);
                    }
                    if let Some(ref crop_path) = cli.crop {
                        write_crop(&image_bytes, &result, crop_path);
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Trace error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

fn format_anchors(anchors: &[Coord]) -> String {
    if anchors.is_empty() {
        return "(none)".to_string();
    }
    anchors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn write_svg(cli: &Cli, config: &TraceConfig, result: &TraceResult, svg_path: &std::path::Path) {
    let title = cli
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("snapline");
    let desc = format!("anchors: {}", format_anchors(&cli.anchors));
    let config_json = serde_json::to_string(config).ok();
    let metadata = snapline_export::SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: config_json.as_deref(),
    };
    let svg = snapline_export::to_svg(
        std::slice::from_ref(&result.path),
        result.dimensions,
        &metadata,
    );
    match std::fs::write(svg_path, &svg) {
        Ok(()) => {
            eprintln!(
                "SVG written to {} ({} bytes)",
                svg_path.display(),
                svg.len(),
            );
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", svg_path.display());
        }
    }
}

fn write_crop(image_bytes: &[u8], result: &TraceResult, crop_path: &std::path::Path) {
    if !result.path.is_closed() {
        eprintln!("Skipping crop: boundary is not closed (use --close)");
        return;
    }
    let rgba = match snapline_core::grayscale::decode(image_bytes) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            eprintln!("Error decoding image for crop: {e}");
            return;
        }
    };
    let Some(cropped) = snapline_core::mask::crop_to_selection(&rgba, &result.path) else {
        eprintln!("Skipping crop: selection is empty");
        return;
    };
    match cropped.save_with_format(crop_path, image::ImageFormat::Png) {
        Ok(()) => {
            eprintln!(
                "Crop written to {} ({}x{})",
                crop_path.display(),
                cropped.width(),
                cropped.height(),
            );
        }
        Err(e) => {
            eprintln!("Error writing crop to {}: {e}", crop_path.display());
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Minimal [`log`] backend writing `LEVEL target: message` to stderr.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&TraceDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[TraceDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| d.decode.duration),
        ("Blur", |d| d.blur.duration),
        ("Energy", |d| d.energy.duration),
        ("Graph", |d| d.graph.duration),
        ("Search", |d| d.search.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
