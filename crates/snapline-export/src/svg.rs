//! SVG export serializer.
//!
//! Converts traced boundaries into an SVG string with `<path>` elements
//! using the [`svg`] crate for document construction, XML escaping, and
//! path data formatting.
//!
//! Each boundary becomes a separate `<path>` element using `M` (move to)
//! and `L` (line to) commands; a closed boundary ends with a close-path
//! command instead of repeating its first pixel.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path as SvgPath, Title};
use svg::node::{Node, Text, Value};

use snapline_core::{Coord, Dimensions, Path};

/// Namespace of the `<snapline:trace>` metadata element.
const METADATA_NAMESPACE: &str = "urn:snapline:trace:1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized trace configuration, emitted inside
    /// `<metadata><snapline:trace>` so exported files record the settings
    /// that produced them.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a boundary.
///
/// Uses `M` for the first pixel and `L` for the rest. A closed boundary
/// drops its repeated final pixel and ends with a close-path command.
/// Returns an empty string for boundaries with fewer than 2 pixels.
///
/// # Examples
///
/// ```
/// use snapline_core::{Coord, Path};
/// use snapline_export::build_path_data;
///
/// let path = Path::new(vec![Coord::new(10, 20), Coord::new(11, 20)]);
/// assert_eq!(build_path_data(&path), "M10,20 L11,20");
/// ```
#[must_use]
pub fn build_path_data(path: &Path) -> String {
    let coords = path.coords();
    let Some((first, rest)) = coords.split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let closed = path.is_closed();
    let body = if closed { &rest[..rest.len() - 1] } else { rest };

    let mut data = Data::new().move_to(point(*first));
    for &c in body {
        data = data.line_to(point(c));
    }
    if closed {
        data = data.close();
    }
    String::from(Value::from(data))
}

#[allow(clippy::cast_precision_loss)]
fn point(c: Coord) -> (f32, f32) {
    (c.x as f32, c.y as f32)
}

/// Serialize boundaries into an SVG document string.
///
/// The `viewBox` matches the source image, so the output overlays the
/// image pixel for pixel. Boundaries with fewer than 2 pixels are
/// skipped.
#[must_use]
pub fn to_svg(paths: &[Path], dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> String {
    let w = dimensions.width;
    let h = dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut trace_el = Element::new("snapline:trace");
        trace_el.assign("xmlns:snapline", METADATA_NAMESPACE);
        trace_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(trace_el);
        doc = doc.add(metadata_el);
    }

    for path in paths {
        let d = build_path_data(path);
        if d.is_empty() {
            continue;
        }

        let element = SvgPath::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1);
        doc = doc.add(element);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
