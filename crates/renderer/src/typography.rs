//! Poster labels.
//!
//! Sizes scale with the shorter page side against a 12 inch reference.
//! Vertical positions are fractions of the page measured from the bottom.

use svg::node::element::{Element, Line};
use svg::Node;

use poster_common::{Color, Theme};

use crate::canvas::{num, Canvas};
use crate::style::zorder;

pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

const BASE_MAIN: f64 = 60.0;
const BASE_SUB: f64 = 22.0;
const BASE_COORDS: f64 = 14.0;
/// Attribution size in points; not scaled.
const ATTRIBUTION_SIZE: f64 = 8.0;

const CITY_Y: f64 = 0.14;
const DIVIDER_Y: f64 = 0.125;
const COUNTRY_Y: f64 = 0.10;
const COORDS_Y: f64 = 0.07;

/// Names longer than this many characters shrink the title.
const MAX_FULL_SIZE_CHARS: usize = 10;

/// True when more than 80% of alphabetic characters are below U+0250.
/// Text without letters counts as Latin.
pub fn is_latin_script(text: &str) -> bool {
    let (latin, alphabetic) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(latin, total), c| {
            (latin + usize::from((c as u32) < 0x250), total + 1)
        });
    if alphabetic == 0 {
        return true;
    }
    latin as f64 / alphabetic as f64 > 0.8
}

/// Uppercased and letter-spaced with two spaces, e.g. `P  A  R  I  S`.
pub fn spaced(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join("  ")
}

/// Title text: spaced capitals for Latin names, untouched otherwise.
pub fn title_text(city: &str) -> String {
    if is_latin_script(city) {
        spaced(city)
    } else {
        city.to_string()
    }
}

/// Font sizes in points for a page of the given inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub scale: f64,
    pub main: f64,
    pub sub: f64,
    pub coords: f64,
    pub attribution: f64,
}

impl FontSizes {
    pub fn new(width_in: f64, height_in: f64, city: &str) -> Self {
        let scale = width_in.min(height_in) / 12.0;
        let full = BASE_MAIN * scale;
        let chars = city.chars().count();
        let main = if chars > MAX_FULL_SIZE_CHARS {
            (full * MAX_FULL_SIZE_CHARS as f64 / chars as f64).max(10.0 * scale)
        } else {
            full
        };
        Self {
            scale,
            main,
            sub: BASE_SUB * scale,
            coords: BASE_COORDS * scale,
            attribution: ATTRIBUTION_SIZE,
        }
    }
}

/// Text drawn under the map.
#[derive(Debug, Clone, PartialEq)]
pub struct PosterLabels {
    pub city: String,
    pub country: String,
    pub coordinates: String,
}

struct TextStyle<'a> {
    size: f64,
    weight: u16,
    color: Color,
    opacity: f64,
    anchor: &'a str,
    family: &'a str,
}

fn text(x: f64, y: f64, content: &str, style: &TextStyle<'_>) -> Element {
    let mut node = Element::new("text");
    node.assign("x", num(x));
    node.assign("y", num(y));
    node.assign("font-family", format!("{}, sans-serif", style.family));
    node.assign("font-size", num(style.size));
    node.assign("font-weight", style.weight.to_string());
    node.assign("fill", style.color.to_hex());
    if style.opacity < 1.0 {
        node.assign("fill-opacity", num(style.opacity));
    }
    node.assign("text-anchor", style.anchor);
    node.assign("xml:space", "preserve");
    node.append(svg::node::Text::new(content));
    node
}

/// Draw the title block and attribution.
pub fn draw_labels(
    canvas: &mut Canvas,
    theme: &Theme,
    labels: &PosterLabels,
    width_in: f64,
    height_in: f64,
    family: &str,
) {
    let sizes = FontSizes::new(width_in, height_in, &labels.city);
    let style = |size: f64, weight: u16, opacity: f64, anchor: &'static str| TextStyle {
        size,
        weight,
        color: theme.text,
        opacity,
        anchor,
        family,
    };

    let (cx, cy) = canvas.fraction(0.5, CITY_Y);
    let city = text(cx, cy, &title_text(&labels.city), &style(sizes.main, 700, 1.0, "middle"));
    canvas.push(zorder::TEXT, city);

    let (x1, y) = canvas.fraction(0.4, DIVIDER_Y);
    let (x2, _) = canvas.fraction(0.6, DIVIDER_Y);
    let divider = Line::new()
        .set("x1", num(x1))
        .set("y1", num(y))
        .set("x2", num(x2))
        .set("y2", num(y))
        .set("stroke", theme.text.to_hex())
        .set("stroke-width", num(sizes.scale));
    canvas.push(zorder::TEXT, divider);

    let (x, y) = canvas.fraction(0.5, COUNTRY_Y);
    let country = text(x, y, &labels.country.to_uppercase(), &style(sizes.sub, 300, 1.0, "middle"));
    canvas.push(zorder::TEXT, country);

    let (x, y) = canvas.fraction(0.5, COORDS_Y);
    let coords = text(x, y, &labels.coordinates, &style(sizes.coords, 400, 0.7, "middle"));
    canvas.push(zorder::TEXT, coords);

    let (x, y) = canvas.fraction(0.98, 0.02);
    let attribution = text(x, y, ATTRIBUTION, &style(sizes.attribution, 300, 0.5, "end"));
    canvas.push(zorder::TEXT, attribution);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::CropLimits;

    #[test]
    fn test_script_detection() {
        assert!(is_latin_script("Paris"));
        assert!(is_latin_script("São Paulo"));
        assert!(!is_latin_script("東京"));
        assert!(!is_latin_script("القاهرة"));
        assert!(is_latin_script(""));
        assert!(is_latin_script("1234"));
    }

    #[test]
    fn test_mostly_latin_mix_is_latin() {
        // 9 Latin letters, 1 Han
        assert!(is_latin_script("Abcdefghi東"));
        // 4 of 5 is exactly 80%, not more
        assert!(!is_latin_script("Abcd東"));
    }

    #[test]
    fn test_spacing() {
        assert_eq!(spaced("Paris"), "P  A  R  I  S");
        assert_eq!(title_text("東京"), "東京");
    }

    #[test]
    fn test_font_sizes_reference_page() {
        let sizes = FontSizes::new(12.0, 16.0, "Paris");
        assert_eq!(sizes.scale, 1.0);
        assert_eq!(sizes.main, 60.0);
        assert_eq!(sizes.sub, 22.0);
        assert_eq!(sizes.coords, 14.0);
        assert_eq!(sizes.attribution, 8.0);
    }

    #[test]
    fn test_long_names_shrink() {
        // 19 characters
        let sizes = FontSizes::new(12.0, 16.0, "Saint-Rémy-de-Prove");
        assert!((sizes.main - 60.0 * 10.0 / 19.0).abs() < 1e-9);

        let tiny = FontSizes::new(12.0, 16.0, &"x".repeat(100));
        assert_eq!(tiny.main, 10.0);
    }

    #[test]
    fn test_attribution_not_scaled() {
        let sizes = FontSizes::new(24.0, 24.0, "Rome");
        assert_eq!(sizes.scale, 2.0);
        assert_eq!(sizes.attribution, 8.0);
    }

    #[test]
    fn test_draw_labels_adds_five_items() {
        let mut canvas = Canvas::new(12.0, 16.0, CropLimits::new(0.0, 0.0, 4000.0, 12.0, 16.0));
        let labels = PosterLabels {
            city: "Lauris".to_string(),
            country: "France".to_string(),
            coordinates: "43.7833° N / 5.3167° E".to_string(),
        };
        draw_labels(&mut canvas, &Theme::terracotta(), &labels, 12.0, 16.0, "Roboto");
        assert_eq!(canvas.len(), 5);

        let svg = canvas.render(Theme::terracotta().bg);
        assert!(svg.contains("L  A  U  R  I  S"));
        assert!(svg.contains("FRANCE"));
        assert!(svg.contains("OpenStreetMap contributors"));
        assert!(svg.contains("text-anchor=\"end\""));
    }
}
