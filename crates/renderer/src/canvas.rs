//! Poster canvas.
//!
//! Page units are points (1/72 inch). Projected coordinates inside the crop
//! window map linearly onto the page with y flipped. Items carry a z value
//! and are emitted in ascending z; equal z keeps insertion order.

use geo::BoundingRect;
use geo_types::{Coord, LineString, Polygon};
use std::fmt::Write;
use svg::node::element::{Definitions, Path, Rectangle};
use svg::{Document, Node};

use poster_common::Color;

use crate::crop::CropLimits;

/// Points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

struct Item {
    z: f64,
    node: Box<dyn Node>,
}

pub struct Canvas {
    width: f64,
    height: f64,
    window: CropLimits,
    defs: Definitions,
    has_defs: bool,
    items: Vec<Item>,
}

impl Canvas {
    /// Page of `width_in` x `height_in` inches showing `window`.
    pub fn new(width_in: f64, height_in: f64, window: CropLimits) -> Self {
        Self {
            width: width_in * POINTS_PER_INCH,
            height: height_in * POINTS_PER_INCH,
            window,
            defs: Definitions::new(),
            has_defs: false,
            items: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn window(&self) -> &CropLimits {
        &self.window
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Projected meters to page points.
    pub fn to_page(&self, c: Coord<f64>) -> (f64, f64) {
        let (x0, x1) = self.window.x_range();
        let (y0, y1) = self.window.y_range();
        let x = (c.x - x0) / (x1 - x0) * self.width;
        let y = (y1 - c.y) / (y1 - y0) * self.height;
        (x, y)
    }

    /// Page position of a fraction measured from the bottom-left corner.
    pub fn fraction(&self, fx: f64, fy: f64) -> (f64, f64) {
        (fx * self.width, (1.0 - fy) * self.height)
    }

    pub fn push(&mut self, z: f64, node: impl Into<Box<dyn Node>>) {
        self.items.push(Item {
            z,
            node: node.into(),
        });
    }

    pub fn define(&mut self, node: impl Into<Box<dyn Node>>) {
        self.defs.append(node);
        self.has_defs = true;
    }

    /// Fill the whole page.
    pub fn fill_page(&mut self, z: f64, color: Color) {
        let rect = Rectangle::new()
            .set("x", "0")
            .set("y", "0")
            .set("width", num(self.width))
            .set("height", num(self.height))
            .set("fill", color.to_hex());
        self.push(z, rect);
    }

    /// Fill polygons as one even-odd path. Polygons outside the window are
    /// culled. Returns the number drawn.
    pub fn fill_polygons(&mut self, z: f64, polygons: &[Polygon<f64>], color: Color) -> usize {
        let mut d = String::new();
        let mut drawn = 0;
        for polygon in polygons {
            if !self.visible(polygon.exterior()) {
                continue;
            }
            self.ring(&mut d, polygon.exterior());
            for hole in polygon.interiors() {
                self.ring(&mut d, hole);
            }
            drawn += 1;
        }
        if drawn > 0 {
            let path = Path::new()
                .set("d", d)
                .set("fill", color.to_hex())
                .set("fill-rule", "evenodd")
                .set("stroke", "none");
            self.push(z, path);
        }
        drawn
    }

    /// Stroke lines as one path. Returns the number drawn.
    pub fn stroke_lines(&mut self, z: f64, lines: &[LineString<f64>], color: Color, width: f64) -> usize {
        let mut d = String::new();
        let mut drawn = 0;
        for line in lines {
            if line.0.len() < 2 || !self.visible(line) {
                continue;
            }
            self.polyline(&mut d, line);
            drawn += 1;
        }
        if drawn > 0 {
            let path = Path::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", color.to_hex())
                .set("stroke-width", num(width))
                .set("stroke-linecap", "round")
                .set("stroke-linejoin", "round");
            self.push(z, path);
        }
        drawn
    }

    fn visible(&self, line: &LineString<f64>) -> bool {
        line.bounding_rect()
            .map(|rect| self.window.intersects(&rect))
            .unwrap_or(false)
    }

    fn polyline(&self, d: &mut String, line: &LineString<f64>) {
        for (i, c) in line.0.iter().enumerate() {
            let (x, y) = self.to_page(*c);
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{}{:.2} {:.2}", cmd, x, y);
        }
    }

    fn ring(&self, d: &mut String, ring: &LineString<f64>) {
        if ring.0.len() < 3 {
            return;
        }
        self.polyline(d, ring);
        d.push('Z');
    }

    /// Finish the document over a `background` page.
    pub fn into_document(self, background: Color) -> Document {
        let mut items = self.items;
        items.sort_by(|a, b| a.z.total_cmp(&b.z));

        let mut document = Document::new()
            .set("width", num(self.width))
            .set("height", num(self.height))
            .set("viewBox", format!("0 0 {} {}", num(self.width), num(self.height)));
        if self.has_defs {
            document = document.add(self.defs);
        }
        document = document.add(
            Rectangle::new()
                .set("width", "100%")
                .set("height", "100%")
                .set("fill", background.to_hex()),
        );
        for item in items {
            document = document.add(item.node);
        }
        document
    }

    /// Serialized SVG text.
    pub fn render(self, background: Color) -> String {
        self.into_document(background).to_string()
    }
}

/// Fixed-precision number for attribute values.
pub(crate) fn num(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
