//! Top and bottom fades.
//!
//! Each fade is a page-wide rectangle filled with a vertical linear gradient
//! of one color whose opacity runs from 1 at the page edge to 0 at
//! `height` (a fraction of the page) inward.

use svg::node::element::{LinearGradient, Rectangle, Stop};

use poster_common::Color;

use crate::canvas::{num, Canvas};
use crate::style::zorder;

/// Which page edge a fade starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeEdge {
    Top,
    Bottom,
}

impl FadeEdge {
    fn id(&self) -> &'static str {
        match self {
            FadeEdge::Top => "fade-top",
            FadeEdge::Bottom => "fade-bottom",
        }
    }
}

/// Add one fade. Heights of zero or less draw nothing.
pub fn add_fade(canvas: &mut Canvas, color: Color, edge: FadeEdge, height: f64) {
    if height <= 0.0 {
        return;
    }
    let band = canvas.height() * height.min(1.0);

    // Opaque stop sits on the page edge.
    let (y1, y2, rect_y) = match edge {
        FadeEdge::Bottom => ("1", "0", canvas.height() - band),
        FadeEdge::Top => ("0", "1", 0.0),
    };

    let gradient = LinearGradient::new()
        .set("id", edge.id())
        .set("x1", "0")
        .set("y1", y1)
        .set("x2", "0")
        .set("y2", y2)
        .add(
            Stop::new()
                .set("offset", "0")
                .set("stop-color", color.to_hex())
                .set("stop-opacity", "1"),
        )
        .add(
            Stop::new()
                .set("offset", "1")
                .set("stop-color", color.to_hex())
                .set("stop-opacity", "0"),
        );
    canvas.define(gradient);

    let rect = Rectangle::new()
        .set("x", "0")
        .set("y", num(rect_y))
        .set("width", num(canvas.width()))
        .set("height", num(band))
        .set("fill", format!("url(#{})", edge.id()));
    canvas.push(zorder::GRADIENT, rect);
}

/// Both fades at the same height.
pub fn add_fades(canvas: &mut Canvas, color: Color, height: f64) {
    add_fade(canvas, color, FadeEdge::Bottom, height);
    add_fade(canvas, color, FadeEdge::Top, height);
}
