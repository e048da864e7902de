//! Border and rule line painting.
//!
//! Every line style is reduced to one or more straight strokes along the
//! centre lines of the segment rectangle. The painter only talks to a
//! [`LineSink`], so it works the same against the raster engine and a
//! recording sink.

use tiny_skia::LineCap;

use crate::error::Result;
use crate::state::StrokeSpec;
use crate::types::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderStyle {
    None,
    Hidden,
    Solid,
    Dashed,
    Dotted,
    Double,
    Groove,
    Ridge,
    Inset,
    Outset,
}

impl BorderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderStyle::None => "none",
            BorderStyle::Hidden => "hidden",
            BorderStyle::Solid => "solid",
            BorderStyle::Dashed => "dashed",
            BorderStyle::Dotted => "dotted",
            BorderStyle::Double => "double",
            BorderStyle::Groove => "groove",
            BorderStyle::Ridge => "ridge",
            BorderStyle::Inset => "inset",
            BorderStyle::Outset => "outset",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(BorderStyle::None),
            "hidden" => Some(BorderStyle::Hidden),
            "solid" => Some(BorderStyle::Solid),
            "dashed" => Some(BorderStyle::Dashed),
            "dotted" => Some(BorderStyle::Dotted),
            "double" => Some(BorderStyle::Double),
            "groove" => Some(BorderStyle::Groove),
            "ridge" => Some(BorderStyle::Ridge),
            "inset" => Some(BorderStyle::Inset),
            "outset" => Some(BorderStyle::Outset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Which logical edge a segment sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    StartOrBefore,
    EndOrAfter,
}

/// Resolved attributes of one border segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSpec {
    pub orientation: Orientation,
    pub polarity: Polarity,
    pub style: BorderStyle,
    pub color: Color,
}

/// Bounding rectangle of a line segment, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LineRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }
}

/// Receiver of the painter's colour/stroke updates and strokes.
pub trait LineSink {
    fn set_color(&mut self, color: Color);
    fn set_stroke(&mut self, stroke: StrokeSpec);
    fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<()>;
}

/// Computes the dash period for a line of `length` and `thickness`.
///
/// Returns the unit and the odd repeat count, so the line begins and ends
/// with a dash. `None` for degenerate lines.
pub fn dash_unit(length: f32, thickness: f32) -> Option<(f32, u32)> {
    let base = (2.0 * thickness).abs();
    if !(base > 0.0) || !(length > 0.0) || !length.is_finite() {
        return None;
    }
    let mut rep = (length / base) as u32;
    if rep % 2 == 0 {
        rep += 1;
    }
    Some((length / rep as f32, rep))
}

struct Axis {
    orientation: Orientation,
    rect: LineRect,
}

impl Axis {
    fn thickness(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.rect.height,
            Orientation::Vertical => self.rect.width,
        }
    }

    fn length(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.rect.width,
            Orientation::Vertical => self.rect.height,
        }
    }

    // Stroke along the segment at `offset` from the near edge.
    fn stroke_at(&self, sink: &mut dyn LineSink, offset: f32) -> Result<()> {
        let r = self.rect;
        match self.orientation {
            Orientation::Horizontal => {
                let y = r.y + offset;
                sink.stroke_line(r.x, y, r.x + r.width, y)
            }
            Orientation::Vertical => {
                let x = r.x + offset;
                sink.stroke_line(x, r.y, x, r.y + r.height)
            }
        }
    }
}

/// Paints one border or rule segment.
///
/// `shade` is the lighten/darken factor for groove, ridge, inset and
/// outset. Rectangles with a negative extent are logged and skipped.
pub fn paint_border_line(
    rect: LineRect,
    spec: &BorderSpec,
    shade: f32,
    sink: &mut dyn LineSink,
) -> Result<()> {
    if rect.width < 0.0 || rect.height < 0.0 {
        log::error!(
            "negative extent {}x{} received; {} border won't be painted",
            rect.width,
            rect.height,
            spec.style.as_str()
        );
        return Ok(());
    }
    let axis = Axis {
        orientation: spec.orientation,
        rect,
    };
    let t = axis.thickness();
    let color = spec.color;

    match spec.style {
        BorderStyle::Hidden | BorderStyle::None => Ok(()),
        BorderStyle::Dashed => match dash_unit(axis.length(), t) {
            Some((unit, _)) => {
                sink.set_color(color);
                sink.set_stroke(StrokeSpec::dashed(t, vec![unit, unit], LineCap::Butt));
                axis.stroke_at(sink, t / 2.0)
            }
            None => solid(&axis, color, sink),
        },
        BorderStyle::Dotted => match dash_unit(axis.length(), t) {
            Some((unit, _)) => {
                sink.set_color(color);
                sink.set_stroke(StrokeSpec::dashed(t, vec![0.0, unit], LineCap::Round));
                axis.stroke_at(sink, t / 2.0)
            }
            None => solid(&axis, color, sink),
        },
        BorderStyle::Double => {
            let t3 = t / 3.0;
            sink.set_color(color);
            sink.set_stroke(StrokeSpec::solid(t3));
            axis.stroke_at(sink, t3 / 2.0)?;
            axis.stroke_at(sink, t3 / 2.0 + 2.0 * t3)
        }
        BorderStyle::Groove | BorderStyle::Ridge => {
            let factor = if spec.style == BorderStyle::Groove {
                shade
            } else {
                -shade
            };
            let t3 = t / 3.0;
            let first = t3 / 2.0;
            sink.set_stroke(StrokeSpec::solid(t3));
            sink.set_color(color.lighten(factor));
            axis.stroke_at(sink, first)?;
            sink.set_color(color);
            axis.stroke_at(sink, first + t3)?;
            sink.set_color(color.lighten(-factor));
            axis.stroke_at(sink, first + 2.0 * t3)
        }
        BorderStyle::Inset | BorderStyle::Outset => {
            let factor = if spec.style == BorderStyle::Outset {
                shade
            } else {
                -shade
            };
            let sign = match spec.polarity {
                Polarity::StartOrBefore => 1.0,
                Polarity::EndOrAfter => -1.0,
            };
            sink.set_color(color.lighten(sign * factor));
            sink.set_stroke(StrokeSpec::solid(t));
            axis.stroke_at(sink, t / 2.0)
        }
        BorderStyle::Solid => solid(&axis, color, sink),
    }
}

fn solid(axis: &Axis, color: Color, sink: &mut dyn LineSink) -> Result<()> {
    let t = axis.thickness();
    sink.set_color(color);
    sink.set_stroke(StrokeSpec::solid(t));
    axis.stroke_at(sink, t / 2.0)
}
