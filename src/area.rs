use std::fmt;
use std::sync::Arc;

use tiny_skia::Transform;

use crate::border::{BorderStyle, LineRect, Orientation, Polarity};
use crate::context::{PaintContext, Position};
use crate::error::Result;
use crate::types::{Color, Pt, Rect};

/// Something that can paint itself into a page session.
///
/// Layout output implements this; so do delegated images (vector content the
/// engine paints recursively into the image bounds).
pub trait AreaContent: Send + Sync {
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()>;
}

impl<F> AreaContent for F
where
    F: Fn(&mut PaintContext<'_>) -> Result<()> + Send + Sync,
{
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// One laid-out page: its bounds in points and the content tree.
#[derive(Clone)]
pub struct PageViewport {
    bounds: Rect,
    label: String,
    content: Arc<dyn AreaContent>,
}

impl PageViewport {
    pub fn new(bounds: Rect, content: Arc<dyn AreaContent>) -> Self {
        Self {
            bounds,
            label: String::new(),
            content,
        }
    }

    /// Sets the page number string shown to users.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn content(&self) -> &Arc<dyn AreaContent> {
        &self.content
    }
}

impl fmt::Debug for PageViewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageViewport")
            .field("bounds", &self.bounds)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A border side of a block box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSide {
    pub style: BorderStyle,
    pub color: Color,
    pub width: Pt,
}

impl BorderSide {
    pub fn new(style: BorderStyle, color: Color, width: Pt) -> Self {
        Self {
            style,
            color,
            width,
        }
    }

    fn painted_width(side: Option<&BorderSide>) -> Pt {
        match side {
            Some(side) if side.style != BorderStyle::None && side.style != BorderStyle::Hidden => {
                side.width
            }
            _ => Pt::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxBorders {
    pub before: Option<BorderSide>,
    pub after: Option<BorderSide>,
    pub start: Option<BorderSide>,
    pub end: Option<BorderSide>,
}

impl BoxBorders {
    pub fn all(side: BorderSide) -> Self {
        Self {
            before: Some(side),
            after: Some(side),
            start: Some(side),
            end: Some(side),
        }
    }
}

/// A block box; children are positioned relative to its content origin
/// (inside the before/start borders).
#[derive(Debug, Clone, Default)]
pub struct BlockArea {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
    pub background: Option<Color>,
    pub borders: BoxBorders,
    pub children: Vec<Area>,
}

/// A reference area with its own coordinate system.
#[derive(Debug, Clone)]
pub struct ViewportArea {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
    /// Clip children to the viewport rectangle.
    pub clip: bool,
    /// Applied after translating to `(x, y)`.
    pub ctm: Transform,
    pub children: Vec<Area>,
}

/// Content positioned against the page root, whatever encloses it.
#[derive(Debug, Clone, Default)]
pub struct FixedArea {
    pub x: Pt,
    pub y: Pt,
    pub children: Vec<Area>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextDecoration {
    pub underline: bool,
    pub overline: bool,
    pub line_through: bool,
}

impl TextDecoration {
    fn any(&self) -> bool {
        self.underline || self.overline || self.line_through
    }
}

#[derive(Debug, Clone)]
pub struct TextArea {
    pub x: Pt,
    pub y: Pt,
    /// Advance width of the run, used for decorations.
    pub width: Pt,
    /// Distance from `y` to the baseline. Derived from the font ascent when
    /// unset.
    pub baseline_offset: Option<Pt>,
    pub font: String,
    pub size: Pt,
    pub color: Color,
    pub text: String,
    pub decoration: TextDecoration,
}

/// A rule filling inline space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderArea {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub thickness: Pt,
    pub style: BorderStyle,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageArea {
    pub url: String,
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

/// A single border line given by its two corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSegment {
    pub x1: Pt,
    pub y1: Pt,
    pub x2: Pt,
    pub y2: Pt,
    pub orientation: Orientation,
    pub polarity: Polarity,
    pub style: BorderStyle,
    pub color: Color,
}

/// The area tree node kinds the painter understands. Coordinates are points
/// relative to the enclosing area's content origin.
#[derive(Debug, Clone)]
pub enum Area {
    Block(BlockArea),
    Viewport(ViewportArea),
    Fixed(FixedArea),
    Text(TextArea),
    Leader(LeaderArea),
    Image(ImageArea),
    Border(BorderSegment),
}

/// Root of a page's content.
#[derive(Debug, Clone, Default)]
pub struct AreaTree {
    pub areas: Vec<Area>,
}

impl AreaTree {
    pub fn new(areas: Vec<Area>) -> Self {
        Self { areas }
    }
}

impl AreaContent for AreaTree {
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
        paint_areas(ctx, &self.areas)
    }
}

impl AreaContent for Area {
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
        paint_area(ctx, self)
    }
}

fn paint_areas(ctx: &mut PaintContext<'_>, areas: &[Area]) -> Result<()> {
    for area in areas {
        paint_area(ctx, area)?;
    }
    Ok(())
}

fn paint_area(ctx: &mut PaintContext<'_>, area: &Area) -> Result<()> {
    match area {
        Area::Block(block) => paint_block(ctx, block),
        Area::Viewport(viewport) => paint_viewport(ctx, viewport),
        Area::Fixed(fixed) => paint_fixed(ctx, fixed),
        Area::Text(text) => paint_text(ctx, text),
        Area::Leader(leader) => paint_leader(ctx, leader),
        Area::Image(image) => ctx.draw_image(
            &image.url,
            Rect::new(image.x, image.y, image.width, image.height),
        ),
        Area::Border(segment) => {
            let origin = ctx.position();
            ctx.draw_border_line(
                (origin.ip + segment.x1).to_f32(),
                (origin.bp + segment.y1).to_f32(),
                (origin.ip + segment.x2).to_f32(),
                (origin.bp + segment.y2).to_f32(),
                segment.orientation,
                segment.polarity,
                segment.style,
                segment.color,
            )
        }
    }
}

fn paint_block(ctx: &mut PaintContext<'_>, block: &BlockArea) -> Result<()> {
    let saved = ctx.position();
    let sx = (saved.ip + block.x).to_f32();
    let sy = (saved.bp + block.y).to_f32();
    let w = block.width.to_f32();
    let h = block.height.to_f32();
    let ex = sx + w;
    let ey = sy + h;

    let bt = BorderSide::painted_width(block.borders.before.as_ref());
    let bb = BorderSide::painted_width(block.borders.after.as_ref());
    let bs = BorderSide::painted_width(block.borders.start.as_ref());
    let be = BorderSide::painted_width(block.borders.end.as_ref());

    if let Some(background) = block.background {
        ctx.save_graphics_state();
        ctx.update_color(background);
        ctx.fill_rect(
            sx + bs.to_f32(),
            sy + bt.to_f32(),
            w - bs.to_f32() - be.to_f32(),
            h - bt.to_f32() - bb.to_f32(),
        );
        ctx.restore_graphics_state()?;
    }

    let sides = [
        (
            block.borders.before,
            (sx, sy, ex, sy + bt.to_f32()),
            Orientation::Horizontal,
            Polarity::StartOrBefore,
        ),
        (
            block.borders.after,
            (sx, ey - bb.to_f32(), ex, ey),
            Orientation::Horizontal,
            Polarity::EndOrAfter,
        ),
        (
            block.borders.start,
            (sx, sy, sx + bs.to_f32(), ey),
            Orientation::Vertical,
            Polarity::StartOrBefore,
        ),
        (
            block.borders.end,
            (ex - be.to_f32(), sy, ex, ey),
            Orientation::Vertical,
            Polarity::EndOrAfter,
        ),
    ];
    for (side, (x1, y1, x2, y2), orientation, polarity) in sides {
        let Some(side) = side else { continue };
        if side.width <= Pt::ZERO {
            continue;
        }
        ctx.save_graphics_state();
        let painted =
            ctx.draw_border_line(x1, y1, x2, y2, orientation, polarity, side.style, side.color);
        ctx.restore_graphics_state()?;
        painted?;
    }

    ctx.set_position(Position {
        ip: saved.ip + block.x + bs,
        bp: saved.bp + block.y + bt,
    });
    let result = paint_areas(ctx, &block.children);
    ctx.set_position(saved);
    result
}

fn paint_viewport(ctx: &mut PaintContext<'_>, viewport: &ViewportArea) -> Result<()> {
    let saved = ctx.position();
    let x = (saved.ip + viewport.x).to_f32();
    let y = (saved.bp + viewport.y).to_f32();
    let clip = viewport.clip.then(|| {
        LineRect::new(x, y, viewport.width.to_f32(), viewport.height.to_f32())
    });
    ctx.start_viewport_area(
        Transform::from_translate(x, y).pre_concat(viewport.ctm),
        clip,
    );
    ctx.set_position(Position::ORIGIN);
    let result = paint_areas(ctx, &viewport.children);
    ctx.set_position(saved);
    let ended = ctx.end_viewport_area();
    result.and(ended)
}

fn paint_fixed(ctx: &mut PaintContext<'_>, fixed: &FixedArea) -> Result<()> {
    let saved = ctx.position();
    let result = {
        let mut root = ctx.break_out();
        root.set_position(Position {
            ip: fixed.x,
            bp: fixed.y,
        });
        paint_areas(&mut root, &fixed.children)
    };
    ctx.set_position(saved);
    result
}

fn paint_text(ctx: &mut PaintContext<'_>, text: &TextArea) -> Result<()> {
    let origin = ctx.position();
    let size = text.size.to_f32();
    let (ascent, descent) = match ctx.fonts().and_then(|fonts| fonts.resolve(&text.font)) {
        Some(font) => (font.ascender(size), font.descender(size)),
        None => (size * 0.8, size * 0.2),
    };
    let x = (origin.ip + text.x).to_f32();
    let baseline = match text.baseline_offset {
        Some(offset) => (origin.bp + text.y + offset).to_f32(),
        None => (origin.bp + text.y).to_f32() + ascent,
    };

    ctx.save_graphics_state();
    ctx.update_color(text.color);
    ctx.update_font(&text.font, size, None);
    ctx.draw_text(&text.text, x, baseline);
    let decorated = if text.decoration.any() {
        paint_text_decoration(ctx, text, x, baseline, descent, size)
    } else {
        Ok(())
    };
    ctx.restore_graphics_state()?;
    decorated
}

fn paint_text_decoration(
    ctx: &mut PaintContext<'_>,
    text: &TextArea,
    x: f32,
    baseline: f32,
    descent: f32,
    size: f32,
) -> Result<()> {
    let cap_height = size * 0.7;
    let thickness = (descent / 8.0).max(0.1);
    let end = x + text.width.to_f32();
    let mut lines = Vec::new();
    if text.decoration.underline {
        lines.push(baseline + descent / 2.0);
    }
    if text.decoration.overline {
        lines.push(baseline - 1.1 * cap_height);
    }
    if text.decoration.line_through {
        lines.push(baseline - 0.45 * cap_height);
    }
    for center in lines {
        let top = center - thickness / 2.0;
        ctx.draw_border_line(
            x,
            top,
            end,
            top + thickness,
            Orientation::Horizontal,
            Polarity::StartOrBefore,
            BorderStyle::Solid,
            text.color,
        )?;
    }
    Ok(())
}

fn paint_leader(ctx: &mut PaintContext<'_>, leader: &LeaderArea) -> Result<()> {
    let origin = ctx.position();
    let sx = (origin.ip + leader.x).to_f32();
    let sy = (origin.bp + leader.y).to_f32();
    let ex = sx + leader.width.to_f32();
    let thickness = leader.thickness.to_f32();
    let color = leader.color;

    ctx.save_graphics_state();
    let painted = match leader.style {
        BorderStyle::None | BorderStyle::Hidden => Ok(()),
        BorderStyle::Dotted => {
            ctx.update_color(color);
            ctx.update_stroke(thickness, BorderStyle::Dotted);
            let mid = sy + thickness / 2.0;
            ctx.stroke_line(sx, mid, ex, mid)
        }
        BorderStyle::Groove | BorderStyle::Ridge => {
            paint_bevelled_rule(ctx, leader.style, sx, sy, ex, thickness, color)
        }
        style => ctx.draw_border_line(
            sx,
            sy,
            ex,
            sy + thickness,
            Orientation::Horizontal,
            Polarity::StartOrBefore,
            style,
            color,
        ),
    };
    ctx.restore_graphics_state()?;
    painted
}

// Groove and ridge rules are two filled shapes: the whole rule in a light
// tint, then the darker bevel on top.
fn paint_bevelled_rule(
    ctx: &mut PaintContext<'_>,
    style: BorderStyle,
    sx: f32,
    sy: f32,
    ex: f32,
    thickness: f32,
    color: Color,
) -> Result<()> {
    let half = thickness / 2.0;
    ctx.update_color(color.lighten(0.6));
    ctx.move_to(sx, sy);
    ctx.line_to(ex, sy)?;
    ctx.line_to(ex, sy + 2.0 * half)?;
    ctx.line_to(sx, sy + 2.0 * half)?;
    ctx.close_path()?;
    ctx.fill()?;

    ctx.update_color(color);
    if style == BorderStyle::Groove {
        ctx.move_to(sx, sy);
        ctx.line_to(ex, sy)?;
        ctx.line_to(ex, sy + half)?;
        ctx.line_to(sx + half, sy + half)?;
        ctx.line_to(sx, sy + 2.0 * half)?;
    } else {
        ctx.move_to(ex, sy);
        ctx.line_to(ex, sy + 2.0 * half)?;
        ctx.line_to(sx, sy + 2.0 * half)?;
        ctx.line_to(sx, sy + half)?;
        ctx.line_to(ex - half, sy + half)?;
    }
    ctx.close_path()?;
    ctx.fill()
}
