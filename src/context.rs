use std::ops::{Deref, DerefMut};

use tiny_skia::{PathBuilder, Transform};

use crate::border::{
    paint_border_line, BorderSpec, BorderStyle, LineRect, LineSink, Orientation, Polarity,
};
use crate::error::{RenderError, Result};
use crate::font::FontRegistry;
use crate::image_loader::{ImageLoader, LoadedImage};
use crate::path::CurrentPath;
use crate::state::{BreakOutFrames, GraphicsState, GraphicsStateStack, StrokeSpec};
use crate::surface::{DrawingSurface, ImagePlacement};
use crate::types::{Color, Pt, Rect};

/// Inline/block progression position of the area being painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub ip: Pt,
    pub bp: Pt,
}

impl Position {
    pub const ORIGIN: Position = Position {
        ip: Pt::ZERO,
        bp: Pt::ZERO,
    };
}

/// Everything one page render reads and writes.
///
/// A context lives for exactly one page: the raster producer and the print
/// adapter each build a new one around a fresh state stack.
pub struct PaintContext<'a> {
    surface: &'a mut dyn DrawingSurface,
    state: &'a mut GraphicsStateStack,
    path: CurrentPath,
    position: Position,
    fonts: Option<&'a FontRegistry>,
    images: &'a dyn ImageLoader,
    shade_factor: f32,
    page_index: usize,
}

impl<'a> PaintContext<'a> {
    pub fn new(
        surface: &'a mut dyn DrawingSurface,
        state: &'a mut GraphicsStateStack,
        fonts: Option<&'a FontRegistry>,
        images: &'a dyn ImageLoader,
        shade_factor: f32,
        page_index: usize,
    ) -> Self {
        Self {
            surface,
            state,
            path: CurrentPath::new(),
            position: Position::ORIGIN,
            fonts,
            images,
            shade_factor,
            page_index,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn graphics_state(&self) -> &GraphicsState {
        self.state.current()
    }

    pub fn state_depth(&self) -> usize {
        self.state.depth()
    }

    pub fn fonts(&self) -> Option<&FontRegistry> {
        self.fonts
    }

    pub fn has_current_path(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn save_graphics_state(&mut self) {
        self.state.push();
    }

    pub fn restore_graphics_state(&mut self) -> Result<()> {
        self.state.pop().map(|_| ()).ok_or(RenderError::StateUnderflow)
    }

    pub fn transform(&mut self, transform: Transform) {
        self.state.transform(transform);
    }

    /// Opens a viewport area: saves state, clips to `clip` (points) and
    /// composes `ctm`.
    pub fn start_viewport_area(&mut self, ctm: Transform, clip: Option<LineRect>) {
        self.save_graphics_state();
        if let Some(rect) = clip {
            self.clip_rect(rect.x, rect.y, rect.width, rect.height);
        }
        self.state.transform(ctm);
    }

    pub fn end_viewport_area(&mut self) -> Result<()> {
        self.restore_graphics_state()
    }

    pub fn update_color(&mut self, color: Color) {
        self.state.update_color(color);
    }

    pub fn update_font(&mut self, name: &str, size: f32, variant: Option<&str>) {
        self.state.update_font(name, size, variant);
    }

    pub fn update_stroke(&mut self, width: f32, hint: BorderStyle) {
        self.state.update_stroke(width, hint);
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(x, y);
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> Result<()> {
        self.path.line_to(x, y)
    }

    pub fn close_path(&mut self) -> Result<()> {
        self.path.close_path()
    }

    /// Fills and consumes the current path.
    pub fn fill(&mut self) -> Result<()> {
        if let Some(path) = self.path.take()? {
            let state = self.state.current();
            self.surface
                .fill_path(&path, state.color, state.transform, state.clip.as_ref());
        }
        Ok(())
    }

    /// Intersects the clip with the current path and consumes it.
    pub fn clip(&mut self) -> Result<()> {
        if let Some(path) = self.path.take()? {
            self.state.update_clip(path);
        }
        Ok(())
    }

    pub fn clip_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        match tiny_skia::Rect::from_xywh(x, y, width, height) {
            Some(rect) => self.state.update_clip(PathBuilder::from_rect(rect)),
            None => {
                // Nothing is visible through an empty clip.
                let mut pb = PathBuilder::new();
                pb.move_to(x, y);
                pb.line_to(x, y);
                pb.line_to(x, y);
                pb.close();
                match pb.finish() {
                    Some(path) => self.state.update_clip(path),
                    None => log::warn!("ignoring degenerate clip {width}x{height} at ({x}, {y})"),
                }
            }
        }
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let Some(rect) = tiny_skia::Rect::from_xywh(x, y, width, height) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let state = self.state.current();
        self.surface
            .fill_path(&path, state.color, state.transform, state.clip.as_ref());
    }

    /// Strokes a straight line with the active colour and stroke.
    pub fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<()> {
        let mut pb = PathBuilder::new();
        pb.move_to(x1, y1);
        pb.line_to(x2, y2);
        let Some(path) = pb.finish() else {
            return Ok(());
        };
        let state = self.state.current();
        self.surface.stroke_path(
            &path,
            &state.stroke,
            state.color,
            state.transform,
            state.clip.as_ref(),
        );
        Ok(())
    }

    /// Paints a border segment spanning `(x1, y1)`-`(x2, y2)` in points.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_border_line(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        orientation: Orientation,
        polarity: Polarity,
        style: BorderStyle,
        color: Color,
    ) -> Result<()> {
        let spec = BorderSpec {
            orientation,
            polarity,
            style,
            color,
        };
        let shade = self.shade_factor;
        paint_border_line(LineRect::from_corners(x1, y1, x2, y2), &spec, shade, self)
    }

    /// Draws `text` at baseline point `(x, y)` with the active font and colour.
    pub fn draw_text(&mut self, text: &str, x: f32, y: f32) {
        let state = self.state.current();
        self.surface.draw_text(
            text,
            x,
            y,
            &state.font,
            state.color,
            state.transform,
            state.clip.as_ref(),
        );
    }

    /// Draws the image at `url` into `pos`, which is relative to the current
    /// position.
    pub fn draw_image(&mut self, url: &str, pos: Rect) -> Result<()> {
        let x = (self.position.ip + pos.x).to_f32();
        let y = (self.position.bp + pos.y).to_f32();
        let width = pos.width.to_f32();
        let height = pos.height.to_f32();
        match self.images.load(url) {
            LoadedImage::Bitmap(pixmap) => {
                let state = self.state.current();
                self.surface.draw_image(
                    &pixmap,
                    ImagePlacement {
                        x,
                        y,
                        width,
                        height,
                    },
                    state.transform,
                    state.clip.as_ref(),
                );
                Ok(())
            }
            LoadedImage::Delegated {
                content,
                width: intrinsic_w,
                height: intrinsic_h,
            } => {
                let sx = scale_to(width, intrinsic_w.to_f32());
                let sy = scale_to(height, intrinsic_h.to_f32());
                let saved = self.position;
                self.save_graphics_state();
                self.transform(Transform::from_row(sx, 0.0, 0.0, sy, x, y));
                self.position = Position::ORIGIN;
                let result = content.paint(self);
                self.position = saved;
                let restored = self.restore_graphics_state();
                result.and(restored)
            }
            LoadedImage::Unsupported { mime } => {
                log::warn!("{mime} images are not supported by this renderer: {url}");
                Ok(())
            }
            LoadedImage::Missing => {
                log::warn!("loading of image failed: {url}");
                Ok(())
            }
        }
    }

    /// Escapes to root page coordinates until the guard is dropped.
    pub fn break_out(&mut self) -> BreakOut<'_, 'a> {
        log::debug!("fixed content: breaking out of {} frame(s)", self.state.depth() - 1);
        let frames = self.state.break_out();
        BreakOut {
            ctx: self,
            frames: Some(frames),
        }
    }
}

fn scale_to(target: f32, intrinsic: f32) -> f32 {
    if intrinsic > 0.0 { target / intrinsic } else { 1.0 }
}

impl LineSink for PaintContext<'_> {
    fn set_color(&mut self, color: Color) {
        self.state.update_color(color);
    }

    fn set_stroke(&mut self, stroke: StrokeSpec) {
        self.state.set_stroke(stroke);
    }

    fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<()> {
        PaintContext::stroke_line(self, x1, y1, x2, y2)
    }
}

/// Guard returned by [`PaintContext::break_out`]. Derefs to the context,
/// which paints in root coordinates; dropping it reattaches the detached
/// frames.
pub struct BreakOut<'c, 'a> {
    ctx: &'c mut PaintContext<'a>,
    frames: Option<BreakOutFrames>,
}

impl<'a> Deref for BreakOut<'_, 'a> {
    type Target = PaintContext<'a>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<'a> DerefMut for BreakOut<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for BreakOut<'_, '_> {
    fn drop(&mut self) {
        let Some(frames) = self.frames.take() else {
            return;
        };
        if self.ctx.state.depth() != 1 {
            log::warn!(
                "unbalanced state inside fixed content ({} extra frame(s)); discarding",
                self.ctx.state.depth() - 1
            );
            while self.ctx.state.pop().is_some() {}
        }
        log::debug!("fixed content: restoring {} frame(s)", frames.len());
        self.ctx.state.restore_after_break_out(frames);
    }
}
