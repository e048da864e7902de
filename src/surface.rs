use std::collections::HashSet;
use std::sync::Arc;

use tiny_skia::{
    FillRule, FilterQuality, LineJoin, Mask, Paint, Path, Pixmap, PixmapMut, PixmapPaint, Stroke,
    StrokeDash, Transform,
};

use crate::font::FontRegistry;
use crate::state::{ClipRegion, FontSpec, StrokeSpec};
use crate::types::Color;

/// Raster quality switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderHints {
    pub antialias: bool,
    pub high_quality: bool,
}

impl Default for RenderHints {
    fn default() -> Self {
        Self {
            antialias: true,
            high_quality: true,
        }
    }
}

/// Placement of an image in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The drawing capabilities the engine needs from an output target.
///
/// Every call carries the full device transform and clip of the active
/// graphics state. Surfaces may cache derived data such as clip masks, but
/// drawing never depends on earlier calls.
pub trait DrawingSurface {
    fn fill_path(&mut self, path: &Path, color: Color, transform: Transform, clip: Option<&ClipRegion>);

    fn stroke_path(
        &mut self,
        path: &Path,
        stroke: &StrokeSpec,
        color: Color,
        transform: Transform,
        clip: Option<&ClipRegion>,
    );

    /// Draws `text` with its baseline starting at `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        color: Color,
        transform: Transform,
        clip: Option<&ClipRegion>,
    );

    fn draw_image(
        &mut self,
        image: &Pixmap,
        placement: ImagePlacement,
        transform: Transform,
        clip: Option<&ClipRegion>,
    );
}

/// Surface drawing into a tiny-skia pixmap.
pub struct PixmapSurface<'a> {
    pixmap: PixmapMut<'a>,
    hints: RenderHints,
    fonts: Option<Arc<FontRegistry>>,
    warned_fonts: HashSet<String>,
    clip_mask: Option<(ClipRegion, Mask)>,
    masks_built: usize,
}

impl<'a> PixmapSurface<'a> {
    pub fn new(pixmap: PixmapMut<'a>, hints: RenderHints, fonts: Option<Arc<FontRegistry>>) -> Self {
        Self {
            pixmap,
            hints,
            fonts,
            warned_fonts: HashSet::new(),
            clip_mask: None,
            masks_built: 0,
        }
    }

    pub fn from_pixmap(pixmap: &'a mut Pixmap, hints: RenderHints) -> Self {
        Self::new(pixmap.as_mut(), hints, None)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn paint(&self, color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = self.hints.antialias;
        paint
    }

    /// Number of clip masks rasterized so far.
    pub fn clip_masks_built(&self) -> usize {
        self.masks_built
    }

    /// Makes the cached mask match `clip`, rasterizing only when the region
    /// changed. Returns whether drawing should use the cached mask.
    fn sync_clip(&mut self, clip: Option<&ClipRegion>) -> bool {
        let Some(clip) = clip else {
            return false;
        };
        if let Some((cached, _)) = &self.clip_mask {
            if cached == clip {
                return true;
            }
        }
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        self.clip_mask = build_clip_mask(clip, width, height, self.hints.antialias)
            .map(|mask| (clip.clone(), mask));
        if self.clip_mask.is_some() {
            self.masks_built += 1;
        }
        self.clip_mask.is_some()
    }
}

impl DrawingSurface for PixmapSurface<'_> {
    fn fill_path(&mut self, path: &Path, color: Color, transform: Transform, clip: Option<&ClipRegion>) {
        let paint = self.paint(color);
        let clipped = self.sync_clip(clip);
        let mask = self.clip_mask.as_ref().filter(|_| clipped).map(|(_, mask)| mask);
        self.pixmap
            .fill_path(path, &paint, FillRule::Winding, transform, mask);
    }

    fn stroke_path(
        &mut self,
        path: &Path,
        stroke: &StrokeSpec,
        color: Color,
        transform: Transform,
        clip: Option<&ClipRegion>,
    ) {
        let paint = self.paint(color);
        let stroke = build_stroke(stroke);
        let clipped = self.sync_clip(clip);
        let mask = self.clip_mask.as_ref().filter(|_| clipped).map(|(_, mask)| mask);
        self.pixmap
            .stroke_path(path, &paint, &stroke, transform, mask);
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        color: Color,
        transform: Transform,
        clip: Option<&ClipRegion>,
    ) {
        if text.is_empty() || font.size <= 0.0 {
            return;
        }
        let glyphs = match self.fonts.as_deref() {
            Some(registry) if registry.resolve(&font.name).is_some() => {
                registry.glyph_paths(&font.name, font.size, text, x, y)
            }
            _ => {
                if self.warned_fonts.insert(font.name.clone()) {
                    log::warn!("font '{}' is not registered; text skipped", font.name);
                }
                return;
            }
        };
        let paint = self.paint(color);
        let clipped = self.sync_clip(clip);
        let mask = self.clip_mask.as_ref().filter(|_| clipped).map(|(_, mask)| mask);
        for glyph in &glyphs {
            self.pixmap
                .fill_path(glyph, &paint, FillRule::Winding, transform, mask);
        }
    }

    fn draw_image(
        &mut self,
        image: &Pixmap,
        placement: ImagePlacement,
        transform: Transform,
        clip: Option<&ClipRegion>,
    ) {
        let src_w = image.width() as f32;
        let src_h = image.height() as f32;
        if src_w <= 0.0 || src_h <= 0.0 || placement.width <= 0.0 || placement.height <= 0.0 {
            return;
        }
        let image_ts = Transform::from_row(
            placement.width / src_w,
            0.0,
            0.0,
            placement.height / src_h,
            placement.x,
            placement.y,
        );
        let mut paint = PixmapPaint::default();
        paint.quality = if self.hints.high_quality {
            FilterQuality::Bicubic
        } else {
            FilterQuality::Nearest
        };
        let clipped = self.sync_clip(clip);
        let mask = self.clip_mask.as_ref().filter(|_| clipped).map(|(_, mask)| mask);
        self.pixmap.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &paint,
            transform.pre_concat(image_ts),
            mask,
        );
    }
}

pub(crate) fn build_clip_mask(
    clip: &ClipRegion,
    width: u32,
    height: u32,
    anti_alias: bool,
) -> Option<Mask> {
    let mut shapes = clip.shapes.iter();
    let first = shapes.next()?;
    let mut mask = Mask::new(width, height)?;
    mask.fill_path(&first.path, FillRule::Winding, anti_alias, first.transform);
    for shape in shapes {
        mask.intersect_path(&shape.path, FillRule::Winding, anti_alias, shape.transform);
    }
    Some(mask)
}

fn build_stroke(spec: &StrokeSpec) -> Stroke {
    let mut stroke = Stroke {
        width: spec.width.max(0.0),
        miter_limit: 10.0,
        line_cap: spec.cap,
        line_join: LineJoin::Miter,
        dash: None,
    };
    if let Some(pattern) = spec.dash.as_ref() {
        let mut pattern: Vec<f32> = pattern.iter().map(|v| v.abs()).collect();
        if pattern.len() % 2 == 1 {
            let copy = pattern.clone();
            pattern.extend(copy);
        }
        stroke.dash = StrokeDash::new(pattern, 0.0);
    }
    stroke
}

/// One call received by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Fill {
        points: Vec<(f32, f32)>,
        color: Color,
        transform: Transform,
        clipped: bool,
    },
    Stroke {
        points: Vec<(f32, f32)>,
        stroke: StrokeSpec,
        color: Color,
        transform: Transform,
        clipped: bool,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        font: FontSpec,
        color: Color,
        transform: Transform,
    },
    Image {
        pixels: (u32, u32),
        placement: ImagePlacement,
        transform: Transform,
    },
}

/// Surface that records calls instead of drawing them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strokes(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Stroke { .. }))
    }

    pub fn fills(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Fill { .. }))
    }
}

fn path_points(path: &Path) -> Vec<(f32, f32)> {
    path.points().iter().map(|p| (p.x, p.y)).collect()
}

impl DrawingSurface for RecordingSurface {
    fn fill_path(&mut self, path: &Path, color: Color, transform: Transform, clip: Option<&ClipRegion>) {
        self.ops.push(DrawOp::Fill {
            points: path_points(path),
            color,
            transform,
            clipped: clip.is_some(),
        });
    }

    fn stroke_path(
        &mut self,
        path: &Path,
        stroke: &StrokeSpec,
        color: Color,
        transform: Transform,
        clip: Option<&ClipRegion>,
    ) {
        self.ops.push(DrawOp::Stroke {
            points: path_points(path),
            stroke: stroke.clone(),
            color,
            transform,
            clipped: clip.is_some(),
        });
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        color: Color,
        transform: Transform,
        _clip: Option<&ClipRegion>,
    ) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            font: font.clone(),
            color,
            transform,
        });
    }

    fn draw_image(
        &mut self,
        image: &Pixmap,
        placement: ImagePlacement,
        transform: Transform,
        _clip: Option<&ClipRegion>,
    ) {
        self.ops.push(DrawOp::Image {
            pixels: (image.width(), image.height()),
            placement,
            transform,
        });
    }
}
