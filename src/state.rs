use std::fmt;

use tiny_skia::{LineCap, Path, Transform};

use crate::border::BorderStyle;
use crate::types::Color;

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeSpec {
    pub width: f32,
    pub cap: LineCap,
    pub dash: Option<Vec<f32>>,
}

impl StrokeSpec {
    pub fn solid(width: f32) -> Self {
        Self {
            width: width.max(0.0),
            cap: LineCap::Butt,
            dash: None,
        }
    }

    pub fn dashed(width: f32, dash: Vec<f32>, cap: LineCap) -> Self {
        Self {
            width: width.max(0.0),
            cap,
            dash: Some(dash),
        }
    }

    /// Stroke used for rules drawn directly with a line style hint.
    pub fn for_style(width: f32, hint: BorderStyle) -> Self {
        let width = width.max(0.0);
        match hint {
            BorderStyle::Dotted => Self::dashed(width, vec![0.0, 2.0 * width], LineCap::Round),
            BorderStyle::Dashed => {
                Self::dashed(width, vec![2.0 * width, 2.0 * width], LineCap::Butt)
            }
            _ => Self::solid(width),
        }
    }
}

impl Default for StrokeSpec {
    fn default() -> Self {
        Self::solid(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub name: String,
    pub size: f32,
    pub variant: Option<String>,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            name: "Helvetica".to_string(),
            size: 12.0,
            variant: None,
        }
    }
}

/// One clip shape, frozen in device space at the time it was applied.
#[derive(Clone)]
pub struct ClipShape {
    pub path: Path,
    pub transform: Transform,
}

impl PartialEq for ClipShape {
    fn eq(&self, other: &Self) -> bool {
        self.transform == other.transform
            && self.path.verbs() == other.path.verbs()
            && self.path.points() == other.path.points()
    }
}

impl fmt::Debug for ClipShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipShape")
            .field("bounds", &self.path.bounds())
            .field("transform", &self.transform)
            .finish()
    }
}

/// Intersection of every shape in `shapes`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipRegion {
    pub shapes: Vec<ClipShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    pub transform: Transform,
    pub clip: Option<ClipRegion>,
    pub color: Color,
    pub stroke: StrokeSpec,
    pub font: FontSpec,
}

impl GraphicsState {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            clip: None,
            color: Color::BLACK,
            stroke: StrokeSpec::default(),
            font: FontSpec::default(),
        }
    }
}

/// Frames detached by [`GraphicsStateStack::break_out`], outermost first.
#[must_use = "break-out frames must be handed back to restore_after_break_out"]
#[derive(Debug)]
pub struct BreakOutFrames {
    frames: Vec<GraphicsState>,
}

impl BreakOutFrames {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// LIFO stack of graphics states. `frames[0]` is the root and is never
/// popped; the last frame is the active one.
#[derive(Debug, Clone)]
pub struct GraphicsStateStack {
    frames: Vec<GraphicsState>,
}

impl GraphicsStateStack {
    pub fn new(root_transform: Transform) -> Self {
        Self::from_root(GraphicsState::new(root_transform))
    }

    pub fn from_root(root: GraphicsState) -> Self {
        Self { frames: vec![root] }
    }

    /// Number of frames, including the root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> &GraphicsState {
        // frames is never empty: pop() refuses to remove the root.
        &self.frames[self.frames.len() - 1]
    }

    fn current_mut(&mut self) -> &mut GraphicsState {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    pub fn push(&mut self) {
        let copy = self.current().clone();
        self.frames.push(copy);
    }

    /// Discards the active frame. Returns `None` when only the root is left.
    pub fn pop(&mut self) -> Option<GraphicsState> {
        if self.frames.len() <= 1 {
            return None;
        }
        self.frames.pop()
    }

    /// Composes `transform` into the active frame; it applies before the
    /// existing transform.
    pub fn transform(&mut self, transform: Transform) {
        let state = self.current_mut();
        state.transform = state.transform.pre_concat(transform);
    }

    /// Intersects the active clip with `path`, given in current user space.
    pub fn update_clip(&mut self, path: Path) {
        let state = self.current_mut();
        let shape = ClipShape {
            path,
            transform: state.transform,
        };
        state
            .clip
            .get_or_insert_with(ClipRegion::default)
            .shapes
            .push(shape);
    }

    pub fn update_color(&mut self, color: Color) -> bool {
        let state = self.current_mut();
        if state.color == color {
            return false;
        }
        state.color = color;
        true
    }

    pub fn update_stroke(&mut self, width: f32, hint: BorderStyle) -> bool {
        self.set_stroke(StrokeSpec::for_style(width, hint))
    }

    pub fn set_stroke(&mut self, stroke: StrokeSpec) -> bool {
        let state = self.current_mut();
        if state.stroke == stroke {
            return false;
        }
        state.stroke = stroke;
        true
    }

    pub fn update_font(&mut self, name: &str, size: f32, variant: Option<&str>) -> bool {
        let state = self.current_mut();
        if state.font.name == name
            && state.font.size == size
            && state.font.variant.as_deref() == variant
        {
            return false;
        }
        state.font = FontSpec {
            name: name.to_string(),
            size,
            variant: variant.map(str::to_string),
        };
        true
    }

    /// Pops every frame above the root so drawing happens in root space.
    pub fn break_out(&mut self) -> BreakOutFrames {
        let mut frames = Vec::with_capacity(self.frames.len().saturating_sub(1));
        while let Some(frame) = self.pop() {
            log::debug!("break-out: detaching frame at depth {}", self.depth() + 1);
            frames.push(frame);
        }
        frames.reverse();
        BreakOutFrames { frames }
    }

    pub fn restore_after_break_out(&mut self, saved: BreakOutFrames) {
        for frame in saved.frames {
            log::debug!("break-out: restoring frame at depth {}", self.depth() + 1);
            self.frames.push(frame);
        }
    }
}
