//! Paints laid-out page area trees onto raster surfaces.
//!
//! Pages are retained as [`PageViewport`]s by a [`Renderer`], then either
//! rasterized on demand ([`Renderer::get_page_image`]) or painted onto a
//! caller-supplied [`DrawingSurface`] ([`Renderer::print_page`]). Area content
//! drives a [`PaintContext`] that owns the graphics-state stack, the current
//! path and the border/rule painter.

mod area;
mod border;
mod config;
mod context;
mod error;
mod font;
mod image_loader;
mod path;
mod renderer;
mod state;
mod store;
mod surface;
mod types;

pub use area::{
    Area, AreaContent, AreaTree, BlockArea, BorderSegment, BorderSide, BoxBorders, FixedArea,
    ImageArea, LeaderArea, PageViewport, TextArea, TextDecoration, ViewportArea,
};
pub use border::{
    BorderSpec, BorderStyle, LineRect, LineSink, Orientation, Polarity, dash_unit,
    paint_border_line,
};
pub use config::{DEFAULT_SHADE_FACTOR, REFERENCE_PIXEL_UNIT_MM, RasterConfig, RasterConfigBuilder};
pub use context::{BreakOut, PaintContext, Position};
pub use error::{RenderError, Result};
pub use font::{FontRegistry, GlyphPlacement, RegisteredFont};
pub use image_loader::{DefaultImageLoader, ImageLoader, LoadedImage};
pub use path::CurrentPath;
pub use renderer::{DeviceRaster, PrintStatus, Renderer};
pub use state::{
    BreakOutFrames, ClipRegion, ClipShape, FontSpec, GraphicsState, GraphicsStateStack, StrokeSpec,
};
pub use store::PageViewportStore;
pub use surface::{DrawOp, DrawingSurface, ImagePlacement, PixmapSurface, RecordingSurface, RenderHints};
pub use types::{Color, Pt, Rect, Size};

pub use tiny_skia::{LineCap, Pixmap, Transform};
