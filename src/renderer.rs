use std::sync::Arc;

use tiny_skia::{Pixmap, Transform};

use crate::area::PageViewport;
use crate::border::BorderStyle;
use crate::config::RasterConfig;
use crate::context::PaintContext;
use crate::error::{RenderError, Result};
use crate::font::FontRegistry;
use crate::image_loader::{DefaultImageLoader, ImageLoader};
use crate::state::{GraphicsState, GraphicsStateStack};
use crate::store::PageViewportStore;
use crate::surface::{DrawingSurface, PixmapSurface, RenderHints};
use crate::types::Color;

/// Outcome of [`Renderer::print_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStatus {
    PageExists,
    NoSuchPage,
}

/// A rasterized page.
#[derive(Debug, Clone)]
pub struct DeviceRaster {
    pixmap: Pixmap,
    page_index: usize,
    scale: f64,
}

impl DeviceRaster {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Points-to-pixels factor the page was produced with.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Straight-alpha RGBA of one pixel.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let px = self.pixmap.pixel(x, y)?.demultiply();
        Some([px.red(), px.green(), px.blue(), px.alpha()])
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|err| RenderError::Image(format!("png encode failed: {err}")))
    }
}

/// Retains laid-out pages and turns them into page images or print output.
pub struct Renderer {
    config: RasterConfig,
    fonts: Option<Arc<FontRegistry>>,
    images: Arc<dyn ImageLoader>,
    store: PageViewportStore,
    current_page_number: usize,
    number_of_pages: usize,
    rendering_done: bool,
    active_viewport: Option<usize>,
    state: GraphicsStateStack,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RasterConfig::default())
    }
}

impl Renderer {
    pub fn new(config: RasterConfig) -> Self {
        Self {
            config,
            fonts: None,
            images: Arc::new(DefaultImageLoader::new()),
            store: PageViewportStore::new(),
            current_page_number: 0,
            number_of_pages: 0,
            rendering_done: false,
            active_viewport: None,
            state: GraphicsStateStack::new(Transform::identity()),
        }
    }

    pub fn with_fonts(mut self, fonts: Arc<FontRegistry>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn with_image_loader(mut self, images: Arc<dyn ImageLoader>) -> Self {
        self.images = images;
        self
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    pub fn start_renderer(&mut self) {
        log::debug!("renderer started");
        self.rendering_done = false;
    }

    /// Retains `viewport` for later page-image or print requests.
    pub fn render_page(&mut self, viewport: PageViewport) {
        let index = self.store.push(viewport);
        self.current_page_number += 1;
        log::debug!("retained page {} for rendering", index + 1);
    }

    /// Marks the document complete and fixes the page count.
    pub fn stop_renderer(&mut self) -> Result<()> {
        self.rendering_done = true;
        self.number_of_pages = self.current_page_number;
        if self.number_of_pages == 0 {
            return Err(RenderError::NoPagesRendered);
        }
        log::debug!("renderer stopped after {} page(s)", self.number_of_pages);
        Ok(())
    }

    pub fn is_rendering_done(&self) -> bool {
        self.rendering_done
    }

    pub fn current_page_number(&self) -> usize {
        self.current_page_number
    }

    pub fn set_current_page_number(&mut self, page_number: usize) {
        self.current_page_number = page_number;
    }

    /// Page count fixed by [`Renderer::stop_renderer`].
    pub fn number_of_pages(&self) -> usize {
        self.number_of_pages
    }

    /// Pages currently retained.
    pub fn page_count(&self) -> usize {
        self.store.len()
    }

    pub fn page_viewport(&self, index: usize) -> Result<&PageViewport> {
        self.store.get(index)
    }

    /// Drops every retained page; the next page rendered is page 1 again.
    pub fn clear_viewport_list(&mut self) {
        self.store.clear();
        self.current_page_number = 0;
    }

    /// Like [`Renderer::clear_viewport_list`], and also forgets the fixed
    /// page count, the completion flag and the image loader's cache.
    pub fn clear_all(&mut self) {
        self.clear_viewport_list();
        self.number_of_pages = 0;
        self.rendering_done = false;
        self.images.clear();
    }

    /// The renderer's current graphics state: the root frame installed by
    /// the last `produce`, or identity before any page was produced.
    pub fn graphics_state(&self) -> &GraphicsState {
        self.state.current()
    }

    pub fn state_depth(&self) -> usize {
        self.state.depth()
    }

    /// Index of the page being produced, if any.
    pub fn active_viewport(&self) -> Option<usize> {
        self.active_viewport
    }

    pub fn get_page_image(&mut self, index: usize) -> Result<DeviceRaster> {
        let viewport = self.store.get(index)?.clone();
        self.produce(&viewport, index)
    }

    /// Rasterizes `viewport` at the configured scale.
    pub fn produce(&mut self, viewport: &PageViewport, page_index: usize) -> Result<DeviceRaster> {
        self.active_viewport = Some(page_index);
        let result = self.produce_inner(viewport, page_index);
        self.active_viewport = None;
        result
    }

    fn produce_inner(&mut self, viewport: &PageViewport, page_index: usize) -> Result<DeviceRaster> {
        let bounds = viewport.bounds();
        let page_width = bounds.width.to_milli_i64() as f64 / 1000.0;
        let page_height = bounds.height.to_milli_i64() as f64 / 1000.0;
        let scale = self.config.device_scale();
        let width_px = (page_width * scale).round() as i64;
        let height_px = (page_height * scale).round() as i64;
        let allocation_error = RenderError::RasterAllocation {
            width: width_px,
            height: height_px,
        };
        let (Ok(width), Ok(height)) = (u32::try_from(width_px), u32::try_from(height_px)) else {
            return Err(allocation_error);
        };
        let mut pixmap = Pixmap::new(width, height).ok_or(allocation_error)?;

        let label = if viewport.label().is_empty() {
            (page_index + 1).to_string()
        } else {
            viewport.label().to_string()
        };
        log::info!("rendering page {label} at {width}x{height} px (scale {scale:.4})");

        let hints = RenderHints {
            antialias: self.config.antialiasing(),
            high_quality: self.config.quality_rendering(),
        };
        let root = Transform::from_scale(scale as f32, scale as f32);
        self.state = GraphicsStateStack::new(root);
        {
            let mut surface = PixmapSurface::new(pixmap.as_mut(), hints, self.fonts.clone());
            let mut ctx = PaintContext::new(
                &mut surface,
                &mut self.state,
                self.fonts.as_deref(),
                self.images.as_ref(),
                self.config.shade_factor(),
                page_index,
            );
            if self.config.page_frame() {
                draw_page_frame(&mut ctx, page_width as f32, page_height as f32)?;
            }
            viewport.content().paint(&mut ctx)?;
        }

        Ok(DeviceRaster {
            pixmap,
            page_index,
            scale,
        })
    }

    /// Paints page `index` onto a caller-supplied surface.
    ///
    /// The renderer's own state is set aside for the duration and put back
    /// afterwards, whether or not painting succeeds.
    pub fn print_page(
        &mut self,
        index: usize,
        surface: &mut dyn DrawingSurface,
        base_transform: Transform,
    ) -> Result<PrintStatus> {
        let Ok(viewport) = self.store.get(index) else {
            log::debug!("print requested for page {index}; no such page");
            return Ok(PrintStatus::NoSuchPage);
        };
        let viewport = viewport.clone();
        let saved = std::mem::replace(&mut self.state, GraphicsStateStack::new(base_transform));
        let result = {
            let mut ctx = PaintContext::new(
                surface,
                &mut self.state,
                self.fonts.as_deref(),
                self.images.as_ref(),
                self.config.shade_factor(),
                index,
            );
            viewport.content().paint(&mut ctx)
        };
        self.state = saved;
        result.map(|()| PrintStatus::PageExists)
    }
}

// White page with a black outline and a two-pixel drop shadow.
fn draw_page_frame(ctx: &mut PaintContext<'_>, w: f32, h: f32) -> Result<()> {
    ctx.save_graphics_state();
    ctx.update_color(Color::WHITE);
    ctx.fill_rect(0.0, 0.0, w, h);

    ctx.update_color(Color::BLACK);
    ctx.update_stroke(1.0, BorderStyle::Solid);
    let lines = [
        (-1.0, -1.0, w + 1.0, -1.0),
        (w + 1.0, -1.0, w + 1.0, h + 1.0),
        (w + 1.0, h + 1.0, -1.0, h + 1.0),
        (-1.0, h + 1.0, -1.0, -1.0),
        (w + 2.0, 0.0, w + 2.0, h + 2.0),
        (w + 3.0, 1.0, w + 3.0, h + 3.0),
        (0.0, h + 2.0, w + 2.0, h + 2.0),
        (1.0, h + 3.0, w + 3.0, h + 3.0),
    ];
    for (x1, y1, x2, y2) in lines {
        ctx.stroke_line(x1, y1, x2, y2)?;
    }
    ctx.restore_graphics_state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{Area, AreaContent, AreaTree, BlockArea};
    use crate::surface::{DrawOp, RecordingSurface};
    use crate::types::{Pt, Rect, Size};

    fn page(width: i32, height: i32, content: Arc<dyn AreaContent>) -> PageViewport {
        PageViewport::new(
            Rect::from_size(Size {
                width: Pt::from_i32(width),
                height: Pt::from_i32(height),
            }),
            content,
        )
    }

    fn empty_page(width: i32, height: i32) -> PageViewport {
        page(width, height, Arc::new(AreaTree::default()))
    }

    fn reference_config() -> RasterConfig {
        RasterConfig::builder().build().unwrap()
    }

    #[test]
    fn lifecycle_counts_pages() {
        let mut renderer = Renderer::new(reference_config());
        renderer.start_renderer();
        renderer.render_page(empty_page(10, 10));
        renderer.render_page(empty_page(10, 10));
        assert_eq!(renderer.current_page_number(), 2);
        assert_eq!(renderer.number_of_pages(), 0);
        renderer.stop_renderer().unwrap();
        assert!(renderer.is_rendering_done());
        assert_eq!(renderer.number_of_pages(), 2);
        assert_eq!(renderer.page_count(), 2);
    }

    #[test]
    fn stopping_without_pages_fails() {
        let mut renderer = Renderer::default();
        renderer.start_renderer();
        assert!(matches!(
            renderer.stop_renderer(),
            Err(RenderError::NoPagesRendered)
        ));
        assert!(renderer.is_rendering_done());
    }

    #[test]
    fn page_image_has_reference_dimensions_and_frame() {
        let mut renderer = Renderer::new(reference_config());
        renderer.render_page(empty_page(20, 10));
        let raster = renderer.get_page_image(0).unwrap();
        assert_eq!((raster.width(), raster.height()), (20, 10));
        assert_eq!(raster.pixel_rgba(10, 5), Some([255, 255, 255, 255]));
        assert_eq!(raster.page_index(), 0);
        assert!(renderer.active_viewport().is_none());
        assert_eq!(renderer.state_depth(), 1);
        assert_eq!(renderer.graphics_state().transform, Transform::identity());
    }

    #[test]
    fn frame_can_be_disabled() {
        let config = RasterConfig::builder().page_frame(false).build().unwrap();
        let mut renderer = Renderer::new(config);
        renderer.render_page(empty_page(4, 4));
        let raster = renderer.get_page_image(0).unwrap();
        assert_eq!(raster.pixel_rgba(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn half_scale_halves_dimensions() {
        let config = RasterConfig::builder().scale_factor(0.5).build().unwrap();
        let mut renderer = Renderer::new(config);
        renderer.render_page(empty_page(200, 100));
        let raster = renderer.get_page_image(0).unwrap();
        assert_eq!((raster.width(), raster.height()), (100, 50));
        assert_eq!(
            renderer.graphics_state().transform,
            Transform::from_scale(0.5, 0.5)
        );
    }

    #[test]
    fn zero_sized_pages_cannot_be_allocated() {
        let mut renderer = Renderer::default();
        renderer.render_page(empty_page(0, 10));
        assert!(matches!(
            renderer.get_page_image(0),
            Err(RenderError::RasterAllocation { width: 0, height: 10 })
        ));
        assert!(renderer.active_viewport().is_none());
    }

    #[test]
    fn active_viewport_is_set_while_painting_and_cleared_on_error() {
        let content = |ctx: &mut PaintContext<'_>| -> Result<()> {
            assert_eq!(ctx.page_index(), 0);
            ctx.restore_graphics_state()
        };
        let mut renderer = Renderer::new(reference_config());
        renderer.render_page(page(10, 10, Arc::new(content)));
        assert!(matches!(
            renderer.get_page_image(0),
            Err(RenderError::StateUnderflow)
        ));
        assert!(renderer.active_viewport().is_none());
    }

    #[test]
    fn page_image_out_of_range_and_after_clear() {
        let mut renderer = Renderer::default();
        renderer.render_page(empty_page(10, 10));
        assert!(matches!(
            renderer.get_page_image(1),
            Err(RenderError::PageOutOfRange { index: 1, count: 1 })
        ));
        renderer.clear_all();
        assert_eq!(renderer.page_count(), 0);
        assert_eq!(renderer.current_page_number(), 0);
        assert!(matches!(
            renderer.get_page_image(0),
            Err(RenderError::PageOutOfRange { index: 0, count: 0 })
        ));
    }

    #[test]
    fn print_restores_state_and_reports_missing_pages() {
        let tree = AreaTree::new(vec![Area::Block(BlockArea {
            width: Pt::from_i32(5),
            height: Pt::from_i32(5),
            background: Some(Color::BLACK),
            ..BlockArea::default()
        })]);
        let mut renderer = Renderer::new(reference_config());
        renderer.render_page(page(10, 10, Arc::new(tree)));
        renderer.get_page_image(0).unwrap();
        let before = renderer.graphics_state().clone();

        let mut surface = RecordingSurface::new();
        let base = Transform::from_translate(3.0, 4.0);
        assert_eq!(
            renderer.print_page(0, &mut surface, base).unwrap(),
            PrintStatus::PageExists
        );
        assert_eq!(
            renderer.print_page(7, &mut surface, base).unwrap(),
            PrintStatus::NoSuchPage
        );
        assert_eq!(renderer.graphics_state(), &before);
        assert_eq!(surface.ops.len(), 1);
        match &surface.ops[0] {
            DrawOp::Fill { transform, .. } => assert_eq!(*transform, base),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn print_restores_state_when_painting_fails() {
        let content = |ctx: &mut PaintContext<'_>| -> Result<()> {
            ctx.update_color(Color::WHITE);
            ctx.fill()
        };
        let mut renderer = Renderer::new(reference_config());
        renderer.render_page(page(10, 10, Arc::new(content)));
        let mut surface = RecordingSurface::new();
        let err = renderer
            .print_page(0, &mut surface, Transform::identity())
            .unwrap_err();
        assert!(matches!(err, RenderError::NoCurrentPath));
        assert_eq!(renderer.graphics_state().color, Color::BLACK);
        assert_eq!(renderer.state_depth(), 1);
    }

    #[test]
    fn clear_all_drops_cached_images() {
        let loader = Arc::new(DefaultImageLoader::new());
        let uri = crate::image_loader::tests::png_data_uri(&[[0, 0, 255, 255]], 1, 1);
        loader.load(&uri);
        assert_eq!(loader.cached(), 1);

        let mut renderer = Renderer::new(reference_config()).with_image_loader(loader.clone());
        renderer.render_page(empty_page(4, 4));
        renderer.clear_viewport_list();
        assert_eq!(loader.cached(), 1);
        renderer.clear_all();
        assert_eq!(loader.cached(), 0);
        assert_eq!(renderer.page_count(), 0);
    }
}
