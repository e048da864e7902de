use std::sync::Arc;

use areapaint::{
    Area, AreaContent, AreaTree, BlockArea, BorderSegment, BorderSide, BorderStyle, BoxBorders,
    Color, DrawOp, FixedArea, FontRegistry, ImageArea, LeaderArea, Orientation, PageViewport,
    PaintContext, Polarity, PrintStatus, Pt, RasterConfig, RecordingSurface, Rect, RenderError,
    Renderer, Size, TextArea, TextDecoration, Transform, ViewportArea,
};

const DEJAVU: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

fn pt(v: i32) -> Pt {
    Pt::from_i32(v)
}

fn viewport(width: i32, height: i32, areas: Vec<Area>) -> PageViewport {
    PageViewport::new(
        Rect::from_size(Size {
            width: pt(width),
            height: pt(height),
        }),
        Arc::new(AreaTree::new(areas)),
    )
}

fn sample_page() -> PageViewport {
    let grey = Color::rgb(0.5, 0.5, 0.5);
    viewport(
        120,
        80,
        vec![
            Area::Block(BlockArea {
                x: pt(5),
                y: pt(5),
                width: pt(110),
                height: pt(40),
                background: Some(Color::rgb(0.9, 0.9, 1.0)),
                borders: BoxBorders::all(BorderSide::new(BorderStyle::Ridge, grey, pt(3))),
                children: vec![Area::Leader(LeaderArea {
                    x: pt(4),
                    y: pt(10),
                    width: pt(90),
                    thickness: pt(2),
                    style: BorderStyle::Dashed,
                    color: Color::BLACK,
                })],
            }),
            Area::Viewport(ViewportArea {
                x: pt(10),
                y: pt(50),
                width: pt(40),
                height: pt(20),
                clip: true,
                ctm: Transform::identity(),
                children: vec![Area::Fixed(FixedArea {
                    x: pt(100),
                    y: pt(60),
                    children: vec![Area::Border(BorderSegment {
                        x1: pt(0),
                        y1: pt(0),
                        x2: pt(10),
                        y2: pt(6),
                        orientation: Orientation::Horizontal,
                        polarity: Polarity::StartOrBefore,
                        style: BorderStyle::Groove,
                        color: grey,
                    })],
                })],
            }),
        ],
    )
}

#[test_log::test]
fn rasterizing_twice_is_deterministic() {
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.start_renderer();
    renderer.render_page(sample_page());
    renderer.stop_renderer().unwrap();

    let first = renderer.get_page_image(0).unwrap();
    let second = renderer.get_page_image(0).unwrap();
    assert_eq!(first.pixmap().data(), second.pixmap().data());
    assert_eq!((first.width(), first.height()), (120, 80));
}

#[test_log::test]
fn fixed_content_lands_outside_its_clipping_viewport() {
    let config = RasterConfig::builder().page_frame(false).build().unwrap();
    let mut renderer = Renderer::new(config);
    renderer.render_page(sample_page());
    let raster = renderer.get_page_image(0).unwrap();
    // The groove segment sits at (100..110, 60..66), well outside the
    // viewport clip (10..50, 50..70).
    let [_, _, _, alpha] = raster.pixel_rgba(105, 63).unwrap();
    assert_eq!(alpha, 255);
    assert_eq!(raster.pixel_rgba(60, 75), Some([0, 0, 0, 0]));
}

#[test]
fn groove_segment_prints_three_strokes_light_to_dark() {
    let base = Color::rgb(0.5, 0.5, 0.5);
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.render_page(viewport(
        200,
        20,
        vec![Area::Border(BorderSegment {
            x1: pt(0),
            y1: pt(0),
            x2: pt(100),
            y2: pt(6),
            orientation: Orientation::Horizontal,
            polarity: Polarity::StartOrBefore,
            style: BorderStyle::Groove,
            color: base,
        })],
    ));

    let mut surface = RecordingSurface::new();
    let status = renderer
        .print_page(0, &mut surface, Transform::identity())
        .unwrap();
    assert_eq!(status, PrintStatus::PageExists);

    let strokes: Vec<(f32, Color, f32)> = surface
        .strokes()
        .map(|op| match op {
            DrawOp::Stroke {
                stroke,
                color,
                points,
                ..
            } => (stroke.width, *color, points[0].1),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(strokes.len(), 3);
    for (width, _, _) in &strokes {
        assert!((width - 2.0).abs() < 1e-5);
    }
    assert_eq!(strokes[0].1, base.lighten(0.4));
    assert_eq!(strokes[1].1, base);
    assert_eq!(strokes[2].1, base.lighten(-0.4));
    let offsets: Vec<f32> = strokes.iter().map(|s| s.2).collect();
    for (got, want) in offsets.iter().zip([1.0, 3.0, 5.0]) {
        assert!((got - want).abs() < 1e-5, "{got} vs {want}");
    }
}

#[test]
fn print_reports_missing_pages_and_keeps_renderer_state() {
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.render_page(sample_page());
    renderer.get_page_image(0).unwrap();
    let before = renderer.graphics_state().clone();

    let mut surface = RecordingSurface::new();
    assert_eq!(
        renderer
            .print_page(3, &mut surface, Transform::identity())
            .unwrap(),
        PrintStatus::NoSuchPage
    );
    assert!(surface.ops.is_empty());
    renderer
        .print_page(0, &mut surface, Transform::from_scale(2.0, 2.0))
        .unwrap();
    assert!(!surface.ops.is_empty());
    assert_eq!(renderer.graphics_state(), &before);
}

#[test]
fn zero_page_document_cannot_be_stopped() {
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.start_renderer();
    assert!(matches!(
        renderer.stop_renderer(),
        Err(RenderError::NoPagesRendered)
    ));
}

#[test]
fn page_images_vanish_after_clear_all() {
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.render_page(sample_page());
    assert!(renderer.get_page_image(0).is_ok());
    assert!(matches!(
        renderer.get_page_image(1),
        Err(RenderError::PageOutOfRange { index: 1, count: 1 })
    ));
    renderer.clear_all();
    assert!(matches!(
        renderer.get_page_image(0),
        Err(RenderError::PageOutOfRange { index: 0, count: 0 })
    ));
}

#[test]
fn higher_resolution_targets_scale_the_raster() {
    let config = RasterConfig::builder()
        .target_resolution_dpi(144.0)
        .scale_factor(0.5)
        .build()
        .unwrap();
    let mut renderer = Renderer::new(config);
    renderer.render_page(viewport(100, 50, Vec::new()));
    let raster = renderer.get_page_image(0).unwrap();
    assert_eq!((raster.width(), raster.height()), (100, 50));
    assert!((raster.scale() - 1.0).abs() < 1e-9);
}

#[test]
fn fractional_page_sizes_round_to_nearest_pixel() {
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.render_page(PageViewport::new(
        Rect::from_milli(0, 0, 595_276, 841_890),
        Arc::new(AreaTree::default()),
    ));
    let raster = renderer.get_page_image(0).unwrap();
    assert_eq!((raster.width(), raster.height()), (595, 842));
}

#[test_log::test]
fn unsupported_and_missing_images_are_skipped() {
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.render_page(viewport(
        50,
        50,
        vec![
            Area::Image(ImageArea {
                url: "data:image/svg+xml,<svg/>".to_string(),
                x: pt(0),
                y: pt(0),
                width: pt(10),
                height: pt(10),
            }),
            Area::Image(ImageArea {
                url: "missing-areapaint-image.png".to_string(),
                x: pt(0),
                y: pt(0),
                width: pt(10),
                height: pt(10),
            }),
        ],
    ));
    let mut surface = RecordingSurface::new();
    renderer
        .print_page(0, &mut surface, Transform::identity())
        .unwrap();
    assert!(surface.ops.is_empty());
}

#[test]
fn delegated_content_renders_through_the_same_engine() {
    let nested: Arc<dyn AreaContent> = Arc::new(|ctx: &mut PaintContext<'_>| -> areapaint::Result<()> {
        ctx.update_color(Color::rgb(0.0, 1.0, 0.0));
        ctx.fill_rect(0.0, 0.0, 10.0, 10.0);
        Ok(())
    });
    let outer = move |ctx: &mut PaintContext<'_>| -> areapaint::Result<()> {
        ctx.save_graphics_state();
        ctx.transform(Transform::from_translate(20.0, 30.0));
        let result = nested.paint(ctx);
        ctx.restore_graphics_state()?;
        result
    };
    let mut renderer = Renderer::new(RasterConfig::default());
    renderer.render_page(PageViewport::new(
        Rect::from_size(Size::letter()),
        Arc::new(outer),
    ));
    let mut surface = RecordingSurface::new();
    renderer
        .print_page(0, &mut surface, Transform::identity())
        .unwrap();
    match &surface.ops[..] {
        [DrawOp::Fill { transform, .. }] => {
            assert_eq!(*transform, Transform::from_translate(20.0, 30.0));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn text_renders_with_a_registered_font() {
    if !std::path::Path::new(DEJAVU).exists() {
        eprintln!("skipping: {DEJAVU} not installed");
        return;
    }
    let mut fonts = FontRegistry::new();
    let name = fonts.register_file(DEJAVU).unwrap();
    let config = RasterConfig::builder().page_frame(false).build().unwrap();
    let mut renderer = Renderer::new(config).with_fonts(Arc::new(fonts));
    renderer.render_page(viewport(
        100,
        40,
        vec![Area::Text(TextArea {
            x: pt(5),
            y: pt(5),
            width: pt(60),
            baseline_offset: None,
            font: name,
            size: pt(24),
            color: Color::BLACK,
            text: "HIH".to_string(),
            decoration: TextDecoration::default(),
        })],
    ));
    let raster = renderer.get_page_image(0).unwrap();
    let inked = raster
        .pixmap()
        .pixels()
        .iter()
        .filter(|px| px.alpha() > 0)
        .count();
    assert!(inked > 50, "expected glyph coverage, got {inked} pixels");
}
