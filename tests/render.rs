use pfpgen::{
    AvatarSpec, Caption, CaptionStyle, Compositor, ImageResource, LayerCategory, LayerTransform,
    MemoryImageStore,
};

fn solid_png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn store() -> MemoryImageStore {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut store = MemoryImageStore::new();
    store.insert("red.png", solid_png(8, 8, [255, 0, 0, 255]));
    store.insert("green.png", solid_png(8, 8, [0, 255, 0, 255]));
    store.insert("blue.png", solid_png(8, 8, [0, 0, 255, 255]));
    store.insert("wide-blue.png", solid_png(300, 150, [0, 0, 255, 255]));
    store
}

fn spec_with_base(source: &str) -> AvatarSpec {
    AvatarSpec::new(ImageResource::new(source, source))
}

fn center_pixel(frame: &pfpgen::CanvasRgba) -> [u8; 4] {
    frame.pixel(frame.width / 2, frame.height / 2).unwrap()
}

fn assert_rgb_close(px: [u8; 4], want: [u8; 3]) {
    for (got, want) in px[..3].iter().zip(want) {
        assert!(
            got.abs_diff(want) <= 2,
            "pixel {px:?} not close to rgb {want:?}"
        );
    }
    assert_eq!(px[3], 255);
}

#[test]
fn empty_spec_renders_plain_white_square() {
    let mut compositor = Compositor::new();
    let frame = compositor
        .render(&AvatarSpec::empty(), &mut store())
        .unwrap();

    assert_eq!((frame.width, frame.height), (600, 600));
    assert!(frame.data.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn rendering_is_idempotent() {
    let mut compositor = Compositor::new();
    let mut images = store();

    let mut spec = spec_with_base("red.png");
    spec.layer_mut(LayerCategory::Hat).resource = ImageResource::new("blue.png", "Blue hat");
    spec.layer_mut(LayerCategory::Hat).transform = LayerTransform {
        offset_x: 30.0,
        offset_y: -10.0,
        scale: 0.5,
        rotation_deg: 45.0,
    };
    spec.caption = Some(Caption {
        text: "Test".to_string(),
        style: CaptionStyle::default(),
    });

    let a = compositor.render(&spec, &mut images).unwrap();
    let b = compositor.render(&spec, &mut images).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn later_layers_draw_on_top() {
    let mut compositor = Compositor::new();
    let mut images = store();

    // An 8x8 image fit to a 600x600 canvas covers it entirely.
    let mut spec = spec_with_base("red.png");
    let frame = compositor.render(&spec, &mut images).unwrap();
    assert_rgb_close(center_pixel(&frame), [255, 0, 0]);

    spec.layer_mut(LayerCategory::Clothes).resource = ImageResource::new("blue.png", "Blue");
    let frame = compositor.render(&spec, &mut images).unwrap();
    assert_rgb_close(center_pixel(&frame), [0, 0, 255]);

    spec.layer_mut(LayerCategory::Accessory2).resource = ImageResource::new("green.png", "Green");
    let frame = compositor.render(&spec, &mut images).unwrap();
    assert_rgb_close(center_pixel(&frame), [0, 255, 0]);
}

#[test]
fn blank_layer_contributes_nothing() {
    let mut compositor = Compositor::new();
    let mut images = store();

    let mut with_hat = spec_with_base("red.png");
    with_hat.layer_mut(LayerCategory::Hat).resource = ImageResource::new("green.png", "Green");
    let hat_frame = compositor.render(&with_hat, &mut images).unwrap();

    let mut cleared = with_hat.clone();
    cleared.layer_mut(LayerCategory::Hat).resource = ImageResource::blank();
    let cleared_frame = compositor.render(&cleared, &mut images).unwrap();

    let without_hat = spec_with_base("red.png");
    let base_frame = compositor.render(&without_hat, &mut images).unwrap();

    assert_eq!(cleared_frame.data, base_frame.data);
    assert_ne!(hat_frame.data, base_frame.data);
}

#[test]
fn background_is_fit_not_cropped() {
    let mut compositor = Compositor::new();
    let mut images = store();

    // 300x150 background on 600x600: fit scale 2 gives a 600x300 band
    // centered vertically, white letterboxes above and below.
    let mut spec = AvatarSpec::empty();
    spec.background = Some(ImageResource::new("wide-blue.png", "Uploaded background"));
    let frame = compositor.render(&spec, &mut images).unwrap();

    assert_rgb_close(frame.pixel(300, 300).unwrap(), [0, 0, 255]);
    assert_rgb_close(frame.pixel(300, 100).unwrap(), [255, 255, 255]);
    assert_rgb_close(frame.pixel(300, 500).unwrap(), [255, 255, 255]);
}

#[test]
fn failed_layer_load_is_skipped_not_fatal() {
    let mut compositor = Compositor::new();
    let mut images = store();

    let mut spec = spec_with_base("red.png");
    spec.layer_mut(LayerCategory::Hat).resource = ImageResource::new("missing.png", "Missing");
    let frame = compositor.render(&spec, &mut images).unwrap();

    let base_only = compositor
        .render(&spec_with_base("red.png"), &mut images)
        .unwrap();
    assert_eq!(frame.data, base_only.data);
}

#[test]
fn caption_band_spans_expected_rows() {
    let mut compositor = Compositor::new();
    let mut images = store();

    // fontSize=20, verticalPosition=50 on 600x600: band height 30 centered
    // at y=300, so rows [270, 330).
    let mut spec = AvatarSpec::empty();
    spec.caption = Some(Caption {
        text: "Test".to_string(),
        style: CaptionStyle {
            font_size_px: 20.0,
            vertical_position_pct: 50.0,
        },
    });
    let frame = compositor.render(&spec, &mut images).unwrap();

    // Sample near the left edge, clear of any glyphs.
    let inside_top = frame.pixel(5, 271).unwrap();
    let inside_mid = frame.pixel(5, 300).unwrap();
    let inside_bottom = frame.pixel(5, 328).unwrap();
    for px in [inside_top, inside_mid, inside_bottom] {
        // 50% black over white.
        assert!(px[0] < 160 && px[0] > 90, "band pixel not dimmed: {px:?}");
        assert_eq!(px[3], 255);
    }

    let above = frame.pixel(5, 265).unwrap();
    let below = frame.pixel(5, 335).unwrap();
    assert_rgb_close(above, [255, 255, 255]);
    assert_rgb_close(below, [255, 255, 255]);
}

#[test]
fn caption_glyphs_render_white_inside_the_band() {
    let mut compositor = Compositor::new();
    let mut images = store();
    compositor.set_font_bytes(std::fs::read("tests/data/fonts/DejaVuSans.ttf").unwrap());

    // fontSize=40, verticalPosition=50: band height 60 centered at y=300.
    let mut spec = AvatarSpec::empty();
    spec.caption = Some(Caption {
        text: "Test".to_string(),
        style: CaptionStyle {
            font_size_px: 40.0,
            vertical_position_pct: 50.0,
        },
    });
    let frame = compositor.render(&spec, &mut images).unwrap();

    // Inside the band the backdrop is 50% black over white, so near-white
    // pixels there can only come from the glyphs themselves.
    let mut glyph_px = 0usize;
    for y in 270..330 {
        for x in 0..frame.width {
            let px = frame.pixel(x, y).unwrap();
            if px[0] > 220 && px[1] > 220 && px[2] > 220 {
                glyph_px += 1;
            }
        }
    }
    assert!(glyph_px > 50, "expected glyph coverage, found {glyph_px} white pixels");

    // Without a font the same state draws the band only.
    let mut bare = Compositor::new();
    let bare_frame = bare.render(&spec, &mut images).unwrap();
    let bare_white = (270..330)
        .flat_map(|y| (0..bare_frame.width).map(move |x| (x, y)))
        .filter(|&(x, y)| {
            let px = bare_frame.pixel(x, y).unwrap();
            px[0] > 220 && px[1] > 220 && px[2] > 220
        })
        .count();
    assert_eq!(bare_white, 0);
}

#[test]
fn empty_caption_text_draws_no_band() {
    let mut compositor = Compositor::new();
    let mut images = store();

    let mut spec = AvatarSpec::empty();
    spec.caption = Some(Caption {
        text: String::new(),
        style: CaptionStyle::default(),
    });
    let frame = compositor.render(&spec, &mut images).unwrap();
    assert!(frame.data.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn layer_offset_moves_the_layer() {
    let mut compositor = Compositor::new();
    let mut images = store();

    let mut spec = AvatarSpec::empty();
    spec.layer_mut(LayerCategory::Accessory1).resource =
        ImageResource::new("green.png", "Green");
    spec.layer_mut(LayerCategory::Accessory1).transform = LayerTransform {
        offset_x: 0.0,
        offset_y: 0.0,
        scale: 0.1,
        rotation_deg: 0.0,
    };
    // Scale 0.1 on the 75x fit of an 8x8 image: a 60x60 patch at the center.
    let centered = compositor.render(&spec, &mut images).unwrap();
    assert_rgb_close(center_pixel(&centered), [0, 255, 0]);
    assert_rgb_close(centered.pixel(300, 360).unwrap(), [255, 255, 255]);

    spec.layer_mut(LayerCategory::Accessory1).transform.offset_x = 100.0;
    let shifted = compositor.render(&spec, &mut images).unwrap();
    assert_rgb_close(shifted.pixel(400, 300).unwrap(), [0, 255, 0]);
    assert_rgb_close(shifted.pixel(300, 360).unwrap(), [255, 255, 255]);
    assert_rgb_close(center_pixel(&shifted), [255, 255, 255]);
}
