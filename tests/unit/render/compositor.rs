use chrono::NaiveDate;
use image::Rgb;

use super::*;
use crate::foundation::config::Rgb8;
use crate::metadata::timestamp::TimestampSource;
use crate::render::text::TextExtent;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "photostamp_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[derive(Clone, Debug, PartialEq)]
struct DrawCall {
    text: String,
    color: Rgb8,
    x: i64,
    y: i64,
}

/// Draws every line as a solid box, 10 px per character and `size_px` tall.
#[derive(Default)]
struct BoxRasterizer {
    calls: Vec<DrawCall>,
}

impl TextRasterizer for BoxRasterizer {
    fn measure(&mut self, text: &str, size_px: f32) -> StampResult<TextExtent> {
        Ok(TextExtent {
            width: 10 * text.chars().count() as u32,
            height: size_px as u32,
        })
    }

    fn draw(
        &mut self,
        canvas: &mut RgbaImage,
        text: &str,
        size_px: f32,
        color: Rgb8,
        x: i64,
        y: i64,
    ) -> StampResult<()> {
        let extent = self.measure(text, size_px)?;
        let [r, g, b] = color;
        for dy in 0..i64::from(extent.height) {
            for dx in 0..i64::from(extent.width) {
                let (px, py) = (x + dx, y + dy);
                if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height()
                {
                    canvas.put_pixel(px as u32, py as u32, Rgba([r, g, b, 255]));
                }
            }
        }
        self.calls.push(DrawCall {
            text: text.to_string(),
            color,
            x,
            y,
        });
        Ok(())
    }
}

struct FailingRasterizer;

impl TextRasterizer for FailingRasterizer {
    fn measure(&mut self, _text: &str, _size_px: f32) -> StampResult<TextExtent> {
        Err(StampError::missing_asset("font 'arial.ttf': not found"))
    }

    fn draw(
        &mut self,
        _canvas: &mut RgbaImage,
        _text: &str,
        _size_px: f32,
        _color: Rgb8,
        _x: i64,
        _y: i64,
    ) -> StampResult<()> {
        Err(StampError::missing_asset("font 'arial.ttf': not found"))
    }
}

fn text(description: Option<&str>, logo: bool) -> AnnotationText {
    AnnotationText {
        title: "Sunset".into(),
        description: description.map(str::to_string),
        logo,
        compression: 80,
        timestamp_label: "Timestamp(010523 100000)".into(),
    }
}

fn source(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, Rgb([10, 20, 30])))
}

fn write_logo(dir: &Path) -> PathBuf {
    let path = dir.join("logo.png");
    RgbaImage::from_pixel(30, 10, Rgba([255, 0, 0, 255]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn band_height_covers_all_four_combinations() {
    let style = AnnotationStyle::default();
    assert_eq!(band_height(&style, &text(None, false)), 75);
    assert_eq!(band_height(&style, &text(None, true)), 150);
    assert_eq!(band_height(&style, &text(Some("Clear sky"), false)), 150);
    assert_eq!(band_height(&style, &text(Some("Clear sky"), true)), 150);
}

#[test]
fn empty_description_still_counts_as_present() {
    let style = AnnotationStyle::default();
    assert_eq!(band_height(&style, &text(Some(""), false)), 150);
}

#[test]
fn annotation_text_formats_timestamp_label() {
    let attrs = JobAttributes {
        plant: "North".into(),
        quality: "A".into(),
        title: "Sunset".into(),
        description: Some("Clear sky".into()),
        logo: true,
        compression: 85,
    };
    let ts = ResolvedTimestamp {
        at: NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
        source: TimestampSource::Key("DateTimeOriginal"),
    };
    let t = AnnotationText::new(&attrs, &ts, &AnnotationStyle::default()).unwrap();
    assert_eq!(t.timestamp_label, "Timestamp(010523 100000)");
    assert_eq!(t.title, "Sunset");
    assert_eq!(t.description.as_deref(), Some("Clear sky"));
    assert!(t.logo);
    assert_eq!(t.compression, 85);
}

#[test]
fn layout_places_elements_in_the_band() {
    let style = AnnotationStyle::default();
    let layout = AnnotationLayout::compute(&style, &text(Some("x"), true), 800, 600, 240).unwrap();
    assert_eq!(layout.canvas_width, 800);
    assert_eq!(layout.canvas_height, 750);
    assert_eq!(layout.title, (20, 610));
    assert_eq!(layout.description, (20, 675));
    assert_eq!(layout.timestamp, (560, 610));
    assert_eq!(layout.logo, (490, 650));
}

#[test]
fn compose_without_logo_or_description_uses_compact_band() {
    let mut compositor = Compositor::new(
        AnnotationStyle::default(),
        BoxRasterizer::default(),
        "/nonexistent/logo.png",
    );
    let canvas = compositor.compose(&source(400, 200), &text(None, false)).unwrap();

    assert_eq!(canvas.dimensions(), (400, 275));
    assert_eq!(canvas.get_pixel(0, 0).0, [10, 20, 30, 255]);
    assert_eq!(canvas.get_pixel(5, 270).0, [128, 128, 128, 255]);

    let calls = &compositor.rasterizer().calls;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].text, "Sunset");
    assert_eq!((calls[0].x, calls[0].y), (20, 210));
    assert_eq!(calls[0].color, [255, 255, 255]);
    assert_eq!(calls[1].text, "Timestamp(010523 100000)");
    assert_eq!((calls[1].x, calls[1].y), (400 - 240, 210));
    assert_eq!(calls[1].color, [115, 253, 255]);
}

#[test]
fn compose_draws_empty_description() {
    let mut compositor = Compositor::new(
        AnnotationStyle::default(),
        BoxRasterizer::default(),
        "/nonexistent/logo.png",
    );
    let canvas = compositor.compose(&source(400, 200), &text(Some(""), false)).unwrap();

    assert_eq!(canvas.height(), 350);
    let calls = &compositor.rasterizer().calls;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].text, "");
    assert_eq!((calls[1].x, calls[1].y), (20, 275));
    assert_eq!(calls[1].color, [212, 251, 121]);
}

#[test]
fn compose_pastes_logo_at_bottom_right() {
    let tmp = temp_dir("compositor_logo");
    std::fs::create_dir_all(&tmp).unwrap();
    let logo = write_logo(&tmp);

    let style = AnnotationStyle {
        logo_width_px: 60,
        logo_height_px: 20,
        ..AnnotationStyle::default()
    };
    let mut compositor = Compositor::new(style, BoxRasterizer::default(), logo);
    let canvas = compositor.compose(&source(400, 100), &text(None, true)).unwrap();

    assert_eq!(canvas.dimensions(), (400, 250));
    // Logo spans x 330..390, y 230..250.
    for (x, y) in [(335, 240), (389, 249)] {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        assert!(r > 250 && g < 5 && b < 5 && a == 255, "({x}, {y}) = {r},{g},{b},{a}");
    }
    assert_eq!(canvas.get_pixel(395, 240).0, [128, 128, 128, 255]);
    assert_eq!(canvas.get_pixel(335, 225).0, [128, 128, 128, 255]);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_logo_is_missing_asset_before_any_text() {
    let mut compositor = Compositor::new(
        AnnotationStyle::default(),
        BoxRasterizer::default(),
        "/nonexistent/david_logo.png",
    );
    let err = compositor
        .compose(&source(100, 100), &text(None, true))
        .unwrap_err();
    assert!(matches!(err, StampError::MissingAsset(_)), "{err}");
    assert!(compositor.rasterizer().calls.is_empty());
}

#[test]
fn font_failure_propagates() {
    let mut compositor = Compositor::new(
        AnnotationStyle::default(),
        FailingRasterizer,
        "/nonexistent/logo.png",
    );
    let err = compositor
        .compose(&source(100, 100), &text(None, false))
        .unwrap_err();
    assert!(matches!(err, StampError::MissingAsset(_)));
}

#[test]
fn load_source_rejects_non_images() {
    let tmp = temp_dir("compositor_load");
    std::fs::create_dir_all(&tmp).unwrap();
    let path = tmp.join("broken.jpg");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();

    let err = load_source(&path).unwrap_err();
    assert!(matches!(err, StampError::UnreadableSource(_)), "{err}");
    assert!(err.to_string().contains("broken.jpg"));

    let err = load_source(&tmp.join("absent.jpg")).unwrap_err();
    assert!(matches!(err, StampError::UnreadableSource(_)));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn save_writes_jpeg_with_requested_quality() {
    let tmp = temp_dir("compositor_save");
    std::fs::create_dir_all(&tmp).unwrap();
    let canvas = RgbaImage::from_pixel(64, 48, Rgba([128, 128, 128, 255]));

    let low = tmp.join("low.jpg");
    let high = tmp.join("high.JPG");
    save(canvas.clone(), &low, 5).unwrap();
    save(canvas, &high, 100).unwrap();

    let decoded = image::open(&low).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    assert!(image::open(&high).is_ok());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn save_supports_png_destinations() {
    let tmp = temp_dir("compositor_png");
    std::fs::create_dir_all(&tmp).unwrap();
    let dest = tmp.join("out.png");
    save(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])), &dest, 50).unwrap();
    assert_eq!(image::open(&dest).unwrap().to_rgb8().get_pixel(0, 0).0, [1, 2, 3]);
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn out_of_range_compression_is_encode_failure_without_output() {
    let tmp = temp_dir("compositor_quality");
    std::fs::create_dir_all(&tmp).unwrap();
    let canvas = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));

    for level in [101, -1] {
        let dest = tmp.join(format!("q{level}.jpg"));
        let err = save(canvas.clone(), &dest, level).unwrap_err();
        assert!(matches!(err, StampError::EncodeFailure(_)), "{err}");
        assert!(!dest.exists());
    }

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn unknown_extension_is_encode_failure() {
    let tmp = temp_dir("compositor_ext");
    std::fs::create_dir_all(&tmp).unwrap();
    let dest = tmp.join("out.notanimage");
    let err = save(RgbaImage::new(2, 2), &dest, 80).unwrap_err();
    assert!(matches!(err, StampError::EncodeFailure(_)));
    assert!(!dest.exists());
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn compression_range_applies_to_non_jpeg_formats_too() {
    let tmp = temp_dir("compositor_png_quality");
    std::fs::create_dir_all(&tmp).unwrap();
    let dest = tmp.join("out.png");

    let err = save(RgbaImage::new(2, 2), &dest, 150).unwrap_err();
    assert!(matches!(err, StampError::EncodeFailure(_)), "{err}");
    assert!(!dest.exists());

    save(RgbaImage::new(2, 2), &dest, 0).unwrap();
    assert!(dest.is_file());

    std::fs::remove_dir_all(&tmp).ok();
}
