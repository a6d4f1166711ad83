use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};

use crate::foundation::config::AnnotationStyle;
use crate::foundation::error::{StampError, StampResult};
use crate::jobs::row::JobAttributes;
use crate::metadata::timestamp::ResolvedTimestamp;
use crate::render::text::TextRasterizer;

/// Everything drawn into the band of one annotated image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationText {
    /// First caption line.
    pub title: String,
    /// `Some("")` still reserves the full band and draws an empty line.
    pub description: Option<String>,
    /// Whether the logo is pasted.
    pub logo: bool,
    /// Encoder quality passed to [`save`].
    pub compression: i64,
    /// Full visible label, e.g. `Timestamp(010523 100000)`.
    pub timestamp_label: String,
}

impl AnnotationText {
    /// Caption for `attrs`, with the timestamp label formatted by `style`.
    pub fn new(
        attrs: &JobAttributes,
        timestamp: &ResolvedTimestamp,
        style: &AnnotationStyle,
    ) -> StampResult<Self> {
        let stamp = timestamp.format_with(&style.timestamp_label_format)?;
        Ok(Self {
            title: attrs.title.clone(),
            description: attrs.description.clone(),
            logo: attrs.logo,
            compression: attrs.compression,
            timestamp_label: format!("Timestamp({stamp})"),
        })
    }
}

/// Height of the letterbox band for `text`.
///
/// The compact band only fits one line, so it is used when there is neither a
/// logo nor a description.
pub fn band_height(style: &AnnotationStyle, text: &AnnotationText) -> u32 {
    if !text.logo && text.description.is_none() {
        style.compact_band_px
    } else {
        style.full_band_px
    }
}

/// Top-left positions of every element of the band, in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnnotationLayout {
    /// Width of the canvas, equal to the source width.
    pub canvas_width: u32,
    /// Source height plus the band.
    pub canvas_height: u32,
    /// Title line.
    pub title: (i64, i64),
    /// Description line, used only when one is present.
    pub description: (i64, i64),
    /// Right-aligned timestamp label.
    pub timestamp: (i64, i64),
    /// Logo, anchored to the bottom-right of the band.
    pub logo: (i64, i64),
}

impl AnnotationLayout {
    /// Place the band elements below a `width` x `height` source.
    ///
    /// `timestamp_width` is the measured width of the timestamp label, which is
    /// right-aligned.
    pub fn compute(
        style: &AnnotationStyle,
        text: &AnnotationText,
        width: u32,
        height: u32,
        timestamp_width: u32,
    ) -> StampResult<Self> {
        let band = band_height(style, text);
        let canvas_height = height.checked_add(band).ok_or_else(|| {
            StampError::Other(anyhow::anyhow!(
                "canvas height {height} + {band} overflows"
            ))
        })?;

        let (w, h) = (i64::from(width), i64::from(height));
        let text_y = h + style.text_top_px;
        Ok(Self {
            canvas_width: width,
            canvas_height,
            title: (style.text_left_px, text_y),
            description: (style.text_left_px, text_y + style.description_offset_px),
            timestamp: (
                w - i64::from(timestamp_width) - style.timestamp_right_px,
                text_y,
            ),
            logo: (
                w - i64::from(style.logo_width_px) - style.logo_right_px,
                i64::from(canvas_height) - i64::from(style.logo_height_px) - style.logo_bottom_px,
            ),
        })
    }
}

/// Builds annotated canvases: source on top, letterbox band with text and an
/// optional logo below.
pub struct Compositor<R> {
    style: AnnotationStyle,
    rasterizer: R,
    logo_path: PathBuf,
}

impl<R: TextRasterizer> Compositor<R> {
    /// Compositor drawing text with `rasterizer` and reading the logo from `logo_path`.
    pub fn new(style: AnnotationStyle, rasterizer: R, logo_path: impl Into<PathBuf>) -> Self {
        Self {
            style,
            rasterizer,
            logo_path: logo_path.into(),
        }
    }

    /// Visual constants in use.
    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    /// Text backend in use.
    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Render `text` under `source` on a new opaque canvas.
    ///
    /// The logo is loaded before any text is drawn so that a missing logo
    /// fails the row without touching the font.
    pub fn compose(&mut self, source: &DynamicImage, text: &AnnotationText) -> StampResult<RgbaImage> {
        let logo = if text.logo { Some(self.load_logo()?) } else { None };

        let size = self.style.font_size_px;
        let stamp = self.rasterizer.measure(&text.timestamp_label, size)?;
        let layout = AnnotationLayout::compute(
            &self.style,
            text,
            source.width(),
            source.height(),
            stamp.width,
        )?;

        let [r, g, b] = self.style.background;
        let mut canvas =
            RgbaImage::from_pixel(layout.canvas_width, layout.canvas_height, Rgba([r, g, b, 255]));
        let opaque = DynamicImage::ImageRgb8(source.to_rgb8()).into_rgba8();
        imageops::replace(&mut canvas, &opaque, 0, 0);

        let (x, y) = layout.title;
        self.rasterizer
            .draw(&mut canvas, &text.title, size, self.style.title_color, x, y)?;

        if let Some(description) = &text.description {
            let (x, y) = layout.description;
            self.rasterizer.draw(
                &mut canvas,
                description,
                size,
                self.style.description_color,
                x,
                y,
            )?;
        }

        let (x, y) = layout.timestamp;
        self.rasterizer.draw(
            &mut canvas,
            &text.timestamp_label,
            size,
            self.style.timestamp_color,
            x,
            y,
        )?;

        if let Some(logo) = logo {
            let (x, y) = layout.logo;
            imageops::overlay(&mut canvas, &logo, x, y);
        }

        Ok(canvas)
    }

    fn load_logo(&self) -> StampResult<RgbaImage> {
        let logo = image::open(&self.logo_path).map_err(|e| {
            StampError::missing_asset(format!("logo '{}': {e}", self.logo_path.display()))
        })?;
        Ok(imageops::resize(
            &logo.into_rgba8(),
            self.style.logo_width_px,
            self.style.logo_height_px,
            FilterType::CatmullRom,
        ))
    }
}

/// Decode the image at `path`, guessing the format from its content.
pub fn load_source(path: &Path) -> StampResult<DynamicImage> {
    let unreadable =
        |e: &dyn std::fmt::Display| StampError::unreadable_source(format!("{}: {e}", path.display()));
    ImageReader::open(path)
        .map_err(|e| unreadable(&e))?
        .with_guessed_format()
        .map_err(|e| unreadable(&e))?
        .decode()
        .map_err(|e| unreadable(&e))
}

/// Encode `canvas` for `dest` and write it.
///
/// `compression` must be within `0..=100` for every format. It sets the JPEG
/// quality; other formats validate it but do not use it. Nothing is written
/// when encoding fails.
pub fn save(canvas: RgbaImage, dest: &Path, compression: i64) -> StampResult<()> {
    let quality = u8::try_from(compression)
        .ok()
        .filter(|q| *q <= 100)
        .ok_or_else(|| {
            StampError::encode_failure(format!(
                "compression level {compression} is outside 0..=100"
            ))
        })?;
    let format = ImageFormat::from_path(dest).map_err(|e| {
        StampError::encode_failure(format!("'{}': {e}", dest.display()))
    })?;

    let rgb = DynamicImage::ImageRgba8(canvas).into_rgb8();
    let mut bytes = Cursor::new(Vec::new());
    let encoded = match format {
        ImageFormat::Jpeg => {
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        }
        other => rgb.write_to(&mut bytes, other),
    };
    encoded.map_err(|e| StampError::encode_failure(format!("'{}': {e}", dest.display())))?;

    std::fs::write(dest, bytes.into_inner())
        .map_err(|e| StampError::write_failure(format!("'{}': {e}", dest.display())))?;
    tracing::debug!(dest = %dest.display(), ?format, quality, "annotated image saved");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
