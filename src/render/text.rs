use std::path::PathBuf;

use image::RgbaImage;

use crate::foundation::config::Rgb8;
use crate::foundation::error::{StampError, StampResult};

/// Size of a laid-out line of text, in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextExtent {
    /// Advance width.
    pub width: u32,
    /// Line height.
    pub height: u32,
}

/// Measures and draws single lines of text onto a canvas.
///
/// Positions are the top-left corner of the line box, in canvas pixels;
/// anything falling outside the canvas is clipped.
pub trait TextRasterizer {
    /// Extent of `text` set at `size_px`.
    fn measure(&mut self, text: &str, size_px: f32) -> StampResult<TextExtent>;

    /// Draw `text` in `color` with its line box at `(x, y)`.
    fn draw(
        &mut self,
        canvas: &mut RgbaImage,
        text: &str,
        size_px: f32,
        color: Rgb8,
        x: i64,
        y: i64,
    ) -> StampResult<()>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl From<Rgb8> for TextBrushRgba8 {
    fn from([r, g, b]: Rgb8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Engine with an empty font collection.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register font bytes and return the family name they provide, if any.
    pub fn register_font(&mut self, font_bytes: &[u8]) -> Option<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let (family_id, _) = families.first()?;
        self.font_ctx
            .collection
            .family_name(*family_id)
            .map(str::to_string)
    }

    /// Shape and lay out one unwrapped line in `family`.
    pub fn layout_line(
        &mut self,
        text: &str,
        family: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> StampResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StampError::Other(anyhow::anyhow!(
                "font size must be finite and > 0, got {size_px}"
            )));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.to_string())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

struct LoadedFont {
    family: String,
    data: vello_cpu::peniko::FontData,
}

/// [`TextRasterizer`] shaping with Parley and filling glyphs with `vello_cpu`.
///
/// The font file is read on first use and kept afterwards, so a missing font
/// fails each row that needs text instead of the whole run.
pub struct ParleyRasterizer {
    font_path: PathBuf,
    font: Option<LoadedFont>,
    engine: TextLayoutEngine,
}

impl ParleyRasterizer {
    /// Rasterizer reading its font from `font_path` on first use.
    pub fn new(font_path: impl Into<PathBuf>) -> Self {
        Self {
            font_path: font_path.into(),
            font: None,
            engine: TextLayoutEngine::new(),
        }
    }

    fn font(&mut self) -> StampResult<&LoadedFont> {
        if self.font.is_none() {
            let bytes = std::fs::read(&self.font_path).map_err(|e| {
                StampError::missing_asset(format!("font '{}': {e}", self.font_path.display()))
            })?;
            let family = self.engine.register_font(&bytes).ok_or_else(|| {
                StampError::missing_asset(format!(
                    "font '{}': no usable font family in file",
                    self.font_path.display()
                ))
            })?;
            tracing::debug!(path = %self.font_path.display(), %family, "font loaded");
            let data = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
            self.font = Some(LoadedFont { family, data });
        }
        match &self.font {
            Some(font) => Ok(font),
            None => Err(StampError::missing_asset("font not loaded")),
        }
    }

    fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        color: Rgb8,
    ) -> StampResult<(parley::Layout<TextBrushRgba8>, vello_cpu::peniko::FontData)> {
        let (family, data) = {
            let font = self.font()?;
            (font.family.clone(), font.data.clone())
        };
        let layout = self
            .engine
            .layout_line(text, &family, size_px, color.into())?;
        Ok((layout, data))
    }
}

impl TextRasterizer for ParleyRasterizer {
    fn measure(&mut self, text: &str, size_px: f32) -> StampResult<TextExtent> {
        let (layout, _) = self.layout(text, size_px, [255, 255, 255])?;
        Ok(extent_of(&layout))
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
        let (layout, font) = self.layout(text, size_px, color)?;
        let extent = extent_of(&layout);
        let (w, h) = pixmap_dims(extent)?;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        blend_premul_over(
            canvas,
            pixmap.data_as_u8_slice(),
            u32::from(w),
            u32::from(h),
            x,
            y,
        );
        Ok(())
    }
}

fn extent_of(layout: &parley::Layout<TextBrushRgba8>) -> TextExtent {
    TextExtent {
        width: layout.width().max(0.0).ceil() as u32,
        height: layout.height().max(0.0).ceil() as u32,
    }
}

fn pixmap_dims(extent: TextExtent) -> StampResult<(u16, u16)> {
    let w: u16 = extent.width.max(1).try_into().map_err(|_| {
        StampError::Other(anyhow::anyhow!("text line width {} exceeds u16", extent.width))
    })?;
    let h: u16 = extent.height.max(1).try_into().map_err(|_| {
        StampError::Other(anyhow::anyhow!("text line height {} exceeds u16", extent.height))
    })?;
    Ok((w, h))
}

/// Source-over blend of a premultiplied RGBA8 buffer onto `canvas` at `(x, y)`.
///
/// `canvas` is treated as premultiplied too, which is exact for the opaque
/// canvases the compositor builds.
pub fn blend_premul_over(
    canvas: &mut RgbaImage,
    src: &[u8],
    src_w: u32,
    src_h: u32,
    x: i64,
    y: i64,
) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for sy in 0..i64::from(src_h) {
        let dy = y + sy;
        if dy < 0 || dy >= ch {
            continue;
        }
        for sx in 0..i64::from(src_w) {
            let dx = x + sx;
            if dx < 0 || dx >= cw {
                continue;
            }
            let i = ((sy * i64::from(src_w) + sx) * 4) as usize;
            let Some(s) = src.get(i..i + 4) else {
                return;
            };
            let a = s[3];
            if a == 0 {
                continue;
            }
            let inv = 255 - u16::from(a);
            let d = canvas.get_pixel_mut(dx as u32, dy as u32);
            for c in 0..4 {
                d.0[c] = add_sat_u8(s[c], mul_div255_u8(u16::from(d.0[c]), inv));
            }
        }
    }
}

fn mul_div255_u8(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
