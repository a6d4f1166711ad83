use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::error::StampResult;

/// Default job table file name, looked up in the working directory.
pub const DEFAULT_JOB_TABLE: &str = "images_settings.xlsx";
/// Default font asset file name, looked up in the assets directory.
pub const DEFAULT_FONT_FILE: &str = "arial.ttf";
/// Default logo asset file name, looked up in the assets directory.
pub const DEFAULT_LOGO_FILE: &str = "david_logo.png";
/// Default number of disambiguated names tried before giving up on a destination.
pub const DEFAULT_RETRY_LIMIT: u32 = 32;

/// Straight (non-premultiplied) RGB color.
pub type Rgb8 = [u8; 3];

/// Visual constants used by the compositor.
///
/// Every field has a default matching the historical output, so a style file
/// only needs to list the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    /// Font size for every text line, in pixels.
    pub font_size_px: f32,
    /// Fill color of the letterbox band.
    pub background: Rgb8,
    /// Color of the title line.
    pub title_color: Rgb8,
    /// Color of the description line.
    pub description_color: Rgb8,
    /// Color of the timestamp label.
    pub timestamp_color: Rgb8,
    /// Band height when neither a logo nor a description is drawn.
    pub compact_band_px: u32,
    /// Band height when a logo or a description is drawn.
    pub full_band_px: u32,
    /// Left margin of the title and description lines.
    pub text_left_px: i64,
    /// Distance from the top of the band to the title and timestamp lines.
    pub text_top_px: i64,
    /// Vertical distance from the title line to the description line.
    pub description_offset_px: i64,
    /// Gap between the timestamp label and the right edge of the canvas.
    pub timestamp_right_px: i64,
    /// `chrono` format of the visible timestamp label.
    pub timestamp_label_format: String,
    /// Width the logo is resized to.
    pub logo_width_px: u32,
    /// Height the logo is resized to.
    pub logo_height_px: u32,
    /// Gap between the logo and the right edge of the canvas.
    pub logo_right_px: i64,
    /// Gap between the logo and the bottom edge of the canvas.
    pub logo_bottom_px: i64,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            font_size_px: 40.0,
            background: [128, 128, 128],
            title_color: [255, 255, 255],
            description_color: [212, 251, 121],
            timestamp_color: [115, 253, 255],
            compact_band_px: 75,
            full_band_px: 150,
            text_left_px: 20,
            text_top_px: 10,
            description_offset_px: 65,
            timestamp_right_px: 0,
            timestamp_label_format: "%d%m%y %H%M%S".to_string(),
            logo_width_px: 300,
            logo_height_px: 100,
            logo_right_px: 10,
            logo_bottom_px: 0,
        }
    }
}

impl AnnotationStyle {
    /// Load a style from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> StampResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read style file '{}'", path.display()))?;
        let style = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse style file '{}'", path.display()))?;
        Ok(style)
    }
}

/// Everything a batch run needs besides the job rows themselves.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Root of the output tree (`<root>/<Plant>/<Quality>/...`).
    pub output_root: PathBuf,
    /// Font used for every text line.
    pub font_path: PathBuf,
    /// Logo pasted when a row asks for it.
    pub logo_path: PathBuf,
    /// Lowercase extensions (without dot) picked up when a job path is a directory.
    pub extensions: Vec<String>,
    /// Disambiguated names tried before a destination counts as exhausted.
    pub retry_limit: u32,
    /// Visual constants.
    pub style: AnnotationStyle,
}

impl RunConfig {
    /// Defaults: output under `~/Downloads/output`, assets looked up in `assets_dir`.
    pub fn with_defaults(assets_dir: &Path) -> Self {
        Self {
            output_root: default_output_root(),
            font_path: assets_dir.join(DEFAULT_FONT_FILE),
            logo_path: assets_dir.join(DEFAULT_LOGO_FILE),
            extensions: vec!["jpg".to_string()],
            retry_limit: DEFAULT_RETRY_LIMIT,
            style: AnnotationStyle::default(),
        }
    }
}

/// `~/Downloads/output`, or `./output` when no home directory is known.
pub fn default_output_root() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join("Downloads").join("output"),
        None => {
            tracing::warn!("no home directory found; writing output under ./output");
            PathBuf::from("output")
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
