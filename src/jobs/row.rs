use std::path::PathBuf;

use crate::foundation::error::{StampError, StampResult};
use crate::jobs::table::{CellValue, TableRecord};
use crate::metadata::bag::MetadataBag;

/// Source file or folder.
pub const COL_PATH: &str = "Path";
/// First output directory level.
pub const COL_PLANT: &str = "Plant";
/// Second output directory level.
pub const COL_QUALITY: &str = "Quality";
/// Caption title, also the output file name prefix.
pub const COL_TITLE: &str = "Title";
/// Optional second caption line.
pub const COL_DESCRIPTION: &str = "Description";
/// `yes` to paste the logo.
pub const COL_LOGO: &str = "Logo";
/// Encoder quality, 0 to 100.
pub const COL_COMPRESS: &str = "Compress(%)";

/// Columns every job table must provide.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_PATH,
    COL_PLANT,
    COL_QUALITY,
    COL_TITLE,
    COL_DESCRIPTION,
    COL_LOGO,
    COL_COMPRESS,
];

/// Destination and annotation attributes shared by every image of a job row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobAttributes {
    /// First output directory level.
    pub plant: String,
    /// Second output directory level.
    pub quality: String,
    /// Caption title and file name prefix.
    pub title: String,
    /// `None` when the cell was empty; `Some("")` is a present, empty description.
    pub description: Option<String>,
    /// Whether the logo is pasted into the band.
    pub logo: bool,
    /// Encoder quality on a 0-100 scale, not range-checked here.
    pub compression: i64,
}

/// A validated job-table record before directory expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobTemplate {
    /// Row number in the job table.
    pub line: usize,
    /// File or directory named in the `Path` column.
    pub path: PathBuf,
    /// Attributes inherited by every expanded row.
    pub attrs: JobAttributes,
}

/// One image to annotate.
#[derive(Clone, Debug, PartialEq)]
pub struct JobRow {
    /// Image file to annotate.
    pub source: PathBuf,
    /// Destination and caption attributes.
    pub attrs: JobAttributes,
    /// Metadata resolved ahead of time; the driver resolves it when absent.
    pub metadata: Option<MetadataBag>,
}

impl JobRow {
    /// Row for `source` with metadata left to the driver.
    pub fn new(source: impl Into<PathBuf>, attrs: JobAttributes) -> Self {
        Self {
            source: source.into(),
            attrs,
            metadata: None,
        }
    }

    /// Attach an already resolved metadata bag.
    pub fn with_metadata(mut self, metadata: MetadataBag) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl JobTemplate {
    /// Validate a raw table record into typed attributes.
    pub fn from_record(record: &TableRecord) -> StampResult<Self> {
        let line = record.line;
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|col| record.get(col).is_none())
        {
            return Err(StampError::invalid_job_row(format!(
                "row {line}: missing column '{missing}'"
            )));
        }

        let path = required_text(record, COL_PATH)?;
        let attrs = JobAttributes {
            plant: required_text(record, COL_PLANT)?,
            quality: required_text(record, COL_QUALITY)?,
            title: required_text(record, COL_TITLE)?,
            description: optional_text(record.get(COL_DESCRIPTION)),
            logo: logo_flag(record)?,
            compression: compression_level(record)?,
        };

        Ok(Self {
            line,
            path: PathBuf::from(path),
            attrs,
        })
    }

    /// Best-effort label for reporting a record that failed validation.
    pub fn describe_record(record: &TableRecord) -> String {
        match record.get(COL_PATH).and_then(|c| optional_text(Some(c))) {
            Some(path) if !path.trim().is_empty() => path,
            _ => format!("<row {}>", record.line),
        }
    }
}

fn required_text(record: &TableRecord, column: &str) -> StampResult<String> {
    match optional_text(record.get(column)) {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(StampError::invalid_job_row(format!(
            "row {}: column '{column}' is empty",
            record.line
        ))),
    }
}

fn optional_text(cell: Option<&CellValue>) -> Option<String> {
    match cell? {
        CellValue::Empty => None,
        CellValue::Text(s) => Some(s.clone()),
        CellValue::Number(n) => Some(number_text(*n)),
        CellValue::Bool(b) => Some(b.to_string()),
    }
}

/// Whole numbers print without a fractional part (`3`, not `3.0`).
fn number_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn logo_flag(record: &TableRecord) -> StampResult<bool> {
    match record.get(COL_LOGO) {
        Some(CellValue::Text(s)) => Ok(s.trim().eq_ignore_ascii_case("yes")),
        Some(CellValue::Bool(b)) => Ok(*b),
        Some(CellValue::Empty) | None => Ok(false),
        Some(CellValue::Number(n)) => Err(StampError::invalid_job_row(format!(
            "row {}: column '{COL_LOGO}' must be yes/no, got {n}",
            record.line
        ))),
    }
}

fn compression_level(record: &TableRecord) -> StampResult<i64> {
    let invalid = |got: &dyn std::fmt::Display| {
        StampError::invalid_job_row(format!(
            "row {}: column '{COL_COMPRESS}' must be a whole number, got '{got}'",
            record.line
        ))
    };
    match record.get(COL_COMPRESS) {
        Some(CellValue::Number(n)) if n.is_finite() && n.fract() == 0.0 => Ok(*n as i64),
        Some(CellValue::Number(n)) => Err(invalid(n)),
        Some(CellValue::Text(s)) => {
            let trimmed = s.trim().trim_end_matches('%').trim_end();
            trimmed.parse::<i64>().map_err(|_| invalid(s))
        }
        Some(CellValue::Bool(b)) => Err(invalid(b)),
        Some(CellValue::Empty) | None => Err(invalid(&"")),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/row.rs"]
mod tests;
