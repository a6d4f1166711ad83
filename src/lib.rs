//! photostamp annotates batches of photographs.
//!
//! Each job row names a source image (or a folder of them) plus a destination
//! and caption. For every image the pipeline:
//!
//! - Resolves metadata and picks an event timestamp ([`resolve`], [`resolve_timestamp`])
//! - Plans a deterministic, collision-safe output path ([`OutputPathPlanner`])
//! - Draws title, description, timestamp and an optional logo into a band
//!   below the image ([`Compositor`])
//!
//! [`BatchDriver`] runs rows sequentially and keeps going when one fails.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod batch;
mod foundation;
mod jobs;
mod metadata;
mod output;
mod render;

pub use crate::batch::driver::{BatchDriver, BatchSummary, RowFailure, run_job_table};
pub use crate::foundation::clock::{Clock, FixedClock, SystemClock};
pub use crate::foundation::config::{
    AnnotationStyle, DEFAULT_FONT_FILE, DEFAULT_JOB_TABLE, DEFAULT_LOGO_FILE, DEFAULT_RETRY_LIMIT,
    Rgb8, RunConfig, default_output_root,
};
pub use crate::foundation::error::{StampError, StampResult};
pub use crate::jobs::expand::{ExtensionFilter, expand};
pub use crate::jobs::row::{JobAttributes, JobRow, JobTemplate, REQUIRED_COLUMNS};
pub use crate::jobs::table::{CellValue, TableRecord, read_job_table};
pub use crate::metadata::bag::{MetadataBag, MetadataValue, TIMESTAMP_PRIORITY};
pub use crate::metadata::resolver::{read_embedded, read_filesystem, resolve};
pub use crate::metadata::timestamp::{ResolvedTimestamp, TimestampSource, resolve_timestamp};
pub use crate::output::planner::{DestinationPath, OutputPathPlanner, sanitize_component};
pub use crate::render::compositor::{
    AnnotationLayout, AnnotationText, Compositor, band_height, load_source, save,
};
pub use crate::render::text::{ParleyRasterizer, TextExtent, TextRasterizer};
