use std::path::{Path, PathBuf};

use crate::foundation::clock::Clock;
use crate::foundation::config::RunConfig;
use crate::foundation::error::{StampError, StampResult};
use crate::jobs::expand::{ExtensionFilter, expand};
use crate::jobs::row::{JobRow, JobTemplate};
use crate::jobs::table::TableRecord;
use crate::metadata::resolver;
use crate::metadata::timestamp::resolve_timestamp;
use crate::output::planner::OutputPathPlanner;
use crate::render::compositor::{AnnotationText, Compositor, load_source, save};
use crate::render::text::{ParleyRasterizer, TextRasterizer};

/// A row that did not produce an output, with the reason.
#[derive(Debug)]
pub struct RowFailure {
    /// Source path, or `<row N>` for a job record without a usable path.
    pub source: String,
    /// Why the row failed.
    pub error: StampError,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Rows attempted, including failed records.
    pub processed: usize,
    /// Final path of every written image, in processing order.
    pub outputs: Vec<PathBuf>,
    /// Rows that produced no output, in processing order.
    pub failures: Vec<RowFailure>,
}

impl BatchSummary {
    /// Rows written.
    pub fn succeeded(&self) -> usize {
        self.outputs.len()
    }

    /// Rows that failed.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every row succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, source: String, error: StampError) {
        tracing::error!(%source, kind = error.kind(), error = %error, "row failed");
        self.processed += 1;
        self.failures.push(RowFailure { source, error });
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed={} succeeded={} failed={}",
            self.processed,
            self.succeeded(),
            self.failed()
        )
    }
}

/// Runs job rows one after another; a failing row never stops the batch.
pub struct BatchDriver<R, C> {
    planner: OutputPathPlanner,
    compositor: Compositor<R>,
    clock: C,
}

impl<C: Clock> BatchDriver<ParleyRasterizer, C> {
    /// Driver with the Parley text stack, wired from `config`.
    pub fn from_config(config: &RunConfig, clock: C) -> Self {
        Self::new(
            OutputPathPlanner::new(&config.output_root, config.retry_limit),
            Compositor::new(
                config.style.clone(),
                ParleyRasterizer::new(&config.font_path),
                &config.logo_path,
            ),
            clock,
        )
    }
}

impl<R: TextRasterizer, C: Clock> BatchDriver<R, C> {
    /// Driver over explicit parts.
    pub fn new(planner: OutputPathPlanner, compositor: Compositor<R>, clock: C) -> Self {
        Self {
            planner,
            compositor,
            clock,
        }
    }

    /// Annotate every row in order.
    pub fn run(&mut self, rows: Vec<JobRow>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        self.run_into(rows, &mut summary);
        tracing::info!(%summary, "batch finished");
        summary
    }

    /// Validate, expand and annotate raw job-table records.
    ///
    /// A record that fails validation or expansion counts as one failed row.
    pub fn run_records(
        &mut self,
        records: Vec<TableRecord>,
        filter: &ExtensionFilter,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for record in records {
            let template = match JobTemplate::from_record(&record) {
                Ok(template) => template,
                Err(e) => {
                    summary.record_failure(JobTemplate::describe_record(&record), e);
                    continue;
                }
            };
            match expand(&template, filter) {
                Ok(rows) => self.run_into(rows, &mut summary),
                Err(e) => summary.record_failure(template.path.display().to_string(), e),
            }
        }
        tracing::info!(%summary, "batch finished");
        summary
    }

    fn run_into(&mut self, rows: Vec<JobRow>, summary: &mut BatchSummary) {
        for row in rows {
            let source = row.source.display().to_string();
            match self.process(row) {
                Ok(written) => {
                    summary.processed += 1;
                    summary.outputs.push(written);
                }
                Err(e) => summary.record_failure(source, e),
            }
        }
    }

    /// Annotate a single row and return the path it was written to.
    #[tracing::instrument(skip_all, fields(source = %row.source.display()))]
    pub fn process(&mut self, row: JobRow) -> StampResult<PathBuf> {
        let resolved;
        let metadata = match &row.metadata {
            Some(bag) => bag,
            None => {
                resolved = resolver::resolve(&row.source)?;
                &resolved
            }
        };
        let timestamp = resolve_timestamp(metadata, &self.clock);

        let dest = self.planner.plan(&row, &timestamp);
        self.planner.ensure_directory(&dest)?;

        let source = load_source(&row.source)?;
        let text = AnnotationText::new(&row.attrs, &timestamp, self.compositor.style())?;
        let canvas = self.compositor.compose(&source, &text)?;

        let path = self.planner.resolve_collision(&dest)?;
        save(canvas, &path, text.compression)?;
        tracing::info!(dest = %path.display(), timestamp = %timestamp.at, "annotated image written");
        Ok(path)
    }
}

/// Read the job table at `path` and run it with `config`.
pub fn run_job_table<C: Clock>(path: &Path, config: &RunConfig, clock: C) -> StampResult<BatchSummary> {
    let records = crate::jobs::table::read_job_table(path)?;
    let filter = ExtensionFilter::new(&config.extensions);
    let mut driver = BatchDriver::from_config(config, clock);
    Ok(driver.run_records(records, &filter))
}

#[cfg(test)]
#[path = "../../tests/unit/batch/driver.rs"]
mod tests;
