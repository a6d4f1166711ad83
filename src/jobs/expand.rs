use std::path::Path;

use walkdir::WalkDir;

use crate::foundation::error::{StampError, StampResult};
use crate::jobs::row::{JobRow, JobTemplate};

/// Case-insensitive set of file extensions picked up from job directories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionFilter {
    exts: Vec<String>,
}

impl ExtensionFilter {
    /// Extensions may be given with or without a leading dot.
    pub fn new<S: AsRef<str>>(exts: impl IntoIterator<Item = S>) -> Self {
        Self {
            exts: exts
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Whether `path` has one of the accepted extensions.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.exts.iter().any(|x| *x == ext))
    }
}

/// Turn a template into the rows it stands for.
///
/// A file path yields one row. A directory yields one row per directly
/// contained file accepted by `filter`, in file-name order; subdirectories are
/// not descended into. Anything else is an invalid job row.
pub fn expand(template: &JobTemplate, filter: &ExtensionFilter) -> StampResult<Vec<JobRow>> {
    let path = &template.path;
    if path.is_file() {
        return Ok(vec![JobRow::new(path.clone(), template.attrs.clone())]);
    }
    if !path.is_dir() {
        return Err(StampError::invalid_job_row(format!(
            "row {}: path '{}' is neither a file nor a directory",
            template.line,
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !filter.matches(entry.path()) {
            continue;
        }
        rows.push(JobRow::new(entry.into_path(), template.attrs.clone()));
    }

    tracing::info!(dir = %path.display(), images = rows.len(), "expanded job folder");
    Ok(rows)
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/expand.rs"]
mod tests;
