use std::path::{Path, PathBuf};

use rand::Rng;

use crate::foundation::error::{StampError, StampResult};
use crate::jobs::row::JobRow;
use crate::metadata::timestamp::ResolvedTimestamp;

/// Where one annotated image goes, before collision handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationPath {
    /// `<root>/<Plant>/<Quality>`.
    pub dir: PathBuf,
    /// `<Title>_<YYYYMMDD_HHMMSS>`.
    pub stem: String,
    /// Source extension including the dot, or empty.
    pub ext: String,
}

impl DestinationPath {
    /// `<stem><ext>`.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.stem, self.ext)
    }

    /// Full path without a collision suffix.
    pub fn path(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{suffix}{}", self.stem, self.ext))
    }
}

/// Builds deterministic destination paths under an output root.
#[derive(Clone, Debug)]
pub struct OutputPathPlanner {
    root: PathBuf,
    retry_limit: u32,
}

impl OutputPathPlanner {
    /// Planner writing under `root`, trying `retry_limit` suffixes per collision.
    pub fn new(root: impl Into<PathBuf>, retry_limit: u32) -> Self {
        Self {
            root: root.into(),
            retry_limit,
        }
    }

    /// Destination for `row`: `<root>/<Plant>/<Quality>/<Title>_<stamp><ext>`.
    ///
    /// Plant, Quality and Title pass through [`sanitize_component`].
    pub fn plan(&self, row: &JobRow, timestamp: &ResolvedTimestamp) -> DestinationPath {
        let dir = self
            .root
            .join(sanitize_component(&row.attrs.plant))
            .join(sanitize_component(&row.attrs.quality));
        let stem = format!(
            "{}_{}",
            sanitize_component(&row.attrs.title),
            timestamp.file_stamp()
        );
        let ext = row
            .source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        DestinationPath { dir, stem, ext }
    }

    /// Create the destination directory; an existing directory is success.
    pub fn ensure_directory(&self, dest: &DestinationPath) -> StampResult<()> {
        match std::fs::create_dir_all(&dest.dir) {
            Ok(()) => Ok(()),
            // Lost a race with another creator.
            Err(_) if dest.dir.is_dir() => Ok(()),
            Err(e) => Err(StampError::write_failure(format!(
                "create directory '{}': {e}",
                dest.dir.display()
            ))),
        }
    }

    /// Final path for `dest` that does not overwrite an existing file.
    pub fn resolve_collision(&self, dest: &DestinationPath) -> StampResult<PathBuf> {
        self.resolve_collision_with(dest, &mut rand::thread_rng())
    }

    /// [`Self::resolve_collision`] with a caller-supplied random source.
    ///
    /// A taken path gets a `(<a-z><0-9>)` suffix before the extension; suffixes
    /// are redrawn until a free name turns up or the retry limit is spent.
    pub fn resolve_collision_with<R: Rng + ?Sized>(
        &self,
        dest: &DestinationPath,
        rng: &mut R,
    ) -> StampResult<PathBuf> {
        let wanted = dest.path();
        if !wanted.exists() {
            return Ok(wanted);
        }

        for _ in 0..self.retry_limit {
            let candidate = dest.with_suffix(&disambiguator(rng));
            if !candidate.exists() {
                tracing::warn!(
                    existing = %wanted.display(),
                    saved_as = %candidate.display(),
                    "destination already exists; saving under a disambiguated name"
                );
                return Ok(candidate);
            }
        }

        Err(StampError::destination_exhausted(format!(
            "'{}' and {} disambiguated variants already exist",
            wanted.display(),
            self.retry_limit
        )))
    }
}

fn disambiguator<R: Rng + ?Sized>(rng: &mut R) -> String {
    let letter = char::from(b'a' + rng.gen_range(0..26u8));
    let digit = rng.gen_range(0..10u8);
    format!("({letter}{digit})")
}

/// Make a job attribute safe to use as a single path component.
///
/// Alphanumerics, space, `-`, `_`, `.`, `(` and `)` are kept; anything else
/// becomes `_`. A result that is empty or only dots becomes `_`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "../../tests/unit/output/planner.rs"]
mod tests;
