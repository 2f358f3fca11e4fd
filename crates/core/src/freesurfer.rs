//! FreeSurfer subject output discovery.
//!
//! [`FreeSurferSource`] walks the convention table for one subject and globs for each
//! semantic key. A subject that is missing some outputs still resolves: the missing
//! keys map to `None`. The only hard failures are missing configuration and
//! uncompilable patterns.

use crate::conventions::{self, ConventionEntry, CONVENTIONS};
use crate::error::{SourceError, SourceResult};
use crate::outputs::{ResolvedOutputSet, ResolvedPaths};
use crate::template::resolve_template;
use nidata_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Inputs for locating one FreeSurfer subject's outputs.
#[derive(Debug, Clone)]
pub struct FreeSurferSource {
    subjects_dir: PathBuf,
    subject_id: NonEmptyText,
    hemi: Option<NonEmptyText>,
}

impl FreeSurferSource {
    /// Creates a source for `subject_id` under `subjects_dir`.
    ///
    /// `subjects_dir` is normally the result of
    /// [`resolve_subjects_dir`](crate::config::resolve_subjects_dir). A blank `hemi` is
    /// treated as not supplied.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Configuration` if `subjects_dir` is absent or `subject_id`
    /// is blank.
    pub fn new(
        subjects_dir: Option<PathBuf>,
        subject_id: &str,
        hemi: Option<&str>,
    ) -> SourceResult<Self> {
        let subjects_dir = subjects_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                SourceError::Configuration(
                    "SUBJECTS_DIR variable must be set or provided as input to FreeSurferSource"
                        .into(),
                )
            })?;

        let subject_id = NonEmptyText::new(subject_id)
            .map_err(|_| SourceError::Configuration("subject_id must be provided".into()))?;

        let hemi = hemi.and_then(|h| NonEmptyText::new(h).ok());

        Ok(Self {
            subjects_dir,
            subject_id,
            hemi,
        })
    }

    pub fn subjects_dir(&self) -> &Path {
        &self.subjects_dir
    }

    pub fn subject_id(&self) -> &str {
        self.subject_id.as_str()
    }

    pub fn hemi(&self) -> Option<&str> {
        self.hemi.as_ref().map(NonEmptyText::as_str)
    }

    /// `<subjects_dir>/<subject_id>`
    pub fn subject_path(&self) -> PathBuf {
        self.subjects_dir.join(self.subject_id.as_str())
    }

    /// Glob pattern for one convention entry.
    pub fn glob_pattern(&self, entry: &ConventionEntry) -> PathBuf {
        self.subject_path()
            .join(entry.subdirectory.dir_name())
            .join(entry.file_glob(self.hemi()))
    }

    fn resolve_entry(&self, entry: &ConventionEntry) -> SourceResult<Option<ResolvedPaths>> {
        let pattern = self.glob_pattern(entry);
        let matches = resolve_template(&pattern.to_string_lossy(), &[])?;
        tracing::debug!(
            "{}: {} -> {} file(s)",
            entry.semantic_key,
            pattern.display(),
            matches.len()
        );

        if matches.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ResolvedPaths::from_matches(matches)))
        }
    }

    /// Resolves a single semantic key.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Lookup` for a key outside the convention table.
    pub fn resolve_key(&self, semantic_key: &str) -> SourceResult<Option<ResolvedPaths>> {
        self.resolve_entry(conventions::lookup(semantic_key)?)
    }

    /// Resolves every key of the convention table.
    ///
    /// # Returns
    ///
    /// A set containing every semantic key; keys without files map to `None`.
    pub fn aggregate(&self) -> SourceResult<ResolvedOutputSet> {
        let mut outputs = ResolvedOutputSet::new();
        for entry in CONVENTIONS.iter() {
            outputs.insert(entry.semantic_key, self.resolve_entry(entry)?);
        }

        tracing::info!(
            "resolved {} of {} FreeSurfer outputs for {}",
            outputs.iter().filter(|(_, v)| v.is_some()).count(),
            outputs.len(),
            self.subject_id
        );
        Ok(outputs)
    }
}
