//! Hierarchical file deposit.
//!
//! A [`DataSink`] copies produced files into a structured output tree. Each deposit key
//! is a dotted path whose segments become nested directories:
//!
//! ```text
//! <root>/[parameterization]/
//! ├── anat/                   "anat"            -> files copied here
//! │   └── seg/                "anat.seg"
//! ├── func/                   "@qa.func"        -> "@qa" adds no level
//! └── report.html             "@report"         -> lands directly in the output dir
//! ```
//!
//! Segments starting with `@` never create a directory. There is no rollback: a failure
//! part way through leaves whatever was already copied in place.

use crate::constants::{FLAT_SEGMENT_MARKER, KEY_PATH_SEPARATOR};
use crate::error::{SourceError, SourceResult};
use crate::subject::subject_directory_or_locate;
use nidata_files::{CopiedFile, CopyService};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Sources to deposit, keyed by dotted key-path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositSpec {
    entries: BTreeMap<String, Vec<PathBuf>>,
}

impl DepositSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sources deposited under `key_path`.
    pub fn insert<I, P>(&mut self, key_path: impl Into<String>, sources: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.entries
            .insert(key_path.into(), sources.into_iter().map(Into::into).collect());
    }

    /// Adds one source under `key_path`, keeping earlier ones.
    pub fn push(&mut self, key_path: impl Into<String>, source: impl Into<PathBuf>) {
        self.entries
            .entry(key_path.into())
            .or_default()
            .push(source.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries
            .iter()
            .map(|(key, sources)| (key.as_str(), sources.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directory segments a key-path creates, with `@` segments removed.
///
/// # Errors
///
/// Returns `SourceError::Configuration` for an empty segment, or a segment that is
/// absolute or contains `..`.
pub fn key_path_dirs(key_path: &str) -> SourceResult<Vec<&str>> {
    let mut dirs = Vec::new();
    for segment in key_path.split(KEY_PATH_SEPARATOR) {
        if segment.is_empty() {
            return Err(SourceError::Configuration(format!(
                "empty segment in key path [{}]",
                key_path
            )));
        }
        if segment.starts_with(FLAT_SEGMENT_MARKER) {
            continue;
        }
        let escapes = Path::new(segment)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(SourceError::Configuration(format!(
                "segment [{}] of key path [{}] is not a plain directory name",
                segment, key_path
            )));
        }
        dirs.push(segment);
    }
    Ok(dirs)
}

/// Outcome of one deposit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DepositReport {
    pub output_directory: PathBuf,
    pub copied: Vec<CopiedFile>,
}

/// Destination of a deposit.
#[derive(Debug, Clone)]
pub struct DataSink {
    root: PathBuf,
    parameterization: Option<String>,
}

impl DataSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            parameterization: None,
        }
    }

    /// Roots the deposit at a subject directory.
    ///
    /// `subject_directory` wins when given; otherwise the directory is located from
    /// `base_directory`, `subject_id` and `subject_template`.
    ///
    /// # Errors
    ///
    /// Returns the `Configuration` and `TemplateArgument` errors of the subject locator.
    pub fn for_subject(
        subject_directory: Option<&Path>,
        base_directory: Option<&Path>,
        subject_id: Option<&str>,
        subject_template: Option<&str>,
    ) -> SourceResult<Self> {
        let root = subject_directory_or_locate(
            subject_directory,
            base_directory,
            subject_id,
            subject_template,
        )?;
        Ok(Self::new(root))
    }

    /// Adds an extra directory level below the root; blank values are ignored.
    pub fn with_parameterization(mut self, parameterization: impl Into<String>) -> Self {
        let parameterization = parameterization.into();
        self.parameterization = (!parameterization.trim().is_empty()).then_some(parameterization);
        self
    }

    /// `<root>/[parameterization]`
    pub fn output_directory(&self) -> PathBuf {
        match &self.parameterization {
            Some(p) => self.root.join(p),
            None => self.root.clone(),
        }
    }

    /// Copies every source of `spec` into the output tree.
    ///
    /// Regular files are copied with hash comparison (identical destinations are left
    /// alone). Directories are copied recursively under their own name. Sources that
    /// are neither are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if:
    /// - a key-path is malformed (`Configuration`)
    /// - an output directory cannot be created (`DirCreation`)
    /// - a copy fails, including copying a directory over an existing one (`Files`)
    pub fn deposit(&self, spec: &DepositSpec) -> SourceResult<DepositReport> {
        let output_directory = self.output_directory();
        create_dir(&output_directory)?;

        let service = CopyService::new(&output_directory)?;
        let mut copied = Vec::new();

        for (key_path, sources) in spec.iter() {
            let target = key_path_dirs(key_path)?
                .into_iter()
                .fold(output_directory.clone(), |dir, segment| dir.join(segment));
            create_dir(&target)?;

            for source in sources {
                if source.is_file() {
                    copied.push(service.copy_file(source, &target)?);
                } else if source.is_dir() {
                    copied.extend(service.copy_tree(source, &target)?);
                } else {
                    tracing::warn!(
                        "skipping {} for [{}]: not a file or directory",
                        source.display(),
                        key_path
                    );
                }
            }
        }

        tracing::info!(
            "deposited {} file(s) into {}",
            copied.len(),
            output_directory.display()
        );
        Ok(DepositReport {
            output_directory,
            copied,
        })
    }
}

fn create_dir(path: &Path) -> SourceResult<()> {
    fs::create_dir_all(path).map_err(|source| SourceError::DirCreation {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nidata_files::{CopyOutcome, FilesError};
    use tempfile::TempDir;

    fn write(path: &Path, contents: &[u8]) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        path.to_path_buf()
    }

    #[test]
    fn test_key_path_dirs() {
        assert_eq!(key_path_dirs("a.b.c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(key_path_dirs("@skip.b").unwrap(), vec!["b"]);
        assert_eq!(key_path_dirs("a.@mid.c").unwrap(), vec!["a", "c"]);
        assert!(key_path_dirs("@only").unwrap().is_empty());
    }

    #[test]
    fn test_key_path_dirs_rejects_bad_segments() {
        assert!(matches!(key_path_dirs("a..b"), Err(SourceError::Configuration(_))));
        assert!(matches!(key_path_dirs(""), Err(SourceError::Configuration(_))));
        assert!(matches!(key_path_dirs("a./etc"), Err(SourceError::Configuration(_))));
    }

    #[test]
    fn test_deposit_creates_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let source = write(&temp.path().join("work/brain.nii"), b"brain");
        let root = temp.path().join("out");

        let mut spec = DepositSpec::new();
        spec.insert("a.b.c", [&source]);

        let report = DataSink::new(&root).deposit(&spec).unwrap();

        assert_eq!(report.copied.len(), 1);
        assert_eq!(fs::read(root.join("a/b/c/brain.nii")).unwrap(), b"brain");
    }

    #[test]
    fn test_deposit_marker_segment_is_flat() {
        let temp = TempDir::new().unwrap();
        let source = write(&temp.path().join("work/lh.white"), b"white");
        let root = temp.path().join("out");

        let mut spec = DepositSpec::new();
        spec.insert("@skip.b", [&source]);

        DataSink::new(&root).deposit(&spec).unwrap();

        assert!(root.join("b/lh.white").is_file());
        assert!(!root.join("@skip").exists());
        let entries: Vec<_> = fs::read_dir(&root).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("b")]);
    }

    #[test]
    fn test_deposit_with_parameterization() {
        let temp = TempDir::new().unwrap();
        let source = write(&temp.path().join("work/stats.txt"), b"stats");
        let root = temp.path().join("out");

        let mut spec = DepositSpec::new();
        spec.insert("@flat", [&source]);

        let sink = DataSink::new(&root).with_parameterization("_fwhm_6");
        let report = sink.deposit(&spec).unwrap();

        assert_eq!(report.output_directory, root.join("_fwhm_6"));
        assert!(root.join("_fwhm_6/stats.txt").is_file());
    }

    #[test]
    fn test_deposit_copies_directory_under_its_name() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("work/surf/lh.pial"), b"pial");
        write(&temp.path().join("work/surf/deep/rh.pial"), b"pial");
        let root = temp.path().join("out");

        let mut spec = DepositSpec::new();
        spec.insert("fs", [temp.path().join("work/surf/")]);

        let report = DataSink::new(&root).deposit(&spec).unwrap();

        assert_eq!(report.copied.len(), 2);
        assert!(root.join("fs/surf/lh.pial").is_file());
        assert!(root.join("fs/surf/deep/rh.pial").is_file());
    }

    #[test]
    fn test_deposit_twice_is_unchanged_for_files() {
        let temp = TempDir::new().unwrap();
        let source = write(&temp.path().join("work/T1.mgz"), b"t1");
        let root = temp.path().join("out");

        let mut spec = DepositSpec::new();
        spec.insert("anat", [&source]);

        let sink = DataSink::new(&root);
        sink.deposit(&spec).unwrap();
        let second = sink.deposit(&spec).unwrap();

        assert_eq!(second.copied[0].outcome, CopyOutcome::Unchanged);
    }

    #[test]
    fn test_deposit_directory_twice_fails_and_keeps_partial_tree() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("work/surf/lh.pial"), b"pial");
        let root = temp.path().join("out");

        let mut spec = DepositSpec::new();
        spec.insert("fs", [temp.path().join("work/surf")]);

        let sink = DataSink::new(&root);
        sink.deposit(&spec).unwrap();
        let result = sink.deposit(&spec);

        assert!(matches!(
            result,
            Err(SourceError::Files(FilesError::DestinationExists(_)))
        ));
        assert!(root.join("fs/surf/lh.pial").is_file());
    }

    #[test]
    fn test_deposit_skips_missing_sources() {
        let temp = TempDir::new().unwrap();
        let source = write(&temp.path().join("work/brain.nii"), b"brain");
        let root = temp.path().join("out");

        let mut spec = DepositSpec::new();
        spec.push("anat", temp.path().join("work/absent.nii"));
        spec.push("anat", &source);

        let report = DataSink::new(&root).deposit(&spec).unwrap();

        assert_eq!(report.copied.len(), 1);
        assert!(root.join("anat/brain.nii").is_file());
    }

    #[test]
    fn test_for_subject_uses_locator() {
        let sink = DataSink::for_subject(None, Some(Path::new("/results")), Some("s1"), Some("sub-%s"))
            .unwrap()
            .with_parameterization("run1");

        assert_eq!(sink.output_directory(), Path::new("/results/sub-s1/run1"));
    }

    #[test]
    fn test_for_subject_missing_inputs() {
        let result = DataSink::for_subject(None, None, Some("s1"), None);
        assert!(matches!(result, Err(SourceError::Configuration(_))));
    }
}
