//! Per-subject run aggregation.
//!
//! A [`DataSource`] maps, for each subject, lists of run identifiers to named output
//! fields. Every run identifier is substituted into the file template and globbed
//! inside the subject directory; unlike FreeSurfer discovery, a run that matches
//! nothing is an error.
//!
//! Subject info can be written in YAML:
//!
//! ```yaml
//! s1:
//!   - runs: [f3, f5, f7, f10]
//!     field: func
//!   - runs: [2]
//!     field: struct
//! ```

use crate::constants::DEFAULT_FILE_TEMPLATE;
use crate::error::{SourceError, SourceResult};
use crate::outputs::ResolvedPaths;
use crate::subject::subject_directory_or_locate;
use crate::template::{format_template, resolve_template, TemplateArg};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// One list of runs feeding one output field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RunGroup {
    pub runs: Vec<TemplateArg>,
    pub field: String,
}

/// Run groups keyed by subject identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct SubjectInfo(HashMap<String, Vec<RunGroup>>);

impl SubjectInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses subject info from YAML.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::SubjectInfoParse` on malformed YAML.
    pub fn from_yaml_str(yaml: &str) -> SourceResult<Self> {
        serde_yaml::from_str(yaml).map_err(SourceError::SubjectInfoParse)
    }

    pub fn insert(&mut self, subject_id: impl Into<String>, groups: Vec<RunGroup>) {
        self.0.insert(subject_id.into(), groups);
    }

    pub fn groups(&self, subject_id: &str) -> Option<&[RunGroup]> {
        self.0.get(subject_id).map(Vec::as_slice)
    }
}

/// DataSource inputs.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub base_directory: Option<PathBuf>,
    pub subject_template: Option<String>,
    pub file_template: String,
    pub subject_id: Option<String>,
    pub subject_directory: Option<PathBuf>,
    pub subject_info: Option<SubjectInfo>,
}

impl Default for DataSource {
    fn default() -> Self {
        Self {
            base_directory: None,
            subject_template: None,
            file_template: DEFAULT_FILE_TEMPLATE.to_owned(),
            subject_id: None,
            subject_directory: None,
            subject_info: None,
        }
    }
}

/// DataSource results.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DataSourceOutputs {
    pub subject_id: Option<String>,
    pub subject_directory: PathBuf,
    #[serde(flatten)]
    pub fields: BTreeMap<String, ResolvedPaths>,
}

impl DataSource {
    /// Resolves every run group of the configured subject.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if:
    /// - no subject directory can be determined (`Configuration`)
    /// - `subject_info` is not provided (`Configuration`)
    /// - the subject has no entry in `subject_info` (`Lookup`)
    /// - a run identifier does not fit the file template (`TemplateArgument`)
    /// - any run matches no file (`NotFound`)
    pub fn aggregate(&self) -> SourceResult<DataSourceOutputs> {
        let subject_id = self.subject_id.as_deref().map(str::trim);
        let subject_directory = subject_directory_or_locate(
            self.subject_directory.as_deref(),
            self.base_directory.as_deref(),
            subject_id,
            self.subject_template.as_deref(),
        )?;

        let info = self
            .subject_info
            .as_ref()
            .ok_or_else(|| SourceError::Configuration("subject_info not provided".into()))?;

        let groups = info.groups(subject_id.unwrap_or_default()).ok_or_else(|| {
            SourceError::Lookup(format!(
                "key [{}] does not exist in subject_info",
                subject_id.unwrap_or_default()
            ))
        })?;

        let mut fields = BTreeMap::new();
        for group in groups {
            let mut found = Vec::new();
            for run in &group.runs {
                found.extend(self.resolve_run(&subject_directory, run)?);
            }
            tracing::debug!("{}: {} file(s)", group.field, found.len());
            fields.insert(group.field.clone(), ResolvedPaths::from_matches(found));
        }

        Ok(DataSourceOutputs {
            subject_id: subject_id.map(str::to_owned),
            subject_directory,
            fields,
        })
    }

    fn resolve_run(&self, subject_directory: &Path, run: &TemplateArg) -> SourceResult<Vec<PathBuf>> {
        let file = format_template(&self.file_template, std::slice::from_ref(run))?;
        let pattern = subject_directory.join(file);
        let pattern = pattern.to_string_lossy();

        let matches = resolve_template(&pattern, &[])?;
        if matches.is_empty() {
            return Err(SourceError::NotFound(pattern.into_owned()));
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_experiment(temp: &TempDir) -> PathBuf {
        let subject = temp.path().join("exp001").join("s1");
        fs::create_dir_all(&subject).unwrap();
        for name in ["f3.nii", "f5.nii", "f7.nii", "f10.nii", "run-2-anat.nii"] {
            fs::write(subject.join(name), b"").unwrap();
        }
        subject
    }

    fn func_info() -> SubjectInfo {
        let mut info = SubjectInfo::new();
        info.insert(
            "s1",
            vec![RunGroup {
                runs: vec!["f3".into(), "f5".into(), "f7".into(), "f10".into()],
                field: "func".into(),
            }],
        );
        info
    }

    fn source_for(temp: &TempDir, file_template: &str, info: Option<SubjectInfo>) -> DataSource {
        DataSource {
            base_directory: Some(temp.path().join("exp001")),
            subject_template: Some("%s".into()),
            file_template: file_template.into(),
            subject_id: Some("s1".into()),
            subject_info: info,
            ..DataSource::default()
        }
    }

    #[test]
    fn test_aggregate_collects_runs_in_order() {
        let temp = TempDir::new().unwrap();
        let subject = create_experiment(&temp);

        let outputs = source_for(&temp, "%s.nii", Some(func_info()))
            .aggregate()
            .unwrap();

        assert_eq!(outputs.subject_directory, subject);
        assert_eq!(outputs.subject_id.as_deref(), Some("s1"));
        assert_eq!(
            outputs.fields["func"],
            ResolvedPaths::Many(vec![
                subject.join("f3.nii"),
                subject.join("f5.nii"),
                subject.join("f7.nii"),
                subject.join("f10.nii"),
            ])
        );
    }

    #[test]
    fn test_default_template_with_integer_run() {
        let temp = TempDir::new().unwrap();
        let subject = create_experiment(&temp);

        let mut info = SubjectInfo::new();
        info.insert(
            "s1",
            vec![RunGroup {
                runs: vec![2.into()],
                field: "struct".into(),
            }],
        );
        let source = DataSource {
            subject_info: Some(info),
            ..source_for(&temp, DEFAULT_FILE_TEMPLATE, None)
        };

        let outputs = source.aggregate().unwrap();
        assert_eq!(
            outputs.fields["struct"],
            ResolvedPaths::Single(subject.join("run-2-anat.nii"))
        );
    }

    #[test]
    fn test_empty_run_list_is_empty_field() {
        let temp = TempDir::new().unwrap();
        create_experiment(&temp);

        let mut info = SubjectInfo::new();
        info.insert(
            "s1",
            vec![RunGroup {
                runs: Vec::new(),
                field: "rest".into(),
            }],
        );

        let outputs = source_for(&temp, "%s.nii", Some(info)).aggregate().unwrap();
        assert_eq!(outputs.fields["rest"], ResolvedPaths::Many(Vec::new()));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        create_experiment(&temp);

        let mut info = SubjectInfo::new();
        info.insert(
            "s1",
            vec![RunGroup {
                runs: vec!["f3".into(), "f99".into()],
                field: "func".into(),
            }],
        );

        let result = source_for(&temp, "%s.nii", Some(info)).aggregate();
        match result {
            Err(SourceError::NotFound(pattern)) => assert!(pattern.ends_with("f99.nii")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_field_keeps_last_group() {
        let temp = TempDir::new().unwrap();
        let subject = create_experiment(&temp);

        let mut info = SubjectInfo::new();
        info.insert(
            "s1",
            vec![
                RunGroup {
                    runs: vec!["f3".into(), "f5".into()],
                    field: "func".into(),
                },
                RunGroup {
                    runs: vec!["f10".into()],
                    field: "func".into(),
                },
            ],
        );

        let outputs = source_for(&temp, "%s.nii", Some(info)).aggregate().unwrap();
        assert_eq!(outputs.fields.len(), 1);
        assert_eq!(
            outputs.fields["func"],
            ResolvedPaths::Single(subject.join("f10.nii"))
        );
    }

    #[test]
    fn test_subject_id_is_trimmed_for_lookup() {
        let temp = TempDir::new().unwrap();
        let subject = create_experiment(&temp);

        let source = DataSource {
            subject_id: Some(" s1 ".into()),
            ..source_for(&temp, "%s.nii", Some(func_info()))
        };
        let outputs = source.aggregate().unwrap();

        assert_eq!(outputs.subject_directory, subject);
        assert_eq!(outputs.subject_id.as_deref(), Some("s1"));
        assert_eq!(outputs.fields["func"].len(), 4);
    }

    #[test]
    fn test_missing_subject_info() {
        let temp = TempDir::new().unwrap();
        let result = source_for(&temp, "%s.nii", None).aggregate();
        assert!(matches!(result, Err(SourceError::Configuration(_))));
    }

    #[test]
    fn test_subject_absent_from_info() {
        let temp = TempDir::new().unwrap();
        let source = DataSource {
            subject_id: Some("s2".into()),
            ..source_for(&temp, "%s.nii", Some(func_info()))
        };

        assert!(matches!(source.aggregate(), Err(SourceError::Lookup(_))));
    }

    #[test]
    fn test_missing_base_directory() {
        let source = DataSource {
            subject_id: Some("s1".into()),
            subject_info: Some(func_info()),
            ..DataSource::default()
        };

        assert!(matches!(source.aggregate(), Err(SourceError::Configuration(_))));
    }

    #[test]
    fn test_subject_info_from_yaml() {
        let yaml = "s1:\n  - runs: [f3, 5]\n    field: func\n";
        let info = SubjectInfo::from_yaml_str(yaml).unwrap();

        let groups = info.groups("s1").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].field, "func");
        assert_eq!(
            groups[0].runs,
            vec![TemplateArg::Text("f3".into()), TemplateArg::Int(5)]
        );
    }

    #[test]
    fn test_subject_info_malformed_yaml() {
        let result = SubjectInfo::from_yaml_str("s1: [runs: ");
        assert!(matches!(result, Err(SourceError::SubjectInfoParse(_))));
    }
}
