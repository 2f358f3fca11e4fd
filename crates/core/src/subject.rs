//! Subject directory location.

use crate::error::{SourceError, SourceResult};
use crate::template::format_template;
use std::path::{Path, PathBuf};

/// Computes a subject's directory from a base directory and identifier.
///
/// With a `subject_template` the relative segment is the template formatted with
/// `subject_id` (e.g. `sub-%s`), otherwise the identifier itself.
///
/// # Arguments
///
/// * `base_directory` - Directory holding all subjects
/// * `subject_id` - Subject identifier
/// * `subject_template` - Optional template with one placeholder
///
/// # Errors
///
/// Returns `SourceError::Configuration` if `base_directory` or `subject_id` is absent
/// or blank, and `SourceError::TemplateArgument` if the template does not take
/// exactly one argument.
pub fn locate_subject_directory(
    base_directory: Option<&Path>,
    subject_id: Option<&str>,
    subject_template: Option<&str>,
) -> SourceResult<PathBuf> {
    let base_directory = base_directory
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| SourceError::Configuration("base_directory must be provided".into()))?;

    let subject_id = subject_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SourceError::Configuration("subject_id must be provided".into()))?;

    let segment = match subject_template {
        Some(template) => format_template(template, &[subject_id.into()])?,
        None => subject_id.to_owned(),
    };

    Ok(base_directory.join(segment))
}

/// Uses `subject_directory` when given, otherwise locates it from the other inputs.
pub fn subject_directory_or_locate(
    subject_directory: Option<&Path>,
    base_directory: Option<&Path>,
    subject_id: Option<&str>,
    subject_template: Option<&str>,
) -> SourceResult<PathBuf> {
    match subject_directory.filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => Ok(dir.to_path_buf()),
        None => locate_subject_directory(base_directory, subject_id, subject_template),
    }
}
