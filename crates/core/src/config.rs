//! Core runtime configuration.
//!
//! Configuration is resolved once by the binary and passed into the adapters. Library
//! code never reads process-wide environment variables; the entry point reads
//! `SUBJECTS_DIR` and hands the raw value to [`resolve_subjects_dir`].

use crate::constants::SUBJECTS_DIR_ENV;
use crate::{SourceError, SourceResult};
use std::path::PathBuf;

/// Picks the FreeSurfer subjects directory.
///
/// An explicit, non-empty `explicit` value wins; otherwise `env_value` (the raw
/// `SUBJECTS_DIR` value, if set) is used. Empty values count as absent; any other value
/// is taken as a path unchanged.
///
/// # Errors
///
/// Returns `SourceError::Configuration` when neither source supplies a directory.
pub fn resolve_subjects_dir(
    explicit: Option<PathBuf>,
    env_value: Option<String>,
) -> SourceResult<PathBuf> {
    let explicit = explicit.filter(|dir| !dir.as_os_str().is_empty());
    let from_env = env_value.filter(|v| !v.is_empty()).map(PathBuf::from);

    explicit.or(from_env).ok_or_else(|| {
        SourceError::Configuration(format!(
            "{} variable must be set or subjects_dir provided as input",
            SUBJECTS_DIR_ENV
        ))
    })
}
