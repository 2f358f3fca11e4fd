//! Constants used throughout the nidata core crate.
//!
//! Directory names, environment variable names and defaults live here so the
//! FreeSurfer layout and deposit conventions are spelled in one place.

/// Environment variable naming the FreeSurfer subjects directory.
pub const SUBJECTS_DIR_ENV: &str = "SUBJECTS_DIR";

/// FreeSurfer volume directory inside a subject.
pub const MRI_DIR_NAME: &str = "mri";

/// FreeSurfer surface directory inside a subject.
pub const SURF_DIR_NAME: &str = "surf";

/// FreeSurfer label/annotation directory inside a subject.
pub const LABEL_DIR_NAME: &str = "label";

/// Suffix of FreeSurfer compressed volumes.
pub const MGZ_SUFFIX: &str = ".mgz";

/// Default DataSource file template, one integer run identifier.
pub const DEFAULT_FILE_TEMPLATE: &str = "*-%d-*.nii";

/// Key-path segments starting with this character do not create a directory level.
pub const FLAT_SEGMENT_MARKER: char = '@';

/// Separator between key-path segments in a deposit spec.
pub const KEY_PATH_SEPARATOR: char = '.';
