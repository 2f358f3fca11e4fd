//! FreeSurfer output naming conventions.
//!
//! Every semantic output key of a FreeSurfer subject maps to the subdirectory it lives
//! in, the suffix its files carry and the glob prefix that selects hemisphere files.
//! The table is a `static` array; each entry carries its own rule values so no
//! conditional logic is needed to name a file.
//!
//! ```text
//! <subjects_dir>/<subject_id>/
//! ├── mri/    T1.mgz, aseg.mgz, ..., lh.ribbon.mgz, ribbon.mgz
//! ├── surf/   lh.white, rh.white, lh.sphere.reg, ...
//! └── label/  lh.cortex.label, lh.aparc.annot, ...
//! ```

use crate::constants::{LABEL_DIR_NAME, MGZ_SUFFIX, MRI_DIR_NAME, SURF_DIR_NAME};
use crate::error::{SourceError, SourceResult};

/// Subject subdirectory an output lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectSubdir {
    Mri,
    Surf,
    Label,
}

impl SubjectSubdir {
    pub fn dir_name(&self) -> &'static str {
        match self {
            SubjectSubdir::Mri => MRI_DIR_NAME,
            SubjectSubdir::Surf => SURF_DIR_NAME,
            SubjectSubdir::Label => LABEL_DIR_NAME,
        }
    }
}

/// Glob prefix used when the caller did not select a hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPrefix {
    /// No prefix at all
    Empty,
    /// `*h.`: both `lh.` and `rh.` files
    BothHemispheres,
    /// `*`: hemisphere files and combined files alike
    Anything,
}

impl DefaultPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultPrefix::Empty => "",
            DefaultPrefix::BothHemispheres => "*h.",
            DefaultPrefix::Anything => "*",
        }
    }
}

/// One row of the convention table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ConventionEntry {
    pub semantic_key: &'static str,
    pub subdirectory: SubjectSubdir,
    pub suffix: &'static str,
    /// A supplied hemisphere replaces the default prefix with `<hemi>.`
    pub hemisphere_sensitive: bool,
    pub default_prefix: DefaultPrefix,
    /// Appends `*` after whichever prefix was chosen
    pub trailing_wildcard: bool,
}

impl ConventionEntry {
    const fn mri(semantic_key: &'static str) -> Self {
        Self {
            semantic_key,
            subdirectory: SubjectSubdir::Mri,
            suffix: MGZ_SUFFIX,
            hemisphere_sensitive: false,
            default_prefix: DefaultPrefix::Empty,
            trailing_wildcard: false,
        }
    }

    const fn surf(semantic_key: &'static str) -> Self {
        Self {
            semantic_key,
            subdirectory: SubjectSubdir::Surf,
            suffix: "",
            hemisphere_sensitive: true,
            default_prefix: DefaultPrefix::BothHemispheres,
            trailing_wildcard: false,
        }
    }

    /// Glob prefix placed before the key name.
    pub fn prefix(&self, hemi: Option<&str>) -> String {
        let mut prefix = match hemi {
            Some(hemi) if self.hemisphere_sensitive => format!("{}.", hemi),
            _ => self.default_prefix.as_str().to_owned(),
        };
        if self.trailing_wildcard {
            prefix.push('*');
        }
        prefix
    }

    /// File name glob, e.g. `lh.curv`, `*ribbon.mgz`, `*h.*annot`.
    pub fn file_glob(&self, hemi: Option<&str>) -> String {
        format!("{}{}{}", self.prefix(hemi), self.semantic_key, self.suffix)
    }
}

/// The complete FreeSurfer convention table, in output order.
pub static CONVENTIONS: [ConventionEntry; 25] = [
    ConventionEntry::mri("T1"),
    ConventionEntry::mri("aseg"),
    ConventionEntry::mri("aparc+aseg"),
    ConventionEntry::mri("brain"),
    ConventionEntry::mri("brainmask"),
    ConventionEntry::mri("filled"),
    ConventionEntry::mri("norm"),
    ConventionEntry::mri("nu"),
    ConventionEntry::mri("orig"),
    ConventionEntry::mri("rawavg"),
    ConventionEntry {
        semantic_key: "ribbon",
        subdirectory: SubjectSubdir::Mri,
        suffix: MGZ_SUFFIX,
        hemisphere_sensitive: true,
        default_prefix: DefaultPrefix::Anything,
        trailing_wildcard: false,
    },
    ConventionEntry::mri("wm"),
    ConventionEntry::mri("wmparc"),
    ConventionEntry::surf("curv"),
    ConventionEntry::surf("inflated"),
    ConventionEntry::surf("pial"),
    ConventionEntry::surf("smoothwm"),
    ConventionEntry::surf("sphere"),
    ConventionEntry::surf("sphere.reg"),
    ConventionEntry::surf("sulc"),
    ConventionEntry::surf("thickness"),
    ConventionEntry::surf("volume"),
    ConventionEntry::surf("white"),
    ConventionEntry {
        semantic_key: "label",
        subdirectory: SubjectSubdir::Label,
        suffix: "",
        hemisphere_sensitive: true,
        default_prefix: DefaultPrefix::Anything,
        trailing_wildcard: false,
    },
    ConventionEntry {
        semantic_key: "annot",
        subdirectory: SubjectSubdir::Label,
        suffix: "",
        hemisphere_sensitive: true,
        default_prefix: DefaultPrefix::BothHemispheres,
        trailing_wildcard: true,
    },
];

/// Looks up the convention for a semantic key.
///
/// # Errors
///
/// Returns `SourceError::Lookup` if the key is not in the table.
pub fn lookup(semantic_key: &str) -> SourceResult<&'static ConventionEntry> {
    CONVENTIONS
        .iter()
        .find(|entry| entry.semantic_key == semantic_key)
        .ok_or_else(|| {
            SourceError::Lookup(format!(
                "no FreeSurfer convention for key [{}]",
                semantic_key
            ))
        })
}

/// All semantic keys, in table order.
pub fn semantic_keys() -> impl Iterator<Item = &'static str> {
    CONVENTIONS.iter().map(|entry| entry.semantic_key)
}
