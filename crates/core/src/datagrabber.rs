//! Template-driven file grabbing.
//!
//! ```text
//! file_template     = "%s/%s.nii"
//! template_args     = ["foo"]
//! template_argnames = ["run"]          named = { run: "bar" }
//! pattern           = "foo/bar.nii"
//! ```
//!
//! Named arguments exist so pipelines can iterate over a single named input while the
//! rest of the template stays fixed.

use crate::error::{SourceError, SourceResult};
use crate::outputs::ResolvedPaths;
use crate::template::{resolve_template, TemplateArg};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct DataGrabber {
    pub file_template: Option<String>,
    pub template_args: Vec<TemplateArg>,
    pub template_argnames: Vec<String>,
    pub named_args: BTreeMap<String, TemplateArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DataGrabberOutputs {
    pub file_list: ResolvedPaths,
}

impl DataGrabber {
    pub fn new(file_template: impl Into<String>) -> Self {
        Self {
            file_template: Some(file_template.into()),
            ..Self::default()
        }
    }

    /// Positional arguments followed by the named ones, in argname order.
    ///
    /// Named arguments that are unset or empty text are skipped.
    pub fn arguments(&self) -> Vec<TemplateArg> {
        let named = self
            .template_argnames
            .iter()
            .filter_map(|name| self.named_args.get(name))
            .filter(|arg| !arg.is_empty());

        self.template_args
            .iter()
            .chain(named)
            .cloned()
            .collect()
    }

    /// # Errors
    ///
    /// Returns `SourceError::Configuration` without a file template, or the
    /// template/glob errors of [`resolve_template`].
    pub fn aggregate(&self) -> SourceResult<DataGrabberOutputs> {
        let template = self
            .file_template
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::Configuration("file_template must be provided".into()))?;

        let matches = resolve_template(template, &self.arguments())?;
        Ok(DataGrabberOutputs {
            file_list: ResolvedPaths::from_matches(matches),
        })
    }
}
