//! DTI-TK affine/deformation composition (`dfRightComposeAffine`).
//!
//! ```text
//! dfRightComposeAffine -aff <in_aff> -df <in_df> -out <out_file> [args]
//! ```
//!
//! When `out_file` is not given it is named after `in_df`:
//! `warp.df.nii.gz` becomes `<output_dir>/warp.df_comboaff.nii.gz`.

use super::argspec::{self, ArgSpec};
use crate::error::{SourceError, SourceResult};
use crate::template::{format_template, TemplateArg};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const COMPOSE_XFM_COMMAND: &str = "dfRightComposeAffine";

pub static COMPOSE_XFM_INPUTS: [ArgSpec; 7] = [
    ArgSpec::new("args").argstr("%s"),
    ArgSpec::new("environ").nohash().usedefault(),
    ArgSpec::new("ignore_exception")
        .deprecated("1.0.0")
        .nohash()
        .usedefault(),
    ArgSpec::new("in_aff")
        .argstr("-aff %s")
        .exists()
        .mandatory(false)
        .position(0),
    ArgSpec::new("in_df")
        .argstr("-df %s")
        .exists()
        .mandatory(false)
        .position(1),
    ArgSpec::new("out_file")
        .argstr("-out %s")
        .exists()
        .mandatory(false)
        .named_from("in_df", "%s_comboaff.nii.gz")
        .position(2),
    ArgSpec::new("terminal_output").deprecated("1.0.0").nohash(),
];

pub static COMPOSE_XFM_OUTPUTS: [ArgSpec; 1] = [ArgSpec::new("out_file")];

const IMAGE_EXTENSIONS: [&str; 2] = [".nii.gz", ".nii"];

/// Typed inputs of the composition tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ComposeXfmInputs {
    pub in_aff: Option<PathBuf>,
    pub in_df: Option<PathBuf>,
    pub out_file: Option<PathBuf>,
    /// Free-form arguments appended after the positional ones.
    pub args: Option<String>,
    #[serde(default)]
    pub environ: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ComposeXfmOutputs {
    pub out_file: Option<PathBuf>,
}

/// A command line ready to hand to a process runner.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RenderedCommand {
    pub program: &'static str,
    pub args: Vec<String>,
    pub environ: BTreeMap<String, String>,
    pub outputs: ComposeXfmOutputs,
}

impl RenderedCommand {
    /// The command as one shell-style line.
    pub fn to_command_string(&self) -> String {
        std::iter::once(self.program.to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ComposeXfmInputs {
    fn explicit_value(&self, name: &str) -> Option<&Path> {
        match name {
            "in_aff" => self.in_aff.as_deref(),
            "in_df" => self.in_df.as_deref(),
            "out_file" => self.out_file.as_deref(),
            _ => None,
        }
    }

    /// The output file: the explicit `out_file`, else a name derived from `in_df` inside
    /// `output_dir`, else `None`.
    pub fn resolved_out_file(&self, output_dir: &Path) -> SourceResult<Option<PathBuf>> {
        if let Some(out_file) = &self.out_file {
            return Ok(Some(out_file.clone()));
        }
        let Some(spec) = argspec::find(&COMPOSE_XFM_INPUTS, "out_file") else {
            return Ok(None);
        };
        let (Some(source), Some(template)) = (spec.name_source, spec.name_template) else {
            return Ok(None);
        };
        let Some(source_path) = self.explicit_value(source) else {
            return Ok(None);
        };

        let file_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SourceError::Configuration(format!(
                    "cannot derive out_file from {}",
                    source_path.display()
                ))
            })?;
        let stem = TemplateArg::Text(strip_image_extension(&file_name).to_string());
        let derived = format_template(template, &[stem])?;
        Ok(Some(output_dir.join(derived)))
    }

    /// Checks inputs flagged `exists` and renders the argument vector.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::NotFound` for a supplied `exists` input that is missing on
    /// disk, or `TemplateArgument` if an argument fragment cannot be rendered.
    pub fn command_line(&self, output_dir: &Path) -> SourceResult<RenderedCommand> {
        let out_file = self.resolved_out_file(output_dir)?;
        let mut args = Vec::new();

        for spec in argspec::positional(&COMPOSE_XFM_INPUTS) {
            let value = match spec.name {
                "out_file" => out_file.as_deref(),
                name => self.explicit_value(name),
            };
            let Some(value) = value else {
                continue;
            };
            if spec.exists && self.explicit_value(spec.name).is_some() && !value.exists() {
                return Err(SourceError::NotFound(value.display().to_string()));
            }
            if let Some(argstr) = spec.argstr {
                let value = [TemplateArg::Text(value.display().to_string())];
                for token in argstr.split_whitespace() {
                    if token.contains('%') {
                        args.push(format_template(token, &value)?);
                    } else {
                        args.push(token.to_string());
                    }
                }
            }
        }

        if let Some(extra) = self.args.as_deref() {
            args.extend(extra.split_whitespace().map(str::to_string));
        }

        tracing::debug!("{} {}", COMPOSE_XFM_COMMAND, args.join(" "));
        Ok(RenderedCommand {
            program: COMPOSE_XFM_COMMAND,
            args,
            environ: self.environ.clone(),
            outputs: ComposeXfmOutputs { out_file },
        })
    }
}

fn strip_image_extension(file_name: &str) -> &str {
    for ext in IMAGE_EXTENSIONS {
        if let Some(stem) = file_name.strip_suffix(ext) {
            return stem;
        }
    }
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}
