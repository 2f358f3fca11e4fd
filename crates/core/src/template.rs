//! Path templates and glob expansion.
//!
//! Templates use printf-style positional placeholders, the convention neuroimaging
//! file templates are written in:
//!
//! - `%s` substitutes any argument
//! - `%d` substitutes an integer argument; `%3d` pads with spaces, `%03d` with zeros
//! - `%%` is a literal percent sign
//!
//! The formatted string is then expanded as a glob. `*`, `?` and `[...]` match inside a
//! single path component only, so `sub-*/anat/*.nii` never descends further than two
//! directories below its static prefix.
//! As in a shell, wildcards skip names starting with `.` and braces are literal.

use crate::error::{SourceError, SourceResult};
use std::path::{Path, PathBuf};

/// A positional template argument.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum TemplateArg {
    Int(i64),
    Text(String),
}

impl TemplateArg {
    /// Parses a command-line value: integers become `Int`, anything else `Text`.
    pub fn parse_lenient(value: &str) -> Self {
        value
            .parse::<i64>()
            .map(TemplateArg::Int)
            .unwrap_or_else(|_| TemplateArg::Text(value.to_owned()))
    }

    /// Empty text counts as "not supplied" for named grabber arguments.
    pub fn is_empty(&self) -> bool {
        matches!(self, TemplateArg::Text(text) if text.is_empty())
    }
}

impl std::fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateArg::Int(value) => write!(f, "{}", value),
            TemplateArg::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for TemplateArg {
    fn from(value: &str) -> Self {
        TemplateArg::Text(value.to_owned())
    }
}

impl From<String> for TemplateArg {
    fn from(value: String) -> Self {
        TemplateArg::Text(value)
    }
}

impl From<i64> for TemplateArg {
    fn from(value: i64) -> Self {
        TemplateArg::Int(value)
    }
}

impl From<i32> for TemplateArg {
    fn from(value: i32) -> Self {
        TemplateArg::Int(i64::from(value))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Any,
    Int { width: usize, zero_pad: bool },
}

fn parse_template(template: &str) -> SourceResult<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        let zero_pad = chars.next_if_eq(&'0').is_some();
        let mut digits = String::new();
        while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
            digits.push(d);
        }
        let plain = !zero_pad && digits.is_empty();

        let piece = match chars.next() {
            Some('%') if plain => {
                literal.push('%');
                continue;
            }
            Some('s') if plain => Piece::Any,
            Some('d') => {
                let width = if digits.is_empty() {
                    0
                } else {
                    digits.parse().map_err(|_| {
                        SourceError::TemplateArgument(format!(
                            "field width too large in template {:?}",
                            template
                        ))
                    })?
                };
                Piece::Int { width, zero_pad }
            }
            Some(other) => {
                return Err(SourceError::TemplateArgument(format!(
                    "unsupported conversion '%{}' in template {:?}",
                    other, template
                )))
            }
            None => {
                return Err(SourceError::TemplateArgument(format!(
                    "incomplete placeholder at end of template {:?}",
                    template
                )))
            }
        };

        if !literal.is_empty() {
            pieces.push(Piece::Literal(std::mem::take(&mut literal)));
        }
        pieces.push(piece);
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

/// Substitutes `args` into the placeholders of `template`.
///
/// # Errors
///
/// Returns `SourceError::TemplateArgument` if:
/// - the number of placeholders differs from `args.len()`,
/// - a `%d` placeholder receives a text argument,
/// - the template contains an unsupported or incomplete conversion.
pub fn format_template(template: &str, args: &[TemplateArg]) -> SourceResult<String> {
    let pieces = parse_template(template)?;
    let expected = pieces
        .iter()
        .filter(|p| !matches!(p, Piece::Literal(_)))
        .count();

    if expected != args.len() {
        return Err(SourceError::TemplateArgument(format!(
            "template {:?} has {} placeholder(s) but {} argument(s) were supplied",
            template,
            expected,
            args.len()
        )));
    }

    let mut args = args.iter();
    let mut out = String::with_capacity(template.len());
    for piece in pieces {
        match piece {
            Piece::Literal(text) => out.push_str(&text),
            Piece::Any => {
                if let Some(arg) = args.next() {
                    out.push_str(&arg.to_string());
                }
            }
            Piece::Int { width, zero_pad } => match args.next() {
                Some(TemplateArg::Int(value)) if zero_pad => {
                    out.push_str(&format!("{:0width$}", value, width = width))
                }
                Some(TemplateArg::Int(value)) => {
                    out.push_str(&format!("{:width$}", value, width = width))
                }
                Some(TemplateArg::Text(text)) => {
                    return Err(SourceError::TemplateArgument(format!(
                        "%d placeholder in template {:?} requires an integer, got {:?}",
                        template, text
                    )))
                }
                None => {}
            },
        }
    }

    Ok(out)
}

/// Formats `template` with `args` and expands the result as a glob.
///
/// With no arguments the template is taken verbatim as the pattern, placeholders
/// included. Zero matches is not an error.
///
/// # Returns
///
/// Sorted absolute paths of every match.
pub fn resolve_template(template: &str, args: &[TemplateArg]) -> SourceResult<Vec<PathBuf>> {
    let pattern = if args.is_empty() {
        template.to_owned()
    } else {
        format_template(template, args)?
    };
    expand_glob(&pattern)
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(&['*', '?', '['][..])
}

/// Rewrites one pattern component so the walker reads it as a plain shell glob.
///
/// Brace groups, backslashes, `**`, a leading `!` or `#` and trailing spaces carry
/// meaning to the walker but not to a shell glob.
fn escape_component(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    let mut in_class = false;
    let last = component.chars().count().saturating_sub(1);
    for (i, c) in component.chars().enumerate() {
        match c {
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '*' if !in_class && escaped.ends_with('*') => continue,
            '{' | '}' | '\\' if !in_class => escaped.push('\\'),
            '!' | '#' if i == 0 => escaped.push('\\'),
            ' ' if i == last => escaped.push('\\'),
            _ => {}
        }
        escaped.push(c);
    }
    escaped
}

/// A wildcard never matches a leading `.` unless the pattern component starts with one.
fn hidden_by_wildcard(path: &Path, base: &Path, remainder: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(base) else {
        return false;
    };
    relative
        .components()
        .zip(remainder)
        .any(|(name, pattern)| {
            name.as_os_str().to_string_lossy().starts_with('.') && !pattern.starts_with('.')
        })
}

/// Expands a filesystem glob pattern.
///
/// The pattern is split into a static directory prefix and a glob remainder; only the
/// prefix directory is walked, and only to the depth of the remainder. Relative patterns
/// are anchored at the current working directory.
///
/// # Errors
///
/// Returns `SourceError::InvalidPattern` if the glob cannot be compiled, or
/// `SourceError::Io` if the working directory cannot be determined.
pub fn expand_glob(pattern: &str) -> SourceResult<Vec<PathBuf>> {
    let mut base = PathBuf::new();
    let mut remainder: Vec<String> = Vec::new();

    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if remainder.is_empty() && !has_glob_meta(&text) {
            base.push(component);
        } else {
            remainder.push(text.into_owned());
        }
    }

    if base.is_relative() {
        base = std::env::current_dir()?.join(base);
    }

    if remainder.is_empty() {
        tracing::debug!("literal pattern {}", base.display());
        return Ok(if base.exists() { vec![base] } else { Vec::new() });
    }

    if !base.is_dir() {
        tracing::debug!("glob base {} is not a directory", base.display());
        return Ok(Vec::new());
    }

    let depth = remainder.len();
    let glob = remainder
        .iter()
        .map(|component| escape_component(component))
        .collect::<Vec<_>>()
        .join("/");
    let walker = globwalk::GlobWalkerBuilder::from_patterns(&base, &[glob.as_str()])
        .max_depth(depth)
        .follow_links(true)
        .build()
        .map_err(|e| SourceError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;

    let mut matches: Vec<PathBuf> = walker
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() == depth)
        .map(|entry| entry.into_path())
        .filter(|path| !hidden_by_wildcard(path, &base, &remainder))
        .collect();
    matches.sort();

    tracing::debug!("{} -> {} match(es)", pattern, matches.len());
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_format_template_substitutes_in_order() {
        let formatted =
            format_template("%s/run-%d/%s.nii", &["s1".into(), 3.into(), "bold".into()]).unwrap();
        assert_eq!(formatted, "s1/run-3/bold.nii");
    }

    #[test]
    fn test_format_template_padding_and_percent() {
        assert_eq!(format_template("f%03d", &[7.into()]).unwrap(), "f007");
        assert_eq!(format_template("f%3d", &[7.into()]).unwrap(), "f  7");
        assert_eq!(format_template("100%%-%s", &["x".into()]).unwrap(), "100%-x");
    }

    #[test]
    fn test_format_template_integer_as_text() {
        assert_eq!(format_template("sub-%s", &[12.into()]).unwrap(), "sub-12");
    }

    #[test]
    fn test_format_template_count_mismatch() {
        let too_few = format_template("%s/%s", &["a".into()]);
        let too_many = format_template("%s", &["a".into(), "b".into()]);
        let none_expected = format_template("plain.nii", &["a".into()]);

        assert!(matches!(too_few, Err(SourceError::TemplateArgument(_))));
        assert!(matches!(too_many, Err(SourceError::TemplateArgument(_))));
        assert!(matches!(none_expected, Err(SourceError::TemplateArgument(_))));
    }

    #[test]
    fn test_format_template_rejects_text_for_integer() {
        let result = format_template("run-%d", &["three".into()]);
        assert!(matches!(result, Err(SourceError::TemplateArgument(_))));
    }

    #[test]
    fn test_format_template_rejects_unknown_conversion() {
        assert!(matches!(
            format_template("%f", &[1.into()]),
            Err(SourceError::TemplateArgument(_))
        ));
        assert!(matches!(
            format_template("trailing%", &[]),
            Err(SourceError::TemplateArgument(_))
        ));
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(TemplateArg::parse_lenient("42"), TemplateArg::Int(42));
        assert_eq!(TemplateArg::parse_lenient("s1"), TemplateArg::Text("s1".into()));
        assert!(TemplateArg::parse_lenient("").is_empty());
    }

    #[test]
    fn test_template_arg_deserializes_untagged() {
        let args: Vec<TemplateArg> = serde_json::from_str(r#"[3, "f5"]"#).unwrap();
        assert_eq!(args, vec![TemplateArg::Int(3), TemplateArg::Text("f5".into())]);
    }

    #[test]
    fn test_expand_glob_sorted_matches() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("s1/f10.nii"));
        touch(&temp.path().join("s1/f3.nii"));
        touch(&temp.path().join("s1/notes.txt"));

        let pattern = format!("{}/s1/*.nii", temp.path().display());
        let matches = expand_glob(&pattern).unwrap();

        assert_eq!(
            matches,
            vec![temp.path().join("s1/f10.nii"), temp.path().join("s1/f3.nii")]
        );
    }

    #[test]
    fn test_expand_glob_does_not_cross_directories() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("mri/lh.ribbon.mgz"));
        touch(&temp.path().join("mri/orig/nested.ribbon.mgz"));

        let pattern = format!("{}/mri/*ribbon.mgz", temp.path().display());
        let matches = expand_glob(&pattern).unwrap();

        assert_eq!(matches, vec![temp.path().join("mri/lh.ribbon.mgz")]);
    }

    #[test]
    fn test_expand_glob_wildcard_directory_component() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("sub-01/anat/T1w.nii"));
        touch(&temp.path().join("sub-02/anat/T1w.nii"));
        touch(&temp.path().join("sub-02/func/bold.nii"));

        let pattern = format!("{}/sub-*/anat/*.nii", temp.path().display());
        let matches = expand_glob(&pattern).unwrap();

        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|p| p.ends_with("anat/T1w.nii")));
    }

    #[test]
    fn test_expand_glob_wildcard_skips_hidden_names() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("mri/ribbon.mgz"));
        touch(&temp.path().join("mri/.lh.ribbon.mgz"));
        touch(&temp.path().join(".cache/ribbon.mgz"));

        let visible = expand_glob(&format!("{}/mri/*ribbon.mgz", temp.path().display())).unwrap();
        let explicit = expand_glob(&format!("{}/mri/.*ribbon.mgz", temp.path().display())).unwrap();
        let nested = expand_glob(&format!("{}/*/ribbon.mgz", temp.path().display())).unwrap();

        assert_eq!(visible, vec![temp.path().join("mri/ribbon.mgz")]);
        assert_eq!(explicit, vec![temp.path().join("mri/.lh.ribbon.mgz")]);
        assert_eq!(nested, vec![temp.path().join("mri/ribbon.mgz")]);
    }

    #[test]
    fn test_expand_glob_braces_and_backslashes_are_literal() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("s1/a{b.nii"));
        touch(&temp.path().join("s1/x\\y.nii"));
        touch(&temp.path().join("s1/a.nii"));
        touch(&temp.path().join("s1/{a,b}.nii"));

        let brace = expand_glob(&format!("{}/*/a{{b.nii", temp.path().display())).unwrap();
        let backslash = expand_glob(&format!("{}/*/x\\y.nii", temp.path().display())).unwrap();
        let group = expand_glob(&format!("{}/s1/{{a,b}}.nii", temp.path().display())).unwrap();

        assert_eq!(brace, vec![temp.path().join("s1/a{b.nii")]);
        assert_eq!(backslash, vec![temp.path().join("s1/x\\y.nii")]);
        assert_eq!(group, vec![temp.path().join("s1/{a,b}.nii")]);
    }

    #[test]
    fn test_expand_glob_relative_pattern_is_absolute() {
        // Tests run from the crate directory.
        let matches = expand_glob("src/*.rs").unwrap();

        assert!(!matches.is_empty());
        assert!(matches.iter().all(|p| p.is_absolute()));
        assert!(matches.iter().any(|p| p.ends_with("src/template.rs")));
    }

    #[test]
    fn test_expand_glob_literal_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("T1.mgz");
        touch(&file);

        let found = expand_glob(&file.display().to_string()).unwrap();
        let missing = expand_glob(&temp.path().join("T2.mgz").display().to_string()).unwrap();

        assert_eq!(found, vec![file]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_expand_glob_missing_base_is_empty() {
        let temp = TempDir::new().unwrap();
        let pattern = format!("{}/absent/*.nii", temp.path().display());

        assert!(expand_glob(&pattern).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_template_without_args_is_verbatim() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("run-%d.nii"));
        touch(&temp.path().join("run-1.nii"));

        let template = format!("{}/run-%d.nii", temp.path().display());
        let matches = resolve_template(&template, &[]).unwrap();

        assert_eq!(matches, vec![temp.path().join("run-%d.nii")]);
    }

    #[test]
    fn test_resolve_template_with_args() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("s1/f3.nii"));
        touch(&temp.path().join("s1/f5.nii"));

        let template = format!("{}/%s/f%d.nii", temp.path().display());
        let matches = resolve_template(&template, &["s1".into(), 5.into()]).unwrap();

        assert_eq!(matches, vec![temp.path().join("s1/f5.nii")]);
    }

    #[test]
    fn test_resolve_template_zero_matches_is_ok() {
        let temp = TempDir::new().unwrap();
        let template = format!("{}/%s/*.nii", temp.path().display());

        let matches = resolve_template(&template, &["nobody".into()]).unwrap();
        assert!(matches.is_empty());
    }
}
