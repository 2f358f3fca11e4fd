//! Argument metadata for command-line tool wrappers.

/// Metadata attached to one input or output of a wrapped tool.
///
/// Fields left at their defaults carry no metadata, so two specs compare equal only
/// when every declared attribute matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ArgSpec {
    pub name: &'static str,
    /// printf-style fragment the value is rendered into, e.g. `-aff %s`.
    pub argstr: Option<&'static str>,
    pub position: Option<i32>,
    pub mandatory: Option<bool>,
    /// The value names a path that must exist.
    pub exists: bool,
    /// Input the value is derived from when unset.
    pub name_source: Option<&'static str>,
    pub name_template: Option<&'static str>,
    /// Excluded from input hashing.
    pub nohash: bool,
    pub usedefault: bool,
    /// Version the input was deprecated in.
    pub deprecated: Option<&'static str>,
}

impl ArgSpec {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            argstr: None,
            position: None,
            mandatory: None,
            exists: false,
            name_source: None,
            name_template: None,
            nohash: false,
            usedefault: false,
            deprecated: None,
        }
    }

    pub const fn argstr(self, argstr: &'static str) -> Self {
        Self {
            argstr: Some(argstr),
            ..self
        }
    }

    pub const fn position(self, position: i32) -> Self {
        Self {
            position: Some(position),
            ..self
        }
    }

    pub const fn mandatory(self, mandatory: bool) -> Self {
        Self {
            mandatory: Some(mandatory),
            ..self
        }
    }

    pub const fn exists(self) -> Self {
        Self {
            exists: true,
            ..self
        }
    }

    pub const fn named_from(self, source: &'static str, template: &'static str) -> Self {
        Self {
            name_source: Some(source),
            name_template: Some(template),
            ..self
        }
    }

    pub const fn nohash(self) -> Self {
        Self {
            nohash: true,
            ..self
        }
    }

    pub const fn usedefault(self) -> Self {
        Self {
            usedefault: true,
            ..self
        }
    }

    pub const fn deprecated(self, version: &'static str) -> Self {
        Self {
            deprecated: Some(version),
            ..self
        }
    }
}

/// Finds a spec by name.
pub fn find<'a>(specs: &'a [ArgSpec], name: &str) -> Option<&'a ArgSpec> {
    specs.iter().find(|spec| spec.name == name)
}

/// Specs with an `argstr` and a position, in position order.
pub fn positional(specs: &[ArgSpec]) -> Vec<&ArgSpec> {
    let mut ordered: Vec<&ArgSpec> = specs
        .iter()
        .filter(|spec| spec.argstr.is_some() && spec.position.is_some())
        .collect();
    ordered.sort_by_key(|spec| spec.position);
    ordered
}
