//! Fragments are unvalidated parts of a cluster configuration. For example, mandatory values may be missing.
//! Fragments may be turned into their validated type by implementing [`FromFragment`].
//!
//! Unlike a plain [`Result`], validation never stops at the first problem. Every problem is recorded as a
//! [`Diagnostic`] that carries the [`FieldPath`] of the offending field, so that a user sees all of them at once.
use std::fmt::{Display, Write};

use serde::{Serialize, Serializer};
use snafu::Snafu;

/// Contains context used for generating diagnostics
///
/// Use [`Validator::root`] to start validating a document, and [`Validator::field`] or [`Validator::index`]
/// to descend into it.
pub struct Validator<'a> {
    segment: Option<Segment<'a>>,
    parent: Option<&'a Validator<'a>>,
}

#[derive(Clone, Copy)]
enum Segment<'a> {
    Field(&'a str),
    Index(usize),
}

impl Validator<'static> {
    /// Creates a `Validator` for the root of a document
    pub fn root() -> Self {
        Self {
            segment: None,
            parent: None,
        }
    }
}

impl<'a> Validator<'a> {
    /// Creates a `Validator` for a subfield of the current object
    pub fn field<'b>(&'b self, name: &'b str) -> Validator<'b> {
        Validator {
            segment: Some(Segment::Field(name)),
            parent: Some(self),
        }
    }

    /// Creates a `Validator` for an element of the current list
    pub fn index<'b>(&'b self, index: usize) -> Validator<'b> {
        Validator {
            segment: Some(Segment::Index(index)),
            parent: Some(self),
        }
    }

    /// Returns the path from the document root to the field this `Validator` refers to
    pub fn path(&self) -> FieldPath {
        let mut segments = Vec::new();
        let mut curr = Some(self);
        while let Some(curr_some) = curr {
            match curr_some.segment {
                Some(Segment::Field(name)) => segments.push(PathSegment::Field(name.to_owned())),
                Some(Segment::Index(index)) => segments.push(PathSegment::Index(index)),
                None => {}
            }
            curr = curr_some.parent;
        }
        segments.reverse();
        FieldPath { segments }
    }

    /// Returns a fatal diagnostic for the field this `Validator` refers to
    pub fn error(&self, problem: Problem) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            path: self.path(),
            problem,
        }
    }

    /// Returns a non-fatal diagnostic for the field this `Validator` refers to
    pub fn warning(&self, problem: Problem) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            path: self.path(),
            problem,
        }
    }

    /// Returns the value if it is provided, otherwise records that the field is required
    pub fn required<T>(&self, value: Option<T>, diagnostics: &mut Diagnostics) -> Option<T> {
        if value.is_none() {
            diagnostics.push(self.error(Problem::FieldRequired));
        }
        value
    }

    /// Like [`Self::required`], but additionally rejects empty strings
    pub fn required_non_empty(
        &self,
        value: Option<String>,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        match self.required(value, diagnostics) {
            Some(value) if value.is_empty() => {
                diagnostics.push(self.error(Problem::EmptyValue));
                None
            }
            value => value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PathSegment {
    Field(String),
    Index(usize),
}

/// The location of a field within a document, such as `spec.host[2].ssh`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A problem that was discovered during validation, with no additional context.
#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
pub enum Problem {
    #[snafu(display("field is required"))]
    FieldRequired,

    #[snafu(display("field must not be empty"))]
    EmptyValue,

    #[snafu(display("at least {min} host is required"))]
    TooFewHosts { min: usize },

    #[snafu(display("host has no connection method, either ssh or winrm must be configured"))]
    NoConnectionMethod,

    #[snafu(display("host has both ssh and winrm configured, using ssh and ignoring winrm"))]
    AmbiguousConnectionMethod,

    #[snafu(display("port {port} is out of range, it must be between 1 and 65535"))]
    PortOutOfRange { port: i64 },
}

impl Serialize for Problem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// The document cannot be translated.
    Error,

    /// The document was translated, but possibly not in the way the user intended.
    Warning,
}

/// A single problem, located at a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    severity: Severity,
    path: FieldPath,
    #[serde(rename = "message")]
    problem: Problem,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            severity,
            path,
            problem,
        } = self;
        if path.is_root() {
            write!(f, "{severity}: {problem}")
        } else {
            write!(f, "{severity}: {path}: {problem}")
        }
    }
}

/// A collection of diagnostics, in the order they were discovered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether any of the diagnostics is fatal.
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|diagnostic| diagnostic.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|diagnostic| !diagnostic.is_error())
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl IntoIterator for Diagnostics {
    type IntoIter = std::vec::IntoIter<Diagnostic>;
    type Item = Diagnostic;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type IntoIter = std::slice::Iter<'a, Diagnostic>;
    type Item = &'a Diagnostic;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A type that can be constructed by validating a "fragment" type.
///
/// Implementations record every problem they find in `diagnostics` and return [`None`] if at least one of them
/// was fatal. They should keep validating sibling fields after a failure, so that all problems of a document are
/// reported together.
pub trait FromFragment: Sized {
    /// The unvalidated counterpart of `Self`.
    type Fragment;

    /// Try to validate a [`Self::Fragment`] into `Self`.
    ///
    /// `validator` contains additional error reporting context, such as the path to the field from the root
    /// fragment.
    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct WithFields {
        name: String,
        tag: Option<String>,
    }

    #[derive(Default)]
    struct WithFieldsFragment {
        name: Option<String>,
        tag: Option<String>,
    }

    impl FromFragment for WithFields {
        type Fragment = WithFieldsFragment;

        fn from_fragment(
            fragment: Self::Fragment,
            validator: &Validator,
            diagnostics: &mut Diagnostics,
        ) -> Option<Self> {
            let name = validator
                .field("name")
                .required_non_empty(fragment.name, diagnostics)?;
            Some(Self {
                name,
                tag: fragment.tag,
            })
        }
    }

    #[test]
    fn validate_basics() {
        let mut diagnostics = Diagnostics::default();
        let validated = WithFields::from_fragment(
            WithFieldsFragment {
                name: Some("foo".to_owned()),
                tag: None,
            },
            &Validator::root(),
            &mut diagnostics,
        );

        assert_eq!(
            validated,
            Some(WithFields {
                name: "foo".to_owned(),
                tag: None
            })
        );
        assert!(diagnostics.is_empty());
    }

    #[rstest]
    #[case(None, "error: items[3].name: field is required")]
    #[case(Some(""), "error: items[3].name: field must not be empty")]
    fn validate_nested(#[case] name: Option<&str>, #[case] expected: &str) {
        let root = Validator::root();
        let items = root.field("items");
        let item = items.index(3);

        let mut diagnostics = Diagnostics::default();
        let validated = WithFields::from_fragment(
            WithFieldsFragment {
                name: name.map(ToOwned::to_owned),
                ..Default::default()
            },
            &item,
            &mut diagnostics,
        );

        assert_eq!(validated, None);
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.to_string(), expected);
    }

    #[rstest]
    #[case(&[], "")]
    #[case(&["spec"], "spec")]
    #[case(&["spec", "host"], "spec.host")]
    fn display_field_paths(#[case] fields: &[&str], #[case] expected: &str) {
        let path = FieldPath {
            segments: fields
                .iter()
                .map(|field| PathSegment::Field((*field).to_owned()))
                .collect(),
        };

        assert_eq!(path.to_string(), expected);
    }

    #[test]
    fn display_indexed_path() {
        let root = Validator::root();
        let spec = root.field("spec");
        let host = spec.field("host");
        let second = host.index(2);

        assert_eq!(second.field("ssh").path().to_string(), "spec.host[2].ssh");
    }

    #[test]
    fn separates_errors_and_warnings() {
        let root = Validator::root();
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(root.field("a").warning(Problem::AmbiguousConnectionMethod));
        assert!(!diagnostics.has_errors());

        diagnostics.push(root.field("b").error(Problem::NoConnectionMethod));
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn serializes_diagnostics() {
        let root = Validator::root();
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(root.field("spec").field("host").error(Problem::TooFewHosts { min: 1 }));

        let value = serde_json::to_value(&diagnostics).expect("diagnostics must serialize");
        assert_eq!(
            value,
            serde_json::json!([{
                "severity": "error",
                "path": "spec.host",
                "message": "at least 1 host is required",
            }])
        );
    }
}
