//! Diagnostics reported while checking an expression.
//!
//! Every problem with the checked expression is recorded here and checking
//! continues; none of these unwind the walk.

use std::fmt;

use cel_typecheck_common::{format_function, CelType, Location, SourceInfo};

/// The kind of type checking error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckErrorKind {
    /// Reference to an undeclared identifier, function or message type.
    #[error("undeclared reference to '{name}' (in container '{container}')")]
    UndeclaredReference { container: String, name: String },

    /// `has()` applied to a name that resolves to a declared identifier.
    #[error("expression does not select a field")]
    NotAFieldSelection,

    #[error("type '{cel_type}' does not support field selection")]
    FieldSelectionUnsupported { cel_type: CelType },

    #[error("undefined field '{field}'")]
    UndefinedField { field: String },

    /// No overload of the function accepts the argument types.
    #[error(
        "found no matching overload for '{function}' applied to '{}'",
        call_signature(.arg_types, .is_instance)
    )]
    NoMatchingOverload {
        function: String,
        arg_types: Vec<CelType>,
        is_instance: bool,
    },

    #[error("expected type '{expected}' but found '{actual}'")]
    TypeMismatch { expected: CelType, actual: CelType },

    #[error("'{cel_type}' is not a type")]
    NotAType { cel_type: CelType },

    #[error("'{cel_type}' is not a message type")]
    NotAMessageType { cel_type: CelType },

    #[error(
        "expression of type '{cel_type}' cannot be range of a comprehension (must be list, map, or dynamic)"
    )]
    NotAComprehensionRange { cel_type: CelType },

    #[error("expected type of field '{field}' is '{expected}' but provided type is '{actual}'")]
    FieldTypeMismatch {
        field: String,
        expected: CelType,
        actual: CelType,
    },

    /// The provider could not resolve a message it previously reported.
    #[error("[internal] unexpected failed resolution of '{name}'")]
    UnexpectedFailedResolution { name: String },
}

/// Render call-site argument types, receiver first for instance calls.
fn call_signature(arg_types: &[CelType], is_instance: &bool) -> String {
    format_function(None, arg_types, *is_instance)
}

/// A type checking error at an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckError {
    pub kind: CheckErrorKind,
    /// The expression ID where the error occurred.
    pub expr_id: i64,
    /// The resolved position, when the source info records one for the id.
    pub location: Option<Location>,
}

impl CheckError {
    pub fn new(kind: CheckErrorKind, expr_id: i64, location: Option<Location>) -> Self {
        Self {
            kind,
            expr_id,
            location,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{}: {}", location, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for CheckError {}

/// Ordered, append-only list of check errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    errors: Vec<CheckError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error at `expr_id`, resolving its location through `source_info`.
    pub fn report(&mut self, source_info: &SourceInfo, expr_id: i64, kind: CheckErrorKind) {
        self.errors
            .push(CheckError::new(kind, expr_id, source_info.location(expr_id)));
    }

    pub fn push(&mut self, error: CheckError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CheckError> {
        self.errors.iter()
    }

    pub fn errors(&self) -> &[CheckError] {
        &self.errors
    }

    /// Render every error as `ERROR: <description>:<line>:<column>: <message>`,
    /// one per line.
    pub fn to_display_string(&self, description: &str) -> String {
        let lines: Vec<String> = self
            .errors
            .iter()
            .map(|e| match e.location {
                Some(location) => format!("ERROR: {}:{}: {}", description, location, e.kind),
                None => format!("ERROR: {}: {}", description, e.kind),
            })
            .collect();
        lines.join("\n")
    }
}

impl IntoIterator for Diagnostics {
    type Item = CheckError;
    type IntoIter = std::vec::IntoIter<CheckError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a CheckError;
    type IntoIter = std::slice::Iter<'a, CheckError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
