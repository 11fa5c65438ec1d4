//! Declaration types for identifiers, functions, and overloads.
//!
//! These are the pure data values a checking environment is built from. A
//! `Decl` is either an identifier (with an optional constant value) or a
//! function (an ordered list of overloads).

use crate::{CelType, CelValue};

/// Identifier declaration.
///
/// Represents a variable or constant that can be referenced in CEL expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentDecl {
    /// The fully qualified identifier name.
    pub name: String,
    /// The CEL type of the identifier.
    pub cel_type: CelType,
    /// For enum constants, the compile-time value.
    pub value: Option<CelValue>,
}

impl IdentDecl {
    pub fn new(name: impl Into<String>, cel_type: CelType) -> Self {
        Self {
            name: name.into(),
            cel_type,
            value: None,
        }
    }

    /// Create a constant declaration with a compile-time value.
    pub fn constant(name: impl Into<String>, cel_type: CelType, value: CelValue) -> Self {
        Self {
            name: name.into(),
            cel_type,
            value: Some(value),
        }
    }
}

/// One callable signature of a function.
///
/// For instance overloads the receiver is the first entry of `params`.
/// Type parameters are local to the overload and instantiated afresh at every
/// call site.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadDecl {
    /// Unique identifier for this overload (e.g., "add_int64").
    pub id: String,
    pub params: Vec<CelType>,
    pub result: CelType,
    /// Whether this overload is called receiver-style (`target.fn(args)`).
    pub is_instance: bool,
    /// Names of the overload's own type parameters (e.g., ["A", "B"]).
    pub type_params: Vec<String>,
}

impl OverloadDecl {
    /// Create a global (static) overload.
    pub fn global(id: impl Into<String>, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            id: id.into(),
            params,
            result,
            is_instance: false,
            type_params: Vec::new(),
        }
    }

    /// Create a receiver-style overload. The first parameter is the receiver type.
    pub fn instance(id: impl Into<String>, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            id: id.into(),
            params,
            result,
            is_instance: true,
            type_params: Vec::new(),
        }
    }

    /// Declare the overload's type parameters, making it parametric.
    pub fn with_type_params<S: Into<String>>(mut self, params: impl IntoIterator<Item = S>) -> Self {
        self.type_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_parametric(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// The overload's signature as a function type `(params...) -> result`.
    pub fn function_type(&self) -> CelType {
        CelType::function(self.result.clone(), self.params.iter().cloned())
    }

    /// Get the receiver type for instance overloads.
    pub fn receiver_type(&self) -> Option<&CelType> {
        if self.is_instance {
            self.params.first()
        } else {
            None
        }
    }
}

/// Function declaration with overloads.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<OverloadDecl>,
}

impl FunctionDecl {
    /// Create a new function declaration with no overloads.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    pub fn with_overload(mut self, overload: OverloadDecl) -> Self {
        self.overloads.push(overload);
        self
    }

    pub fn with_overloads(mut self, overloads: impl IntoIterator<Item = OverloadDecl>) -> Self {
        self.overloads.extend(overloads);
        self
    }

    /// Look up an overload by id.
    pub fn overload(&self, id: &str) -> Option<&OverloadDecl> {
        self.overloads.iter().find(|o| o.id == id)
    }
}

/// A named declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Ident(IdentDecl),
    Function(FunctionDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Ident(ident) => &ident.name,
            Decl::Function(function) => &function.name,
        }
    }
}

impl From<IdentDecl> for Decl {
    fn from(decl: IdentDecl) -> Self {
        Decl::Ident(decl)
    }
}

impl From<FunctionDecl> for Decl {
    fn from(decl: FunctionDecl) -> Self {
        Decl::Function(decl)
    }
}
