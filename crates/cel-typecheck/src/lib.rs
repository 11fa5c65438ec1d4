//! CEL Type Checker
//!
//! Assigns a static type to every node of a CEL expression tree and resolves
//! identifiers, message types and function overloads against a
//! [`CheckerEnv`]. The result carries a `type_map` and `reference_map` keyed
//! by expression id, the checked tree with names qualified, and every error
//! found.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cel_typecheck::{check, CheckerEnv, Container};
//! use cel_typecheck_common::{CelType, Decl, ExprFactory, IdentDecl, SourceInfo, StaticTypeProvider};
//!
//! let mut env = CheckerEnv::standard(Container::default(), Arc::new(StaticTypeProvider::new()));
//! env.add([Decl::Ident(IdentDecl::new("x", CelType::Int))]).unwrap();
//!
//! // x + 1
//! let mut f = ExprFactory::new();
//! let (x, one) = (f.ident("x"), f.int(1));
//! let expr = f.global_call("_+_", vec![x, one]);
//!
//! let result = check(&expr, &SourceInfo::default(), &env);
//! assert!(result.is_ok());
//! assert_eq!(result.result_type(), Some(&CelType::Int));
//! ```

mod checker;
mod container;
mod debug;
mod env;
mod errors;
mod mapping;
mod overload;
mod scopes;
mod standard_library;
mod types;

pub use checker::{check, CheckResult, Checker, Reference};
pub use container::{Container, ContainerError};
pub use debug::{to_adorned_debug_string, to_debug_string, Adorner, EmptyAdorner, SemanticAdorner};
pub use env::{AggregateLiteralPolicy, CheckerEnv, DeclConflict, EnvError, EnvOptions};
pub use errors::{CheckError, CheckErrorKind, Diagnostics};
pub use mapping::Mapping;
pub use scopes::{Group, Scopes};
pub use standard_library::{get_standard_function, STANDARD_DECLARATIONS};
pub use types::{
    is_assignable, is_assignable_list, is_equal_or_less_specific, most_general, not_referenced_in,
    substitute,
};
