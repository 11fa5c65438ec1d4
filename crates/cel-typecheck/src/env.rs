//! The checking environment.
//!
//! A `CheckerEnv` bundles the container, the type provider, the declared
//! scopes and the checker options. It is a cheap-to-clone value: entering or
//! leaving a scope produces a new environment and never changes the one it
//! was derived from.

use std::collections::BTreeSet;
use std::sync::Arc;

use cel_typecheck_common::{
    well_known_type, CelType, CelValue, Decl, FunctionDecl, IdentDecl, OverloadDecl, TypeProvider,
};
use dashmap::DashMap;

use crate::container::Container;
use crate::mapping::Mapping;
use crate::scopes::Scopes;
use crate::standard_library::STANDARD_DECLARATIONS;
use crate::types::{is_assignable, substitute};

/// Macros that expand at parse time and so cannot be declared as functions:
/// `(name, argument count including any receiver, receiver style)`.
const RESERVED_MACROS: &[(&str, usize, bool)] = &[
    ("has", 1, false),
    ("all", 3, true),
    ("exists", 3, true),
    ("exists_one", 3, true),
    ("map", 3, true),
    ("map", 4, true),
    ("filter", 3, true),
];

/// How list and map literals with differing element types are typed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregateLiteralPolicy {
    /// Mixed element types widen to `dyn`.
    #[default]
    Dynamic,
    /// Mixed element types are a type mismatch.
    Homogeneous,
}

/// Checker options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOptions {
    pub aggregate_literal_policy: AggregateLiteralPolicy,
    /// Overload ids that overload resolution skips.
    pub disabled_overloads: BTreeSet<String>,
}

/// One rejected declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclConflict {
    #[error("overlapping identifier for name '{name}'")]
    OverlappingIdentifier { name: String },

    #[error(
        "overlapping overload for name '{function}' (type '{signature}' with overloadId: '{overload_id}' cannot be distinguished from '{existing_signature}' with overloadId: '{existing_id}')"
    )]
    OverlappingOverload {
        function: String,
        overload_id: String,
        signature: String,
        existing_id: String,
        existing_signature: String,
    },

    #[error("overlapping macro for name '{function}' with {arg_count} args")]
    OverlappingMacro { function: String, arg_count: usize },
}

/// Errors building an environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    /// Every conflict found in one `add` call.
    #[error("{}", join_lines(.0))]
    Overlapping(Vec<DeclConflict>),
}

fn join_lines(conflicts: &[DeclConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The environment expressions are checked against.
#[derive(Debug, Clone)]
pub struct CheckerEnv {
    container: Arc<Container>,
    provider: Arc<dyn TypeProvider>,
    scopes: Arc<Scopes>,
    options: Arc<EnvOptions>,
    /// Provider types and enum constants promoted to identifiers on first use.
    promoted: Arc<DashMap<String, IdentDecl>>,
}

impl CheckerEnv {
    /// Create an environment with no declarations.
    pub fn new(container: Container, provider: Arc<dyn TypeProvider>) -> Self {
        Self {
            container: Arc::new(container),
            provider,
            scopes: Arc::new(Scopes::new()),
            options: Arc::new(EnvOptions::default()),
            promoted: Arc::new(DashMap::new()),
        }
    }

    /// Create an environment with the standard declarations installed.
    pub fn standard(container: Container, provider: Arc<dyn TypeProvider>) -> Self {
        let mut env = Self::new(container, provider);
        let scopes = Arc::make_mut(&mut env.scopes);
        for decl in STANDARD_DECLARATIONS.iter() {
            match decl {
                Decl::Ident(ident) => scopes.add_ident(ident.clone()),
                Decl::Function(function) => scopes.set_function(function.clone()),
            }
        }
        env
    }

    pub fn with_options(mut self, options: EnvOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    /// Reject list and map literals whose elements differ in type.
    pub fn with_homogeneous_aggregate_literals(mut self) -> Self {
        Arc::make_mut(&mut self.options).aggregate_literal_policy = AggregateLiteralPolicy::Homogeneous;
        self
    }

    pub fn with_disabled_overloads<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        Arc::make_mut(&mut self.options)
            .disabled_overloads
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn provider(&self) -> &dyn TypeProvider {
        self.provider.as_ref()
    }

    pub fn options(&self) -> &EnvOptions {
        &self.options
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn is_overload_disabled(&self, id: &str) -> bool {
        self.options.disabled_overloads.contains(id)
    }

    // ==================== Lookup ====================

    /// Resolve an identifier through the container candidates.
    ///
    /// For each candidate, in order: a declared identifier, a provider message
    /// type (as an identifier of type `type(T)`), then a provider enum constant
    /// (as an `int` constant). Provider hits are cached for later lookups.
    pub fn lookup_ident(&self, name: &str) -> Option<IdentDecl> {
        for candidate in self.container.resolve_candidate_names(name) {
            if let Some(ident) = self.scopes.find_ident(&candidate) {
                return Some(ident.clone());
            }
            if let Some(ident) = self.promoted.get(&candidate) {
                return Some(ident.value().clone());
            }
            if let Some(message) = self.provider.find_type(&candidate) {
                tracing::debug!(name = %candidate, "promoted message type to identifier");
                let decl = IdentDecl::new(candidate.clone(), CelType::type_of(message));
                self.promoted.insert(candidate, decl.clone());
                return Some(decl);
            }
            if let Some(value) = self.provider.enum_value(&candidate) {
                tracing::debug!(name = %candidate, value, "promoted enum constant to identifier");
                let decl = IdentDecl::constant(candidate.clone(), CelType::Int, CelValue::Int(value));
                self.promoted.insert(candidate, decl.clone());
                return Some(decl);
            }
        }
        None
    }

    /// Resolve a function through the container candidates.
    pub fn lookup_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.container
            .resolve_candidate_names(name)
            .iter()
            .find_map(|candidate| self.scopes.find_function(candidate))
    }

    // ==================== Scopes ====================

    /// A new environment with an empty innermost scope.
    pub fn enter_scope(&self) -> CheckerEnv {
        CheckerEnv {
            scopes: Arc::new(Scopes::push(&self.scopes)),
            ..self.clone()
        }
    }

    /// A new environment without the innermost scope. At the outermost scope
    /// this is the same environment.
    pub fn exit_scope(&self) -> CheckerEnv {
        match self.scopes.pop() {
            Some(parent) => CheckerEnv {
                scopes: Arc::clone(parent),
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Bind an identifier in the innermost scope, shadowing outer ones.
    pub fn bind(&mut self, decl: IdentDecl) {
        Arc::make_mut(&mut self.scopes).add_ident(decl);
    }

    // ==================== Declaration ====================

    /// Add declarations to the innermost scope.
    ///
    /// Either every declaration is installed or, when any conflicts, none is
    /// and every conflict is reported.
    pub fn add(&mut self, decls: impl IntoIterator<Item = Decl>) -> Result<(), EnvError> {
        let mut scopes = Scopes::clone(&self.scopes);
        let mut conflicts = Vec::new();

        for decl in decls {
            match decl {
                Decl::Ident(ident) => {
                    let ident = sanitize_ident(ident);
                    match scopes.find_ident_in_scope(&ident.name) {
                        Some(existing) if *existing == ident => {}
                        Some(_) => conflicts.push(DeclConflict::OverlappingIdentifier { name: ident.name }),
                        None => scopes.add_ident(ident),
                    }
                }
                Decl::Function(function) => {
                    let mut current = scopes
                        .find_function(&function.name)
                        .cloned()
                        .unwrap_or_else(|| FunctionDecl::new(function.name.clone()));
                    for overload in function.overloads {
                        add_overload(&mut current, sanitize_overload(overload), &mut conflicts);
                    }
                    scopes.set_function(current);
                }
            }
        }

        if !conflicts.is_empty() {
            return Err(EnvError::Overlapping(conflicts));
        }
        self.scopes = Arc::new(scopes);
        Ok(())
    }
}

/// Merge `overload` into `function` unless it conflicts with an existing
/// overload or a reserved macro.
fn add_overload(function: &mut FunctionDecl, overload: OverloadDecl, conflicts: &mut Vec<DeclConflict>) {
    if function.overloads.iter().any(|existing| *existing == overload) {
        return;
    }

    let empty = Mapping::new();
    let signature = overload.function_type();
    let erased = substitute(&empty, &signature, true);
    let mut rejected = false;

    for existing in &function.overloads {
        let existing_signature = existing.function_type();
        let existing_erased = substitute(&empty, &existing_signature, true);
        let overlaps = is_assignable(&empty, &erased, &existing_erased).is_some()
            && is_assignable(&empty, &existing_erased, &erased).is_some();
        if existing.id == overload.id || (overlaps && existing.is_instance == overload.is_instance) {
            conflicts.push(DeclConflict::OverlappingOverload {
                function: function.name.clone(),
                overload_id: overload.id.clone(),
                signature: signature.display_name(),
                existing_id: existing.id.clone(),
                existing_signature: existing_signature.display_name(),
            });
            rejected = true;
        }
    }

    for &(name, arg_count, receiver_style) in RESERVED_MACROS {
        if name == function.name && receiver_style == overload.is_instance && arg_count == overload.params.len() {
            conflicts.push(DeclConflict::OverlappingMacro {
                function: function.name.clone(),
                arg_count,
            });
            rejected = true;
        }
    }

    if !rejected {
        function.overloads.push(overload);
    }
}

/// Replace message types naming well-known types with their CEL types.
fn sanitize_type(t: &CelType) -> CelType {
    match t {
        CelType::Message(name) => well_known_type(name).unwrap_or_else(|| t.clone()),
        CelType::List(elem) => CelType::list(sanitize_type(elem)),
        CelType::Map(key, value) => CelType::map(sanitize_type(key), sanitize_type(value)),
        CelType::Abstract { name, params } => CelType::Abstract {
            name: name.clone(),
            params: params.iter().map(sanitize_type).collect(),
        },
        CelType::Function { result, args } => {
            CelType::function(sanitize_type(result), args.iter().map(sanitize_type))
        }
        CelType::Type(Some(inner)) => CelType::type_of(sanitize_type(inner)),
        _ => t.clone(),
    }
}

fn sanitize_ident(ident: IdentDecl) -> IdentDecl {
    IdentDecl {
        cel_type: sanitize_type(&ident.cel_type),
        ..ident
    }
}

fn sanitize_overload(overload: OverloadDecl) -> OverloadDecl {
    OverloadDecl {
        params: overload.params.iter().map(sanitize_type).collect(),
        result: sanitize_type(&overload.result),
        ..overload
    }
}
