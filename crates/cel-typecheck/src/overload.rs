//! Overload resolution for function calls.
//!
//! Every overload whose call style matches is tried against the argument
//! types. Matches accumulate into one reference; the result type is that of
//! the first match, widened to `dyn` when a later match disagrees.

use cel_typecheck_common::{CelType, FunctionDecl};

use crate::checker::Reference;
use crate::env::CheckerEnv;
use crate::mapping::Mapping;
use crate::types::{is_assignable_list, substitute};

/// Source of fresh type variables, unique within one check.
#[derive(Debug, Default)]
pub(crate) struct TypeVarGenerator {
    next: usize,
}

impl TypeVarGenerator {
    pub(crate) fn fresh(&mut self) -> CelType {
        let name = format!("_var{}", self.next);
        self.next += 1;
        CelType::type_param(&name)
    }
}

/// A successful resolution: the matching overloads and the call's type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OverloadResolution {
    pub reference: Reference,
    pub result_type: CelType,
}

/// Resolve a call of `function` with the given argument types.
///
/// For instance calls the receiver type is the first entry of `arg_types`.
/// Bindings made by matching overloads are kept in `mappings`. Returns None
/// when no overload matches.
pub(crate) fn resolve_overload(
    env: &CheckerEnv,
    mappings: &mut Mapping,
    type_vars: &mut TypeVarGenerator,
    function: &FunctionDecl,
    arg_types: &[CelType],
    is_instance: bool,
) -> Option<OverloadResolution> {
    let mut resolution: Option<OverloadResolution> = None;

    for overload in &function.overloads {
        if env.is_overload_disabled(&overload.id) || overload.is_instance != is_instance {
            continue;
        }

        let mut overload_type = overload.function_type();
        if overload.is_parametric() {
            let mut instantiation = Mapping::new();
            for param in &overload.type_params {
                instantiation.add(CelType::type_param(param), type_vars.fresh());
            }
            overload_type = substitute(&instantiation, &overload_type, false);
        }
        let CelType::Function { result, args } = &overload_type else {
            continue;
        };

        let Some(bound) = is_assignable_list(mappings, arg_types, args) else {
            tracing::trace!(overload = %overload.id, "overload does not match");
            continue;
        };
        *mappings = bound;

        let result_type = substitute(mappings, result, false);
        match resolution.as_mut() {
            None => {
                resolution = Some(OverloadResolution {
                    reference: Reference::function(&overload.id),
                    result_type,
                });
            }
            Some(current) => {
                current.reference.add_overload(&overload.id);
                if !current.result_type.is_dyn() && current.result_type != result_type {
                    current.result_type = CelType::Dyn;
                }
            }
        }
    }

    match &resolution {
        Some(r) => tracing::debug!(
            function = %function.name,
            overloads = ?r.reference.overload_ids,
            result = %r.result_type,
            "resolved overloads"
        ),
        None => tracing::debug!(function = %function.name, "no matching overload"),
    }
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cel_typecheck_common::{OverloadDecl, StaticTypeProvider};

    use crate::container::Container;

    fn env() -> CheckerEnv {
        CheckerEnv::new(Container::default(), Arc::new(StaticTypeProvider::new()))
    }

    fn resolve(env: &CheckerEnv, function: &FunctionDecl, args: &[CelType], is_instance: bool) -> Option<OverloadResolution> {
        let mut mappings = Mapping::new();
        let mut type_vars = TypeVarGenerator::default();
        resolve_overload(env, &mut mappings, &mut type_vars, function, args, is_instance)
    }

    #[test]
    fn test_fresh_type_vars() {
        let mut vars = TypeVarGenerator::default();
        assert_eq!(vars.fresh(), CelType::type_param("_var0"));
        assert_eq!(vars.fresh(), CelType::type_param("_var1"));
    }

    #[test]
    fn test_single_match() {
        let f = FunctionDecl::new("f")
            .with_overload(OverloadDecl::global("f_int", vec![CelType::Int], CelType::Int))
            .with_overload(OverloadDecl::global("f_string", vec![CelType::String], CelType::Bool));
        let r = resolve(&env(), &f, &[CelType::String], false).unwrap();
        assert_eq!(r.reference.overload_ids, vec!["f_string"]);
        assert_eq!(r.result_type, CelType::Bool);
    }

    #[test]
    fn test_no_match() {
        let f = FunctionDecl::new("f").with_overload(OverloadDecl::global("f_int", vec![CelType::Int], CelType::Int));
        assert!(resolve(&env(), &f, &[CelType::String], false).is_none());
    }

    #[test]
    fn test_call_style_must_match() {
        let f = FunctionDecl::new("f").with_overload(OverloadDecl::instance("int_f", vec![CelType::Int], CelType::Int));
        assert!(resolve(&env(), &f, &[CelType::Int], false).is_none());
        assert!(resolve(&env(), &f, &[CelType::Int], true).is_some());
    }

    #[test]
    fn test_differing_results_widen_to_dyn() {
        let f = FunctionDecl::new("f")
            .with_overload(OverloadDecl::global("f_int", vec![CelType::Int], CelType::Int))
            .with_overload(OverloadDecl::global("f_string", vec![CelType::String], CelType::String));
        let r = resolve(&env(), &f, &[CelType::Dyn], false).unwrap();
        assert_eq!(r.reference.overload_ids, vec!["f_int", "f_string"]);
        assert_eq!(r.result_type, CelType::Dyn);
    }

    #[test]
    fn test_equal_results_do_not_widen() {
        let f = FunctionDecl::new("f")
            .with_overload(OverloadDecl::global("f_int", vec![CelType::Int], CelType::Bool))
            .with_overload(OverloadDecl::global("f_string", vec![CelType::String], CelType::Bool));
        let r = resolve(&env(), &f, &[CelType::Dyn], false).unwrap();
        assert_eq!(r.reference.overload_ids.len(), 2);
        assert_eq!(r.result_type, CelType::Bool);
    }

    #[test]
    fn test_parametric_overload_binds_result() {
        let a = CelType::type_param("A");
        let f = FunctionDecl::new("head").with_overload(
            OverloadDecl::global("head_list", vec![CelType::list(a.clone())], a).with_type_params(["A"]),
        );
        let r = resolve(&env(), &f, &[CelType::list(CelType::String)], false).unwrap();
        assert_eq!(r.result_type, CelType::String);
    }

    #[test]
    fn test_disabled_overload_is_skipped() {
        let env = env().with_disabled_overloads(["f_int"]);
        let f = FunctionDecl::new("f").with_overload(OverloadDecl::global("f_int", vec![CelType::Int], CelType::Int));
        assert!(resolve(&env, &f, &[CelType::Int], false).is_none());
    }
}
