//! Common test utilities for cel-typecheck integration tests.

use std::sync::Arc;

use cel_typecheck::{check, CheckResult, CheckerEnv, Container};
use cel_typecheck_common::{CelType, Decl, Expr, IdentDecl, SourceInfo, StaticTypeProvider, TypeProvider};

/// Provider with a small `acme` schema used across tests.
#[allow(dead_code)]
pub fn acme_provider() -> Arc<dyn TypeProvider> {
    Arc::new(
        StaticTypeProvider::new()
            .with_well_known_types()
            .with_message(
                "acme.Account",
                [
                    ("id", CelType::Int),
                    ("name", CelType::String),
                    ("tags", CelType::list(CelType::String)),
                    ("labels", CelType::map(CelType::String, CelType::String)),
                    ("parent", CelType::message("acme.Account")),
                    ("nickname", CelType::wrapper(cel_typecheck_common::Primitive::String)),
                ],
            )
            .with_enum("acme.Tier", [("FREE", 0), ("PRO", 2)]),
    )
}

/// Standard environment with an empty container and no messages.
#[allow(dead_code)]
pub fn standard_env() -> CheckerEnv {
    CheckerEnv::standard(Container::default(), Arc::new(StaticTypeProvider::new()))
}

/// Standard environment over the `acme` schema in `container`.
#[allow(dead_code)]
pub fn acme_env(container: &str) -> CheckerEnv {
    let container = Container::new(container).expect("valid container");
    CheckerEnv::standard(container, acme_provider())
}

/// Add identifier declarations, panicking on conflicts.
#[allow(dead_code)]
pub fn declare(mut env: CheckerEnv, idents: &[(&str, CelType)]) -> CheckerEnv {
    let decls: Vec<Decl> = idents
        .iter()
        .map(|(name, t)| Decl::Ident(IdentDecl::new(*name, t.clone())))
        .collect();
    env.add(decls).expect("declarations should not conflict");
    env
}

/// Check without source positions.
#[allow(dead_code)]
pub fn check_expr(expr: &Expr, env: &CheckerEnv) -> CheckResult {
    check(expr, &SourceInfo::default(), env)
}

/// Check and assert no errors were reported, returning the result.
#[allow(dead_code)]
pub fn assert_checks(expr: &Expr, env: &CheckerEnv) -> CheckResult {
    let result = check_expr(expr, env);
    if !result.is_ok() {
        panic!(
            "expected no errors, got: {:?}",
            result.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>()
        );
    }
    result
}

/// Check and assert at least one error was reported, returning the result.
#[allow(dead_code)]
pub fn assert_check_error(expr: &Expr, env: &CheckerEnv) -> CheckResult {
    let result = check_expr(expr, env);
    if result.is_ok() {
        panic!("expected check errors, got type {:?}", result.result_type());
    }
    result
}

/// True when a type parameter appears anywhere within `t`.
#[allow(dead_code)]
pub fn contains_type_param(t: &CelType) -> bool {
    match t {
        CelType::TypeParam(_) => true,
        CelType::List(elem) => contains_type_param(elem),
        CelType::Map(k, v) => contains_type_param(k) || contains_type_param(v),
        CelType::Type(Some(inner)) => contains_type_param(inner),
        CelType::Abstract { params, .. } => params.iter().any(contains_type_param),
        CelType::Function { result, args } => {
            contains_type_param(result) || args.iter().any(contains_type_param)
        }
        _ => false,
    }
}
