//! Standard library signatures exercised through the checker.

mod common;

use std::sync::Arc;

use cel_typecheck::{CheckerEnv, Container, STANDARD_DECLARATIONS};
use cel_typecheck_common::{CelType, Expr, ExprFactory, StaticTypeProvider};
use common::{assert_check_error, assert_checks, declare, standard_env};

fn env() -> CheckerEnv {
    declare(
        standard_env(),
        &[
            ("i", CelType::Int),
            ("u", CelType::UInt),
            ("d", CelType::Double),
            ("s", CelType::String),
            ("b", CelType::Bytes),
            ("ts", CelType::Timestamp),
            ("dur", CelType::Duration),
            ("xs", CelType::list(CelType::Int)),
            ("m", CelType::map(CelType::String, CelType::Bool)),
        ],
    )
}

fn call(f: &mut ExprFactory, function: &str, args: &[&str]) -> Expr {
    let args = args.iter().map(|name| f.ident(*name)).collect();
    f.global_call(function, args)
}

fn method(f: &mut ExprFactory, function: &str, target: &str, args: &[&str]) -> Expr {
    let target = f.ident(target);
    let args = args.iter().map(|name| f.ident(*name)).collect();
    f.receiver_call(function, target, args)
}

/// Check and return the root type and its overload ids.
fn resolve(expr: &Expr) -> (CelType, Vec<String>) {
    let result = assert_checks(expr, &env());
    let t = result.result_type().cloned().unwrap();
    let ids = result
        .get_reference(expr.id)
        .map(|r| r.overload_ids.clone())
        .unwrap_or_default();
    (t, ids)
}

#[test]
fn test_arithmetic() {
    let mut f = ExprFactory::new();
    let cases = vec![
        (call(&mut f, "_+_", &["i", "i"]), CelType::Int, "add_int64"),
        (call(&mut f, "_+_", &["u", "u"]), CelType::UInt, "add_uint64"),
        (call(&mut f, "_+_", &["s", "s"]), CelType::String, "add_string"),
        (call(&mut f, "_+_", &["b", "b"]), CelType::Bytes, "add_bytes"),
        (call(&mut f, "_+_", &["xs", "xs"]), CelType::list(CelType::Int), "add_list"),
        (call(&mut f, "_+_", &["ts", "dur"]), CelType::Timestamp, "add_timestamp_duration"),
        (call(&mut f, "_-_", &["ts", "ts"]), CelType::Duration, "subtract_timestamp_timestamp"),
        (call(&mut f, "_*_", &["d", "d"]), CelType::Double, "multiply_double"),
        (call(&mut f, "_/_", &["u", "u"]), CelType::UInt, "divide_uint64"),
        (call(&mut f, "_%_", &["i", "i"]), CelType::Int, "modulo_int64"),
        (call(&mut f, "-_", &["d"]), CelType::Double, "negate_double"),
    ];
    for (expr, expected_type, expected_id) in cases {
        let (t, ids) = resolve(&expr);
        assert_eq!(t, expected_type, "{}", expected_id);
        assert_eq!(ids, vec![expected_id]);
    }
}

#[test]
fn test_relations_and_logic() {
    let mut f = ExprFactory::new();
    let cases = vec![
        (call(&mut f, "_<_", &["i", "i"]), "less_int64"),
        (call(&mut f, "_>=_", &["ts", "ts"]), "greater_equals_timestamp"),
        (call(&mut f, "_==_", &["s", "s"]), "equals"),
        (call(&mut f, "_!=_", &["xs", "xs"]), "not_equals"),
        (call(&mut f, "_&&_", &["m", "m"]), ""),
        (call(&mut f, "@in", &["i", "xs"]), "in_list"),
        (call(&mut f, "@in", &["s", "m"]), "in_map"),
    ];
    for (expr, expected_id) in cases {
        if expected_id.is_empty() {
            // map values are not bools
            assert_check_error(&expr, &env());
            continue;
        }
        let (t, ids) = resolve(&expr);
        assert_eq!(t, CelType::Bool, "{}", expected_id);
        assert_eq!(ids, vec![expected_id]);
    }
}

#[test]
fn test_conversions() {
    let mut f = ExprFactory::new();
    let cases = vec![
        (call(&mut f, "int", &["d"]), CelType::Int, "double_to_int64"),
        (call(&mut f, "uint", &["i"]), CelType::UInt, "int64_to_uint64"),
        (call(&mut f, "double", &["s"]), CelType::Double, "string_to_double"),
        (call(&mut f, "string", &["b"]), CelType::String, "bytes_to_string"),
        (call(&mut f, "bytes", &["s"]), CelType::Bytes, "string_to_bytes"),
        (call(&mut f, "duration", &["s"]), CelType::Duration, "string_to_duration"),
        (call(&mut f, "int", &["ts"]), CelType::Int, "timestamp_to_int64"),
    ];
    for (expr, expected_type, expected_id) in cases {
        let (t, ids) = resolve(&expr);
        assert_eq!(t, expected_type, "{}", expected_id);
        assert_eq!(ids, vec![expected_id]);
    }
}

#[test]
fn test_dyn_and_type() {
    let mut f = ExprFactory::new();
    let (t, ids) = resolve(&call(&mut f, "dyn", &["i"]));
    assert_eq!(t, CelType::Dyn);
    assert_eq!(ids, vec!["to_dyn"]);

    let (t, _) = resolve(&call(&mut f, "type", &["s"]));
    assert_eq!(t, CelType::type_of(CelType::String));
}

#[test]
fn test_string_methods() {
    let mut f = ExprFactory::new();
    let cases = vec![
        (method(&mut f, "contains", "s", &["s"]), "contains_string"),
        (method(&mut f, "startsWith", "s", &["s"]), "starts_with_string"),
        (method(&mut f, "endsWith", "s", &["s"]), "ends_with_string"),
        (method(&mut f, "matches", "s", &["s"]), "matches_string"),
    ];
    for (expr, expected_id) in cases {
        let (t, ids) = resolve(&expr);
        assert_eq!(t, CelType::Bool);
        assert_eq!(ids, vec![expected_id]);
    }

    let (t, ids) = resolve(&call(&mut f, "matches", &["s", "s"]));
    assert_eq!(t, CelType::Bool);
    assert_eq!(ids, vec!["matches"]);
}

#[test]
fn test_time_accessors() {
    let mut f = ExprFactory::new();
    let (t, ids) = resolve(&method(&mut f, "getHours", "dur", &[]));
    assert_eq!(t, CelType::Int);
    assert_eq!(ids, vec!["duration_to_hours"]);

    let (t, ids) = resolve(&method(&mut f, "getDayOfWeek", "ts", &["s"]));
    assert_eq!(t, CelType::Int);
    assert_eq!(ids, vec!["timestamp_to_day_of_week_with_tz"]);
}

#[test]
fn test_size_global_and_receiver() {
    let mut f = ExprFactory::new();
    let (t, ids) = resolve(&call(&mut f, "size", &["m"]));
    assert_eq!(t, CelType::Int);
    assert_eq!(ids, vec!["size_map"]);

    let (_, ids) = resolve(&method(&mut f, "size", "xs", &[]));
    assert_eq!(ids, vec!["list_size"]);
}

#[test]
fn test_standard_declarations_have_no_overlaps() {
    let mut env = CheckerEnv::new(Container::default(), Arc::new(StaticTypeProvider::new()));
    env.add(STANDARD_DECLARATIONS.iter().cloned()).unwrap();
    assert!(env.lookup_function("_+_").is_some());
    assert!(env.lookup_ident("int").is_some());
}
