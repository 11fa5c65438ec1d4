//! CEL standard declarations.
//!
//! All built-in operators, functions and type identifiers with their
//! signatures. Overload ids follow the cel-go naming.

use std::sync::LazyLock;

use cel_typecheck_common::{CelType, Decl, FunctionDecl, IdentDecl, OverloadDecl};

/// The standard declarations, built once on first use.
pub static STANDARD_DECLARATIONS: LazyLock<Vec<Decl>> = LazyLock::new(build_standard_declarations);

/// Find a standard function declaration by name.
pub fn get_standard_function(name: &str) -> Option<&'static FunctionDecl> {
    STANDARD_DECLARATIONS.iter().find_map(|decl| match decl {
        Decl::Function(f) if f.name == name => Some(f),
        _ => None,
    })
}

fn a() -> CelType {
    CelType::type_param("A")
}

fn b() -> CelType {
    CelType::type_param("B")
}

fn global(id: &str, params: Vec<CelType>, result: CelType) -> OverloadDecl {
    OverloadDecl::global(id, params, result)
}

fn instance(id: &str, params: Vec<CelType>, result: CelType) -> OverloadDecl {
    OverloadDecl::instance(id, params, result)
}

/// `id` for each `(suffix, type)` pair: `(T, T) -> result_of(T)`.
fn binary_family(
    prefix: &str,
    operands: &[(&str, CelType)],
    result: impl Fn(&CelType) -> CelType,
) -> Vec<OverloadDecl> {
    operands
        .iter()
        .map(|(suffix, t)| {
            global(
                &format!("{}_{}", prefix, suffix),
                vec![t.clone(), t.clone()],
                result(t),
            )
        })
        .collect()
}

/// Overloads `<prefix>_to_<target>` converting from each source type.
fn conversions(target_suffix: &str, target: CelType, sources: &[(&str, CelType)]) -> Vec<OverloadDecl> {
    sources
        .iter()
        .map(|(suffix, t)| {
            global(
                &format!("{}_to_{}", suffix, target_suffix),
                vec![t.clone()],
                target.clone(),
            )
        })
        .collect()
}

fn build_standard_declarations() -> Vec<Decl> {
    let mut decls: Vec<Decl> = Vec::new();

    // ==================== Type identifiers ====================

    let type_idents = [
        ("bool", CelType::Bool),
        ("bytes", CelType::Bytes),
        ("double", CelType::Double),
        ("null_type", CelType::Null),
        ("int", CelType::Int),
        ("uint", CelType::UInt),
        ("string", CelType::String),
        ("list", CelType::list(a())),
        ("map", CelType::map(a(), b())),
        ("type", CelType::type_type()),
        ("dyn", CelType::Dyn),
    ];
    for (name, t) in type_idents {
        decls.push(IdentDecl::new(name, CelType::type_of(t)).into());
    }

    // ==================== Logical ====================

    let logical = [
        FunctionDecl::new("_?_:_").with_overload(
            global("conditional", vec![CelType::Bool, a(), a()], a()).with_type_params(["A"]),
        ),
        FunctionDecl::new("_&&_").with_overload(global(
            "logical_and",
            vec![CelType::Bool, CelType::Bool],
            CelType::Bool,
        )),
        FunctionDecl::new("_||_").with_overload(global(
            "logical_or",
            vec![CelType::Bool, CelType::Bool],
            CelType::Bool,
        )),
        FunctionDecl::new("!_").with_overload(global("logical_not", vec![CelType::Bool], CelType::Bool)),
        FunctionDecl::new("@not_strictly_false").with_overload(global(
            "not_strictly_false",
            vec![CelType::Bool],
            CelType::Bool,
        )),
    ];
    decls.extend(logical.into_iter().map(Decl::from));

    // ==================== Equality ====================

    for (name, id) in [("_==_", "equals"), ("_!=_", "not_equals")] {
        decls.push(
            FunctionDecl::new(name)
                .with_overload(global(id, vec![a(), a()], CelType::Bool).with_type_params(["A"]))
                .into(),
        );
    }

    // ==================== Arithmetic ====================

    let numeric = [
        ("int64", CelType::Int),
        ("uint64", CelType::UInt),
        ("double", CelType::Double),
    ];

    decls.push(
        FunctionDecl::new("_+_")
            .with_overloads(binary_family(
                "add",
                &[
                    ("int64", CelType::Int),
                    ("uint64", CelType::UInt),
                    ("double", CelType::Double),
                    ("string", CelType::String),
                    ("bytes", CelType::Bytes),
                ],
                CelType::clone,
            ))
            .with_overload(
                global(
                    "add_list",
                    vec![CelType::list(a()), CelType::list(a())],
                    CelType::list(a()),
                )
                .with_type_params(["A"]),
            )
            .with_overloads([
                global(
                    "add_timestamp_duration",
                    vec![CelType::Timestamp, CelType::Duration],
                    CelType::Timestamp,
                ),
                global(
                    "add_duration_timestamp",
                    vec![CelType::Duration, CelType::Timestamp],
                    CelType::Timestamp,
                ),
                global(
                    "add_duration_duration",
                    vec![CelType::Duration, CelType::Duration],
                    CelType::Duration,
                ),
            ])
            .into(),
    );

    decls.push(
        FunctionDecl::new("_-_")
            .with_overloads(binary_family("subtract", &numeric, CelType::clone))
            .with_overloads([
                global(
                    "subtract_timestamp_timestamp",
                    vec![CelType::Timestamp, CelType::Timestamp],
                    CelType::Duration,
                ),
                global(
                    "subtract_timestamp_duration",
                    vec![CelType::Timestamp, CelType::Duration],
                    CelType::Timestamp,
                ),
                global(
                    "subtract_duration_duration",
                    vec![CelType::Duration, CelType::Duration],
                    CelType::Duration,
                ),
            ])
            .into(),
    );

    decls.push(
        FunctionDecl::new("_*_")
            .with_overloads(binary_family("multiply", &numeric, CelType::clone))
            .into(),
    );
    decls.push(
        FunctionDecl::new("_/_")
            .with_overloads(binary_family("divide", &numeric, CelType::clone))
            .into(),
    );
    decls.push(
        FunctionDecl::new("_%_")
            .with_overloads(binary_family("modulo", &numeric[..2], CelType::clone))
            .into(),
    );
    decls.push(
        FunctionDecl::new("-_")
            .with_overload(global("negate_int64", vec![CelType::Int], CelType::Int))
            .with_overload(global("negate_double", vec![CelType::Double], CelType::Double))
            .into(),
    );

    // ==================== Relations ====================

    let comparable = [
        ("bool", CelType::Bool),
        ("int64", CelType::Int),
        ("uint64", CelType::UInt),
        ("double", CelType::Double),
        ("string", CelType::String),
        ("bytes", CelType::Bytes),
        ("timestamp", CelType::Timestamp),
        ("duration", CelType::Duration),
    ];
    for (name, prefix) in [
        ("_<_", "less"),
        ("_<=_", "less_equals"),
        ("_>_", "greater"),
        ("_>=_", "greater_equals"),
    ] {
        decls.push(
            FunctionDecl::new(name)
                .with_overloads(binary_family(prefix, &comparable, |_| CelType::Bool))
                .into(),
        );
    }

    // ==================== Indexing and membership ====================

    decls.push(
        FunctionDecl::new("_[_]")
            .with_overload(
                global("index_list", vec![CelType::list(a()), CelType::Int], a()).with_type_params(["A"]),
            )
            .with_overload(
                global("index_map", vec![CelType::map(a(), b()), a()], b()).with_type_params(["A", "B"]),
            )
            .into(),
    );

    // `_in_` is the deprecated spelling of `@in`.
    for name in ["@in", "_in_"] {
        decls.push(
            FunctionDecl::new(name)
                .with_overload(
                    global("in_list", vec![a(), CelType::list(a())], CelType::Bool).with_type_params(["A"]),
                )
                .with_overload(
                    global("in_map", vec![a(), CelType::map(a(), b())], CelType::Bool)
                        .with_type_params(["A", "B"]),
                )
                .into(),
        );
    }

    decls.push(
        FunctionDecl::new("size")
            .with_overloads([
                global("size_string", vec![CelType::String], CelType::Int),
                global("size_bytes", vec![CelType::Bytes], CelType::Int),
                global("size_list", vec![CelType::list(a())], CelType::Int).with_type_params(["A"]),
                global("size_map", vec![CelType::map(a(), b())], CelType::Int).with_type_params(["A", "B"]),
                instance("string_size", vec![CelType::String], CelType::Int),
                instance("bytes_size", vec![CelType::Bytes], CelType::Int),
                instance("list_size", vec![CelType::list(a())], CelType::Int).with_type_params(["A"]),
                instance("map_size", vec![CelType::map(a(), b())], CelType::Int)
                    .with_type_params(["A", "B"]),
            ])
            .into(),
    );

    // ==================== Conversions ====================

    decls.push(
        FunctionDecl::new("type")
            .with_overload(global("type", vec![a()], CelType::type_of(a())).with_type_params(["A"]))
            .into(),
    );
    decls.push(
        FunctionDecl::new("int")
            .with_overloads(conversions(
                "int64",
                CelType::Int,
                &[
                    ("int64", CelType::Int),
                    ("uint64", CelType::UInt),
                    ("double", CelType::Double),
                    ("string", CelType::String),
                    ("timestamp", CelType::Timestamp),
                    ("duration", CelType::Duration),
                ],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("uint")
            .with_overloads(conversions(
                "uint64",
                CelType::UInt,
                &[
                    ("uint64", CelType::UInt),
                    ("int64", CelType::Int),
                    ("double", CelType::Double),
                    ("string", CelType::String),
                ],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("double")
            .with_overloads(conversions(
                "double",
                CelType::Double,
                &[
                    ("double", CelType::Double),
                    ("int64", CelType::Int),
                    ("uint64", CelType::UInt),
                    ("string", CelType::String),
                ],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("bool")
            .with_overloads(conversions(
                "bool",
                CelType::Bool,
                &[("bool", CelType::Bool), ("string", CelType::String)],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("string")
            .with_overloads(conversions(
                "string",
                CelType::String,
                &[
                    ("string", CelType::String),
                    ("int64", CelType::Int),
                    ("uint64", CelType::UInt),
                    ("double", CelType::Double),
                    ("bytes", CelType::Bytes),
                    ("timestamp", CelType::Timestamp),
                    ("duration", CelType::Duration),
                ],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("bytes")
            .with_overloads(conversions(
                "bytes",
                CelType::Bytes,
                &[("bytes", CelType::Bytes), ("string", CelType::String)],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("timestamp")
            .with_overloads(conversions(
                "timestamp",
                CelType::Timestamp,
                &[
                    ("timestamp", CelType::Timestamp),
                    ("string", CelType::String),
                    ("int64", CelType::Int),
                ],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("duration")
            .with_overloads(conversions(
                "duration",
                CelType::Duration,
                &[("duration", CelType::Duration), ("string", CelType::String)],
            ))
            .into(),
    );
    decls.push(
        FunctionDecl::new("dyn")
            .with_overload(global("to_dyn", vec![a()], CelType::Dyn).with_type_params(["A"]))
            .into(),
    );

    // ==================== Strings ====================

    let string_predicates = [
        ("contains", "contains_string"),
        ("endsWith", "ends_with_string"),
        ("startsWith", "starts_with_string"),
    ];
    for (name, id) in string_predicates {
        decls.push(
            FunctionDecl::new(name)
                .with_overload(instance(id, vec![CelType::String, CelType::String], CelType::Bool))
                .into(),
        );
    }
    decls.push(
        FunctionDecl::new("matches")
            .with_overload(global("matches", vec![CelType::String, CelType::String], CelType::Bool))
            .with_overload(instance(
                "matches_string",
                vec![CelType::String, CelType::String],
                CelType::Bool,
            ))
            .into(),
    );

    // ==================== Timestamp and duration accessors ====================

    let date_accessors = [
        ("getFullYear", "year"),
        ("getMonth", "month"),
        ("getDayOfYear", "day_of_year"),
        ("getDayOfMonth", "day_of_month"),
        ("getDate", "day_of_month_1_based"),
        ("getDayOfWeek", "day_of_week"),
    ];
    for (name, part) in date_accessors {
        decls.push(
            FunctionDecl::new(name)
                .with_overloads(timestamp_accessor(part))
                .into(),
        );
    }

    let time_accessors = [
        ("getHours", "hours"),
        ("getMinutes", "minutes"),
        ("getSeconds", "seconds"),
        ("getMilliseconds", "milliseconds"),
    ];
    for (name, part) in time_accessors {
        decls.push(
            FunctionDecl::new(name)
                .with_overloads(timestamp_accessor(part))
                .with_overload(instance(
                    &format!("duration_to_{}", part),
                    vec![CelType::Duration],
                    CelType::Int,
                ))
                .into(),
        );
    }

    decls
}

/// `timestamp.getX()` and `timestamp.getX(tz)`.
fn timestamp_accessor(part: &str) -> [OverloadDecl; 2] {
    [
        instance(
            &format!("timestamp_to_{}", part),
            vec![CelType::Timestamp],
            CelType::Int,
        ),
        instance(
            &format!("timestamp_to_{}_with_tz", part),
            vec![CelType::Timestamp, CelType::String],
            CelType::Int,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overload_ids(name: &str) -> Vec<String> {
        get_standard_function(name)
            .unwrap()
            .overloads
            .iter()
            .map(|o| o.id.clone())
            .collect()
    }

    #[test]
    fn test_arithmetic_ids() {
        assert_eq!(
            overload_ids("_+_"),
            vec![
                "add_int64",
                "add_uint64",
                "add_double",
                "add_string",
                "add_bytes",
                "add_list",
                "add_timestamp_duration",
                "add_duration_timestamp",
                "add_duration_duration",
            ]
        );
        assert_eq!(overload_ids("_%_"), vec!["modulo_int64", "modulo_uint64"]);
    }

    #[test]
    fn test_relations_cover_comparable_types() {
        let ids = overload_ids("_<=_");
        assert_eq!(ids.len(), 8);
        assert!(ids.contains(&"less_equals_timestamp".to_string()));
        assert!(ids.contains(&"less_equals_bool".to_string()));
    }

    #[test]
    fn test_size_has_both_call_styles() {
        let size = get_standard_function("size").unwrap();
        assert_eq!(size.overloads.iter().filter(|o| o.is_instance).count(), 4);
        assert_eq!(size.overloads.iter().filter(|o| !o.is_instance).count(), 4);
    }

    #[test]
    fn test_parametric_overloads() {
        let index = get_standard_function("_[_]").unwrap();
        let index_map = index.overload("index_map").unwrap();
        assert_eq!(index_map.type_params, vec!["A", "B"]);
        assert_eq!(index_map.result, CelType::type_param("B"));
    }

    #[test]
    fn test_conversion_ids() {
        assert!(overload_ids("int").contains(&"timestamp_to_int64".to_string()));
        assert!(overload_ids("string").contains(&"bytes_to_string".to_string()));
        assert_eq!(overload_ids("dyn"), vec!["to_dyn"]);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(
            overload_ids("getDate"),
            vec![
                "timestamp_to_day_of_month_1_based",
                "timestamp_to_day_of_month_1_based_with_tz"
            ]
        );
        assert_eq!(
            overload_ids("getSeconds"),
            vec![
                "timestamp_to_seconds",
                "timestamp_to_seconds_with_tz",
                "duration_to_seconds"
            ]
        );
    }

    #[test]
    fn test_type_identifiers() {
        let list = STANDARD_DECLARATIONS
            .iter()
            .find_map(|d| match d {
                Decl::Ident(i) if i.name == "list" => Some(i),
                _ => None,
            })
            .unwrap();
        assert_eq!(list.cel_type, CelType::type_of(CelType::list(a())));
    }

    #[test]
    fn test_deprecated_in_matches_in() {
        assert_eq!(overload_ids("_in_"), overload_ids("@in"));
    }
}
