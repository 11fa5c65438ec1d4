//! Common types for the CEL type checker.
//!
//! This crate provides the foundational types shared by the checker and its
//! embedders:
//!
//! - **Type System**: `CelType` and its `Kind` classification, covering
//!   primitives, well-known types, wrappers, parameterized collections,
//!   abstract types, functions, type values and type parameters.
//! - **Values**: `CelValue` for literal constants and enum constants.
//! - **AST**: the id-tagged expression tree (`Expr`, `ExprKind`) consumed by
//!   the checker, plus `SourceInfo` for translating ids to positions.
//! - **Declarations**: `IdentDecl`, `FunctionDecl`, `OverloadDecl` and the
//!   `Decl` sum used to build checking environments.
//! - **Type providers**: the `TypeProvider` trait resolving message, field
//!   and enum names, with in-memory and protobuf-descriptor implementations.

use std::fmt;
use std::sync::Arc;

mod ast;
pub use ast::{Comprehension, Expr, ExprKind, MapEntry, StructField};

mod decls;
pub use decls::{Decl, FunctionDecl, IdentDecl, OverloadDecl};

mod factory;
pub use factory::{ExprFactory, ACCUMULATOR_VAR};

mod provider;
pub use provider::{StaticTypeProvider, TypeProvider};

pub mod proto_types;
pub use proto_types::{proto_message_to_cel_type, well_known_type, DescriptorTypeProvider};

mod source_info;
pub use source_info::{compute_line_offsets, Location, SourceInfo};

// ==================== CelValue ====================

/// A CEL constant value.
///
/// This represents compile-time constant values that can appear in CEL expressions,
/// such as literals and enum constants.
#[derive(Debug, Clone, PartialEq)]
pub enum CelValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    UInt(u64),
    /// 64-bit floating point.
    Double(f64),
    /// Unicode string.
    String(String),
    /// Byte sequence.
    Bytes(Vec<u8>),
}

impl CelValue {
    /// Get the CEL type of this value.
    pub fn cel_type(&self) -> CelType {
        match self {
            CelValue::Null => CelType::Null,
            CelValue::Bool(_) => CelType::Bool,
            CelValue::Int(_) => CelType::Int,
            CelValue::UInt(_) => CelType::UInt,
            CelValue::Double(_) => CelType::Double,
            CelValue::String(_) => CelType::String,
            CelValue::Bytes(_) => CelType::Bytes,
        }
    }
}

impl fmt::Display for CelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CelValue::Null => write!(f, "null"),
            CelValue::Bool(v) => write!(f, "{}", v),
            CelValue::Int(v) => write!(f, "{}", v),
            CelValue::UInt(v) => write!(f, "{}u", v),
            CelValue::Double(v) => write!(f, "{:?}", v),
            CelValue::String(v) => write!(f, "{:?}", v),
            CelValue::Bytes(v) => {
                write!(f, "b\"")?;
                for byte in v {
                    match byte {
                        b'"' => write!(f, "\\\"")?,
                        b'\\' => write!(f, "\\\\")?,
                        0x20..=0x7e => write!(f, "{}", *byte as char)?,
                        _ => write!(f, "\\{:03o}", byte)?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

// ==================== Primitive ====================

/// The primitive types that may also appear wrapped (nullable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    Int,
    UInt,
    Double,
    String,
    Bytes,
}

impl Primitive {
    /// The unwrapped `CelType` for this primitive.
    pub fn to_type(self) -> CelType {
        match self {
            Primitive::Bool => CelType::Bool,
            Primitive::Int => CelType::Int,
            Primitive::UInt => CelType::UInt,
            Primitive::Double => CelType::Double,
            Primitive::String => CelType::String,
            Primitive::Bytes => CelType::Bytes,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::UInt => "uint",
            Primitive::Double => "double",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
        }
    }
}

// ==================== Kind ====================

/// The variant tag of a `CelType`.
///
/// `Unknown` classifies an absent type, e.g. the missing nested type of a
/// bare `type` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Unknown,
    Error,
    Dyn,
    Null,
    Primitive,
    WellKnown,
    Wrapper,
    Abstract,
    Function,
    List,
    Map,
    Object,
    Type,
    TypeParam,
}

impl Kind {
    /// Classify a possibly absent type.
    pub fn of(t: Option<&CelType>) -> Kind {
        t.map_or(Kind::Unknown, CelType::kind)
    }
}

// ==================== CelType ====================

/// The static types over which the checker reasons.
///
/// Structural equality is value equality over the variant and its payload.
/// A `TypeParam` is identified by its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CelType {
    // ==================== Primitives ====================
    /// Boolean type
    Bool,
    /// Signed 64-bit integer
    Int,
    /// Unsigned 64-bit integer
    UInt,
    /// 64-bit floating point
    Double,
    /// Unicode string
    String,
    /// Byte sequence
    Bytes,

    // ==================== Well-known Types ====================
    /// google.protobuf.Any
    Any,
    /// google.protobuf.Timestamp
    Timestamp,
    /// google.protobuf.Duration
    Duration,

    // ==================== Parameterized Collections ====================
    /// List with element type: `list(E)`
    List(Arc<CelType>),
    /// Map with key and value types: `map(K, V)`
    Map(Arc<CelType>, Arc<CelType>),

    // ==================== Special Types ====================
    /// Null value
    Null,
    /// Dynamic type, the top of the lattice
    Dyn,
    /// Type value: `type(T)`, or bare `type` when the nested type is absent
    Type(Option<Arc<CelType>>),
    /// Nullable primitive, e.g. `google.protobuf.Int64Value`
    Wrapper(Primitive),

    // ==================== Named Types ====================
    /// Protobuf message type with fully qualified name
    Message(Arc<str>),
    /// Application-defined type with ordered type parameters
    Abstract {
        name: Arc<str>,
        params: Arc<[CelType]>,
    },

    // ==================== Type Checking Types ====================
    /// Function type with result type and argument types
    Function {
        result: Arc<CelType>,
        args: Arc<[CelType]>,
    },
    /// Named type parameter, bound through a substitution mapping
    TypeParam(Arc<str>),
    /// Error type, used when type inference fails
    Error,
}

// ==================== Constructors ====================

impl CelType {
    /// Create a list type with the given element type.
    ///
    /// # Example
    /// ```
    /// use cel_typecheck_common::CelType;
    /// let list_of_int = CelType::list(CelType::Int);
    /// assert_eq!(list_of_int.display_name(), "list(int)");
    /// ```
    pub fn list(elem: CelType) -> Self {
        CelType::List(Arc::new(elem))
    }

    /// Create a map type with the given key and value types.
    ///
    /// # Example
    /// ```
    /// use cel_typecheck_common::CelType;
    /// let map_str_int = CelType::map(CelType::String, CelType::Int);
    /// assert_eq!(map_str_int.display_name(), "map(string, int)");
    /// ```
    pub fn map(key: CelType, value: CelType) -> Self {
        CelType::Map(Arc::new(key), Arc::new(value))
    }

    /// Create a type value representing `type(T)`.
    pub fn type_of(inner: CelType) -> Self {
        CelType::Type(Some(Arc::new(inner)))
    }

    /// The bare `type` type, whose nested type is unspecified.
    pub fn type_type() -> Self {
        CelType::Type(None)
    }

    /// Create a message type with the given fully qualified name.
    pub fn message(name: &str) -> Self {
        CelType::Message(Arc::from(name))
    }

    /// Create an abstract type with the given name and type parameters.
    ///
    /// # Example
    /// ```
    /// use cel_typecheck_common::CelType;
    /// let vector = CelType::abstract_type("vector", [CelType::Int]);
    /// assert_eq!(vector.display_name(), "vector(int)");
    /// ```
    pub fn abstract_type(name: &str, params: impl IntoIterator<Item = CelType>) -> Self {
        CelType::Abstract {
            name: Arc::from(name),
            params: params.into_iter().collect(),
        }
    }

    /// Create a function type with the given result and argument types.
    pub fn function(result: CelType, args: impl IntoIterator<Item = CelType>) -> Self {
        CelType::Function {
            result: Arc::new(result),
            args: args.into_iter().collect(),
        }
    }

    /// Create a type parameter with the given name.
    pub fn type_param(name: &str) -> Self {
        CelType::TypeParam(Arc::from(name))
    }

    /// Create a wrapper (nullable) type around a primitive.
    pub fn wrapper(primitive: Primitive) -> Self {
        CelType::Wrapper(primitive)
    }
}

// ==================== Type Properties ====================

impl CelType {
    /// Returns the variant tag of this type.
    pub fn kind(&self) -> Kind {
        match self {
            CelType::Bool
            | CelType::Int
            | CelType::UInt
            | CelType::Double
            | CelType::String
            | CelType::Bytes => Kind::Primitive,
            CelType::Any | CelType::Timestamp | CelType::Duration => Kind::WellKnown,
            CelType::List(_) => Kind::List,
            CelType::Map(_, _) => Kind::Map,
            CelType::Null => Kind::Null,
            CelType::Dyn => Kind::Dyn,
            CelType::Type(_) => Kind::Type,
            CelType::Wrapper(_) => Kind::Wrapper,
            CelType::Message(_) => Kind::Object,
            CelType::Abstract { .. } => Kind::Abstract,
            CelType::Function { .. } => Kind::Function,
            CelType::TypeParam(_) => Kind::TypeParam,
            CelType::Error => Kind::Error,
        }
    }

    /// Returns the primitive this type denotes, if it is a primitive.
    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            CelType::Bool => Some(Primitive::Bool),
            CelType::Int => Some(Primitive::Int),
            CelType::UInt => Some(Primitive::UInt),
            CelType::Double => Some(Primitive::Double),
            CelType::String => Some(Primitive::String),
            CelType::Bytes => Some(Primitive::Bytes),
            _ => None,
        }
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, CelType::Dyn)
    }

    /// Returns true for the wildcard types `dyn` and the error type.
    pub fn is_dyn_or_error(&self) -> bool {
        matches!(self, CelType::Dyn | CelType::Error)
    }

    /// Returns true if `null` may inhabit this type.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self.kind(),
            Kind::Abstract | Kind::Object | Kind::Null | Kind::WellKnown | Kind::Wrapper
        )
    }

    /// Get the element type of a list, or None if not a list.
    pub fn list_elem(&self) -> Option<&CelType> {
        match self {
            CelType::List(elem) => Some(elem),
            _ => None,
        }
    }

    /// Get the key and value types of a map, or None if not a map.
    pub fn map_types(&self) -> Option<(&CelType, &CelType)> {
        match self {
            CelType::Map(key, val) => Some((key, val)),
            _ => None,
        }
    }

    /// Get the nested type of a type value, or None if absent or not a type.
    pub fn type_inner(&self) -> Option<&CelType> {
        match self {
            CelType::Type(Some(inner)) => Some(inner),
            _ => None,
        }
    }

    /// Get the message name if this is a message type.
    pub fn message_name(&self) -> Option<&str> {
        match self {
            CelType::Message(name) => Some(name),
            _ => None,
        }
    }
}

// ==================== Display ====================

impl CelType {
    /// Returns the display name of this type as used in diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            CelType::Bool => "bool".to_string(),
            CelType::Int => "int".to_string(),
            CelType::UInt => "uint".to_string(),
            CelType::Double => "double".to_string(),
            CelType::String => "string".to_string(),
            CelType::Bytes => "bytes".to_string(),
            CelType::Any => "any".to_string(),
            CelType::Timestamp => "timestamp".to_string(),
            CelType::Duration => "duration".to_string(),
            CelType::List(elem) => format!("list({})", elem.display_name()),
            CelType::Map(key, val) => {
                format!("map({}, {})", key.display_name(), val.display_name())
            }
            CelType::Null => "null".to_string(),
            CelType::Dyn => "dyn".to_string(),
            CelType::Type(None) => "type".to_string(),
            CelType::Type(Some(inner)) => format!("type({})", inner.display_name()),
            CelType::Wrapper(p) => format!("wrapper({})", p.name()),
            CelType::Message(name) => name.to_string(),
            CelType::Abstract { name, params } if params.is_empty() => name.to_string(),
            CelType::Abstract { name, params } => {
                let params: Vec<_> = params.iter().map(CelType::display_name).collect();
                format!("{}({})", name, params.join(", "))
            }
            CelType::Function { result, args } => format_function(Some(result), args, false),
            CelType::TypeParam(name) => name.to_string(),
            CelType::Error => "!error!".to_string(),
        }
    }
}

impl fmt::Display for CelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Render a function signature.
///
/// With `is_instance`, the first argument is rendered as the receiver:
/// `string.(string) -> bool`. A missing result omits the arrow, which is how
/// call sites are rendered in overload diagnostics.
pub fn format_function(result: Option<&CelType>, args: &[CelType], is_instance: bool) -> String {
    let mut out = String::new();
    let args = match args.split_first() {
        Some((target, rest)) if is_instance => {
            out.push_str(&target.display_name());
            out.push('.');
            rest
        }
        _ => args,
    };
    let args: Vec<_> = args.iter().map(CelType::display_name).collect();
    out.push('(');
    out.push_str(&args.join(", "));
    out.push(')');
    if let Some(result) = result {
        out.push_str(" -> ");
        out.push_str(&result.display_name());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_types_display() {
        assert_eq!(CelType::Bool.display_name(), "bool");
        assert_eq!(CelType::Int.display_name(), "int");
        assert_eq!(CelType::UInt.display_name(), "uint");
        assert_eq!(CelType::Double.display_name(), "double");
        assert_eq!(CelType::String.display_name(), "string");
        assert_eq!(CelType::Bytes.display_name(), "bytes");
    }

    #[test]
    fn nested_type_display() {
        let nested = CelType::list(CelType::list(CelType::Int));
        assert_eq!(nested.display_name(), "list(list(int))");

        let map_of_lists = CelType::map(CelType::String, CelType::list(CelType::Int));
        assert_eq!(map_of_lists.display_name(), "map(string, list(int))");
    }

    #[test]
    fn type_of_display() {
        assert_eq!(CelType::type_of(CelType::Int).display_name(), "type(int)");
        assert_eq!(CelType::type_type().display_name(), "type");
        assert_eq!(
            CelType::type_of(CelType::type_type()).display_name(),
            "type(type)"
        );
    }

    #[test]
    fn special_types_display() {
        assert_eq!(CelType::wrapper(Primitive::Int).display_name(), "wrapper(int)");
        assert_eq!(CelType::message("a.b.Msg").display_name(), "a.b.Msg");
        assert_eq!(CelType::Error.display_name(), "!error!");
        assert_eq!(CelType::type_param("A").display_name(), "A");
        assert_eq!(CelType::abstract_type("set", []).display_name(), "set");
    }

    #[test]
    fn function_type_display() {
        let func = CelType::function(CelType::Int, [CelType::String]);
        assert_eq!(func.display_name(), "(string) -> int");

        let args = [CelType::String, CelType::String];
        assert_eq!(
            format_function(Some(&CelType::Bool), &args, true),
            "string.(string) -> bool"
        );
        assert_eq!(format_function(None, &[CelType::Int, CelType::String], false), "(int, string)");
    }

    #[test]
    fn kinds() {
        assert_eq!(CelType::Int.kind(), Kind::Primitive);
        assert_eq!(CelType::Duration.kind(), Kind::WellKnown);
        assert_eq!(CelType::message("x.Y").kind(), Kind::Object);
        assert_eq!(CelType::type_param("T").kind(), Kind::TypeParam);
        assert_eq!(Kind::of(None), Kind::Unknown);
        assert_eq!(Kind::of(CelType::type_type().type_inner()), Kind::Unknown);
    }

    #[test]
    fn nullable_kinds() {
        assert!(CelType::message("x.Y").is_nullable());
        assert!(CelType::wrapper(Primitive::String).is_nullable());
        assert!(CelType::Timestamp.is_nullable());
        assert!(!CelType::Int.is_nullable());
        assert!(!CelType::list(CelType::Int).is_nullable());
    }

    #[test]
    fn value_display() {
        assert_eq!(CelValue::UInt(3).to_string(), "3u");
        assert_eq!(CelValue::String("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(CelValue::Bytes(b"x\x01".to_vec()).to_string(), "b\"x\\001\"");
        assert_eq!(CelValue::Double(2.0).to_string(), "2.0");
    }

    #[test]
    fn hash_consistency() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(CelType::list(CelType::Int));
        set.insert(CelType::list(CelType::Int));

        assert_eq!(set.len(), 1);
    }
}
