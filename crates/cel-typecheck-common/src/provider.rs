//! The type provider seam and an in-memory implementation.

use std::collections::HashMap;
use std::fmt;

use crate::{CelType, Primitive};

/// Read-only resolver of message, field and enum names.
///
/// Implementations must be side-effect free: the checker may call them any
/// number of times during one check, in any order.
pub trait TypeProvider: fmt::Debug + Send + Sync {
    /// Resolve a fully qualified message name to its message type.
    ///
    /// Returns the object type itself (e.g. `CelType::Message("a.B")`), not the
    /// `type(a.B)` value an identifier of that name denotes.
    fn find_type(&self, name: &str) -> Option<CelType>;

    /// Resolve the declared type of `field` on the message named `message`.
    ///
    /// Field types naming well-known messages are returned in their CEL form,
    /// e.g. a `google.protobuf.Int64Value` field is `wrapper(int)`.
    fn find_field_type(&self, message: &str, field: &str) -> Option<CelType>;

    /// Resolve a fully qualified enum constant, e.g. `a.Color.RED`.
    fn enum_value(&self, name: &str) -> Option<i64>;
}

/// A `TypeProvider` over explicitly registered messages and enums.
///
/// # Example
/// ```
/// use cel_typecheck_common::{CelType, StaticTypeProvider, TypeProvider};
///
/// let provider = StaticTypeProvider::new()
///     .with_message("acme.Account", [("id", CelType::Int), ("owner", CelType::String)])
///     .with_enum("acme.Tier", [("FREE", 0), ("PRO", 1)]);
///
/// assert_eq!(provider.find_field_type("acme.Account", "id"), Some(CelType::Int));
/// assert_eq!(provider.enum_value("acme.Tier.PRO"), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTypeProvider {
    messages: HashMap<String, HashMap<String, CelType>>,
    enum_values: HashMap<String, i64>,
}

impl StaticTypeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message and its fields. Registering a name again extends
    /// its field table.
    pub fn with_message<N: Into<String>>(
        mut self,
        name: &str,
        fields: impl IntoIterator<Item = (N, CelType)>,
    ) -> Self {
        let table = self.messages.entry(name.to_string()).or_default();
        table.extend(fields.into_iter().map(|(field, t)| (field.into(), t)));
        self
    }

    /// Register the constants of an enum.
    pub fn with_enum<N: AsRef<str>>(
        mut self,
        enum_name: &str,
        values: impl IntoIterator<Item = (N, i64)>,
    ) -> Self {
        for (value_name, number) in values {
            self.enum_values
                .insert(format!("{}.{}", enum_name, value_name.as_ref()), number);
        }
        self
    }

    /// Register the `google.protobuf` well-known messages with their fields.
    pub fn with_well_known_types(self) -> Self {
        let wrappers = [
            ("google.protobuf.BoolValue", Primitive::Bool),
            ("google.protobuf.BytesValue", Primitive::Bytes),
            ("google.protobuf.DoubleValue", Primitive::Double),
            ("google.protobuf.FloatValue", Primitive::Double),
            ("google.protobuf.Int32Value", Primitive::Int),
            ("google.protobuf.Int64Value", Primitive::Int),
            ("google.protobuf.StringValue", Primitive::String),
            ("google.protobuf.UInt32Value", Primitive::UInt),
            ("google.protobuf.UInt64Value", Primitive::UInt),
        ];
        let mut provider = wrappers.into_iter().fold(self, |provider, (name, p)| {
            provider.with_message(name, [("value", p.to_type())])
        });
        for name in ["google.protobuf.Duration", "google.protobuf.Timestamp"] {
            provider = provider.with_message(name, [("seconds", CelType::Int), ("nanos", CelType::Int)]);
        }
        provider
            .with_message(
                "google.protobuf.Any",
                [("type_url", CelType::String), ("value", CelType::Bytes)],
            )
            .with_message(
                "google.protobuf.Struct",
                [("fields", CelType::map(CelType::String, CelType::Dyn))],
            )
            .with_message("google.protobuf.ListValue", [("values", CelType::list(CelType::Dyn))])
            .with_message(
                "google.protobuf.Value",
                [
                    ("null_value", CelType::Null),
                    ("number_value", CelType::Double),
                    ("string_value", CelType::String),
                    ("bool_value", CelType::Bool),
                    ("struct_value", CelType::map(CelType::String, CelType::Dyn)),
                    ("list_value", CelType::list(CelType::Dyn)),
                ],
            )
            .with_enum("google.protobuf.NullValue", [("NULL_VALUE", 0)])
    }
}

impl TypeProvider for StaticTypeProvider {
    fn find_type(&self, name: &str) -> Option<CelType> {
        self.messages
            .contains_key(name)
            .then(|| CelType::message(name))
    }

    fn find_field_type(&self, message: &str, field: &str) -> Option<CelType> {
        self.messages.get(message)?.get(field).cloned()
    }

    fn enum_value(&self, name: &str) -> Option<i64> {
        self.enum_values.get(name).copied()
    }
}
