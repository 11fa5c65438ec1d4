//! Protobuf descriptor backed type resolution.
//!
//! This module provides `DescriptorTypeProvider`, which wraps a
//! `prost_reflect::DescriptorPool` to resolve message names, field types and
//! enum constants, and the table mapping well-known protobuf messages to
//! their built-in CEL types.

use prost_reflect::prost::Message;
use prost_reflect::prost_types::{FileDescriptorProto, FileDescriptorSet};
use prost_reflect::{DescriptorPool, FieldDescriptor, Kind};

use crate::{CelType, Primitive, TypeProvider};

/// Failure to load descriptors into a `DescriptorTypeProvider`.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorLoadError {
    #[error("failed to decode file descriptor set: {0}")]
    Decode(#[from] prost_reflect::prost::DecodeError),
    #[error("invalid descriptors: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),
}

/// A `TypeProvider` over a protobuf descriptor pool.
#[derive(Debug, Clone)]
pub struct DescriptorTypeProvider {
    pool: DescriptorPool,
}

impl DescriptorTypeProvider {
    /// Create a provider with the `google.protobuf` well-known types loaded.
    pub fn new() -> Self {
        Self {
            pool: DescriptorPool::global(),
        }
    }

    pub fn from_pool(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// Add descriptors from a serialized `FileDescriptorSet`.
    pub fn add_file_descriptor_set(&mut self, bytes: &[u8]) -> Result<(), DescriptorLoadError> {
        let set = FileDescriptorSet::decode(bytes)?;
        self.pool.add_file_descriptor_set(set)?;
        Ok(())
    }

    pub fn add_file_descriptor_proto(&mut self, file: FileDescriptorProto) -> Result<(), DescriptorLoadError> {
        self.pool.add_file_descriptor_proto(file)?;
        Ok(())
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    fn field_to_cel_type(field: &FieldDescriptor) -> CelType {
        if field.is_map() {
            let Kind::Message(entry) = field.kind() else {
                return CelType::map(CelType::Dyn, CelType::Dyn);
            };
            let key = Self::kind_to_cel_type(entry.map_entry_key_field().kind());
            let value = Self::kind_to_cel_type(entry.map_entry_value_field().kind());
            return CelType::map(key, value);
        }

        let base = Self::kind_to_cel_type(field.kind());
        if field.is_list() {
            CelType::list(base)
        } else {
            base
        }
    }

    fn kind_to_cel_type(kind: Kind) -> CelType {
        match kind {
            Kind::Bool => CelType::Bool,
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
                CelType::Int
            }
            Kind::Uint32 | Kind::Fixed32 | Kind::Uint64 | Kind::Fixed64 => CelType::UInt,
            Kind::Float | Kind::Double => CelType::Double,
            Kind::String => CelType::String,
            Kind::Bytes => CelType::Bytes,
            Kind::Message(msg) => proto_message_to_cel_type(msg.full_name()),
            Kind::Enum(e) if e.full_name() == "google.protobuf.NullValue" => CelType::Null,
            Kind::Enum(_) => CelType::Int,
        }
    }
}

impl Default for DescriptorTypeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeProvider for DescriptorTypeProvider {
    fn find_type(&self, name: &str) -> Option<CelType> {
        let message = self.pool.get_message_by_name(name)?;
        Some(CelType::message(message.full_name()))
    }

    fn find_field_type(&self, message: &str, field: &str) -> Option<CelType> {
        let message = self.pool.get_message_by_name(message)?;
        let field = message.get_field_by_name(field)?;
        Some(Self::field_to_cel_type(&field))
    }

    fn enum_value(&self, name: &str) -> Option<i64> {
        let (enum_name, value_name) = name.rsplit_once('.')?;
        let value = self.pool.get_enum_by_name(enum_name)?.get_value_by_name(value_name)?;
        Some(i64::from(value.number()))
    }
}

/// The built-in CEL type of a well-known protobuf message, if it has one.
///
/// - Wrapper messages map to `wrapper(P)`
/// - `Any`, `Duration` and `Timestamp` map to the well-known types
/// - `ListValue`, `Struct` and `Value` map to `list(dyn)`, `map(string, dyn)` and `dyn`
/// - `NullValue` maps to `null`
pub fn well_known_type(full_name: &str) -> Option<CelType> {
    let t = match full_name {
        "google.protobuf.BoolValue" => CelType::wrapper(Primitive::Bool),
        "google.protobuf.BytesValue" => CelType::wrapper(Primitive::Bytes),
        "google.protobuf.DoubleValue" | "google.protobuf.FloatValue" => {
            CelType::wrapper(Primitive::Double)
        }
        "google.protobuf.Int32Value" | "google.protobuf.Int64Value" => {
            CelType::wrapper(Primitive::Int)
        }
        "google.protobuf.StringValue" => CelType::wrapper(Primitive::String),
        "google.protobuf.UInt32Value" | "google.protobuf.UInt64Value" => {
            CelType::wrapper(Primitive::UInt)
        }
        "google.protobuf.Any" => CelType::Any,
        "google.protobuf.Duration" => CelType::Duration,
        "google.protobuf.Timestamp" => CelType::Timestamp,
        "google.protobuf.ListValue" => CelType::list(CelType::Dyn),
        "google.protobuf.Struct" => CelType::map(CelType::String, CelType::Dyn),
        "google.protobuf.Value" => CelType::Dyn,
        "google.protobuf.NullValue" => CelType::Null,
        _ => return None,
    };
    Some(t)
}

/// Convert a proto message type name to its CEL type representation.
///
/// Well-known messages become their built-in type; any other message is
/// `CelType::Message(name)`.
pub fn proto_message_to_cel_type(full_name: &str) -> CelType {
    well_known_type(full_name).unwrap_or_else(|| CelType::message(full_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_reflect::prost_types::field_descriptor_proto::{Label, Type};
    use prost_reflect::prost_types::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        MessageOptions,
    };

    fn field(name: &str, number: i32, ty: Type, label: Label, type_name: Option<&str>) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label as i32),
            r#type: Some(ty as i32),
            type_name: type_name.map(str::to_string),
            json_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn test_file() -> FileDescriptorProto {
        let labels_entry = DescriptorProto {
            name: Some("LabelsEntry".to_string()),
            field: vec![
                field("key", 1, Type::String, Label::Optional, None),
                field("value", 2, Type::Int64, Label::Optional, None),
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let account = DescriptorProto {
            name: Some("Account".to_string()),
            field: vec![
                field("id", 1, Type::Int64, Label::Optional, None),
                field("tags", 2, Type::String, Label::Repeated, None),
                field("labels", 3, Type::Message, Label::Repeated, Some(".acme.Account.LabelsEntry")),
                field("tier", 4, Type::Enum, Label::Optional, Some(".acme.Tier")),
                field("score", 5, Type::Float, Label::Optional, None),
                field("parent", 6, Type::Message, Label::Optional, Some(".acme.Account")),
            ],
            nested_type: vec![labels_entry],
            ..Default::default()
        };
        let tier = EnumDescriptorProto {
            name: Some("Tier".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("FREE".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("PRO".to_string()),
                    number: Some(2),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        FileDescriptorProto {
            name: Some("acme/account.proto".to_string()),
            package: Some("acme".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![account],
            enum_type: vec![tier],
            ..Default::default()
        }
    }

    fn provider() -> DescriptorTypeProvider {
        let mut provider = DescriptorTypeProvider::new();
        provider.add_file_descriptor_proto(test_file()).unwrap();
        provider
    }

    #[test]
    fn test_well_known_type_mapping() {
        assert_eq!(proto_message_to_cel_type("google.protobuf.Timestamp"), CelType::Timestamp);
        assert_eq!(proto_message_to_cel_type("google.protobuf.Any"), CelType::Any);
        assert_eq!(
            proto_message_to_cel_type("google.protobuf.FloatValue"),
            CelType::wrapper(Primitive::Double)
        );
        assert_eq!(
            proto_message_to_cel_type("google.protobuf.Struct"),
            CelType::map(CelType::String, CelType::Dyn)
        );
        assert_eq!(well_known_type("google.protobuf.NullValue"), Some(CelType::Null));
    }

    #[test]
    fn test_regular_message_type() {
        assert_eq!(
            proto_message_to_cel_type("my.package.MyMessage"),
            CelType::message("my.package.MyMessage")
        );
    }

    #[test]
    fn test_find_type() {
        let provider = provider();
        assert_eq!(provider.find_type("acme.Account"), Some(CelType::message("acme.Account")));
        assert_eq!(
            provider.find_type("google.protobuf.Duration"),
            Some(CelType::message("google.protobuf.Duration"))
        );
        assert_eq!(provider.find_type("acme.Missing"), None);
    }

    #[test]
    fn test_field_types() {
        let provider = provider();
        assert_eq!(provider.find_field_type("acme.Account", "id"), Some(CelType::Int));
        assert_eq!(
            provider.find_field_type("acme.Account", "tags"),
            Some(CelType::list(CelType::String))
        );
        assert_eq!(
            provider.find_field_type("acme.Account", "labels"),
            Some(CelType::map(CelType::String, CelType::Int))
        );
        assert_eq!(provider.find_field_type("acme.Account", "tier"), Some(CelType::Int));
        assert_eq!(provider.find_field_type("acme.Account", "score"), Some(CelType::Double));
        assert_eq!(
            provider.find_field_type("acme.Account", "parent"),
            Some(CelType::message("acme.Account"))
        );
        assert_eq!(provider.find_field_type("acme.Account", "nope"), None);
    }

    #[test]
    fn test_enum_value() {
        let provider = provider();
        assert_eq!(provider.enum_value("acme.Tier.PRO"), Some(2));
        assert_eq!(provider.enum_value("acme.Tier.GOLD"), None);
        assert_eq!(provider.enum_value("Tier"), None);
    }

    #[test]
    fn test_invalid_descriptor_set_bytes() {
        let mut provider = DescriptorTypeProvider::new();
        let err = provider.add_file_descriptor_set(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, DescriptorLoadError::Decode(_)));
    }
}
