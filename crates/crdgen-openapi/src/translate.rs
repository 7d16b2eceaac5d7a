//! Proto descriptor → OpenAPI schema translation

use std::collections::BTreeMap;

use crdgen_core::{DescriptorIndex, EnumStyle, MessageRef, Options};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::FieldDescriptorProto;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;
use crate::tags::{self, FieldTags};

// DescriptorProto.field
const MESSAGE_FIELD: i32 = 2;
// map entries always number their value field 2
const MAP_VALUE_FIELD: i32 = 2;

/// Builds structural schemas for messages of one descriptor set
#[derive(Debug, Clone, Copy)]
pub struct SchemaBuilder<'g, 'i> {
    index: &'g DescriptorIndex<'i>,
    options: Options,
    include_experimental: bool,
}

impl<'g, 'i> SchemaBuilder<'g, 'i> {
    pub fn new(index: &'g DescriptorIndex<'i>, options: Options, include_experimental: bool) -> Self {
        Self {
            index,
            options,
            include_experimental,
        }
    }

    /// Schema for a resource message
    pub fn message_schema(&self, message: &MessageRef<'i>) -> SchemaResult<Schema> {
        let mut stack = Vec::new();
        self.build_message(message, &mut stack)
    }

    /// Cleaned leading comment of `path`, if descriptions are enabled
    pub fn description(&self, message: &MessageRef<'i>, path: &[i32]) -> Option<String> {
        if !self.options.include_description() {
            return None;
        }
        self.index
            .leading_comments(message.file, path)
            .and_then(tags::description)
    }

    fn build_message(
        &self,
        message: &MessageRef<'i>,
        stack: &mut Vec<String>,
    ) -> SchemaResult<Schema> {
        if stack.contains(&message.full_name) {
            return Ok(Schema::free_form_object());
        }
        stack.push(message.full_name.clone());

        let mut schema = Schema::object();
        let mut oneofs: BTreeMap<i32, Vec<String>> = BTreeMap::new();

        for (i, field) in message.descriptor.field.iter().enumerate() {
            let mut path = message.path.clone();
            path.extend([MESSAGE_FIELD, i as i32]);

            let comment = self
                .index
                .leading_comments(message.file, &path)
                .unwrap_or_default();
            let field_tags = tags::parse_field_tags(comment).map_err(|reason| {
                SchemaError::InvalidTag {
                    message: qualified(message, field),
                    reason,
                }
            })?;
            if field_tags.experimental && !self.include_experimental {
                continue;
            }

            let name = json_name(field);
            let mut property = self.field_schema(message, field, stack)?;
            apply_validation(&mut property, &field_tags);
            if self.options.include_description() {
                property.description = tags::description(comment);
            }

            if field_tags.required {
                schema.required.push(name.clone());
            }
            if let Some(oneof) = field.oneof_index {
                if !field.proto3_optional() {
                    oneofs.entry(oneof).or_default().push(name.clone());
                }
            }
            schema.properties.insert(name, property);
        }

        let mut constraints: Vec<Vec<Schema>> = oneofs
            .into_values()
            .filter(|members| !members.is_empty())
            .map(|members| oneof_constraint(&members))
            .collect();
        match constraints.len() {
            0 => {}
            1 => schema.one_of = constraints.remove(0),
            _ => {
                schema.all_of = constraints
                    .into_iter()
                    .map(|one_of| Schema {
                        one_of,
                        ..Default::default()
                    })
                    .collect()
            }
        }

        stack.pop();
        Ok(schema)
    }

    fn field_schema(
        &self,
        owner: &MessageRef<'i>,
        field: &FieldDescriptorProto,
        stack: &mut Vec<String>,
    ) -> SchemaResult<Schema> {
        if let Some(entry) = self.map_entry(field) {
            let value = entry
                .descriptor
                .field
                .iter()
                .find(|f| f.number() == MAP_VALUE_FIELD)
                .ok_or_else(|| SchemaError::UnresolvedType {
                    field: qualified(owner, field),
                    type_name: format!("{} value", entry.full_name),
                })?;
            return Ok(Schema::map_of(self.single_schema(owner, value, stack)?));
        }

        let single = self.single_schema(owner, field, stack)?;
        if field.label() == Label::Repeated {
            Ok(Schema::array_of(single))
        } else {
            Ok(single)
        }
    }

    fn map_entry(&self, field: &FieldDescriptorProto) -> Option<&MessageRef<'i>> {
        if field.label() != Label::Repeated || field.r#type() != Type::Message {
            return None;
        }
        self.index.message(field.type_name()).filter(|m| {
            m.descriptor
                .options
                .as_ref()
                .map(|o| o.map_entry())
                .unwrap_or(false)
        })
    }

    fn single_schema(
        &self,
        owner: &MessageRef<'i>,
        field: &FieldDescriptorProto,
        stack: &mut Vec<String>,
    ) -> SchemaResult<Schema> {
        let schema = match field.r#type() {
            Type::Double => Schema::formatted("number", "double"),
            Type::Float => Schema::formatted("number", "float"),
            Type::Int32 | Type::Sint32 | Type::Sfixed32 => Schema::formatted("integer", "int32"),
            Type::Int64
            | Type::Uint64
            | Type::Sint64
            | Type::Fixed64
            | Type::Sfixed64
            | Type::Uint32
            | Type::Fixed32 => Schema::formatted("integer", "int64"),
            Type::Bool => Schema::typed("boolean"),
            Type::String => Schema::typed("string"),
            Type::Bytes => Schema::formatted("string", "byte"),
            Type::Enum => self.enum_schema(owner, field)?,
            Type::Message | Type::Group => {
                if let Some(schema) = well_known(field.type_name()) {
                    return Ok(schema);
                }
                let message = self.index.message(field.type_name()).ok_or_else(|| {
                    SchemaError::UnresolvedType {
                        field: qualified(owner, field),
                        type_name: field.type_name().to_string(),
                    }
                })?;
                self.build_message(message, stack)?
            }
        };
        Ok(schema)
    }

    fn enum_schema(
        &self,
        owner: &MessageRef<'i>,
        field: &FieldDescriptorProto,
    ) -> SchemaResult<Schema> {
        let enumeration = self.index.enumeration(field.type_name()).ok_or_else(|| {
            SchemaError::UnresolvedType {
                field: qualified(owner, field),
                type_name: field.type_name().to_string(),
            }
        })?;

        Ok(match self.options.enum_style {
            EnumStyle::IntOrString => Schema {
                int_or_string: Some(true),
                ..Default::default()
            },
            EnumStyle::String => Schema {
                enum_values: enumeration
                    .descriptor
                    .value
                    .iter()
                    .map(|v| v.name().to_string())
                    .collect(),
                ..Schema::typed("string")
            },
        })
    }
}

/// Schemas for google.protobuf well-known types
fn well_known(type_name: &str) -> Option<Schema> {
    let schema = match type_name {
        ".google.protobuf.Duration" => Schema::typed("string"),
        ".google.protobuf.Timestamp" => Schema::formatted("string", "date-time"),
        ".google.protobuf.Struct" | ".google.protobuf.Any" => Schema::free_form_object(),
        ".google.protobuf.Value" => Schema::any_value(),
        ".google.protobuf.ListValue" => Schema::array_of(Schema::any_value()),
        ".google.protobuf.Empty" => Schema::object(),
        ".google.protobuf.BoolValue" => Schema::typed("boolean").nullable(),
        ".google.protobuf.StringValue" => Schema::typed("string").nullable(),
        ".google.protobuf.BytesValue" => Schema::formatted("string", "byte").nullable(),
        ".google.protobuf.Int32Value" => Schema::formatted("integer", "int32").nullable(),
        ".google.protobuf.UInt32Value"
        | ".google.protobuf.Int64Value"
        | ".google.protobuf.UInt64Value" => Schema::formatted("integer", "int64").nullable(),
        ".google.protobuf.FloatValue" => Schema::formatted("number", "float").nullable(),
        ".google.protobuf.DoubleValue" => Schema::formatted("number", "double").nullable(),
        _ => return None,
    };
    Some(schema)
}

// At most one member of the oneof may be set
fn oneof_constraint(members: &[String]) -> Vec<Schema> {
    let none_set = Schema {
        not: Some(Box::new(Schema {
            any_of: members.iter().map(|m| Schema::requiring(m)).collect(),
            ..Default::default()
        })),
        ..Default::default()
    };

    std::iter::once(none_set)
        .chain(members.iter().map(|m| Schema::requiring(m)))
        .collect()
}

fn apply_validation(schema: &mut Schema, tags: &FieldTags) {
    schema.min_items = tags.min_items;
    schema.max_items = tags.max_items;
    schema.min_length = tags.min_length;
    schema.max_length = tags.max_length;
    schema.pattern = tags.pattern.clone();
}

/// JSON name of a field, as protoc computed it
pub fn json_name(field: &FieldDescriptorProto) -> String {
    match &field.json_name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => lower_camel(field.name()),
    }
}

fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn qualified(message: &MessageRef<'_>, field: &FieldDescriptorProto) -> String {
    format!(
        "{}.{}",
        message.full_name.trim_start_matches('.'),
        field.name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel("http_route"), "httpRoute");
        assert_eq!(lower_camel("hosts"), "hosts");
        assert_eq!(lower_camel("tls_v1_3"), "tlsV13");
    }

    #[test]
    fn test_json_name_prefers_protoc_value() {
        let field = FieldDescriptorProto {
            name: Some("max_age".into()),
            json_name: Some("maxAgeSeconds".into()),
            ..Default::default()
        };
        assert_eq!(json_name(&field), "maxAgeSeconds");

        let field = FieldDescriptorProto {
            name: Some("max_age".into()),
            ..Default::default()
        };
        assert_eq!(json_name(&field), "maxAge");
    }

    #[test]
    fn test_oneof_constraint_shape() {
        let constraint = oneof_constraint(&["a".into(), "b".into()]);
        assert_eq!(constraint.len(), 3);
        let not = constraint[0].not.as_ref().unwrap();
        assert_eq!(not.any_of, vec![Schema::requiring("a"), Schema::requiring("b")]);
        assert_eq!(constraint[2], Schema::requiring("b"));
    }

    #[test]
    fn test_wrapper_types_are_nullable() {
        let schema = well_known(".google.protobuf.BoolValue").unwrap();
        assert_eq!(schema.type_.as_deref(), Some("boolean"));
        assert_eq!(schema.nullable, Some(true));
        assert!(well_known(".pkg.v1.Custom").is_none());
    }
}
