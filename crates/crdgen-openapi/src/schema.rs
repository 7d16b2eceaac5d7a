//! OpenAPI v3 schema subset accepted by Kubernetes structural schemas

use std::collections::BTreeMap;

use serde::Serialize;

/// One node of a structural schema (`JSONSchemaProps`)
///
/// Properties are kept in a sorted map so rendered output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(
        rename = "x-kubernetes-int-or-string",
        skip_serializing_if = "Option::is_none"
    )]
    pub int_or_string: Option<bool>,

    #[serde(
        rename = "x-kubernetes-preserve-unknown-fields",
        skip_serializing_if = "Option::is_none"
    )]
    pub preserve_unknown_fields: Option<bool>,
}

impl Schema {
    /// Schema with only `type` set
    pub fn typed(type_: &str) -> Self {
        Self {
            type_: Some(type_.to_string()),
            ..Default::default()
        }
    }

    /// Schema with `type` and `format` set
    pub fn formatted(type_: &str, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::typed(type_)
        }
    }

    pub fn object() -> Self {
        Self::typed("object")
    }

    /// Object that accepts arbitrary content
    pub fn free_form_object() -> Self {
        Self {
            preserve_unknown_fields: Some(true),
            ..Self::object()
        }
    }

    /// Untyped node that accepts any JSON value
    pub fn any_value() -> Self {
        Self {
            preserve_unknown_fields: Some(true),
            ..Default::default()
        }
    }

    pub fn array_of(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array")
        }
    }

    pub fn map_of(values: Schema) -> Self {
        Self {
            additional_properties: Some(Box::new(values)),
            ..Self::object()
        }
    }

    /// Schema requiring exactly the named property
    pub fn requiring(property: &str) -> Self {
        Self {
            required: vec![property.to_string()],
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }
}
