//! Plugin parameter decoding
//!
//! protoc hands the plugin a single `--crd_opt` string of comma-separated
//! `key` or `key=value` tokens:
//!
//! ```text
//! include_description=false,enum_as_int_or_string=true
//! ```
//!
//! Recognised keys:
//!
//! - `include_description` (default `true`): embed comments as schema descriptions
//! - `enum_as_int_or_string` (default `false`): render enums as int-or-string
//!
//! # Example
//!
//! ```rust
//! use crdgen_core::options::{EnumStyle, Options};
//!
//! let options = Options::from_parameter("enum_as_int_or_string=TRUE").unwrap();
//! assert_eq!(options.enum_style, EnumStyle::IntOrString);
//! assert!(options.description.include_description);
//! ```

use std::collections::BTreeMap;

use crate::error::{Error, Result};

const INCLUDE_DESCRIPTION: &str = "include_description";
const ENUM_AS_INT_OR_STRING: &str = "enum_as_int_or_string";

/// Controls how comments flow into generated schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionConfiguration {
    pub include_description: bool,
}

impl Default for DescriptionConfiguration {
    fn default() -> Self {
        Self {
            include_description: true,
        }
    }
}

/// Rendering of proto enums in OpenAPI schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumStyle {
    /// `type: string` with an `enum` of value names
    #[default]
    String,
    /// `x-kubernetes-int-or-string: true`
    IntOrString,
}

/// Decoded generation options, built once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options {
    pub description: DescriptionConfiguration,
    pub enum_style: EnumStyle,
}

impl Options {
    /// Decode the protoc parameter string.
    ///
    /// Unknown keys and non-boolean values are configuration errors.
    pub fn from_parameter(parameter: &str) -> Result<Self> {
        let mut options = Self::default();

        for (key, value) in extract_params(parameter) {
            match key.as_str() {
                INCLUDE_DESCRIPTION => {
                    options.description.include_description = parse_bool(&key, &value)?;
                }
                ENUM_AS_INT_OR_STRING => {
                    options.enum_style = if parse_bool(&key, &value)? {
                        EnumStyle::IntOrString
                    } else {
                        EnumStyle::String
                    };
                }
                _ => return Err(Error::UnknownParameter { key }),
            }
        }

        Ok(options)
    }

    pub fn include_description(&self) -> bool {
        self.description.include_description
    }

    pub fn enum_as_int_or_string(&self) -> bool {
        self.enum_style == EnumStyle::IntOrString
    }
}

/// Break the comma-separated parameter string into a key/value map.
///
/// A token without `=` maps to an empty value; empty tokens are skipped and a
/// repeated key keeps its last value.
pub fn extract_params(parameter: &str) -> BTreeMap<String, String> {
    parameter
        .split(',')
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (token.to_string(), String::new()),
        })
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidParameterValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
