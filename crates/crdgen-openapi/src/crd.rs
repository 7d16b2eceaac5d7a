//! CustomResourceDefinition documents

use std::cmp::Ordering;
use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::schema::Schema;

lazy_static! {
    static ref KUBE_VERSION: Regex =
        Regex::new(r"^v([0-9]+)(?:(alpha|beta)([0-9]+))?$").expect("kube version pattern");
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinition {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: CrdSpec,
}

impl CustomResourceDefinition {
    pub fn new(metadata: ObjectMeta, spec: CrdSpec) -> Self {
        Self {
            api_version: "apiextensions.k8s.io/v1".to_string(),
            kind: "CustomResourceDefinition".to_string(),
            metadata,
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectMeta {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdSpec {
    pub group: String,
    pub names: CrdNames,
    pub scope: String,
    pub versions: Vec<CrdVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdNames {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    pub kind: String,
    pub list_kind: String,
    pub plural: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
    pub singular: String,
}

impl CrdNames {
    /// Names derived from the kind, overridden where tags say so
    pub fn for_kind(
        kind: &str,
        plural: Option<&str>,
        singular: Option<&str>,
        list_kind: Option<&str>,
    ) -> Self {
        let lower = kind.to_lowercase();
        Self {
            kind: kind.to_string(),
            list_kind: list_kind
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}List", kind)),
            plural: plural
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}s", lower)),
            singular: singular.map(str::to_string).unwrap_or(lower),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdVersion {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_printer_columns: Vec<PrinterColumn>,
    pub name: String,
    pub schema: CrdValidation,
    pub served: bool,
    pub storage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subresources: Option<Subresources>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrdValidation {
    #[serde(rename = "openAPIV3Schema")]
    pub open_api_v3_schema: Schema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subresources {
    pub status: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterColumn {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "jsonPath")]
    pub json_path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(rename = "type")]
    pub type_: String,
}

/// Order two version names by Kubernetes version priority, highest first.
///
/// GA versions sort before beta, beta before alpha, and higher numbers first
/// within each level. Names that are not Kubernetes-style versions sort last,
/// alphabetically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (version_key(a), version_key(b)) {
        (Some(ka), Some(kb)) => kb.cmp(&ka).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

// (stability, major, minor): stability 2 = GA, 1 = beta, 0 = alpha
fn version_key(version: &str) -> Option<(u8, u64, u64)> {
    let caps = KUBE_VERSION.captures(version)?;
    let major = caps[1].parse().ok()?;

    match caps.get(2).map(|m| m.as_str()) {
        None => Some((2, major, 0)),
        Some(level) => {
            let minor = caps[3].parse().ok()?;
            let stability = if level == "beta" { 1 } else { 0 };
            Some((stability, major, minor))
        }
    }
}
