//! Comment tag parsing
//!
//! Resources are declared with tag lines in the leading comment of a message:
//!
//! ```text
//! // <!-- crd generation tags
//! // +cue-gen:Gateway:groupName:networking.example.io
//! // +cue-gen:Gateway:version:v1
//! // +cue-gen:Gateway:storageVersion
//! // +cue-gen:Gateway:subresource:status
//! // +cue-gen:Gateway:scope:Namespaced
//! // +cue-gen:Gateway:resource:categories=example-io,networking,shortNames=gw
//! // +cue-gen:Gateway:printerColumn:name=Age,type=date,JSONPath=.metadata.creationTimestamp
//! // -->
//! ```
//!
//! Fields carry validation and release tags:
//!
//! ```text
//! // +kubebuilder:validation:Required
//! // +kubebuilder:validation:MaxItems=64
//! // +protoc-gen-crd:experimental
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::crd::PrinterColumn;

const RESOURCE_TAG: &str = "+cue-gen:";
const VALIDATION_TAG: &str = "+kubebuilder:validation:";
const EXPERIMENTAL_TAG: &str = "+protoc-gen-crd:experimental";

// Marker lines kept out of descriptions
const TAG_PREFIXES: [&str; 6] = [
    "+cue-gen:",
    "+kubebuilder:",
    "+protoc-gen-crd:",
    "+k8s:",
    "+genclient",
    "+groupName=",
];

/// Resource scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Namespaced,
    Cluster,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespaced => "Namespaced",
            Self::Cluster => "Cluster",
        }
    }
}

/// Tags describing one custom resource version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTags {
    pub kind: String,
    pub group: Option<String>,
    pub version: Option<String>,
    pub storage_version: bool,
    pub scope: Scope,
    pub status_subresource: bool,
    pub plural: Option<String>,
    pub singular: Option<String>,
    pub list_kind: Option<String>,
    pub short_names: Vec<String>,
    pub categories: Vec<String>,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub printer_columns: Vec<PrinterColumn>,
    pub preserve_unknown_fields: bool,
}

impl ResourceTags {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "groupName" => self.group = Some(value.to_string()),
            "version" => self.version = Some(value.to_string()),
            "storageVersion" => self.storage_version = true,
            "scope" => {
                self.scope = match value {
                    "Namespaced" => Scope::Namespaced,
                    "Cluster" => Scope::Cluster,
                    _ => return Err(format!("unknown scope '{}'", value)),
                }
            }
            "subresource" => match value {
                "status" => self.status_subresource = true,
                _ => return Err(format!("unknown subresource '{}'", value)),
            },
            "resource" => self.apply_resource(value)?,
            "annotations" => self.annotations.extend(parse_pairs(value)?),
            "labels" => self.labels.extend(parse_pairs(value)?),
            "printerColumn" => self.printer_columns.push(parse_printer_column(value)?),
            "preserveUnknownFields" => {
                self.preserve_unknown_fields = parse_bool(key, value)?;
            }
            _ => debug!(kind = %self.kind, key, "ignoring unknown resource tag"),
        }
        Ok(())
    }

    fn apply_resource(&mut self, value: &str) -> Result<(), String> {
        let mut current: Option<&str> = None;

        for token in split_unquoted(value) {
            let (key, item) = match token.split_once('=') {
                Some((key, item)) => (key.trim(), item.trim()),
                None => match current {
                    Some(key) => (key, token.trim()),
                    None => return Err(format!("resource value '{}' has no key", token)),
                },
            };

            match key {
                "plural" => self.plural = Some(item.to_string()),
                "singular" => self.singular = Some(item.to_string()),
                "listKind" => self.list_kind = Some(item.to_string()),
                "shortNames" => self.short_names.push(item.to_string()),
                "categories" => self.categories.push(item.to_string()),
                _ => return Err(format!("unknown resource key '{}'", key)),
            }

            current = match key {
                "shortNames" => Some("shortNames"),
                "categories" => Some("categories"),
                _ => None,
            };
        }
        Ok(())
    }
}

/// Collect the resource tags in a message comment, one entry per kind.
pub fn parse_resource_tags(comment: &str) -> Result<Vec<ResourceTags>, String> {
    let mut resources: Vec<ResourceTags> = Vec::new();

    for line in comment.lines() {
        let Some(tag) = line.trim().strip_prefix(RESOURCE_TAG) else {
            continue;
        };

        let mut parts = tag.splitn(3, ':');
        let kind = parts.next().unwrap_or_default().trim();
        let key = parts.next().unwrap_or_default().trim();
        let value = parts.next().unwrap_or_default().trim();
        if kind.is_empty() || key.is_empty() {
            return Err(format!("malformed tag '{}'", line.trim()));
        }

        let idx = match resources.iter().position(|r| r.kind == kind) {
            Some(idx) => idx,
            None => {
                resources.push(ResourceTags::new(kind));
                resources.len() - 1
            }
        };
        resources[idx].apply(key, value)?;
    }

    Ok(resources)
}

/// Validation and release tags on a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTags {
    pub required: bool,
    pub experimental: bool,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
}

/// Collect the tags in a field comment.
pub fn parse_field_tags(comment: &str) -> Result<FieldTags, String> {
    let mut tags = FieldTags::default();

    for line in comment.lines() {
        let line = line.trim();
        if line == EXPERIMENTAL_TAG {
            tags.experimental = true;
            continue;
        }
        let Some(rule) = line.strip_prefix(VALIDATION_TAG) else {
            continue;
        };

        let (name, value) = rule.split_once('=').unwrap_or((rule, ""));
        match name {
            "Required" => tags.required = true,
            "MinItems" => tags.min_items = Some(parse_count(name, value)?),
            "MaxItems" => tags.max_items = Some(parse_count(name, value)?),
            "MinLength" => tags.min_length = Some(parse_count(name, value)?),
            "MaxLength" => tags.max_length = Some(parse_count(name, value)?),
            "Pattern" => tags.pattern = Some(unquote(value).to_string()),
            _ => debug!(rule = name, "ignoring unknown validation tag"),
        }
    }

    Ok(tags)
}

/// Comment text with tag lines and `<!-- ... -->` blocks removed.
pub fn description(comment: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut in_block = false;

    for line in comment.lines() {
        let trimmed = line.trim();
        if in_block {
            in_block = !trimmed.contains("-->");
            continue;
        }
        if trimmed.starts_with("<!--") {
            in_block = !trimmed.contains("-->");
            continue;
        }
        if TAG_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            continue;
        }
        lines.push(trimmed);
    }

    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn parse_printer_column(value: &str) -> Result<PrinterColumn, String> {
    let mut column = PrinterColumn::default();

    for (key, item) in parse_pairs(value)? {
        match key.as_str() {
            "name" => column.name = item,
            "type" => column.type_ = item,
            "JSONPath" => column.json_path = item,
            "description" => column.description = Some(item),
            "format" => column.format = Some(item),
            "priority" => {
                column.priority = Some(
                    item.parse()
                        .map_err(|_| format!("invalid printer column priority '{}'", item))?,
                )
            }
            _ => return Err(format!("unknown printer column key '{}'", key)),
        }
    }

    if column.name.is_empty() || column.type_.is_empty() || column.json_path.is_empty() {
        return Err(format!(
            "printer column '{}' needs name, type and JSONPath",
            value
        ));
    }
    Ok(column)
}

/// Parse `k=v,k="v, with comma"` into ordered pairs.
fn parse_pairs(value: &str) -> Result<Vec<(String, String)>, String> {
    split_unquoted(value)
        .into_iter()
        .map(|token| {
            token
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), unquote(v.trim()).to_string()))
                .ok_or_else(|| format!("expected key=value, found '{}'", token))
        })
        .collect()
}

/// Split on commas that are not inside double quotes.
fn split_unquoted(value: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                tokens.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(&value[start..]);

    tokens.into_iter().filter(|t| !t.trim().is_empty()).collect()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_count(name: &str, value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {} value '{}'", name, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("invalid {} value '{}'", key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GATEWAY: &str = r#" Gateway describes a load balancer.

 <!-- crd generation tags
 +cue-gen:Gateway:groupName:networking.example.io
 +cue-gen:Gateway:version:v1beta1
 +cue-gen:Gateway:storageVersion
 +cue-gen:Gateway:annotations:helm.sh/resource-policy=keep
 +cue-gen:Gateway:labels:app=gateway,chart=gateway
 +cue-gen:Gateway:subresource:status
 +cue-gen:Gateway:scope:Cluster
 +cue-gen:Gateway:resource:categories=example-io,networking-example-io,shortNames=gw
 +cue-gen:Gateway:printerColumn:name=Age,type=date,JSONPath=.metadata.creationTimestamp,description="CreationTimestamp is a timestamp, in UTC."
 +cue-gen:Gateway:preserveUnknownFields:false
 -->
"#;

    #[test]
    fn test_parse_resource_tags() {
        let tags = parse_resource_tags(GATEWAY).unwrap();
        assert_eq!(tags.len(), 1);

        let gw = &tags[0];
        assert_eq!(gw.kind, "Gateway");
        assert_eq!(gw.group.as_deref(), Some("networking.example.io"));
        assert_eq!(gw.version.as_deref(), Some("v1beta1"));
        assert!(gw.storage_version);
        assert!(gw.status_subresource);
        assert_eq!(gw.scope, Scope::Cluster);
        assert_eq!(gw.short_names, vec!["gw"]);
        assert_eq!(gw.categories, vec!["example-io", "networking-example-io"]);
        assert_eq!(gw.annotations["helm.sh/resource-policy"], "keep");
        assert_eq!(gw.labels.len(), 2);
        assert!(!gw.preserve_unknown_fields);

        let column = &gw.printer_columns[0];
        assert_eq!(column.name, "Age");
        assert_eq!(column.json_path, ".metadata.creationTimestamp");
        assert_eq!(
            column.description.as_deref(),
            Some("CreationTimestamp is a timestamp, in UTC.")
        );
    }

    #[test]
    fn test_untagged_comment_has_no_resources() {
        assert!(parse_resource_tags(" just docs\n").unwrap().is_empty());
    }

    #[test]
    fn test_multiple_kinds_in_one_comment() {
        let comment = " +cue-gen:A:groupName:g.io\n +cue-gen:B:groupName:h.io\n";
        let tags = parse_resource_tags(comment).unwrap();
        let kinds: Vec<_> = tags.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["A", "B"]);
    }

    #[test]
    fn test_bad_scope_is_rejected() {
        let err = parse_resource_tags(" +cue-gen:A:scope:Galaxy\n").unwrap_err();
        assert!(err.contains("Galaxy"));
    }

    #[test]
    fn test_incomplete_printer_column_is_rejected() {
        let err = parse_resource_tags(" +cue-gen:A:printerColumn:name=Age\n").unwrap_err();
        assert!(err.contains("needs name, type and JSONPath"));
    }

    #[test]
    fn test_description_strips_tags() {
        assert_eq!(
            description(GATEWAY).as_deref(),
            Some("Gateway describes a load balancer.")
        );
        assert_eq!(description(" +kubebuilder:validation:Required\n"), None);
        assert_eq!(
            description(" First line.\n Second line.\n").as_deref(),
            Some("First line.\nSecond line.")
        );
    }

    #[test]
    fn test_description_keeps_plus_prose() {
        let comment = " Weight of the route.\n +1 adds one unit of traffic.\n +kubebuilder:validation:Required\n +genclient\n";
        assert_eq!(
            description(comment).as_deref(),
            Some("Weight of the route.\n+1 adds one unit of traffic.")
        );
    }

    #[test]
    fn test_parse_field_tags() {
        let comment = " Hosts to match.\n +kubebuilder:validation:Required\n +kubebuilder:validation:MaxItems=16\n +kubebuilder:validation:Pattern=\"^[a-z]+$\"\n +protoc-gen-crd:experimental\n";
        let tags = parse_field_tags(comment).unwrap();
        assert_eq!(
            tags,
            FieldTags {
                required: true,
                experimental: true,
                max_items: Some(16),
                pattern: Some("^[a-z]+$".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_bad_count_is_rejected() {
        let err = parse_field_tags(" +kubebuilder:validation:MinItems=many\n").unwrap_err();
        assert_eq!(err, "invalid MinItems value 'many'");
    }
}
