//! CRD generator
//!
//! Collects every tagged resource message in a channel's files, merges the
//! versions of each `(group, kind)` into one CustomResourceDefinition and
//! renders the lot as a multi-document YAML stream.

use std::collections::BTreeMap;

use crdgen_core::{BoxError, DescriptorIndex, MessageRef, Options, SchemaGenerator};
use prost_types::compiler::code_generator_response::File;
use prost_types::FileDescriptorProto;
use tracing::{debug, info};

use crate::crd::{
    compare_versions, CrdNames, CrdSpec, CrdValidation, CrdVersion, CustomResourceDefinition,
    ObjectMeta, Subresources,
};
use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;
use crate::tags::{self, ResourceTags};
use crate::translate::SchemaBuilder;

/// First line of every generated file
pub const HEADER: &str = "# Code generated by protoc-gen-crd. DO NOT EDIT.\n";

/// One tagged message contributing a version to a CRD
#[derive(Debug, Clone)]
struct ResourceVersion<'g, 'i> {
    tags: ResourceTags,
    version: String,
    message: &'g MessageRef<'i>,
}

/// Renders the resources of a set of proto files into CRD YAML
#[derive(Debug, Clone, Copy)]
pub struct CrdGenerator<'i> {
    index: &'i DescriptorIndex<'i>,
    options: Options,
    include_experimental: bool,
}

impl<'i> CrdGenerator<'i> {
    pub fn new(index: &'i DescriptorIndex<'i>, options: Options, include_experimental: bool) -> Self {
        Self {
            index,
            options,
            include_experimental,
        }
    }

    /// Build every CRD declared in `members`, sorted by name.
    pub fn build(&self, members: &[&FileDescriptorProto]) -> SchemaResult<Vec<CustomResourceDefinition>> {
        let mut crds = self
            .collect(members)?
            .into_iter()
            .map(|((group, kind), versions)| self.build_crd(&group, &kind, versions))
            .collect::<SchemaResult<Vec<_>>>()?;

        crds.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(crds)
    }

    /// Render `members` into a YAML stream.
    pub fn render(&self, members: &[&FileDescriptorProto]) -> SchemaResult<String> {
        let crds = self.build(members)?;
        info!(
            files = members.len(),
            crds = crds.len(),
            include_experimental = self.include_experimental,
            "rendered custom resource definitions"
        );

        let mut out = String::from(HEADER);
        for crd in &crds {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(crd)?);
        }
        Ok(out)
    }

    fn collect(
        &self,
        members: &[&FileDescriptorProto],
    ) -> SchemaResult<BTreeMap<(String, String), Vec<ResourceVersion<'_, 'i>>>> {
        let mut resources: BTreeMap<(String, String), Vec<ResourceVersion<'_, 'i>>> =
            BTreeMap::new();

        for file in members {
            for message in self.index.messages_in(file) {
                let Some(comment) = self.index.leading_comments(message.file, &message.path)
                else {
                    continue;
                };
                let invalid = |reason: String| SchemaError::InvalidTag {
                    message: message.full_name.trim_start_matches('.').to_string(),
                    reason,
                };

                for tags in tags::parse_resource_tags(comment).map_err(invalid)? {
                    let group = tags
                        .group
                        .clone()
                        .ok_or_else(|| invalid(format!("{} has no groupName", tags.kind)))?;
                    let version = tags
                        .version
                        .clone()
                        .ok_or_else(|| invalid(format!("{} has no version", tags.kind)))?;

                    debug!(
                        kind = %tags.kind,
                        group = %group,
                        version = %version,
                        message = %message.full_name,
                        "found resource"
                    );
                    resources
                        .entry((group, tags.kind.clone()))
                        .or_default()
                        .push(ResourceVersion {
                            tags,
                            version,
                            message,
                        });
                }
            }
        }

        Ok(resources)
    }

    fn build_crd(
        &self,
        group: &str,
        kind: &str,
        mut versions: Vec<ResourceVersion<'_, 'i>>,
    ) -> SchemaResult<CustomResourceDefinition> {
        versions.sort_by(|a, b| compare_versions(&a.version, &b.version));

        let mut declared: BTreeMap<&str, &str> = BTreeMap::new();
        for v in &versions {
            let message = v.message.full_name.trim_start_matches('.');
            if let Some(first) = declared.insert(&v.version, message) {
                return Err(SchemaError::DuplicateVersion {
                    kind: kind.to_string(),
                    group: group.to_string(),
                    version: v.version.clone(),
                    first: first.to_string(),
                    second: message.to_string(),
                });
            }
        }

        let storage = self.storage_version(group, kind, &versions)?;
        let primary = &versions[0].tags;

        let mut names = CrdNames::for_kind(
            kind,
            first_set(&versions, |t| t.plural.as_deref()),
            first_set(&versions, |t| t.singular.as_deref()),
            first_set(&versions, |t| t.list_kind.as_deref()),
        );
        let mut metadata = ObjectMeta::default();
        for v in &versions {
            extend_unique(&mut names.short_names, &v.tags.short_names);
            extend_unique(&mut names.categories, &v.tags.categories);
            metadata.annotations.extend(v.tags.annotations.clone());
            metadata.labels.extend(v.tags.labels.clone());
        }
        metadata.name = format!("{}.{}", names.plural, group);

        let crd_versions = versions
            .iter()
            .map(|v| self.build_version(v, v.version == storage))
            .collect::<SchemaResult<Vec<_>>>()?;

        Ok(CustomResourceDefinition::new(
            metadata,
            CrdSpec {
                group: group.to_string(),
                names,
                scope: primary.scope.as_str().to_string(),
                versions: crd_versions,
            },
        ))
    }

    fn storage_version(
        &self,
        group: &str,
        kind: &str,
        versions: &[ResourceVersion<'_, 'i>],
    ) -> SchemaResult<String> {
        let mut tagged = versions.iter().filter(|v| v.tags.storage_version);

        match (tagged.next(), tagged.next()) {
            (Some(first), Some(second)) => Err(SchemaError::ConflictingStorageVersion {
                kind: kind.to_string(),
                group: group.to_string(),
                first: first.version.clone(),
                second: second.version.clone(),
            }),
            (Some(only), None) => Ok(only.version.clone()),
            // highest priority version
            (None, _) => Ok(versions[0].version.clone()),
        }
    }

    fn build_version(&self, resource: &ResourceVersion<'_, 'i>, storage: bool) -> SchemaResult<CrdVersion> {
        let builder = SchemaBuilder::new(self.index, self.options, self.include_experimental);
        let message = resource.message;

        let mut spec = builder
            .message_schema(message)?
            .with_description(builder.description(message, &message.path));
        if resource.tags.preserve_unknown_fields {
            spec.preserve_unknown_fields = Some(true);
        }

        let mut root = Schema::object();
        root.properties.insert("spec".to_string(), spec);
        root.properties
            .insert("status".to_string(), Schema::free_form_object());

        Ok(CrdVersion {
            additional_printer_columns: resource.tags.printer_columns.clone(),
            name: resource.version.clone(),
            schema: CrdValidation {
                open_api_v3_schema: root,
            },
            served: true,
            storage,
            subresources: resource
                .tags
                .status_subresource
                .then(Subresources::default),
        })
    }
}

impl SchemaGenerator for CrdGenerator<'_> {
    fn generate_single_file_output(
        &self,
        members: &[&FileDescriptorProto],
        output_name: &str,
        include_experimental: bool,
    ) -> Result<File, BoxError> {
        let generator = Self {
            include_experimental,
            ..*self
        };
        let content = generator.render(members)?;

        Ok(File {
            name: Some(output_name.to_string()),
            content: Some(content),
            ..Default::default()
        })
    }
}

fn first_set<'t>(
    versions: &'t [ResourceVersion<'_, '_>],
    get: impl Fn(&'t ResourceTags) -> Option<&'t str>,
) -> Option<&'t str> {
    versions.iter().find_map(|v| get(&v.tags))
}

fn extend_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
