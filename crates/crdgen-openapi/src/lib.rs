//! Kubernetes CRD generator
//!
//! Translates tagged proto messages into `apiextensions.k8s.io/v1`
//! CustomResourceDefinitions with structural OpenAPI v3 schemas. Plugs into
//! `crdgen-core` through [`OpenApiGeneratorFactory`].
//!
//! See [`tags`] for the comment tags that declare a resource.

pub mod crd;
pub mod error;
pub mod generator;
pub mod schema;
pub mod tags;
pub mod translate;

use crdgen_core::{DescriptorIndex, GeneratorFactory, Options, SchemaGenerator};

pub use crd::CustomResourceDefinition;
pub use error::{SchemaError, SchemaResult};
pub use generator::{CrdGenerator, HEADER};
pub use schema::Schema;

/// Factory handing out [`CrdGenerator`]s, one per channel
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenApiGeneratorFactory;

impl GeneratorFactory for OpenApiGeneratorFactory {
    fn construct<'i>(
        &self,
        index: &'i DescriptorIndex<'i>,
        options: Options,
        include_experimental: bool,
    ) -> Box<dyn SchemaGenerator + 'i> {
        Box::new(CrdGenerator::new(index, options, include_experimental))
    }
}
