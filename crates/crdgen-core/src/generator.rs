//! Schema generator seam
//!
//! The core never looks inside generated documents. It hands each channel's
//! membership to a [`SchemaGenerator`] built by a [`GeneratorFactory`] and
//! gets back one named output file.

use prost_types::compiler::code_generator_response::File;
use prost_types::FileDescriptorProto;

use crate::error::BoxError;
use crate::index::DescriptorIndex;
use crate::options::Options;

/// Produces one output document from a set of proto files
pub trait SchemaGenerator: Send + Sync {
    /// Render every resource declared in `members` into a file named `output_name`.
    fn generate_single_file_output(
        &self,
        members: &[&FileDescriptorProto],
        output_name: &str,
        include_experimental: bool,
    ) -> Result<File, BoxError>;
}

/// Builds a generator configured for one channel
pub trait GeneratorFactory: Sync {
    /// `index` covers every file of the request so cross-file references resolve.
    fn construct<'i>(
        &self,
        index: &'i DescriptorIndex<'i>,
        options: Options,
        include_experimental: bool,
    ) -> Box<dyn SchemaGenerator + 'i>;
}
