//! Request orchestration
//!
//! One call to [`generate`] serves one plugin request:
//!
//! 1. decode the parameter string into [`Options`]
//! 2. index every proto file protoc supplied
//! 3. classify each requested file into the channel registry
//! 4. run one generator pass per non-empty channel
//! 5. assemble the outputs in channel order
//!
//! Any error aborts the whole request. Channels without members produce no
//! output file.

use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::channel::{Channel, ChannelRegistry};
use crate::error::{Error, Result};
use crate::generator::GeneratorFactory;
use crate::index::DescriptorIndex;
use crate::options::Options;

/// Serve one plugin request.
pub fn generate<F>(request: &CodeGeneratorRequest, factory: &F) -> Result<CodeGeneratorResponse>
where
    F: GeneratorFactory + ?Sized,
{
    let options = Options::from_parameter(request.parameter())?;
    let index = DescriptorIndex::new(&request.proto_file);
    let registry = classify(&index, &request.file_to_generate)?;

    let files = generate_channels(&registry, &index, options, factory)?;
    info!(
        requested = request.file_to_generate.len(),
        outputs = files.len(),
        "generation complete"
    );

    Ok(assemble(files))
}

/// Resolve every requested file and sort it into channels.
pub fn classify<'a>(
    index: &DescriptorIndex<'a>,
    files_to_generate: &[String],
) -> Result<ChannelRegistry<'a>> {
    let mut registry = ChannelRegistry::new();

    for name in files_to_generate {
        let file = index.file(name)?;
        registry.classify(file);
    }

    Ok(registry)
}

/// Generate every non-empty channel, in channel order.
#[cfg(not(feature = "parallel"))]
pub fn generate_channels<F>(
    registry: &ChannelRegistry<'_>,
    index: &DescriptorIndex<'_>,
    options: Options,
    factory: &F,
) -> Result<Vec<File>>
where
    F: GeneratorFactory + ?Sized,
{
    registry
        .non_empty()
        .map(|channel| generate_channel(channel, index, options, factory))
        .collect()
}

/// Generate every non-empty channel concurrently, merged in channel order.
#[cfg(feature = "parallel")]
pub fn generate_channels<F>(
    registry: &ChannelRegistry<'_>,
    index: &DescriptorIndex<'_>,
    options: Options,
    factory: &F,
) -> Result<Vec<File>>
where
    F: GeneratorFactory + ?Sized,
{
    let channels: Vec<_> = registry.non_empty().collect();
    channels
        .par_iter()
        .map(|channel| generate_channel(channel, index, options, factory))
        .collect()
}

fn generate_channel<F>(
    channel: &Channel<'_>,
    index: &DescriptorIndex<'_>,
    options: Options,
    factory: &F,
) -> Result<File>
where
    F: GeneratorFactory + ?Sized,
{
    info!(
        channel = %channel.kind(),
        output = channel.output_name(),
        files = channel.len(),
        include_experimental = channel.include_experimental(),
        "generating channel"
    );

    let generator = factory.construct(index, options, channel.include_experimental());
    let mut file = generator
        .generate_single_file_output(
            channel.members(),
            channel.output_name(),
            channel.include_experimental(),
        )
        .map_err(|source| Error::Generation {
            channel: channel.output_name().to_string(),
            source,
        })?;

    if file.name.is_none() {
        file.name = Some(channel.output_name().to_string());
    }
    Ok(file)
}

/// Wrap generated files into the plugin response.
pub fn assemble(files: Vec<File>) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        file: files,
        ..Default::default()
    }
}
