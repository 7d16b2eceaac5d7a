//! protoc-gen-crd
//!
//! Reads an encoded `CodeGeneratorRequest`, renders one CRD file per release
//! channel and returns the encoded `CodeGeneratorResponse`. Generation
//! failures are reported to protoc through `CodeGeneratorResponse.error`;
//! only transport failures surface as [`RunnerError`].

use crdgen_core::generate;
use crdgen_openapi::OpenApiGeneratorFactory;
use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use thiserror::Error;
use tracing::{error, info};

/// Failures that prevent any response from reaching protoc
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode CodeGeneratorRequest: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("failed to encode CodeGeneratorResponse: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// Run the plugin over an encoded request.
pub fn run(request: &[u8]) -> Result<Vec<u8>, RunnerError> {
    let request = CodeGeneratorRequest::decode(request)?;
    info!(
        files = request.file_to_generate.len(),
        parameter = request.parameter(),
        "received generation request"
    );

    let response = respond(&request);

    let mut out = Vec::with_capacity(response.encoded_len());
    response.encode(&mut out)?;
    Ok(out)
}

/// Build the response for a decoded request, folding failures into `error`.
pub fn respond(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    match generate(request, &OpenApiGeneratorFactory) {
        Ok(response) => response,
        Err(e) => {
            error!(config = e.is_config(), "generation failed: {}", e);
            CodeGeneratorResponse {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}
