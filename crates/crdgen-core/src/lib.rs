//! crdgen core
//!
//! Channel classification and per-channel output assembly for
//! `protoc-gen-crd`. Given a decoded `CodeGeneratorRequest`, every requested
//! proto file is sorted into release channels by its package version suffix
//! and each channel is rendered by a pluggable [`SchemaGenerator`]:
//!
//! - `kubernetes/experimental.gen.yaml`: `v1alpha1` / `v1beta1` packages
//! - `kubernetes/legacy.gen.yaml`: every requested file
//! - `kubernetes/standard.gen.yaml`: `v1` packages
//!
//! # Features
//!
//! - `parallel` - Generate channels concurrently via rayon
//!
//! # Example
//!
//! ```rust,ignore
//! use crdgen_core::generate;
//!
//! let response = generate(&request, &factory)?;
//! for file in &response.file {
//!     println!("{}", file.name());
//! }
//! ```

pub mod channel;
pub mod error;
pub mod generate;
pub mod generator;
pub mod index;
pub mod options;
pub mod tracing;

// Re-export main types at crate root
pub use channel::{Channel, ChannelKind, ChannelRegistry, ChannelSpec, CHANNELS};
pub use error::{BoxError, Error, Result};
pub use generate::{assemble, classify, generate};
pub use generator::{GeneratorFactory, SchemaGenerator};
pub use index::{DescriptorIndex, EnumRef, MessageRef};
pub use options::{DescriptionConfiguration, EnumStyle, Options};
