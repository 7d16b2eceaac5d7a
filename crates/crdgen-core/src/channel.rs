//! Release channels
//!
//! Every requested proto file is classified by the version suffix of its
//! package and admitted into one or more output channels:
//!
//! | Package suffix         | standard | experimental | legacy |
//! |------------------------|----------|--------------|--------|
//! | `v1`, `v2`             | yes      |              | yes    |
//! | `v1alpha1`, `v2beta3`  |          | yes          | yes    |
//! | anything else          |          |              | yes    |
//!
//! The legacy channel is the union of every requested file and keeps the
//! pre-channel output format alive.
//!
//! # Example
//!
//! ```rust
//! use crdgen_core::channel::ChannelKind;
//!
//! assert!(ChannelKind::Standard.admits("networking.example.io.v1"));
//! assert!(ChannelKind::Experimental.admits("networking.example.io.v1alpha3"));
//! assert!(ChannelKind::Legacy.admits("anything"));
//! ```

use std::collections::HashSet;

use lazy_static::lazy_static;
use prost_types::FileDescriptorProto;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref STANDARD_VERSION: Regex =
        Regex::new(r"v[0-9]+$").expect("standard version pattern");
    static ref EXPERIMENTAL_VERSION: Regex =
        Regex::new(r"v[0-9]+(?:alpha|beta)[0-9]+$").expect("experimental version pattern");
}

/// Admission policy of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Stable packages only (`v1`)
    Standard,
    /// Pre-release packages only (`v1alpha1`, `v1beta1`)
    Experimental,
    /// Every requested file
    Legacy,
}

impl ChannelKind {
    /// Whether a file in `package` belongs to this channel
    pub fn admits(&self, package: &str) -> bool {
        match self {
            Self::Standard => STANDARD_VERSION.is_match(package),
            Self::Experimental => EXPERIMENTAL_VERSION.is_match(package),
            Self::Legacy => true,
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Experimental => write!(f, "experimental"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// Static description of one output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub kind: ChannelKind,
    /// Name of the generated file in the plugin response
    pub output_name: &'static str,
    /// Whether experimental-only schema constructs are rendered
    pub include_experimental: bool,
}

/// The fixed channel table, sorted by output name.
///
/// Adding a channel is a matter of adding a row here.
pub const CHANNELS: [ChannelSpec; 3] = [
    ChannelSpec {
        kind: ChannelKind::Experimental,
        output_name: "kubernetes/experimental.gen.yaml",
        include_experimental: true,
    },
    ChannelSpec {
        kind: ChannelKind::Legacy,
        output_name: "kubernetes/legacy.gen.yaml",
        include_experimental: true,
    },
    ChannelSpec {
        kind: ChannelKind::Standard,
        output_name: "kubernetes/standard.gen.yaml",
        include_experimental: false,
    },
];

/// A channel and the files admitted to it so far
#[derive(Debug, Clone)]
pub struct Channel<'a> {
    spec: ChannelSpec,
    members: Vec<&'a FileDescriptorProto>,
    seen: HashSet<&'a str>,
}

impl<'a> Channel<'a> {
    pub fn new(spec: ChannelSpec) -> Self {
        Self {
            spec,
            members: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn spec(&self) -> &ChannelSpec {
        &self.spec
    }

    pub fn kind(&self) -> ChannelKind {
        self.spec.kind
    }

    pub fn output_name(&self) -> &'static str {
        self.spec.output_name
    }

    pub fn include_experimental(&self) -> bool {
        self.spec.include_experimental
    }

    /// Admit `file` regardless of policy. Returns false if it was already a member.
    pub fn admit(&mut self, file: &'a FileDescriptorProto) -> bool {
        if !self.seen.insert(file.name()) {
            return false;
        }
        self.members.push(file);
        true
    }

    /// Admitted files in admission order
    pub fn members(&self) -> &[&'a FileDescriptorProto] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// All channels of one generation request
#[derive(Debug, Clone)]
pub struct ChannelRegistry<'a> {
    channels: Vec<Channel<'a>>,
}

impl<'a> ChannelRegistry<'a> {
    /// Registry over [`CHANNELS`], kept sorted by output name.
    pub fn new() -> Self {
        let mut channels: Vec<_> = CHANNELS.iter().copied().map(Channel::new).collect();
        channels.sort_by(|a, b| a.output_name().cmp(b.output_name()));
        Self { channels }
    }

    /// Test `file` against every channel policy and admit it where it matches.
    ///
    /// Returns the kinds of the channels that now contain the file.
    pub fn classify(&mut self, file: &'a FileDescriptorProto) -> Vec<ChannelKind> {
        let package = file.package();
        let mut admitted = Vec::new();

        for channel in &mut self.channels {
            if channel.kind().admits(package) {
                channel.admit(file);
                admitted.push(channel.kind());
            }
        }

        debug!(
            file = file.name(),
            package = package,
            channels = ?admitted,
            "classified file"
        );
        admitted
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&Channel<'a>> {
        self.channels.iter().find(|c| c.kind() == kind)
    }

    /// Channels in deterministic output-name order
    pub fn channels(&self) -> &[Channel<'a>] {
        &self.channels
    }

    /// Channels with at least one member, in output-name order
    pub fn non_empty(&self) -> impl Iterator<Item = &Channel<'a>> {
        self.channels.iter().filter(|c| !c.is_empty())
    }
}

impl Default for ChannelRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}
