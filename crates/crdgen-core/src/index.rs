//! Descriptor index
//!
//! Wraps every `FileDescriptorProto` protoc supplied so requested files,
//! cross-referenced messages and enums, and source comments can be looked up
//! without rescanning the request.

use std::collections::HashMap;

use prost_types::source_code_info::Location;
use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

use crate::error::{Error, Result};

// Field numbers used in SourceCodeInfo paths
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;

/// A message and where it was declared
#[derive(Debug, Clone)]
pub struct MessageRef<'a> {
    pub file: &'a FileDescriptorProto,
    pub descriptor: &'a DescriptorProto,
    /// Fully-qualified name with a leading dot, e.g. `.pkg.v1.Outer.Inner`
    pub full_name: String,
    /// SourceCodeInfo path of the message within its file
    pub path: Vec<i32>,
}

/// An enum and where it was declared
#[derive(Debug, Clone)]
pub struct EnumRef<'a> {
    pub file: &'a FileDescriptorProto,
    pub descriptor: &'a EnumDescriptorProto,
    pub full_name: String,
    pub path: Vec<i32>,
}

/// Lookup structure over the full descriptor set of a request
#[derive(Debug, Default)]
pub struct DescriptorIndex<'a> {
    files: HashMap<&'a str, &'a FileDescriptorProto>,
    messages: Vec<MessageRef<'a>>,
    message_names: HashMap<String, usize>,
    enums: HashMap<String, EnumRef<'a>>,
    locations: HashMap<&'a str, HashMap<&'a [i32], &'a Location>>,
}

impl<'a> DescriptorIndex<'a> {
    pub fn new(files: &'a [FileDescriptorProto]) -> Self {
        let mut index = Self::default();

        for file in files {
            index.files.insert(file.name(), file);

            if let Some(info) = &file.source_code_info {
                let by_path = info
                    .location
                    .iter()
                    .map(|loc| (loc.path.as_slice(), loc))
                    .collect();
                index.locations.insert(file.name(), by_path);
            }

            let scope = match file.package() {
                "" => String::new(),
                package => format!(".{}", package),
            };

            for (i, message) in file.message_type.iter().enumerate() {
                index.add_message(file, message, &scope, vec![FILE_MESSAGE_TYPE, i as i32]);
            }
            for (i, enumeration) in file.enum_type.iter().enumerate() {
                index.add_enum(file, enumeration, &scope, vec![FILE_ENUM_TYPE, i as i32]);
            }
        }

        index
    }

    fn add_message(
        &mut self,
        file: &'a FileDescriptorProto,
        message: &'a DescriptorProto,
        scope: &str,
        path: Vec<i32>,
    ) {
        let full_name = format!("{}.{}", scope, message.name());

        for (i, nested) in message.nested_type.iter().enumerate() {
            let mut nested_path = path.clone();
            nested_path.extend([MESSAGE_NESTED_TYPE, i as i32]);
            self.add_message(file, nested, &full_name, nested_path);
        }
        for (i, enumeration) in message.enum_type.iter().enumerate() {
            let mut enum_path = path.clone();
            enum_path.extend([MESSAGE_ENUM_TYPE, i as i32]);
            self.add_enum(file, enumeration, &full_name, enum_path);
        }

        self.message_names.insert(full_name.clone(), self.messages.len());
        self.messages.push(MessageRef {
            file,
            descriptor: message,
            full_name,
            path,
        });
    }

    fn add_enum(
        &mut self,
        file: &'a FileDescriptorProto,
        enumeration: &'a EnumDescriptorProto,
        scope: &str,
        path: Vec<i32>,
    ) {
        let full_name = format!("{}.{}", scope, enumeration.name());
        self.enums.insert(
            full_name.clone(),
            EnumRef {
                file,
                descriptor: enumeration,
                full_name,
                path,
            },
        );
    }

    /// Resolve a file by the name protoc used in `file_to_generate`.
    pub fn file(&self, name: &str) -> Result<&'a FileDescriptorProto> {
        self.files
            .get(name)
            .copied()
            .ok_or_else(|| Error::FileNotFound(name.to_string()))
    }

    /// Look up a message by fully-qualified name (`.pkg.Message`).
    pub fn message(&self, full_name: &str) -> Option<&MessageRef<'a>> {
        self.message_names
            .get(full_name)
            .map(|&idx| &self.messages[idx])
    }

    /// Look up an enum by fully-qualified name (`.pkg.Enum`).
    pub fn enumeration(&self, full_name: &str) -> Option<&EnumRef<'a>> {
        self.enums.get(full_name)
    }

    /// Every message declared in `file`, nested ones included.
    pub fn messages_in(&self, file: &FileDescriptorProto) -> Vec<&MessageRef<'a>> {
        self.messages
            .iter()
            .filter(|m| m.file.name() == file.name())
            .collect()
    }

    /// Source location recorded for `path` in `file`, if protoc kept it.
    pub fn comments(&self, file: &FileDescriptorProto, path: &[i32]) -> Option<&'a Location> {
        self.locations
            .get(file.name())
            .and_then(|by_path| by_path.get(path))
            .copied()
    }

    /// Leading comment attached to `path` in `file`.
    pub fn leading_comments(&self, file: &FileDescriptorProto, path: &[i32]) -> Option<&'a str> {
        self.comments(file, path)
            .and_then(|loc| loc.leading_comments.as_deref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::SourceCodeInfo;

    fn file_with_nested() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("pkg/v1/a.proto".into()),
            package: Some("pkg.v1".into()),
            message_type: vec![DescriptorProto {
                name: Some("Outer".into()),
                nested_type: vec![DescriptorProto {
                    name: Some("Inner".into()),
                    ..Default::default()
                }],
                enum_type: vec![EnumDescriptorProto {
                    name: Some("Mode".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            source_code_info: Some(SourceCodeInfo {
                location: vec![Location {
                    path: vec![4, 0, 3, 0],
                    leading_comments: Some(" Inner docs\n".into()),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_lookup() {
        let files = vec![file_with_nested()];
        let index = DescriptorIndex::new(&files);

        assert_eq!(index.len(), 1);
        assert_eq!(index.file("pkg/v1/a.proto").unwrap().package(), "pkg.v1");

        let err = index.file("missing.proto").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(ref name) if name == "missing.proto"));
        assert_eq!(err.to_string(), "unable to find missing.proto");
    }

    #[test]
    fn test_nested_types_are_indexed() {
        let files = vec![file_with_nested()];
        let index = DescriptorIndex::new(&files);

        let inner = index.message(".pkg.v1.Outer.Inner").unwrap();
        assert_eq!(inner.path, vec![4, 0, 3, 0]);
        assert!(index.message(".pkg.v1.Outer").is_some());
        assert!(index.message(".pkg.v1.Inner").is_none());

        let mode = index.enumeration(".pkg.v1.Outer.Mode").unwrap();
        assert_eq!(mode.path, vec![4, 0, 4, 0]);

        assert_eq!(index.messages_in(&files[0]).len(), 2);
    }

    #[test]
    fn test_leading_comments() {
        let files = vec![file_with_nested()];
        let index = DescriptorIndex::new(&files);

        assert_eq!(
            index.leading_comments(&files[0], &[4, 0, 3, 0]),
            Some(" Inner docs\n")
        );
        assert_eq!(index.leading_comments(&files[0], &[4, 0]), None);
    }

    #[test]
    fn test_package_less_file() {
        let files = vec![FileDescriptorProto {
            name: Some("bare.proto".into()),
            message_type: vec![DescriptorProto {
                name: Some("Bare".into()),
                ..Default::default()
            }],
            ..Default::default()
        }];
        let index = DescriptorIndex::new(&files);
        assert!(index.message(".Bare").is_some());
    }
}
