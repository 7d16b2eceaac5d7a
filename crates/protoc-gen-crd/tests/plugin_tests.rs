//! Round trips through the encoded plugin protocol

use pretty_assertions::assert_eq;
use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, SourceCodeInfo};
use protoc_gen_crd::{run, RunnerError};

fn sidecar_file(version: &str) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(format!("mesh/{}/sidecar.proto", version)),
        package: Some(format!("mesh.example.io.{}", version)),
        message_type: vec![DescriptorProto {
            name: Some("Sidecar".into()),
            field: vec![FieldDescriptorProto {
                name: Some("egress_hosts".into()),
                number: Some(1),
                label: Some(Label::Repeated as i32),
                r#type: Some(Type::String as i32),
                ..Default::default()
            }],
            ..Default::default()
        }],
        source_code_info: Some(SourceCodeInfo {
            location: vec![Location {
                path: vec![4, 0],
                leading_comments: Some(format!(
                    " Sidecar scopes proxy configuration.\n +cue-gen:Sidecar:groupName:mesh.example.io\n +cue-gen:Sidecar:version:{}\n",
                    version
                )),
                ..Default::default()
            }],
        }),
        syntax: Some("proto3".into()),
        ..Default::default()
    }
}

fn request(parameter: Option<&str>) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: vec![
            "mesh/v1beta1/sidecar.proto".into(),
            "mesh/v1/sidecar.proto".into(),
        ],
        parameter: parameter.map(String::from),
        proto_file: vec![sidecar_file("v1beta1"), sidecar_file("v1")],
        ..Default::default()
    }
}

fn round_trip(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let output = run(&request.encode_to_vec()).unwrap();
    CodeGeneratorResponse::decode(output.as_slice()).unwrap()
}

#[test]
fn test_emits_one_file_per_channel() {
    let response = round_trip(&request(None));

    assert_eq!(response.error, None);
    assert_eq!(response.supported_features, Some(1));

    let names: Vec<_> = response.file.iter().map(|f| f.name()).collect();
    assert_eq!(
        names,
        vec![
            "kubernetes/experimental.gen.yaml",
            "kubernetes/legacy.gen.yaml",
            "kubernetes/standard.gen.yaml",
        ]
    );
    for file in &response.file {
        assert!(file
            .content()
            .starts_with("# Code generated by protoc-gen-crd. DO NOT EDIT.\n---\n"));
    }
}

#[test]
fn test_channel_contents_are_valid_yaml() {
    let response = round_trip(&request(Some("include_description=false")));
    let legacy = response.file[1].content();

    let document = legacy.split("---\n").nth(1).unwrap();
    let crd: serde_yaml::Value = serde_yaml::from_str(document).unwrap();
    assert_eq!(
        crd["metadata"]["name"].as_str(),
        Some("sidecars.mesh.example.io")
    );
    let versions: Vec<_> = crd["spec"]["versions"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(versions, vec!["v1", "v1beta1"]);
    assert!(!legacy.contains("description:"));
}

#[test]
fn test_bad_parameter_is_reported_in_response() {
    let response = round_trip(&request(Some("include_description=maybe")));

    assert_eq!(
        response.error.as_deref(),
        Some("unknown value 'maybe' for include_description")
    );
    assert!(response.file.is_empty());
}

#[test]
fn test_missing_file_is_reported_in_response() {
    let mut req = request(None);
    req.file_to_generate.push("mesh/v2/absent.proto".into());

    let response = round_trip(&req);

    assert_eq!(
        response.error.as_deref(),
        Some("unable to find mesh/v2/absent.proto")
    );
    assert!(response.file.is_empty());
}

#[test]
fn test_empty_request_yields_empty_response() {
    let response = round_trip(&CodeGeneratorRequest::default());

    assert_eq!(response.error, None);
    assert!(response.file.is_empty());
}

#[test]
fn test_garbage_input_is_a_decode_error() {
    let err = run(&[0xff, 0xff, 0xff]).unwrap_err();
    assert!(matches!(err, RunnerError::Decode(_)));
}
