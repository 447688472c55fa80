use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manifest::{ExtensionDescriptor, ExtensionFlags, PluginManifest};
use crate::plugin_system::properties::PropertyValue;

const MANIFEST: &str = r#"{
    "name": "console-demo",
    "version": "0.1.0",
    "buildHash": "abc123",
    "dependencies": { "core": "^1.0.0" },
    "extensions": [
        {
            "type": "console.page/route",
            "properties": { "path": "/demo", "component": { "$codeRef": "pages.DemoPage" } },
            "flags": { "required": ["DEMO"] }
        },
        { "type": "console.flag" }
    ]
}"#;

#[test]
fn test_parse_manifest() {
    let manifest = PluginManifest::from_json_str(MANIFEST).expect("valid manifest");
    assert_eq!(manifest.name, "console-demo");
    assert_eq!(manifest.version, "0.1.0");
    assert_eq!(manifest.build_hash.as_deref(), Some("abc123"));
    assert_eq!(manifest.dependencies.get("core").map(String::as_str), Some("^1.0.0"));
    assert_eq!(manifest.extensions.len(), 2);

    let route = &manifest.extensions[0];
    assert_eq!(route.extension_type, "console.page/route");
    assert!(route.properties["component"].is_encoded_code_ref());
    assert_eq!(route.properties["path"].as_str(), Some("/demo"));
    let keys: Vec<&str> = route.properties.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["path", "component"]);
    let flags = route.flags.as_ref().expect("flags present");
    assert!(flags.required.contains("DEMO"));
    assert!(flags.disallowed.is_empty());

    let bare = &manifest.extensions[1];
    assert!(bare.properties.is_empty());
    assert!(bare.flags.is_none());
}

#[test]
fn test_metadata_snapshot() {
    let manifest = PluginManifest::new("p", "2.0.0").with_dependency("q", ">=1");
    let metadata = manifest.metadata();
    assert_eq!(metadata.name, "p");
    assert_eq!(metadata.version, "2.0.0");
    assert_eq!(metadata.dependencies.len(), 1);
}

#[test]
fn test_invalid_json_is_manifest_error() {
    match PluginManifest::from_json_str("{ not json") {
        Err(PluginSystemError::ManifestError { message, source }) => {
            assert!(message.starts_with("invalid manifest JSON"));
            assert!(source.is_some());
        }
        other => panic!("expected manifest error, got {other:?}"),
    }
}

#[test]
fn test_validation_rejects_empty_fields() {
    let err = PluginManifest::from_json_str(r#"{ "name": " ", "version": "1" }"#).unwrap_err();
    assert!(err.to_string().contains("plugin name must not be empty"));

    let empty_type = PluginManifest::new("p", "1").with_extension(ExtensionDescriptor::new(""));
    let err = empty_type.validate().unwrap_err();
    assert!(err.to_string().contains("extension 0 of plugin p has an empty type"));
}

#[test]
fn test_descriptor_builders() {
    let descriptor = ExtensionDescriptor::new("t")
        .properties_json(serde_json::json!({ "n": 1, "f": { "$codeRef": "m" } }))
        .flags(ExtensionFlags::default().required(["A"]).disallowed(["B"]));
    assert!(matches!(descriptor.properties["n"], PropertyValue::Number(_)));
    assert!(descriptor.properties["f"].is_encoded_code_ref());
    let flags = descriptor.flags.expect("flags set");
    assert!(flags.required.contains("A"));
    assert!(flags.disallowed.contains("B"));
}
