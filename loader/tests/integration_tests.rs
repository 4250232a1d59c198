use std::path::{Path, PathBuf};

use schema_drift_core::{DiffEngine, IssueKind, Kind, SchemaTree, Severity};
use schema_drift_loader::{
    DriftConfig, InputFormat, LoaderError, digest, from_value, load, load_library, load_spec,
};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

fn library_doc() -> Value {
    json!({
        "metadata": {"version": "4.2.0", "generator": "schema-build"},
        "common": {
            "Status": {"type": "string", "enum": ["active", "paused"]},
            "User": {
                "type": "object",
                "properties": {"id": {"type": "string"}, "email": {"type": ["string", "null"]}},
                "required": ["id"]
            }
        },
        "updates": {
            "Session": {
                "type": "object",
                "properties": {
                    "sid": {"type": "string"},
                    "status": {"$ref": "common.Status"},
                    "owner": {"$ref": "common.User"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["sid", "status"],
                "additionalProperties": false
            }
        }
    })
}

fn openapi_doc() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {"title": "session-service", "version": "4.2.1"},
        "paths": {},
        "components": {"schemas": {
            "Status": {"type": "string", "enum": ["active", "paused", "archived"]},
            "User": {
                "type": "object",
                "properties": {"id": {"type": "string"}, "email": {"type": "string", "nullable": true}},
                "required": ["id"]
            },
            "Session": {
                "type": "object",
                "properties": {
                    "sid": {"type": "string"},
                    "status": {"$ref": "#/components/schemas/Status"},
                    "owner": {"allOf": [{"$ref": "#/components/schemas/User"}]},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["sid", "status"],
                "additionalProperties": false
            }
        }}
    })
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

#[test]
fn test_load_library_and_spec_from_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let library_path = write_json(dir.path(), "library.json", &library_doc());
    let spec_path = write_json(dir.path(), "openapi.json", &openapi_doc());

    let library = load_library(&library_path).unwrap();
    let spec = load_spec(&spec_path).unwrap();

    assert_eq!(library.version.as_deref(), Some("4.2.0"));
    assert_eq!(spec.version.as_deref(), Some("4.2.1"));
    assert_eq!(library.names(), vec!["Status", "User", "Session"]);
    assert_eq!(spec.names(), vec!["Status", "User", "Session"]);

    let bytes = std::fs::read(&library_path).unwrap();
    assert_eq!(library.digest.as_deref(), Some(digest(&bytes).as_str()));
    assert_eq!(library.digest.as_ref().unwrap().len(), 64);
}

#[test]
fn test_loaded_sources_compare_cleanly_except_superset_enum() {
    let dir = tempfile::TempDir::new().unwrap();
    let library = load_library(write_json(dir.path(), "library.json", &library_doc())).unwrap();
    let spec = load_spec(write_json(dir.path(), "openapi.json", &openapi_doc())).unwrap();

    let issues = DiffEngine::new(&library, &spec).compare_all();
    assert_eq!(issues.len(), 1, "unexpected issues: {issues:#?}");
    assert_eq!(issues[0].kind, IssueKind::EnumDiff);
    assert_eq!(issues[0].severity, Severity::Info);
    assert_eq!(issues[0].path, "common.Status");
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load("/nonexistent/library.json", InputFormat::Library).unwrap_err();
    match err {
        LoaderError::Io { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/library.json")),
        other => panic!("expected I/O error, got {other:?}"),
    }
}

#[test]
fn test_malformed_json_names_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"openapi\": ").unwrap();

    let err = load_spec(&path).unwrap_err();
    assert!(matches!(err, LoaderError::Json { .. }));
    assert!(err.to_string().contains("broken.json"));
}

// ---------------------------------------------------------------------------
// Normalization through documents
// ---------------------------------------------------------------------------

#[test]
fn test_pre_normalized_trees_pass_through() {
    let session = SchemaTree::object()
        .with_property("id", SchemaTree::string())
        .with_property("count", SchemaTree::number().allow_null());
    let doc = json!({
        "metadata": {"version": "1"},
        "updates": {"Session": serde_json::to_value(&session).unwrap()}
    });

    let set = from_value(&doc, InputFormat::Library, "export.json").unwrap();
    assert_eq!(set.get("Session"), Some(&session));
}

#[test]
fn test_invariant_violation_reports_json_path() {
    let doc = json!({
        "openapi": "3.0.0",
        "info": {"version": "1"},
        "components": {"schemas": {
            "Broken": {"type": "object", "properties": {
                "field": {"items": {"type": "string"}, "properties": {}}
            }}
        }}
    });

    let err = from_value(&doc, InputFormat::Spec, "openapi.json").unwrap_err();
    assert_eq!(
        err.to_string(),
        "schema at #/components/schemas/Broken/properties/field mixes mutually exclusive fields: properties, items"
    );
}

#[test]
fn test_nullable_spellings_are_equivalent_across_sources() {
    let dir = tempfile::TempDir::new().unwrap();
    let library = load_library(write_json(dir.path(), "library.json", &library_doc())).unwrap();
    let spec = load_spec(write_json(dir.path(), "openapi.json", &openapi_doc())).unwrap();

    let email_a = library.get("User").unwrap().property("email").unwrap();
    let email_b = spec.get("User").unwrap().property("email").unwrap();
    assert_eq!(email_a, email_b);
    assert_eq!(email_a.kind(), Kind::String);
    assert!(email_a.nullable);
}

#[test]
fn test_dotted_component_names_compare_cleanly() {
    let user = json!({"type": "object", "properties": {"id": {"type": "string"}}});
    let library = json!({
        "metadata": {"version": "1"},
        "g": {
            "v1.User": user.clone(),
            "S": {"type": "object", "properties": {"owner": {"$ref": "g.v1.User"}}}
        }
    });
    let spec = json!({
        "openapi": "3.1.0",
        "info": {"version": "1"},
        "components": {"schemas": {
            "v1.User": user,
            "S": {"type": "object", "properties": {"owner": {"$ref": "#/components/schemas/v1.User"}}}
        }}
    });

    let library = from_value(&library, InputFormat::Library, "export.json").unwrap();
    let spec = from_value(&spec, InputFormat::Spec, "openapi.json").unwrap();
    assert_eq!(
        spec.get("S").unwrap().property("owner").unwrap().reference_target(),
        Some("v1.User")
    );

    let issues = DiffEngine::new(&library, &spec).compare_all();
    assert!(issues.is_empty(), "unexpected issues: {issues:#?}");
}

#[test]
fn test_dotted_names_sharing_last_segment_stay_distinct() {
    let doc = |owner_type: &str| {
        json!({
            "openapi": "3.0.3",
            "info": {"version": "1"},
            "components": {"schemas": {
                "v1.User": {"type": "object", "properties": {"id": {"type": "string"}}},
                "v2.User": {"type": "object", "properties": {"id": {"type": owner_type}}},
                "S": {"type": "object", "properties": {"owner": {"$ref": "#/components/schemas/v2.User"}}}
            }}
        })
    };
    let a = from_value(&doc("string"), InputFormat::Spec, "a.json").unwrap();
    let b = from_value(&doc("number"), InputFormat::Spec, "b.json").unwrap();

    let issues = DiffEngine::new(&a, &b).compare_all();
    assert_eq!(issues.len(), 1, "unexpected issues: {issues:#?}");
    assert_eq!(issues[0].kind, IssueKind::TypeMismatch);
    assert_eq!(issues[0].path, "v2.User.id");
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_drives_engine_policy_and_labels() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join(".schema-drift.yml");
    std::fs::write(
        &config_path,
        "labels:\n  a: sdk\n  b: service\nseverity:\n  enum_only_in_b: error\n",
    )
    .unwrap();
    let config = DriftConfig::load(&config_path).unwrap();

    let library = load_library(write_json(dir.path(), "library.json", &library_doc())).unwrap();
    let spec = load_spec(write_json(dir.path(), "openapi.json", &openapi_doc())).unwrap();

    let issues = DiffEngine::new(&library, &spec)
        .with_policy(config.severity.clone())
        .with_labels(config.labels.clone())
        .compare_all();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Error);
    assert_eq!(
        issues[0].message,
        "enum value \"archived\" is accepted by service but not by sdk"
    );
}
