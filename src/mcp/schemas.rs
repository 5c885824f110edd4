//! JSON schema builders for MCP tools.

use super::{LANGUAGES, MODES};
use serde_json::{Map, Value};

/// Build the schema describing the `upload` tool input.
pub(crate) fn upload_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "path".into(),
        string_schema("Local path of a .pdf or .txt file; replaces the loaded document"),
    );
    finalize_object_schema(properties, &["path"])
}

/// Build the schema describing the `ask` tool input.
pub(crate) fn ask_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "question".into(),
        string_schema("Question answered strictly from the loaded document"),
    );
    properties.insert(
        "mode".into(),
        enum_schema("Answer shape; unknown values fall back to 'qa'", &MODES, "qa"),
    );
    properties.insert(
        "language".into(),
        enum_schema(
            "Answer language; unknown values fall back to 'english'",
            &LANGUAGES,
            "english",
        ),
    );
    finalize_object_schema(properties, &["question"])
}

/// Build the schema describing the `recall` tool input.
pub(crate) fn recall_input_schema(default_top_k: usize) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "query".into(),
        string_schema("Text to embed and match against the loaded document"),
    );

    let mut top_k_schema = Map::new();
    top_k_schema.insert("type".into(), Value::String("integer".into()));
    top_k_schema.insert(
        "description".into(),
        Value::String("Number of nearest chunks to return".into()),
    );
    top_k_schema.insert("minimum".into(), Value::Number(1.into()));
    top_k_schema.insert(
        "default".into(),
        Value::Number(serde_json::Number::from(default_top_k as u64)),
    );
    properties.insert("top_k".into(), Value::Object(top_k_schema));

    finalize_object_schema(properties, &["query"])
}

/// Schema for tools that take no arguments.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn enum_schema(description: &str, variants: &[&str], default: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    schema.insert(
        "enum".into(),
        Value::Array(
            variants
                .iter()
                .map(|&variant| Value::String(variant.into()))
                .collect(),
        ),
    );
    schema.insert("default".into(), Value::String(default.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
