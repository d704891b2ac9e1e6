use std::path::PathBuf;

use cypher_compiler_configuration::{
    generate_schema, make_runtime_configuration, parse_configuration, write_parsed_configuration,
    ParsedConfiguration, CONFIGURATION_FILENAME, CONFIGURATION_JSONSCHEMA_FILENAME,
};
use cypher_compiler_configuration::error::ParseConfigurationError;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/movies")
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("cypher-compiler-configuration-{name}-{}", std::process::id()))
}

#[test]
fn fixture_conforms_to_the_generated_schema() {
    let schema = serde_json::to_value(generate_schema()).expect("schema serializes");
    let compiled = jsonschema::JSONSchema::compile(&schema).expect("schema compiles");
    let contents = std::fs::read_to_string(fixture_dir().join(CONFIGURATION_FILENAME))
        .expect("fixture exists");
    let instance: serde_json::Value = serde_json::from_str(&contents).expect("fixture is json");
    assert!(compiled.is_valid(&instance));
    assert!(!compiled.is_valid(&serde_json::json!({ "metadata": {} })));
}

#[tokio::test]
async fn fixture_parses_and_validates() {
    let parsed = parse_configuration(fixture_dir()).await.expect("parses");
    assert_eq!(parsed.settings.default_limit, Some(50));

    let configuration = make_runtime_configuration(parsed).expect("valid schema model");
    let movie = &configuration.metadata.entities.0[&query_engine_models::TypeName::from("Movie")];
    assert_eq!(movie.limit.and_then(|limit| limit.default), Some(50));
    let user = &configuration.metadata.entities.0[&query_engine_models::TypeName::from("User")];
    assert_eq!(user.limit.and_then(|limit| limit.default), Some(20));
}

#[tokio::test]
async fn written_configuration_reads_back() {
    let dir = scratch_dir("write");
    let parsed = parse_configuration(fixture_dir()).await.expect("parses");
    write_parsed_configuration(&parsed, &dir).await.expect("writes");
    assert!(dir.join(CONFIGURATION_JSONSCHEMA_FILENAME).exists());

    let reread = parse_configuration(&dir).await.expect("parses again");
    assert_eq!(reread, parsed);
    std::fs::remove_dir_all(&dir).expect("cleanup");
}

#[tokio::test]
async fn unsupported_versions_are_rejected() {
    let dir = scratch_dir("version");
    let mut parsed = ParsedConfiguration::empty();
    parsed.version = 2;
    write_parsed_configuration(&parsed, &dir).await.expect("writes");

    let result = parse_configuration(&dir).await;
    assert!(matches!(result, Err(ParseConfigurationError::UnsupportedVersion(2))));
    std::fs::remove_dir_all(&dir).expect("cleanup");
}

#[tokio::test]
async fn syntax_errors_carry_a_position() {
    let dir = scratch_dir("syntax");
    std::fs::create_dir_all(&dir).expect("scratch dir");
    std::fs::write(dir.join(CONFIGURATION_FILENAME), "{\n  \"version\": 1,\n}\n").expect("writes");

    match parse_configuration(&dir).await {
        Err(ParseConfigurationError::ParseError { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected a parse error, got {other:?}"),
    }
    std::fs::remove_dir_all(&dir).expect("cleanup");
}
