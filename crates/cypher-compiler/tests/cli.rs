use std::path::PathBuf;

use clap::Parser;
use cypher_compiler::cli::Cli;
use serde_json::json;

fn configuration_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../configuration/tests/fixtures/movies")
}

fn request(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

async fn run(args: &[&str]) -> anyhow::Result<String> {
    let configuration = configuration_dir();
    let mut argv = vec!["cypher-compiler", "--configuration", configuration.to_str().expect("utf-8 path")];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;
    let mut out = Vec::new();
    cli.run(&mut out).await?;
    Ok(String::from_utf8(out)?)
}

#[tokio::test]
async fn prints_the_statement() {
    let request = request("movies_by_title.json");
    let output = run(&["cypher", request.to_str().expect("utf-8 path")])
        .await
        .expect("compiles");
    assert_eq!(
        output,
        [
            "MATCH (this0:Movie)",
            "WHERE this0.title = $param0",
            "WITH *",
            "ORDER BY this0.title ASC",
            "LIMIT $param1",
            "RETURN this0 { .title } AS this",
            "",
        ]
        .join("\n")
    );
}

#[tokio::test]
async fn prints_the_parameters() {
    let request = request("movies_by_title.json");
    let output = run(&["params", request.to_str().expect("utf-8 path")])
        .await
        .expect("compiles");
    let params: serde_json::Value = serde_json::from_str(&output).expect("json");
    assert_eq!(params, json!({ "param0": "Up", "param1": 5 }));
}

#[tokio::test]
async fn context_claims_are_passed_through() {
    let request = request("my_account.json");
    let output = run(&["params", request.to_str().expect("utf-8 path")])
        .await
        .expect("compiles");
    let params: serde_json::Value = serde_json::from_str(&output).expect("json");
    assert_eq!(params["isAuthenticated"], json!(true));
    assert_eq!(params["jwt"]["sub"], json!("u-1"));
}

#[tokio::test]
async fn prints_an_outline() {
    let request = request("movies_by_title.json");
    let output = run(&["tree", request.to_str().expect("utf-8 path")])
        .await
        .expect("compiles");
    let first_line = output.lines().next().expect("outline");
    assert!(first_line.starts_with("ReadOperation"), "{output}");
    assert!(output.lines().skip(1).all(|line| line.starts_with("    ")));
}

#[tokio::test]
async fn lists_root_fields() {
    let output = run(&["root-fields"]).await.expect("lists");
    assert!(output.lines().any(|line| line == "movies\tread\tMovie"));
    assert!(output.lines().any(|line| line == "deleteMovies\tdelete\tMovie"));
    assert!(output.lines().any(|line| line == "productionsConnection\tconnection\tProduction"));
    assert!(!output.lines().any(|line| line.starts_with("deleteProductions")));
}

#[tokio::test]
async fn unknown_root_fields_fail() {
    let dir = std::env::temp_dir().join(format!("cypher-compiler-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    let file = dir.join("request.json");
    std::fs::write(&file, r#"{ "operation": { "name": "documentaries" } }"#).expect("writes");

    let error = run(&["cypher", file.to_str().expect("utf-8 path")])
        .await
        .expect_err("unknown root field");
    assert!(error.to_string().contains("documentaries"));
    std::fs::remove_dir_all(&dir).expect("cleanup");
}

#[tokio::test]
async fn initialize_refuses_to_overwrite() {
    let error = run(&["initialize"]).await.expect_err("configuration exists");
    assert!(error.to_string().contains("already exists"));
}
