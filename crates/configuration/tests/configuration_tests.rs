//! Tests of the configuration shipped in `static/` and of the configuration lifecycle.

use std::path::PathBuf;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, Executor};

use grid_adapter_configuration::environment::{EmptyEnvironment, FixedEnvironment};
use grid_adapter_configuration::error::{MakeRuntimeConfigurationError, ParseConfigurationError};
use grid_adapter_configuration::{
    configure, make_runtime_configuration, parse_configuration, write_parsed_configuration,
    ParsedConfiguration, CONFIGURATION_FILENAME, DEFAULT_CONNECTION_URI_VARIABLE,
};

const FIXTURE: &str = include_str!("../../../static/fixture.sql");

fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../static")
}

#[tokio::test]
async fn the_static_configuration_follows_the_generated_schema() {
    let schema = serde_json::to_value(schemars::schema_for!(ParsedConfiguration)).unwrap();
    let configuration: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(static_dir().join(CONFIGURATION_FILENAME)).unwrap(),
    )
    .unwrap();

    let compiled = jsonschema::JSONSchema::compile(&schema).unwrap();
    let messages: Vec<String> = match compiled.validate(&configuration) {
        Ok(()) => vec![],
        Err(errors) => errors.map(|error| error.to_string()).collect(),
    };
    assert_eq!(messages, Vec::<String>::new());
}

#[tokio::test]
async fn written_configurations_parse_back() {
    let parsed = parse_configuration(static_dir()).await.unwrap();
    let directory = tempfile::tempdir().unwrap();

    write_parsed_configuration(parsed.clone(), directory.path())
        .await
        .unwrap();

    assert_eq!(parse_configuration(directory.path()).await.unwrap(), parsed);
}

#[tokio::test]
async fn other_versions_are_rejected() {
    let directory = tempfile::tempdir().unwrap();
    std::fs::write(
        directory.path().join(CONFIGURATION_FILENAME),
        r#"{"version": 2, "connectionUri": "sqlite::memory:"}"#,
    )
    .unwrap();

    match parse_configuration(directory.path()).await {
        Err(ParseConfigurationError::UnsupportedVersion { version, .. }) => {
            assert_eq!(version, 2);
        }
        other => panic!("expected an unsupported version, got {other:?}"),
    }
}

#[tokio::test]
async fn syntax_errors_are_located() {
    let directory = tempfile::tempdir().unwrap();
    std::fs::write(
        directory.path().join(CONFIGURATION_FILENAME),
        "{\n  \"version\": 1,\n  \"connectionUri\": \n}",
    )
    .unwrap();

    match parse_configuration(directory.path()).await {
        Err(ParseConfigurationError::ParseError { line, .. }) => assert_eq!(line, 4),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn the_connection_uri_must_be_set() {
    let parsed = parse_configuration(static_dir()).await.unwrap();

    assert!(matches!(
        make_runtime_configuration(parsed.clone(), EmptyEnvironment),
        Err(MakeRuntimeConfigurationError::MissingEnvironmentVariable { .. })
    ));
    assert!(matches!(
        make_runtime_configuration(
            parsed,
            FixedEnvironment::from([(DEFAULT_CONNECTION_URI_VARIABLE.into(), "  ".to_string())])
        ),
        Err(MakeRuntimeConfigurationError::EmptyConnectionUri)
    ));
}

#[tokio::test]
async fn introspection_matches_the_static_tables() {
    let directory = tempfile::tempdir().unwrap();
    let database = directory.path().join("fixture.sqlite");
    let mut connection = SqliteConnectOptions::new()
        .filename(&database)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    connection.execute(FIXTURE).await.unwrap();
    connection.close().await.unwrap();

    let shipped = parse_configuration(static_dir()).await.unwrap();
    let introspected = configure(
        &shipped,
        FixedEnvironment::from([(
            DEFAULT_CONNECTION_URI_VARIABLE.into(),
            format!("sqlite://{}", database.display()),
        )]),
    )
    .await
    .unwrap();

    assert_eq!(introspected, shipped);
}
