use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, Executor};

use grid_adapter::cli::{self, Command};
use grid_adapter_configuration::environment::{EmptyEnvironment, FixedEnvironment};
use grid_adapter_configuration::{CONFIGURATION_FILENAME, CONFIGURATION_JSONSCHEMA_FILENAME};
use tests_common::fixtures;

#[tokio::test]
async fn initialize_writes_an_empty_configuration_once() {
    let directory = tempfile::tempdir().unwrap();

    cli::run(Command::Initialize, directory.path(), EmptyEnvironment)
        .await
        .unwrap();

    assert!(directory.path().join(CONFIGURATION_FILENAME).exists());
    assert!(directory.path().join(CONFIGURATION_JSONSCHEMA_FILENAME).exists());
    let parsed = grid_adapter_configuration::parse_configuration(directory.path())
        .await
        .unwrap();
    assert_eq!(parsed, grid_adapter_configuration::ParsedConfiguration::initial());

    let again = cli::run(Command::Initialize, directory.path(), EmptyEnvironment).await;
    assert!(again.is_err());
}

#[tokio::test]
async fn update_introspects_the_database_and_keeps_the_grids() {
    let directory = tempfile::tempdir().unwrap();
    let database = directory.path().join("grid.sqlite");

    let mut connection = SqliteConnectOptions::new()
        .filename(&database)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    connection.execute(fixtures::FIXTURE).await.unwrap();
    connection.close().await.unwrap();

    let environment = FixedEnvironment::from([(
        grid_adapter_configuration::DEFAULT_CONNECTION_URI_VARIABLE.into(),
        format!("sqlite://{}", database.display()),
    )]);

    cli::run(Command::Initialize, directory.path(), &environment)
        .await
        .unwrap();
    cli::run(Command::Update, directory.path(), &environment)
        .await
        .unwrap();

    let updated = grid_adapter_configuration::parse_configuration(directory.path())
        .await
        .unwrap();
    let shipped = fixtures::static_configuration().await;
    assert_eq!(updated.metadata.tables, shipped.metadata.tables);
    assert!(updated.metadata.grids.0.is_empty());
}
