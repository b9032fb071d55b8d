//! Version 1 of the configuration format.

use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tokio::fs;

use query_engine_metadata::metadata::{self, database};

use crate::environment::{Environment, Variable};
use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::values::{ConnectionUri, PoolSettings, Secret};

const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";
pub const DEFAULT_CONNECTION_URI_VARIABLE: &str = "GRID_ADAPTER_CONNECTION_URI";

const TABLES_QUERY: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
const COLUMNS_QUERY: &str =
    "SELECT name, type, \"notnull\", pk FROM pragma_table_info($1) ORDER BY cid";
const FOREIGN_KEYS_QUERY: &str =
    "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list($1) ORDER BY id, seq";

/// Initial configuration, just enough to connect to a database and elaborate a full
/// 'Configuration'.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    // Connection string for the SQLite database
    pub connection_uri: ConnectionUri,
    #[serde(skip_serializing_if = "PoolSettings::is_default")]
    #[serde(default)]
    pub pool_settings: PoolSettings,
    #[serde(default)]
    pub metadata: metadata::Metadata,
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::empty()
    }

    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            connection_uri: ConnectionUri(Secret::FromEnvironment {
                variable: Variable::from_static(DEFAULT_CONNECTION_URI_VARIABLE),
            }),
            pool_settings: PoolSettings::default(),
            metadata: metadata::Metadata::empty(),
        }
    }
}

/// Construct the deployment configuration by introspecting the database.
///
/// Tables, columns, primary keys and foreign keys are read afresh; the grid
/// definitions are kept as they are.
pub async fn configure(
    args: &ParsedConfiguration,
    environment: impl Environment,
) -> anyhow::Result<ParsedConfiguration> {
    let ConnectionUri(secret) = &args.connection_uri;
    let uri = secret.resolve(environment)?;

    let mut connection = uri
        .parse::<SqliteConnectOptions>()?
        .read_only(true)
        .connect()
        .await?;

    let mut tables = BTreeMap::new();
    let table_names: Vec<(String,)> = sqlx::query_as(TABLES_QUERY)
        .fetch_all(&mut connection)
        .await?;
    for (table_name,) in table_names {
        match introspect_table(&mut connection, &table_name).await? {
            Some(table_info) => {
                tables.insert(table_name, table_info);
            }
            None => tracing::warn!(table = table_name, "skipping table without a primary key"),
        }
    }
    connection.close().await?;

    Ok(ParsedConfiguration {
        version: CURRENT_VERSION,
        connection_uri: args.connection_uri.clone(),
        pool_settings: args.pool_settings.clone(),
        metadata: metadata::Metadata {
            tables: metadata::TablesInfo(tables),
            grids: args.metadata.grids.clone(),
        },
    })
}

async fn introspect_table(
    connection: &mut SqliteConnection,
    table_name: &str,
) -> anyhow::Result<Option<database::TableInfo>> {
    let column_rows: Vec<(String, String, i64, i64)> = sqlx::query_as(COLUMNS_QUERY)
        .bind(table_name)
        .fetch_all(&mut *connection)
        .await?;

    let primary_key = column_rows
        .iter()
        .find(|(_, _, _, pk)| *pk == 1)
        .map(|(name, _, _, _)| name.clone());
    let Some(primary_key) = primary_key else {
        return Ok(None);
    };

    let columns = column_rows
        .into_iter()
        .map(|(name, declared_type, not_null, pk)| {
            let nullable = if not_null != 0 || pk != 0 {
                database::Nullable::NonNullable
            } else {
                database::Nullable::Nullable
            };
            (
                name.clone(),
                database::ColumnInfo {
                    name,
                    r#type: database::ScalarType::from_declared_type(&declared_type),
                    nullable,
                },
            )
        })
        .collect();

    let foreign_key_rows: Vec<(i64, String, String, String)> = sqlx::query_as(FOREIGN_KEYS_QUERY)
        .bind(table_name)
        .fetch_all(&mut *connection)
        .await?;

    let mut foreign_keys: BTreeMap<i64, database::ForeignRelation> = BTreeMap::new();
    for (id, foreign_table, from, to) in foreign_key_rows {
        foreign_keys
            .entry(id)
            .or_insert_with(|| database::ForeignRelation {
                foreign_table,
                column_mapping: BTreeMap::new(),
            })
            .column_mapping
            .insert(from, to);
    }

    let mut foreign_relations = BTreeMap::new();
    for relation in foreign_keys.into_values() {
        let name = relation_name(&relation);
        if foreign_relations.contains_key(&name) {
            tracing::warn!(table = table_name, relation = name, "duplicate relation name");
            continue;
        }
        foreign_relations.insert(name, relation);
    }

    Ok(Some(database::TableInfo {
        table_name: table_name.to_string(),
        primary_key,
        columns,
        foreign_relations: database::ForeignRelations(foreign_relations),
    }))
}

/// `profile_id -> profiles.id` is named `profile`; anything else is named
/// after the foreign table.
fn relation_name(relation: &database::ForeignRelation) -> String {
    let mut local_columns = relation.column_mapping.keys();
    match (local_columns.next(), local_columns.next()) {
        (Some(column), None) => match column.strip_suffix("_id") {
            Some(stem) if !stem.is_empty() && !stem.contains("__") => stem.to_string(),
            _ => relation.foreign_table.clone(),
        },
        _ => relation.foreign_table.clone(),
    }
}

/// Parse the configuration format from a directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| {
                ParseConfigurationError::IoErrorButStringified(format!(
                    "{}: {}",
                    &configuration_file.display(),
                    err
                ))
            })?;

    let parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    if parsed_config.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion {
            file_path: configuration_file,
            version: parsed_config.version,
        });
    }

    Ok(parsed_config)
}

/// Write the parsed configuration into a directory on disk, along with its
/// JSON schema.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().to_owned().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    // create the configuration file
    fs::write(
        configuration_file,
        serde_json::to_string_pretty(&parsed_config)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    // create the jsonschema file
    let configuration_jsonschema_file_path = out_dir
        .as_ref()
        .to_owned()
        .join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(columns: &[(&str, &str)]) -> database::ForeignRelation {
        database::ForeignRelation {
            foreign_table: "profiles".to_string(),
            column_mapping: columns
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
        }
    }

    #[test]
    fn relations_are_named_after_their_key_column() {
        assert_eq!(relation_name(&relation(&[("profile_id", "id")])), "profile");
        assert_eq!(relation_name(&relation(&[("owner", "id")])), "profiles");
        assert_eq!(relation_name(&relation(&[("_id", "id")])), "profiles");
        assert_eq!(
            relation_name(&relation(&[("a_id", "a"), ("b_id", "b")])),
            "profiles"
        );
    }

    #[test]
    fn empty_configuration_reads_the_uri_from_the_environment() {
        let json = serde_json::to_value(ParsedConfiguration::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "version": 1,
                "connectionUri": {"variable": "GRID_ADAPTER_CONNECTION_URI"},
                "metadata": {"tables": {}, "grids": {}}
            })
        );
    }
}
