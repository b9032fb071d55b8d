//! Convert a parsed configuration into the runtime configuration.

use std::sync::LazyLock;

use regex::Regex;

use query_engine_metadata::metadata;

use crate::configuration::Configuration;
use crate::environment::Environment;
use crate::error::{MakeRuntimeConfigurationError, MultiError};
use crate::values::ConnectionUri;
use crate::version1::ParsedConfiguration;

static ADDRESSABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_]+$").expect("name pattern is valid"));

/// Resolve the secrets of a parsed configuration and check its grids.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let ConnectionUri(secret) = &parsed_config.connection_uri;
    let connection_uri = secret.resolve(environment).map_err(|err| {
        MakeRuntimeConfigurationError::MissingEnvironmentVariable {
            message: err.to_string(),
        }
    })?;
    if connection_uri.trim().is_empty() {
        return Err(MakeRuntimeConfigurationError::EmptyConnectionUri);
    }

    let errors = validate_grids(&parsed_config.metadata);
    if !errors.is_empty() {
        return Err(MakeRuntimeConfigurationError::InvalidGrids(MultiError(
            errors,
        )));
    }

    Ok(Configuration {
        metadata: parsed_config.metadata,
        pool_settings: parsed_config.pool_settings,
        connection_uri,
    })
}

/// Every problem with the grid registry, one message each.
pub fn validate_grids(metadata: &metadata::Metadata) -> Vec<String> {
    let mut errors = vec![];
    for (grid_name, grid) in &metadata.grids.0 {
        let mut error = |message: String| errors.push(format!("grid '{grid_name}': {message}"));

        let Some(collection) = metadata.tables.0.get(&grid.collection) else {
            error(format!("collection '{}' is not a known table", grid.collection));
            continue;
        };
        if !is_addressable(&grid.collection) {
            error(format!(
                "collection '{}' cannot be addressed in field names",
                grid.collection
            ));
        }

        // relation name -> table of the relation
        let mut relations = vec![(grid.collection.as_str(), collection)];
        for relation in &grid.relations {
            if relation == &grid.collection {
                error(format!(
                    "relation '{relation}' has the name of the collection"
                ));
                continue;
            }
            if !is_addressable(relation) {
                error(format!("relation '{relation}' cannot be addressed in field names"));
                continue;
            }
            match collection
                .foreign_relations
                .0
                .get(relation)
                .and_then(|foreign| metadata.tables.0.get(&foreign.foreign_table))
            {
                Some(table) => relations.push((relation.as_str(), table)),
                None => error(format!(
                    "relation '{relation}' is not a foreign relation of '{}'",
                    grid.collection
                )),
            }
        }

        let resolve = |field: &str| {
            let (relation, column) = field.split_once("__")?;
            let (_, table) = relations.iter().find(|(name, _)| *name == relation)?;
            table.columns.get(column)
        };
        for element in &grid.default_order {
            if resolve(&element.field).is_none() {
                error(format!(
                    "default order field '{}' does not resolve",
                    element.field
                ));
            }
        }

        for (relation, columns) in &grid.editable.0 {
            let Some((_, table)) = relations.iter().find(|(name, _)| name == relation) else {
                error(format!("editable relation '{relation}' is not part of the grid"));
                continue;
            };
            for column in columns {
                if !table.columns.contains_key(column) {
                    error(format!("editable column '{relation}__{column}' does not exist"));
                } else if relation == &grid.collection && column == &collection.primary_key {
                    error(format!(
                        "the primary key '{relation}__{column}' cannot be editable"
                    ));
                }
            }
        }

        if let (Some(default_limit), Some(max_limit)) = (grid.default_limit, grid.max_limit) {
            if default_limit > max_limit {
                error(format!(
                    "default limit {default_limit} exceeds the maximum limit {max_limit}"
                ));
            }
        }
    }
    errors
}

/// Whether `<name>__<column>` splits back into `name`.
fn is_addressable(name: &str) -> bool {
    ADDRESSABLE_NAME.is_match(name) && !name.contains("__") && !name.ends_with('_')
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use query_engine_metadata::metadata::database::*;
    use query_engine_metadata::metadata::*;

    use super::*;

    fn column(name: &str, r#type: ScalarType) -> (String, ColumnInfo) {
        (
            name.to_string(),
            ColumnInfo {
                name: name.to_string(),
                r#type,
                nullable: Nullable::Nullable,
            },
        )
    }

    fn metadata(grid: GridInfo) -> Metadata {
        let users = TableInfo {
            table_name: "users".to_string(),
            primary_key: "id".to_string(),
            columns: BTreeMap::from([
                column("id", ScalarType::Integer),
                column("name", ScalarType::Text),
                column("profile_id", ScalarType::Integer),
            ]),
            foreign_relations: ForeignRelations(BTreeMap::from([(
                "profile".to_string(),
                ForeignRelation {
                    foreign_table: "profiles".to_string(),
                    column_mapping: BTreeMap::from([("profile_id".to_string(), "id".to_string())]),
                },
            )])),
        };
        let profiles = TableInfo {
            table_name: "profiles".to_string(),
            primary_key: "id".to_string(),
            columns: BTreeMap::from([
                column("id", ScalarType::Integer),
                column("city", ScalarType::Text),
            ]),
            foreign_relations: ForeignRelations::default(),
        };
        Metadata {
            tables: TablesInfo(BTreeMap::from([
                ("users".to_string(), users),
                ("profiles".to_string(), profiles),
            ])),
            grids: GridsInfo(BTreeMap::from([("people".to_string(), grid)])),
        }
    }

    fn grid() -> GridInfo {
        GridInfo {
            collection: "users".to_string(),
            relations: BTreeSet::from(["profile".to_string()]),
            default_order: vec![DefaultOrderElement {
                field: "users__id".to_string(),
                direction: OrderDirection::Asc,
            }],
            editable: EditableFields(BTreeMap::from([
                ("users".to_string(), BTreeSet::from(["name".to_string()])),
                ("profile".to_string(), BTreeSet::from(["city".to_string()])),
            ])),
            default_limit: Some(100),
            max_limit: Some(1000),
        }
    }

    #[test]
    fn a_consistent_grid_is_valid() {
        assert_eq!(validate_grids(&metadata(grid())), Vec::<String>::new());
    }

    #[test]
    fn every_inconsistency_is_reported() {
        let mut grid = grid();
        grid.relations.insert("owner".to_string());
        grid.default_order.push(DefaultOrderElement {
            field: "profile__nope".to_string(),
            direction: OrderDirection::Desc,
        });
        grid.editable
            .0
            .get_mut("users")
            .unwrap()
            .insert("id".to_string());
        grid.default_limit = Some(5000);

        assert_eq!(
            validate_grids(&metadata(grid)),
            vec![
                "grid 'people': relation 'owner' is not a foreign relation of 'users'",
                "grid 'people': default order field 'profile__nope' does not resolve",
                "grid 'people': the primary key 'users__id' cannot be editable",
                "grid 'people': default limit 5000 exceeds the maximum limit 1000",
            ]
        );
    }

    #[test]
    fn unknown_collections_are_reported() {
        let mut grid = grid();
        grid.collection = "accounts".to_string();
        assert_eq!(
            validate_grids(&metadata(grid)),
            vec!["grid 'people': collection 'accounts' is not a known table"]
        );
    }

    #[test]
    fn relations_that_field_tokens_cannot_address_are_reported() {
        let mut grid = grid();
        grid.relations.insert("profile_".to_string());
        grid.relations.insert("perfil_é".to_string());
        assert_eq!(
            validate_grids(&metadata(grid)),
            vec![
                "grid 'people': relation 'perfil_é' cannot be addressed in field names",
                "grid 'people': relation 'profile_' cannot be addressed in field names",
            ]
        );
    }
}
