//! Translate the changes of save-records and the selection of delete-records
//! into data-changing statements.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use grid_models::RECID;
use query_engine_metadata::metadata::database::Nullable;
use query_engine_sql::sql;

use super::error::Error;
use super::helpers::{Env, Relation};
use super::query::fields::FieldToken;
use super::query::values;
use super::record::Record;

/// Apply one changed-record entry to a fetched record.
///
/// Fields that do not resolve to an editable column of a relation the
/// record has are skipped. A value that cannot be stored in its column is
/// an error naming the field.
pub fn apply_changes(
    env: &Env,
    record: &mut Record,
    changes: &Map<String, Value>,
) -> Result<(), Error> {
    for (field, json) in changes {
        if field == RECID {
            continue;
        }
        let Some(token) = FieldToken::parse(field) else {
            tracing::trace!(field, "dropping unresolved field");
            continue;
        };
        let Some(column) = env.lookup_field(&token) else {
            tracing::trace!(field, "dropping unknown field");
            continue;
        };
        if !env.is_editable(column.relation.name, &column.info.name) {
            tracing::trace!(field, "dropping non-editable field");
            continue;
        }
        if record.object(column.relation.name).is_none() {
            tracing::trace!(field, "record has no related object");
            continue;
        }

        let value = values::translate_json_value(json, column.info.r#type)
            .and_then(|value| match (&value, column.info.nullable) {
                (sql::ast::Value::Null, Nullable::NonNullable) => {
                    Err(Error::UnexpectedNull(column.info.name.clone()))
                }
                _ => Ok(value),
            })
            .map_err(|err| Error::InvalidField(field.clone(), Box::new(err)))?;
        record.set(column.relation.name, &column.info.name, json.clone(), value);
    }
    Ok(())
}

/// Translate the pending changes of a record to one UPDATE per touched
/// relation. The statements are meant to run in one transaction.
pub fn translate_save(
    env: &Env,
    record: &Record,
) -> Result<sql::execution_plan::ExecutionPlan<sql::execution_plan::Mutation>, Error> {
    let statements = record
        .changes()
        .iter()
        .map(|(relation_name, columns)| {
            let relation = env
                .lookup_relation(relation_name)
                .ok_or_else(|| Error::RelationNotFound(relation_name.clone()))?;
            let set: BTreeMap<_, _> = columns
                .iter()
                .map(|(column, value)| {
                    (
                        sql::ast::ColumnName(column.clone()),
                        sql::ast::Expression::Value(value.clone()),
                    )
                })
                .collect();
            Ok(sql::execution_plan::Statement::Update(sql::ast::Update {
                table: relation.table_name(),
                set,
                where_: row_identity(&relation, record)?,
            }))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(sql::execution_plan::ExecutionPlan {
        grid: env.grid_name().to_string(),
        query: sql::execution_plan::Mutation { statements },
    })
}

/// Translate the removal of a record's base row.
pub fn translate_delete(
    env: &Env,
    record: &Record,
) -> Result<sql::execution_plan::ExecutionPlan<sql::execution_plan::Mutation>, Error> {
    let collection = env.collection();
    let statement = sql::execution_plan::Statement::Delete(sql::ast::Delete {
        table: collection.table_name(),
        where_: row_identity(&collection, record)?,
    });
    Ok(sql::execution_plan::ExecutionPlan {
        grid: env.grid_name().to_string(),
        query: sql::execution_plan::Mutation {
            statements: vec![statement],
        },
    })
}

/// `"table"."primary key" = $n` for the row of a relation the record holds.
fn row_identity(relation: &Relation, record: &Record) -> Result<sql::ast::Where, Error> {
    let primary_key = &relation.table.primary_key;
    let column = relation.lookup_column(primary_key).ok_or_else(|| {
        Error::ColumnNotFound(primary_key.clone(), relation.name.to_string())
    })?;
    let key = record
        .field(relation.name, primary_key)
        .filter(|key| !key.is_null())
        .ok_or_else(|| Error::MalformedRow(format!("missing key of '{}'", relation.name)))?;
    Ok(sql::ast::Where(sql::helpers::equals(
        relation.table_column(primary_key),
        sql::ast::Expression::Value(values::translate_json_value(key, column.r#type)?),
    )))
}
