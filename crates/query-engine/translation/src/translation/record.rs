//! Records of a grid: a row of the base collection together with the related
//! objects of the grid's relations, as fetched by the record select list.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use grid_models::RECID;
use query_engine_sql::sql;

use super::error::Error;
use super::helpers::Env;

/// One record of a grid, keyed by relation name. A related object is absent
/// when the record has no row on the other side of the relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Value,
    objects: BTreeMap<String, Option<Map<String, Value>>>,
    changes: BTreeMap<String, BTreeMap<String, sql::ast::Value>>,
}

impl Record {
    /// Build a record from the json object held by the `record` column.
    pub fn from_row(env: &Env, row: Value) -> Result<Record, Error> {
        let Value::Object(mut row) = row else {
            return Err(Error::MalformedRow(format!("expected an object, got {row}")));
        };

        let mut objects = BTreeMap::new();
        for relation in env.relations() {
            let object = match row.remove(relation.name) {
                Some(Value::Object(object)) => object,
                Some(Value::Null) | None if !relation.is_collection() => {
                    objects.insert(relation.name.to_string(), None);
                    continue;
                }
                _ => {
                    return Err(Error::MalformedRow(format!(
                        "missing object for relation '{}'",
                        relation.name
                    )))
                }
            };
            // a left join without a match leaves every joined column null
            let present = relation.join.is_none_or(|join| {
                join.column_mapping
                    .values()
                    .all(|column| object.get(column).is_some_and(|v| !v.is_null()))
            });
            objects.insert(relation.name.to_string(), present.then_some(object));
        }

        let collection = env.collection();
        let id = objects
            .get(collection.name)
            .and_then(Option::as_ref)
            .and_then(|object| object.get(&collection.table.primary_key))
            .cloned()
            .ok_or_else(|| Error::MalformedRow("missing primary key".to_string()))?;

        Ok(Record {
            id,
            objects,
            changes: BTreeMap::new(),
        })
    }

    /// The primary key of the record's base row.
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// The object of a relation, if the record has one.
    pub fn object(&self, relation: &str) -> Option<&Map<String, Value>> {
        self.objects.get(relation).and_then(Option::as_ref)
    }

    pub fn field(&self, relation: &str, column: &str) -> Option<&Value> {
        self.object(relation)?.get(column)
    }

    /// Set a column of one of the record's objects. The change is kept until
    /// the record is saved. Does nothing if the record has no such object.
    pub fn set(&mut self, relation: &str, column: &str, json: Value, value: sql::ast::Value) {
        let Some(Some(object)) = self.objects.get_mut(relation) else {
            return;
        };
        object.insert(column.to_string(), json);
        self.changes
            .entry(relation.to_string())
            .or_default()
            .insert(column.to_string(), value);
    }

    /// Columns set since the record was fetched, per relation.
    pub fn changes(&self) -> &BTreeMap<String, BTreeMap<String, sql::ast::Value>> {
        &self.changes
    }

    /// The record as a json object keyed by relation name; absent related
    /// objects are `null`.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.objects
                .iter()
                .map(|(relation, object)| {
                    (
                        relation.clone(),
                        object.clone().map_or(Value::Null, Value::Object),
                    )
                })
                .collect(),
        )
    }

    /// The record flattened to the wire form of a grid row:
    /// `{"recid": .., "relation__column": ..}`. Columns of absent related
    /// objects are omitted.
    pub fn flatten(&self) -> Value {
        let mut row = Map::new();
        row.insert(RECID.to_string(), self.id.clone());
        for (relation, object) in &self.objects {
            for (column, value) in object.iter().flatten() {
                row.insert(format!("{relation}__{column}"), value.clone());
            }
        }
        Value::Object(row)
    }
}
