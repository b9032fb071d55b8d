//! Helpers for looking up grids, relations and columns while translating.

use query_engine_metadata::metadata;
use query_engine_sql::sql;

use super::error::Error;
use super::query::fields::FieldToken;

/// Static information from the metadata about the grid being translated.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    metadata: &'a metadata::Metadata,
    grid_name: &'a str,
    grid: &'a metadata::GridInfo,
    collection: &'a metadata::TableInfo,
}

/// A relation a field token can address: the base collection, or one of the
/// grid's joined foreign relations.
#[derive(Debug, Clone, Copy)]
pub struct Relation<'a> {
    pub name: &'a str,
    pub table: &'a metadata::TableInfo,
    /// How the relation joins the base collection. `None` for the collection itself.
    pub join: Option<&'a metadata::ForeignRelation>,
}

/// A column resolved from a field token.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub relation: Relation<'a>,
    pub info: &'a metadata::ColumnInfo,
}

impl<'a> Env<'a> {
    /// Look up the grid and its base collection in the metadata.
    pub fn new(metadata: &'a metadata::Metadata, grid_name: &'a str) -> Result<Self, Error> {
        let grid = metadata
            .grids
            .0
            .get(grid_name)
            .ok_or_else(|| Error::GridNotFound(grid_name.to_string()))?;
        let collection = metadata
            .tables
            .0
            .get(&grid.collection)
            .ok_or_else(|| Error::CollectionNotFound(grid.collection.clone()))?;
        Ok(Env {
            metadata,
            grid_name,
            grid,
            collection,
        })
    }

    pub fn grid_name(&self) -> &'a str {
        self.grid_name
    }

    pub fn grid(&self) -> &'a metadata::GridInfo {
        self.grid
    }

    /// The base collection of the grid.
    pub fn collection(&self) -> Relation<'a> {
        Relation {
            name: &self.collection.table_name,
            table: self.collection,
            join: None,
        }
    }

    /// The primary key column of the base collection.
    pub fn primary_key(&self) -> Result<Column<'a>, Error> {
        let collection = self.collection();
        collection
            .lookup_column(&self.collection.primary_key)
            .map(|info| Column {
                relation: collection,
                info,
            })
            .ok_or_else(|| {
                Error::ColumnNotFound(
                    self.collection.primary_key.clone(),
                    self.collection.table_name.clone(),
                )
            })
    }

    /// Find a relation by the name used in field tokens.
    pub fn lookup_relation(&self, name: &str) -> Option<Relation<'a>> {
        if name == self.collection.table_name {
            return Some(self.collection());
        }
        if !self.grid.relations.contains(name) {
            return None;
        }
        let (name, join) = self.collection.foreign_relations.0.get_key_value(name)?;
        let table = self.metadata.tables.0.get(&join.foreign_table)?;
        Some(Relation {
            name,
            table,
            join: Some(join),
        })
    }

    /// The base collection followed by every joined relation.
    pub fn relations(&self) -> Vec<Relation<'a>> {
        std::iter::once(self.collection())
            .chain(
                self.grid
                    .relations
                    .iter()
                    .filter_map(|name| self.lookup_relation(name)),
            )
            .collect()
    }

    /// Resolve a field token against the grid's relations.
    pub fn lookup_field(&self, token: &FieldToken) -> Option<Column<'a>> {
        let relation = self.lookup_relation(&token.relation)?;
        let info = relation.lookup_column(&token.column)?;
        Some(Column { relation, info })
    }

    /// Whether save-records may set this column.
    pub fn is_editable(&self, relation: &str, column: &str) -> bool {
        self.grid.editable.allows(relation, column)
    }
}

impl<'a> Relation<'a> {
    pub fn is_collection(&self) -> bool {
        self.join.is_none()
    }

    pub fn lookup_column(&self, name: &str) -> Option<&'a metadata::ColumnInfo> {
        self.table.columns.get(name)
    }

    /// The alias the relation has in read queries: its name.
    pub fn alias(&self) -> sql::ast::TableAlias {
        sql::helpers::make_table_alias(self.name.to_string())
    }

    /// A reference to one of the relation's columns through its alias.
    pub fn aliased_column(&self, column: &str) -> sql::ast::Expression {
        sql::helpers::make_column(
            sql::ast::TableReference::AliasedTable(self.alias()),
            sql::ast::ColumnName(column.to_string()),
        )
    }

    /// A reference to one of the relation's columns through its table name,
    /// as used by UPDATE and DELETE statements.
    pub fn table_column(&self, column: &str) -> sql::ast::Expression {
        sql::helpers::make_column(
            sql::ast::TableReference::DBTable(self.table_name()),
            sql::ast::ColumnName(column.to_string()),
        )
    }

    pub fn table_name(&self) -> sql::ast::TableName {
        sql::ast::TableName(self.table.table_name.clone())
    }
}

impl Column<'_> {
    /// The column as it is referenced in read queries.
    pub fn expression(&self) -> sql::ast::Expression {
        self.relation.aliased_column(&self.info.name)
    }
}

/// The FROM clause of a grid read and the joins of its relations.
pub fn from_and_joins(env: &Env) -> (sql::ast::From, Vec<sql::ast::Join>) {
    let collection = env.collection();
    let from = sql::ast::From::Table {
        reference: sql::ast::TableReference::DBTable(collection.table_name()),
        alias: collection.alias(),
    };
    let joins = env
        .relations()
        .into_iter()
        .filter_map(|relation| {
            let join = relation.join?;
            let on = sql::helpers::and_all(join.column_mapping.iter().map(
                |(local_column, foreign_column)| {
                    sql::helpers::equals(
                        collection.aliased_column(local_column),
                        relation.aliased_column(foreign_column),
                    )
                },
            ));
            Some(sql::ast::Join::LeftOuterJoin(sql::ast::LeftOuterJoin {
                reference: sql::ast::TableReference::DBTable(relation.table_name()),
                alias: relation.alias(),
                on,
            }))
        })
        .collect();
    (from, joins)
}
