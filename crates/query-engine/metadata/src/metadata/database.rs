//! Metadata information regarding the database and tracked information.

use std::collections::BTreeMap;
use std::fmt;

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The scalar types supported by the Engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Sequence, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Integer,
    Real,
    Text,
    Date,
    Timestamp,
    Any,
}

impl ScalarType {
    /// Map a declared column type onto a scalar type, following SQLite's
    /// type affinity rules where they apply.
    pub fn from_declared_type(declared: &str) -> ScalarType {
        let declared = declared.trim().to_ascii_lowercase();
        if declared.starts_with("bool") {
            ScalarType::Boolean
        } else if declared == "date" {
            ScalarType::Date
        } else if declared.starts_with("datetime") || declared.starts_with("timestamp") {
            ScalarType::Timestamp
        } else if declared.contains("int") {
            ScalarType::Integer
        } else if declared.contains("char") || declared.contains("clob") || declared.contains("text")
        {
            ScalarType::Text
        } else if declared.contains("real")
            || declared.contains("floa")
            || declared.contains("doub")
            || declared.contains("numeric")
            || declared.contains("decimal")
        {
            ScalarType::Real
        } else {
            ScalarType::Any
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Integer => "integer",
            ScalarType::Real => "real",
            ScalarType::Text => "text",
            ScalarType::Date => "date",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Any => "any",
        };
        write!(f, "{name}")
    }
}

/// Mapping from a "table" name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TablesInfo(pub BTreeMap<String, TableInfo>);

impl TablesInfo {
    pub fn empty() -> Self {
        TablesInfo(BTreeMap::new())
    }
}

/// Information about a database table (or any other kind of relation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub table_name: String,
    pub primary_key: String,
    pub columns: BTreeMap<String, ColumnInfo>,
    /// Named relations to other tables, used for `relation__column` addressing.
    #[serde(default)]
    pub foreign_relations: ForeignRelations,
}

/// Can this column contain null values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

/// Information about a database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    pub r#type: ScalarType,
    #[serde(default)]
    pub nullable: Nullable,
}

/// A mapping from the name of a relation to the foreign table it points at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ForeignRelations(pub BTreeMap<String, ForeignRelation>);

/// A relation to one row of another table.
///
/// `column_mapping` maps columns of the owning table onto columns of the
/// foreign table. It covers both directions of a one-to-one association: a
/// foreign key held by the owner (`profile_id -> id`) or by the foreign
/// table (`id -> user_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForeignRelation {
    pub foreign_table: String,
    pub column_mapping: BTreeMap<String, String>,
}
