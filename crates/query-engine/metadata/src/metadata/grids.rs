//! Grids exposed to the grid UI, each one backed by a base collection.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mapping from a grid name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct GridsInfo(pub BTreeMap<String, GridInfo>);

impl GridsInfo {
    pub fn empty() -> Self {
        GridsInfo(BTreeMap::new())
    }
}

/// Information about a single grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GridInfo {
    /// The table the grid lists. Its name doubles as the relation name of
    /// the base collection in field tokens.
    pub collection: String,
    /// Foreign relations of the collection that are joined and addressable.
    #[serde(default)]
    pub relations: BTreeSet<String>,
    /// Used when a request carries no sort specs. May be empty.
    #[serde(default)]
    pub default_order: Vec<DefaultOrderElement>,
    /// Which columns save-records may set, per relation.
    #[serde(default)]
    pub editable: EditableFields,
    /// Page size used when a request does not name one.
    #[serde(default)]
    pub default_limit: Option<u32>,
    /// Upper bound on the page size of any request.
    #[serde(default)]
    pub max_limit: Option<u32>,
}

/// One element of a grid's default order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DefaultOrderElement {
    /// A `relation__column` field token.
    pub field: String,
    #[serde(default)]
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// A mapping from relation name to the set of its columns that may be set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct EditableFields(pub BTreeMap<String, BTreeSet<String>>);

impl EditableFields {
    pub fn allows(&self, relation: &str, column: &str) -> bool {
        self.0
            .get(relation)
            .is_some_and(|columns| columns.contains(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editable_fields_only_allow_registered_columns() {
        let editable = EditableFields(BTreeMap::from([(
            "users".to_string(),
            BTreeSet::from(["name".to_string()]),
        )]));

        assert!(editable.allows("users", "name"));
        assert!(!editable.allows("users", "id"));
        assert!(!editable.allows("profile", "name"));
    }

    #[test]
    fn grid_defaults_are_optional() {
        let grid: GridInfo = serde_json::from_value(serde_json::json!({
            "collection": "users"
        }))
        .unwrap();

        assert!(grid.relations.is_empty());
        assert!(grid.default_order.is_empty());
        assert_eq!(grid.default_limit, None);
        assert_eq!(grid.editable, EditableFields::default());
    }
}
