//! Resolve `relation__column` field tokens and build the record projection.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use query_engine_sql::sql;

use crate::translation::helpers::{Env, Relation};

static FIELD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Za-z_]+?)__([0-9A-Za-z_]+)$").expect("field token pattern is valid")
});

/// A field token split into the relation it addresses and the column in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldToken {
    pub relation: String,
    pub column: String,
}

impl FieldToken {
    pub fn new(relation: impl Into<String>, column: impl Into<String>) -> Self {
        FieldToken {
            relation: relation.into(),
            column: column.into(),
        }
    }

    /// Split a token of the form `relation__column`. Tokens that do not have
    /// exactly one `__` separator do not resolve; a run of three or more
    /// underscores holds overlapping separators.
    pub fn parse(token: &str) -> Option<Self> {
        let captures = FIELD_TOKEN.captures(token)?;
        let relation = captures.get(1)?.as_str();
        let column = captures.get(2)?.as_str();
        if column.starts_with('_') || column.contains("__") {
            return None;
        }
        Some(FieldToken::new(relation, column))
    }
}

impl fmt::Display for FieldToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}__{}", self.relation, self.column)
    }
}

/// The select list fetching one record: a single `record` column holding a
/// json object keyed by relation name, each relation an object of its columns.
pub fn record_select_list(env: &Env) -> Vec<(sql::ast::ColumnAlias, sql::ast::Expression)> {
    let objects = env
        .relations()
        .iter()
        .map(|relation| (relation.name.to_string(), relation_object(relation)))
        .collect();
    vec![(
        sql::helpers::make_column_alias(sql::helpers::RECORD_COLUMN.to_string()),
        sql::ast::Expression::JsonObject(objects),
    )]
}

fn relation_object(relation: &Relation) -> sql::ast::Expression {
    sql::ast::Expression::JsonObject(
        relation
            .table
            .columns
            .keys()
            .map(|column| (column.clone(), relation.aliased_column(column)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::FieldToken;

    #[test]
    fn well_formed_tokens_resolve() {
        assert_eq!(
            FieldToken::parse("users__name"),
            Some(FieldToken::new("users", "name"))
        );
        assert_eq!(
            FieldToken::parse("user_profiles__created_at"),
            Some(FieldToken::new("user_profiles", "created_at"))
        );
    }

    #[test]
    fn tokens_without_exactly_one_separator_do_not_resolve() {
        for token in [
            "name",
            "users_name",
            "users.name",
            "__name",
            "users__",
            "users__name__first",
            "users__na-me",
            "users___name",
            "users____name",
            "usérs__name",
            "",
        ] {
            assert_eq!(FieldToken::parse(token), None, "{token}");
        }
    }

    #[test]
    fn tokens_display_in_wire_form() {
        assert_eq!(FieldToken::new("profile", "city").to_string(), "profile__city");
    }
}
