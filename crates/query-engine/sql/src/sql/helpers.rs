//! Helpers for building sql::ast types in certain shapes and patterns.

use super::ast::*;

/// The column alias the row-fetching select uses for the json record.
pub const RECORD_COLUMN: &str = "record";
/// The column alias the counting select uses for the total.
pub const TOTAL_COLUMN: &str = "total";

// Empty clauses //

/// An empty `WHERE` clause.
pub fn empty_where() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// Empty `LIMIT` and `OFFSET` clauses.
pub fn empty_limit() -> Limit {
    Limit {
        limit: None,
        offset: None,
    }
}

/// A `true` expression.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// A `false` expression.
pub fn false_expr() -> Expression {
    Expression::Value(Value::Bool(false))
}

// Aliasing //

/// Create table aliases using this function so we build everything in one place.
pub fn make_table_alias(name: String) -> TableAlias {
    TableAlias { name }
}

/// Create column aliases using this function so we build everything in one place.
pub fn make_column_alias(name: String) -> ColumnAlias {
    ColumnAlias { name }
}

/// Generate a column expression refering to a specific table.
pub fn make_column(table: TableReference, name: ColumnName) -> Expression {
    Expression::ColumnReference(ColumnReference::TableColumn { table, name })
}

/// `left = right`
pub fn equals(left: Expression, right: Expression) -> Expression {
    Expression::BinaryOperation {
        left: Box::new(left),
        operator: BinaryOperator::Equals,
        right: Box::new(right),
    }
}

/// Combine expressions with AND, left to right. An empty list is `true`.
pub fn and_all(expressions: impl IntoIterator<Item = Expression>) -> Expression {
    expressions
        .into_iter()
        .reduce(|left, right| Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        })
        .unwrap_or_else(true_expr)
}

// SELECTs //

/// Build a simple select with a select list and the rest are empty.
pub fn simple_select(select_list: Vec<(ColumnAlias, Expression)>) -> Select {
    Select {
        select_list: SelectList::SelectList(select_list),
        from: None,
        joins: vec![],
        where_: Where(empty_where()),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}

/// Build a simple select *
pub fn star_select(from: From) -> Select {
    Select {
        select_list: SelectList::SelectStar,
        from: Some(from),
        joins: vec![],
        where_: Where(empty_where()),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}

/// `SELECT COUNT(*) AS "total"` over the given source, joins and restriction.
pub fn count_select(from: From, joins: Vec<Join>, where_: Where) -> Select {
    let mut select = simple_select(vec![(
        make_column_alias(TOTAL_COLUMN.to_string()),
        Expression::Count(CountType::Star),
    )]);
    select.from = Some(from);
    select.joins = joins;
    select.where_ = where_;
    select
}
