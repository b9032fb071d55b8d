//! Type definitions of a SQL AST representation.

use std::collections::BTreeMap;

/// A SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub select_list: SelectList,
    pub from: Option<From>,
    pub joins: Vec<Join>,
    pub where_: Where,
    pub order_by: OrderBy,
    pub limit: Limit,
}

/// An UPDATE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableName,
    pub set: BTreeMap<ColumnName, Expression>,
    pub where_: Where,
}

/// A DELETE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableName,
    pub where_: Where,
}

/// A select list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    SelectList(Vec<(ColumnAlias, Expression)>),
    SelectStar,
}

/// A FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum From {
    /// Select from a table reference
    Table {
        reference: TableReference,
        alias: TableAlias,
    },
}

/// A JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub enum Join {
    /// LEFT OUTER JOIN
    LeftOuterJoin(LeftOuterJoin),
}

/// A LEFT OUTER JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct LeftOuterJoin {
    pub reference: TableReference,
    pub alias: TableAlias,
    pub on: Expression,
}

/// A WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Where(pub Expression);

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

/// A single element in an ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub target: Expression,
    pub direction: OrderByDirection,
}

/// A direction for a single ORDER BY element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// LIMIT and OFFSET clauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limit {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// AND clause
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// OR clause
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// NOT clause
    Not(Box<Expression>),
    /// A binary operation on two scalar expression
    BinaryOperation {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    /// A binary operation on a scalar expression and an array of scalar expressions
    BinaryArrayOperation {
        left: Box<Expression>,
        operator: BinaryArrayOperator,
        right: Vec<Expression>,
    },
    /// `expression BETWEEN low AND high`, inclusive on both ends
    Between {
        expression: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
    },
    /// A LIKE pattern match. The pattern escapes its wildcards with a backslash.
    Like {
        expression: Box<Expression>,
        pattern: Box<Expression>,
    },
    /// A json_object function call. Keys are rendered as string literals.
    JsonObject(Vec<(String, Expression)>),
    /// A column reference
    ColumnReference(ColumnReference),
    /// An irreducible value
    Value(Value),
    /// A COUNT clause
    Count(CountType),
}

/// Represents the name of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

/// A binary operator when the rhs is an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryArrayOperator {
    In,
    NotIn,
}

/// COUNT clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountType {
    Star,
}

/// Value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i64),
    Float8(f64),
    Bool(bool),
    String(String),
    Null,
}

/// A database table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(pub String);

/// A reference to a table. Used when we want to query it,
/// for example in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableReference {
    /// refers to a db table object name
    DBTable(TableName),
    /// refers to an alias we created
    AliasedTable(TableAlias),
}

/// A database table's column name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnName(pub String);

/// A reference to a column. Used when we want to query it,
/// for example in a SELECT list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnReference {
    /// refers to a db column object name
    TableColumn {
        table: TableReference,
        name: ColumnName,
    },
}

/// aliases that we give to relations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAlias {
    pub name: String,
}

/// aliases that we give to columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnAlias {
    pub name: String,
}
