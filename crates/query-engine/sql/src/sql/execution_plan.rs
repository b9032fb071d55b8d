//! Describe the SQL execution plan.

use super::ast;
use super::string::SQL;

/// Definition of an execution plan to be run against the database.
#[derive(Debug)]
pub struct ExecutionPlan<Query> {
    /// The grid the plan was built for, used in logs and metrics.
    pub grid: String,
    pub query: Query,
}

/// A paged read: the restricted count and the page of rows.
#[derive(Debug)]
pub struct Query {
    pub count: ast::Select,
    pub rows: ast::Select,
}

impl Query {
    /// Render the counting query.
    pub fn count_sql(&self) -> SQL {
        let mut sql = SQL::new();
        self.count.to_sql(&mut sql);
        sql
    }

    /// Render the row-fetching query.
    pub fn rows_sql(&self) -> SQL {
        let mut sql = SQL::new();
        self.rows.to_sql(&mut sql);
        sql
    }
}

/// Fetch at most one record by its primary key.
#[derive(Debug)]
pub struct Lookup {
    pub select: ast::Select,
}

impl Lookup {
    pub fn query_sql(&self) -> SQL {
        let mut sql = SQL::new();
        self.select.to_sql(&mut sql);
        sql
    }
}

/// A single data-changing statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Update(ast::Update),
    Delete(ast::Delete),
}

impl Statement {
    pub fn query_sql(&self) -> SQL {
        let mut sql = SQL::new();
        match self {
            Statement::Update(update) => update.to_sql(&mut sql),
            Statement::Delete(delete) => delete.to_sql(&mut sql),
        }
        sql
    }
}

/// The statements that persist one record. They run inside a single transaction.
#[derive(Debug, Default)]
pub struct Mutation {
    pub statements: Vec<Statement>,
}

impl Mutation {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Build a read execution plan.
pub fn simple_query_execution_plan(
    grid: String,
    count: ast::Select,
    rows: ast::Select,
) -> ExecutionPlan<Query> {
    ExecutionPlan {
        grid,
        query: Query { count, rows },
    }
}
