//! Convert a SQL AST to a low-level SQL string.

use super::ast::*;
use super::helpers;
use super::string::*;

// Convert to SQL strings

impl SelectList {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            SelectList::SelectList(select_list) => {
                for (index, (col, expr)) in select_list.iter().enumerate() {
                    expr.to_sql(sql);
                    sql.append_syntax(" AS ");
                    col.to_sql(sql);
                    if index < (select_list.len() - 1) {
                        sql.append_syntax(", ");
                    }
                }
            }
            SelectList::SelectStar => {
                sql.append_syntax("*");
            }
        }
    }
}

impl Select {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("SELECT ");

        self.select_list.to_sql(sql);

        if let Some(from) = &self.from {
            sql.append_syntax(" ");
            from.to_sql(sql);
        }

        for join in &self.joins {
            join.to_sql(sql);
        }

        self.where_.to_sql(sql);

        self.order_by.to_sql(sql);

        self.limit.to_sql(sql);
    }
}

impl Update {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("UPDATE ");
        self.table.to_sql(sql);
        sql.append_syntax(" SET ");
        for (index, (column, value)) in self.set.iter().enumerate() {
            column.to_sql(sql);
            sql.append_syntax(" = ");
            value.to_sql(sql);
            if index < (self.set.len() - 1) {
                sql.append_syntax(", ");
            }
        }
        self.where_.to_sql(sql);
    }
}

impl Delete {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("DELETE FROM ");
        self.table.to_sql(sql);
        self.where_.to_sql(sql);
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("FROM ");
        match &self {
            From::Table { reference, alias } => {
                reference.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }
        }
    }
}

impl Join {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Join::LeftOuterJoin(join) => {
                sql.append_syntax(" LEFT OUTER JOIN ");
                join.reference.to_sql(sql);
                sql.append_syntax(" AS ");
                join.alias.to_sql(sql);
                sql.append_syntax(" ON ");
                join.on.to_sql(sql);
            }
        }
    }
}

impl Where {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Where(expression) = self;
        if *expression != helpers::true_expr() {
            sql.append_syntax(" WHERE ");
            expression.to_sql(sql);
        }
    }
}

// scalars
impl Expression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Expression::ColumnReference(column_reference) => column_reference.to_sql(sql),
            Expression::Value(value) => value.to_sql(sql),
            Expression::And { left, right } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                sql.append_syntax(" AND ");
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Or { left, right } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                sql.append_syntax(" OR ");
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Not(expr) => {
                sql.append_syntax("NOT ");
                expr.to_sql(sql);
            }
            Expression::BinaryOperation {
                left,
                operator,
                right,
            } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                operator.to_sql(sql);
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::BinaryArrayOperation {
                left,
                operator,
                right,
            } => {
                sql.append_syntax("(");
                {
                    left.to_sql(sql);
                    operator.to_sql(sql);
                    sql.append_syntax("(");
                    for (index, item) in right.iter().enumerate() {
                        item.to_sql(sql);
                        if index < (right.len() - 1) {
                            sql.append_syntax(", ");
                        }
                    }
                    sql.append_syntax(")");
                }
                sql.append_syntax(")");
            }
            Expression::Between {
                expression,
                low,
                high,
            } => {
                sql.append_syntax("(");
                expression.to_sql(sql);
                sql.append_syntax(" BETWEEN ");
                low.to_sql(sql);
                sql.append_syntax(" AND ");
                high.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Like {
                expression,
                pattern,
            } => {
                sql.append_syntax("(");
                expression.to_sql(sql);
                sql.append_syntax(" LIKE ");
                pattern.to_sql(sql);
                sql.append_syntax(" ESCAPE '\\')");
            }
            Expression::JsonObject(items) => {
                sql.append_syntax("json_object(");
                for (index, (label, item)) in items.iter().enumerate() {
                    sql.append_string_literal(label);
                    sql.append_syntax(", ");
                    item.to_sql(sql);
                    if index < (items.len() - 1) {
                        sql.append_syntax(", ");
                    }
                }
                sql.append_syntax(")");
            }
            Expression::Count(count_type) => {
                sql.append_syntax("COUNT(");
                count_type.to_sql(sql);
                sql.append_syntax(")");
            }
        }
    }
}

impl BinaryOperator {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            BinaryOperator::Equals => sql.append_syntax(" = "),
            BinaryOperator::NotEquals => sql.append_syntax(" <> "),
            BinaryOperator::GreaterThan => sql.append_syntax(" > "),
            BinaryOperator::GreaterThanOrEqualTo => sql.append_syntax(" >= "),
            BinaryOperator::LessThan => sql.append_syntax(" < "),
            BinaryOperator::LessThanOrEqualTo => sql.append_syntax(" <= "),
        }
    }
}

impl BinaryArrayOperator {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            BinaryArrayOperator::In => sql.append_syntax(" IN "),
            BinaryArrayOperator::NotIn => sql.append_syntax(" NOT IN "),
        }
    }
}

impl CountType {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            CountType::Star => sql.append_syntax("*"),
        }
    }
}

impl Value {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Value::Int8(i) => sql.append_param(Param::Integer(*i)),
            Value::Float8(f) => sql.append_param(Param::Float(*f)),
            Value::String(s) => sql.append_param(Param::String(s.clone())),
            Value::Bool(true) => sql.append_syntax("true"),
            Value::Bool(false) => sql.append_syntax("false"),
            Value::Null => sql.append_syntax("NULL"),
        }
    }
}

impl Limit {
    pub fn to_sql(&self, sql: &mut SQL) {
        match (self.limit, self.offset) {
            (None, None) => (),
            (Some(limit), offset) => {
                sql.append_syntax(" LIMIT ");
                sql.append_syntax(format!("{limit}").as_str());
                if let Some(offset) = offset {
                    sql.append_syntax(" OFFSET ");
                    sql.append_syntax(format!("{offset}").as_str());
                }
            }
            // SQLite only accepts OFFSET after a LIMIT; a negative limit means "no limit".
            (None, Some(offset)) => {
                sql.append_syntax(" LIMIT -1 OFFSET ");
                sql.append_syntax(format!("{offset}").as_str());
            }
        }
    }
}

// names
impl TableName {
    pub fn to_sql(&self, sql: &mut SQL) {
        let TableName(name) = self;
        sql.append_identifier(name);
    }
}

impl TableReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            TableReference::DBTable(table) => table.to_sql(sql),
            TableReference::AliasedTable(alias) => alias.to_sql(sql),
        };
    }
}

impl TableAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl ColumnName {
    pub fn to_sql(&self, sql: &mut SQL) {
        let ColumnName(name) = self;
        sql.append_identifier(name);
    }
}

impl ColumnReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            ColumnReference::TableColumn { table, name } => {
                table.to_sql(sql);
                sql.append_syntax(".");
                name.to_sql(sql);
            }
        };
    }
}

impl ColumnAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" ORDER BY ");
            for (index, order_by_item) in self.elements.iter().enumerate() {
                order_by_item.to_sql(sql);
                if index < (self.elements.len() - 1) {
                    sql.append_syntax(", ");
                }
            }
        }
    }
}

impl OrderByElement {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.target.to_sql(sql);
        self.direction.to_sql(sql);
    }
}

impl OrderByDirection {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            OrderByDirection::Asc => sql.append_syntax(" ASC"),
            OrderByDirection::Desc => sql.append_syntax(" DESC"),
        }
    }
}
