//! Handle filtering/where clauses translation.
//!
//! Each search spec is parsed into a [`Predicate`]; specs that do not parse
//! are dropped. User values only ever reach the SQL as parameters.

use grid_models::SearchSpec;
use query_engine_sql::sql;

use super::fields::FieldToken;
use super::values;
use crate::translation::helpers::{Column, Env};

/// The connective joining the predicates of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// `OR` in any case is a disjunction, anything else a conjunction.
    pub fn parse(token: Option<&str>) -> Self {
        match token {
            Some(token) if token.trim().eq_ignore_ascii_case("or") => LogicalOperator::Or,
            _ => LogicalOperator::And,
        }
    }

    fn combine(
        self,
        left: sql::ast::Expression,
        right: sql::ast::Expression,
    ) -> sql::ast::Expression {
        let (left, right) = (Box::new(left), Box::new(right));
        match self {
            LogicalOperator::And => sql::ast::Expression::And { left, right },
            LogicalOperator::Or => sql::ast::Expression::Or { left, right },
        }
    }
}

/// What a predicate demands of its column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Inclusive range between two rendered day bounds.
    DateRange { from: String, to: String },
    TextEquals(String),
    TextBegins(String),
    TextContains(String),
    TextEnds(String),
    IntEquals(sql::ast::Value),
    IntIn(Vec<sql::ast::Value>),
    IntNotIn(Vec<sql::ast::Value>),
    IntBetween(sql::ast::Value, sql::ast::Value),
}

/// One restriction on one relation-qualified column.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: sql::ast::Expression,
    pub condition: Condition,
}

impl Predicate {
    pub fn to_expression(&self) -> sql::ast::Expression {
        let column = Box::new(self.column.clone());
        let value = |v: &sql::ast::Value| Box::new(sql::ast::Expression::Value(v.clone()));
        let string = |s: String| Box::new(sql::ast::Expression::Value(sql::ast::Value::String(s)));
        let like = |pattern: String| sql::ast::Expression::Like {
            expression: column.clone(),
            pattern: string(pattern),
        };
        match &self.condition {
            Condition::DateRange { from, to } => sql::ast::Expression::Between {
                expression: column.clone(),
                low: string(from.clone()),
                high: string(to.clone()),
            },
            Condition::TextEquals(text) => sql::ast::Expression::BinaryOperation {
                left: column.clone(),
                operator: sql::ast::BinaryOperator::Equals,
                right: string(text.clone()),
            },
            Condition::TextBegins(text) => like(format!("{}%", values::escape_like(text))),
            Condition::TextContains(text) => like(format!("%{}%", values::escape_like(text))),
            Condition::TextEnds(text) => like(format!("%{}", values::escape_like(text))),
            Condition::IntEquals(number) => sql::ast::Expression::BinaryOperation {
                left: column.clone(),
                operator: sql::ast::BinaryOperator::Equals,
                right: value(number),
            },
            Condition::IntIn(numbers) | Condition::IntNotIn(numbers) => {
                sql::ast::Expression::BinaryArrayOperation {
                    left: column.clone(),
                    operator: if matches!(self.condition, Condition::IntIn(_)) {
                        sql::ast::BinaryArrayOperator::In
                    } else {
                        sql::ast::BinaryArrayOperator::NotIn
                    },
                    right: numbers
                        .iter()
                        .map(|n| sql::ast::Expression::Value(n.clone()))
                        .collect(),
                }
            }
            Condition::IntBetween(low, high) => sql::ast::Expression::Between {
                expression: column.clone(),
                low: value(low),
                high: value(high),
            },
        }
    }
}

/// Translate the search specs of a request into a single restriction, or
/// `None` when no spec produced a predicate.
pub fn translate_filter(
    env: &Env,
    search: &[SearchSpec],
    search_logic: Option<&str>,
) -> Option<sql::ast::Expression> {
    let logic = LogicalOperator::parse(search_logic);
    search
        .iter()
        .filter_map(|spec| {
            let predicate = parse_predicate(env, spec);
            if predicate.is_none() {
                tracing::trace!(?spec, "dropping search spec");
            }
            predicate
        })
        .map(|predicate| predicate.to_expression())
        .reduce(|left, right| logic.combine(left, right))
}

/// Parse one search spec against the grid. Unresolved fields, unknown
/// `(type, operator)` pairs and values of the wrong shape give `None`.
pub fn parse_predicate(env: &Env, spec: &SearchSpec) -> Option<Predicate> {
    let token = FieldToken::parse(spec.field.as_deref()?)?;
    let column = env.lookup_field(&token)?;
    let value = spec.value.as_ref()?;
    let condition = parse_condition(
        &column,
        spec.r#type.as_deref()?,
        spec.operator.as_deref()?,
        value,
    )?;
    Some(Predicate {
        column: column.expression(),
        condition,
    })
}

fn parse_condition(
    column: &Column,
    r#type: &str,
    operator: &str,
    value: &serde_json::Value,
) -> Option<Condition> {
    let scalar_type = column.info.r#type;
    match (r#type, operator) {
        ("date", "is") => {
            let date = values::parse_date(value.as_str()?)?;
            Some(Condition::DateRange {
                from: values::start_of_day(date, scalar_type),
                to: values::end_of_day(date, scalar_type),
            })
        }
        ("date", "between") => {
            let [from, to] = pair(value)?;
            let from = values::parse_date(from.as_str()?)?;
            let to = values::parse_date(to.as_str()?)?;
            Some(Condition::DateRange {
                from: values::start_of_day(from, scalar_type),
                to: values::end_of_day(to, scalar_type),
            })
        }
        ("text", "is") => values::parse_text(value).map(Condition::TextEquals),
        ("text", "begins") => values::parse_text(value).map(Condition::TextBegins),
        ("text", "contains") => values::parse_text(value).map(Condition::TextContains),
        ("text", "ends") => values::parse_text(value).map(Condition::TextEnds),
        ("int", "is") => values::parse_number(value).map(Condition::IntEquals),
        ("int", "in") => number_list(value).map(Condition::IntIn),
        ("int", "not in") => number_list(value).map(Condition::IntNotIn),
        ("int", "between") => {
            let [low, high] = pair(value)?;
            Some(Condition::IntBetween(
                values::parse_number(low)?,
                values::parse_number(high)?,
            ))
        }
        _ => None,
    }
}

fn pair(value: &serde_json::Value) -> Option<[&serde_json::Value; 2]> {
    match value.as_array()?.as_slice() {
        [first, second] => Some([first, second]),
        _ => None,
    }
}

/// A non-empty list of numbers. One unparseable member spoils the list.
fn number_list(value: &serde_json::Value) -> Option<Vec<sql::ast::Value>> {
    let numbers = value
        .as_array()?
        .iter()
        .map(values::parse_number)
        .collect::<Option<Vec<_>>>()?;
    (!numbers.is_empty()).then_some(numbers)
}

