//! Translate an incoming get-records `GridRequest`.

pub mod fields;
pub mod filtering;
pub mod sorting;
pub mod values;

use grid_models::GridRequest;
use query_engine_metadata::metadata;
use query_engine_sql::sql;

use super::error::Error;
use super::helpers::{self, Env};

/// Translate a read request to an execution plan: a count of every record
/// matching the restriction and one page of those records.
pub fn translate(
    metadata: &metadata::Metadata,
    grid_name: &str,
    request: &GridRequest,
) -> Result<sql::execution_plan::ExecutionPlan<sql::execution_plan::Query>, Error> {
    let env = Env::new(metadata, grid_name)?;

    let (from, joins) = helpers::from_and_joins(&env);
    let where_ = sql::ast::Where(
        filtering::translate_filter(
            &env,
            &request.search,
            request.search_logic.as_deref(),
        )
        .unwrap_or_else(sql::helpers::empty_where),
    );

    let count = sql::helpers::count_select(from.clone(), joins.clone(), where_.clone());

    let mut rows = sql::helpers::simple_select(fields::record_select_list(&env));
    rows.from = Some(from);
    rows.joins = joins;
    rows.where_ = where_;
    rows.order_by = sorting::translate_order_by(&env, &request.sort);
    rows.limit = translate_limit(env.grid(), request.limit, request.offset);

    tracing::debug!(grid = grid_name, ?rows, "SQL AST");
    Ok(sql::execution_plan::simple_query_execution_plan(
        grid_name.to_string(),
        count,
        rows,
    ))
}

/// Translate a lookup of one record by the primary key of the base
/// collection. An identifier that cannot be a key of the collection finds
/// nothing, so no plan is returned for it.
pub fn translate_lookup(
    env: &Env,
    id: &serde_json::Value,
) -> Result<Option<sql::execution_plan::ExecutionPlan<sql::execution_plan::Lookup>>, Error> {
    let primary_key = env.primary_key()?;
    let Ok(key) = values::translate_json_value(id, primary_key.info.r#type) else {
        return Ok(None);
    };
    if key == sql::ast::Value::Null {
        return Ok(None);
    }

    let (from, joins) = helpers::from_and_joins(env);
    let mut select = sql::helpers::simple_select(fields::record_select_list(env));
    select.from = Some(from);
    select.joins = joins;
    select.where_ = sql::ast::Where(sql::helpers::equals(
        primary_key.expression(),
        sql::ast::Expression::Value(key),
    ));
    select.limit = sql::ast::Limit {
        limit: Some(1),
        offset: None,
    };

    Ok(Some(sql::execution_plan::ExecutionPlan {
        grid: env.grid_name().to_string(),
        query: sql::execution_plan::Lookup { select },
    }))
}

/// The requested page size, or the grid's default, capped by the grid's maximum.
fn translate_limit(
    grid: &metadata::GridInfo,
    limit: Option<u32>,
    offset: Option<u32>,
) -> sql::ast::Limit {
    let limit = match (limit.or(grid.default_limit), grid.max_limit) {
        (Some(limit), Some(max)) => Some(limit.min(max)),
        (None, Some(max)) => Some(max),
        (limit, None) => limit,
    };
    sql::ast::Limit {
        limit,
        offset: offset.filter(|offset| *offset > 0),
    }
}
