//! Translate sort specs to an ORDER BY clause.

use grid_models::SortSpec;
use query_engine_metadata::metadata;
use query_engine_sql::sql;

use super::fields::FieldToken;
use crate::translation::helpers::Env;

/// Convert the sort specs of a request to an ORDER BY clause. Without sort
/// specs the grid's default order applies. Specs whose field does not resolve
/// or whose direction is neither `asc` nor `desc` are dropped.
pub fn translate_order_by(env: &Env, sort: &[SortSpec]) -> sql::ast::OrderBy {
    let elements = if sort.is_empty() {
        env.grid()
            .default_order
            .iter()
            .filter_map(|element| {
                order_by_element(env, &element.field, translate_direction(element.direction))
            })
            .collect()
    } else {
        sort.iter()
            .filter_map(|spec| {
                let element = spec.field.as_deref().and_then(|field| {
                    let direction = parse_direction(spec.direction.as_deref()?)?;
                    order_by_element(env, field, direction)
                });
                if element.is_none() {
                    tracing::trace!(?spec, "dropping sort spec");
                }
                element
            })
            .collect()
    };
    sql::ast::OrderBy { elements }
}

fn order_by_element(
    env: &Env,
    field: &str,
    direction: sql::ast::OrderByDirection,
) -> Option<sql::ast::OrderByElement> {
    let column = env.lookup_field(&FieldToken::parse(field)?)?;
    Some(sql::ast::OrderByElement {
        target: column.expression(),
        direction,
    })
}

fn parse_direction(direction: &str) -> Option<sql::ast::OrderByDirection> {
    let direction = direction.trim();
    if direction.eq_ignore_ascii_case("asc") {
        Some(sql::ast::OrderByDirection::Asc)
    } else if direction.eq_ignore_ascii_case("desc") {
        Some(sql::ast::OrderByDirection::Desc)
    } else {
        None
    }
}

fn translate_direction(direction: metadata::OrderDirection) -> sql::ast::OrderByDirection {
    match direction {
        metadata::OrderDirection::Asc => sql::ast::OrderByDirection::Asc,
        metadata::OrderDirection::Desc => sql::ast::OrderByDirection::Desc,
    }
}
