//! Handle the translation of literal values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use query_engine_metadata::metadata::database::ScalarType;
use query_engine_sql::sql;

use crate::translation::error::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Convert a JSON value from a changed record into a SQL value of the column's type.
pub fn translate_json_value(
    value: &serde_json::Value,
    scalar_type: ScalarType,
) -> Result<sql::ast::Value, Error> {
    let mismatch = || Error::TypeMismatch(value.clone(), scalar_type);
    if value.is_null() {
        return Ok(sql::ast::Value::Null);
    }
    match scalar_type {
        ScalarType::Boolean => match value {
            serde_json::Value::Bool(b) => Ok(sql::ast::Value::Int8(i64::from(*b))),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i @ (0 | 1)) => Ok(sql::ast::Value::Int8(i)),
                _ => Err(mismatch()),
            },
            serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(sql::ast::Value::Int8(1)),
                "false" | "0" => Ok(sql::ast::Value::Int8(0)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        ScalarType::Integer => match parse_number(value) {
            Some(sql::ast::Value::Int8(i)) => Ok(sql::ast::Value::Int8(i)),
            _ => Err(mismatch()),
        },
        ScalarType::Real => match parse_number(value) {
            Some(sql::ast::Value::Int8(i)) => {
                #[allow(clippy::cast_precision_loss)]
                Ok(sql::ast::Value::Float8(i as f64))
            }
            Some(float @ sql::ast::Value::Float8(_)) => Ok(float),
            _ => Err(mismatch()),
        },
        ScalarType::Text => parse_text(value)
            .map(sql::ast::Value::String)
            .ok_or_else(mismatch),
        ScalarType::Date => value
            .as_str()
            .and_then(parse_date)
            .map(|date| sql::ast::Value::String(date.format(DATE_FORMAT).to_string()))
            .ok_or_else(mismatch),
        ScalarType::Timestamp => value
            .as_str()
            .and_then(parse_timestamp)
            .map(|ts| sql::ast::Value::String(ts.format(TIMESTAMP_FORMAT).to_string()))
            .ok_or_else(mismatch),
        ScalarType::Any => match value {
            serde_json::Value::Bool(b) => Ok(sql::ast::Value::Int8(i64::from(*b))),
            serde_json::Value::Number(_) => parse_number(value).ok_or_else(mismatch),
            serde_json::Value::String(s) => Ok(sql::ast::Value::String(s.clone())),
            _ => Err(Error::NotSupported("nested values".to_string())),
        },
    }
}

/// A JSON number or numeric string as an integer, or as a float when it has
/// a fractional part.
pub fn parse_number(value: &serde_json::Value) -> Option<sql::ast::Value> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(sql::ast::Value::Int8)
            .or_else(|| n.as_f64().map(sql::ast::Value::Float8)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(sql::ast::Value::Int8)
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(sql::ast::Value::Float8)
                })
        }
        _ => None,
    }
}

/// A JSON string, or a number as its textual form.
pub fn parse_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY` and timestamps; only the date is kept.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
        .or_else(|| parse_timestamp(value).map(|ts| ts.date()))
}

/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS[.f]` (with a space or a `T`),
/// and plain dates at midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// The first instant of a day, formatted for a column of the given type.
pub fn start_of_day(date: NaiveDate, scalar_type: ScalarType) -> String {
    if scalar_type == ScalarType::Date {
        date.format(DATE_FORMAT).to_string()
    } else {
        format!("{} 00:00:00", date.format(DATE_FORMAT))
    }
}

/// The last instant of a day, formatted for a column of the given type.
pub fn end_of_day(date: NaiveDate, scalar_type: ScalarType) -> String {
    if scalar_type == ScalarType::Date {
        date.format(DATE_FORMAT).to_string()
    } else {
        format!("{} 23:59:59.999999", date.format(DATE_FORMAT))
    }
}

/// Escape the LIKE wildcards of a user supplied value. Patterns are rendered
/// with `ESCAPE '\'`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dates_parse_in_the_grid_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("03/09/2024"), expected);
        assert_eq!(parse_date("2024-03-09T10:30:00Z"), expected);
        assert_eq!(parse_date("2024-03-09 10:30:00"), expected);
        assert_eq!(parse_date("9 March"), None);
    }

    #[test]
    fn day_bounds_depend_on_the_column_type() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(start_of_day(date, ScalarType::Date), "2024-03-09");
        assert_eq!(end_of_day(date, ScalarType::Date), "2024-03-09");
        assert_eq!(start_of_day(date, ScalarType::Timestamp), "2024-03-09 00:00:00");
        assert_eq!(
            end_of_day(date, ScalarType::Timestamp),
            "2024-03-09 23:59:59.999999"
        );
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like(r"50%_off\now"), r"50\%\_off\\now");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        assert_eq!(parse_number(&json!(3)), Some(sql::ast::Value::Int8(3)));
        assert_eq!(parse_number(&json!(" 42 ")), Some(sql::ast::Value::Int8(42)));
        assert_eq!(parse_number(&json!("2.5")), Some(sql::ast::Value::Float8(2.5)));
        assert_eq!(parse_number(&json!("abc")), None);
        assert_eq!(parse_number(&json!([1])), None);
    }

    #[test]
    fn changed_values_are_converted_to_the_column_type() {
        assert_eq!(
            translate_json_value(&json!("36"), ScalarType::Integer),
            Ok(sql::ast::Value::Int8(36))
        );
        assert_eq!(
            translate_json_value(&json!(true), ScalarType::Boolean),
            Ok(sql::ast::Value::Int8(1))
        );
        assert_eq!(
            translate_json_value(&json!("12/31/1999"), ScalarType::Date),
            Ok(sql::ast::Value::String("1999-12-31".to_string()))
        );
        assert_eq!(
            translate_json_value(&json!("2024-01-02T03:04:05Z"), ScalarType::Timestamp),
            Ok(sql::ast::Value::String("2024-01-02 03:04:05".to_string()))
        );
        assert_eq!(
            translate_json_value(&json!(null), ScalarType::Text),
            Ok(sql::ast::Value::Null)
        );
    }

    #[test]
    fn unconvertible_values_are_type_mismatches() {
        assert_eq!(
            translate_json_value(&json!("old"), ScalarType::Integer),
            Err(Error::TypeMismatch(json!("old"), ScalarType::Integer))
        );
        assert_eq!(
            translate_json_value(&json!(2.5), ScalarType::Integer),
            Err(Error::TypeMismatch(json!(2.5), ScalarType::Integer))
        );
        assert_eq!(
            translate_json_value(&json!({"a": 1}), ScalarType::Text),
            Err(Error::TypeMismatch(json!({"a": 1}), ScalarType::Text))
        );
    }
}
