//! Type definitions of a low-level SQL string representation.

use serde::Serialize;

/// A SQL statement and the parameters bound to its placeholders.
#[derive(Debug, PartialEq)]
pub struct SQL {
    pub sql: String,
    pub params: Vec<Param>,
    /// for internal use and tests only
    pub param_index: u64,
}

impl Default for SQL {
    fn default() -> Self {
        Self::new()
    }
}

/// A parameter for a parameterized query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    /// A literal string
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl SQL {
    pub fn new() -> SQL {
        SQL {
            sql: String::new(),
            params: vec![],
            param_index: 0,
        }
    }
    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }
    /// Append a double-quoted identifier. Embedded quotes are doubled.
    pub fn append_identifier(&mut self, sql: &str) {
        self.sql.push('"');
        self.sql.push_str(&sql.replace('"', "\"\""));
        self.sql.push('"');
    }
    /// Append a single-quoted string literal. Only used for names that come from
    /// configuration, never for request values.
    pub fn append_string_literal(&mut self, sql: &str) {
        self.sql.push('\'');
        self.sql.push_str(&sql.replace('\'', "''"));
        self.sql.push('\'');
    }
    pub fn append_param(&mut self, param: Param) {
        self.param_index += 1;
        self.sql.push_str(format!("${}", self.param_index).as_str());
        self.params.push(param);
    }
}
