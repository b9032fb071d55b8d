//! Where secrets named in the configuration are read from.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::OsString;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The name of an environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct Variable(Cow<'static, str>);

impl Variable {
    pub const fn from_static(name: &'static str) -> Self {
        Variable(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Variable(Cow::Owned(value))
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Variable(Cow::Owned(value.to_string()))
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the environment variable {0} is not set")]
    VariableNotPresent(Variable),
    #[error("the environment variable {0} is not valid unicode: {1:?}")]
    VariableNotUnicode(Variable, OsString),
}

/// A source of environment variables.
pub trait Environment {
    fn read(&self, variable: &Variable) -> Result<String, Error>;
}

impl<T: Environment> Environment for &T {
    fn read(&self, variable: &Variable) -> Result<String, Error> {
        (*self).read(variable)
    }
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn read(&self, variable: &Variable) -> Result<String, Error> {
        std::env::var(variable.as_str()).map_err(|err| match err {
            std::env::VarError::NotPresent => Error::VariableNotPresent(variable.clone()),
            std::env::VarError::NotUnicode(value) => {
                Error::VariableNotUnicode(variable.clone(), value)
            }
        })
    }
}

/// A fixed set of variables, for tests.
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment(HashMap<Variable, String>);

impl<const N: usize> From<[(Variable, String); N]> for FixedEnvironment {
    fn from(value: [(Variable, String); N]) -> Self {
        FixedEnvironment(value.into())
    }
}

impl Environment for FixedEnvironment {
    fn read(&self, variable: &Variable) -> Result<String, Error> {
        self.0
            .get(variable)
            .cloned()
            .ok_or_else(|| Error::VariableNotPresent(variable.clone()))
    }
}

/// An environment without any variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnvironment;

impl Environment for EmptyEnvironment {
    fn read(&self, variable: &Variable) -> Result<String, Error> {
        Err(Error::VariableNotPresent(variable.clone()))
    }
}
