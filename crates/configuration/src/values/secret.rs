use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::environment::{self, Environment, Variable};

/// A value given either in plain text or by the name of the environment
/// variable holding it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Secret {
    Plain(String),
    FromEnvironment { variable: Variable },
}

impl Secret {
    /// The value of the secret in the given environment.
    pub fn resolve(&self, environment: impl Environment) -> Result<String, environment::Error> {
        match self {
            Secret::Plain(value) => Ok(value.clone()),
            Secret::FromEnvironment { variable } => environment.read(variable),
        }
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret::Plain(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}
