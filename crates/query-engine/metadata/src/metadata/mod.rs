//! Metadata information regarding the database and tracked information.

pub mod database;
pub mod grids;

// re-export without modules
pub use database::*;
pub use grids::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    #[serde(default)]
    pub tables: TablesInfo,
    #[serde(default)]
    pub grids: GridsInfo,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            tables: TablesInfo::empty(),
            grids: GridsInfo::empty(),
        }
    }
}
