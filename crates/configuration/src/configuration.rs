//! Configuration for the adapter.

use query_engine_metadata::metadata;

use crate::values::PoolSettings;

/// The 'Configuration' type collects all the information necessary to serve requests at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration': secrets are resolved and the grid registry is
/// checked against the table metadata.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    pub pool_settings: PoolSettings,
    pub connection_uri: String,
}
