//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

/// The errors that can be thrown when parsing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {version} in {file_path}")]
    UnsupportedVersion { file_path: PathBuf, version: u32 },

    #[error("I/O error: {0}")]
    IoErrorButStringified(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when writing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when turning a parsed configuration into a
/// runtime one.
#[derive(Debug, thiserror::Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("invalid connection URI: {message}")]
    MissingEnvironmentVariable { message: String },
    #[error("the connection URI is empty")]
    EmptyConnectionUri,
    #[error("invalid grid configuration:\n{0}")]
    InvalidGrids(MultiError),
}

/// Several independent problems, reported together.
#[derive(Debug)]
pub struct MultiError(pub Vec<String>);

impl std::fmt::Display for MultiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
