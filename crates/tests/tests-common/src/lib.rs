//! Fixtures shared by the integration tests of the workspace.

pub mod deployment;
pub mod fixtures;
