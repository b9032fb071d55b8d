//! Deployment functions used across test cases.

use std::path::PathBuf;

/// The directory of the configuration shipped with the repository.
pub const STATIC_DEPLOYMENT_PATH: &str = "static";

pub mod helpers {
    use super::PathBuf;

    /// Find the project root via the crate root provided by `cargo test`,
    /// and resolve a path relative to it.
    /// This depends on the convention that our crates live in
    /// `/crates/<group>/<name>`.
    pub fn get_path_from_project_root(path: impl AsRef<std::path::Path>) -> PathBuf {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push("../../../");
        d.push(path);
        d
    }
}
