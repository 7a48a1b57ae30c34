use std::path::PathBuf;

use sprinkler_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain-level error (not found, conflict, validation).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed schedule document {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
