use std::path::PathBuf;

/// Errors from loading or editing network settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a valid IPv4 address: {0:?}")]
    InvalidIpv4(String),
}
