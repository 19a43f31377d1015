use std::path::PathBuf;

use thiserror::Error;

use crate::types::AppId;

#[derive(Debug, Error)]
pub enum EmergenceError {
    #[error("unknown app {0}")]
    UnknownApp(AppId),
    #[error("no apps in network")]
    EmptyNetwork,
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T, E = EmergenceError> = std::result::Result<T, E>;
