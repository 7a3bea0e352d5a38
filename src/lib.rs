pub mod cni;
pub mod config;
pub mod kubernetes;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid cidr {cidr}: {source}")]
    InvalidCidr {
        cidr: String,
        source: ipnetwork::IpNetworkError,
    },

    #[error("failed to process cni config template {}: {reason}", path.display())]
    Template { path: PathBuf, reason: String },

    #[error("filesystem error on {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("network plugin is not ready: {0}")]
    PluginNotReady(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
