/// Error types for the backup pipeline
///
/// Every variant is fatal: the first one raised stops the whole run and is
/// reported once by `main`.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::docker::RuntimeError;

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Malformed CLI combination or config file
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A container was explicitly targeted but its image is not a known engine
    #[error("container not supported: {container} with image {image}")]
    Unsupported { container: String, image: String },

    /// MySQL/MariaDB user, password or database could not be discovered.
    /// `env` is the container's full environment with the values of
    /// secret-looking keys (`PASSWORD`, `SECRET`, `KEY`, `TOKEN`) replaced by
    /// `***HIDDEN***`.
    #[error(
        "MYSQL USER/PASSWORD/DATABASE not found in environment variables of container {container}:\n{env:?}"
    )]
    MissingCredentials { container: String, env: Vec<String> },

    /// The runtime could not list containers or create the backup root
    #[error("container runtime unavailable")]
    Runtime(#[from] RuntimeError),

    /// Container lookup, exec or file I/O failed while dumping
    #[error("could not create dump of {engine} container {container}")]
    Execution {
        container: String,
        engine: String,
        #[source]
        source: RuntimeError,
    },

    /// The dump header does not carry the engine signature
    #[error("creating dump for container {container} failed ({}):\n{prefix}", .path.display())]
    Verification {
        container: String,
        path: PathBuf,
        prefix: String,
    },
}

impl BackupError {
    pub fn execution(container: &str, engine: &str, source: impl Into<RuntimeError>) -> Self {
        Self::Execution {
            container: container.to_string(),
            engine: engine.to_string(),
            source: source.into(),
        }
    }
}
