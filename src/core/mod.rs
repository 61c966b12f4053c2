pub mod error;
pub mod docker;
pub mod classifier;
pub mod credentials;
pub mod config;
pub mod dump;
pub mod verify;
pub mod backup;

pub use backup::BackupManager;
pub use classifier::{EngineKind, RunMode};
pub use docker::{ContainerRuntime, DockerRuntime};
pub use error::BackupError;
