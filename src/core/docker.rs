/// Docker integration
///
/// The backup pipeline only needs three things from the container runtime:
/// list running containers, inspect one by name, and run a command inside it
/// while streaming the output back. `ContainerRuntime` is that seam and
/// `DockerRuntime` implements it on top of the Docker Engine API.

use async_trait::async_trait;
use bollard::container::{ListContainersOptions, LogOutput};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use bollard::Docker;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::utils::{sanitize_label, COMPOSE_WORKING_DIR_LABEL};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Docker API error: {0}")]
    Api(#[from] bollard::errors::Error),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("exec in container {0} started detached, no output to capture")]
    Detached(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Snapshot of a container's metadata taken once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub name: String,
    pub image: String,
    /// Raw `KEY=VALUE` entries in the order Docker reports them
    pub env: Vec<String>,
    pub labels: HashMap<String, String>,
}

impl ContainerDescriptor {
    /// Compose working directory with `/` replaced by `_`, or the container
    /// name when the container was not started by compose.
    pub fn working_dir_label(&self) -> String {
        match self.labels.get(COMPOSE_WORKING_DIR_LABEL) {
            Some(dir) => sanitize_label(dir),
            None => {
                warn!(
                    "Could not get working_dir of container {}. Using {}",
                    self.name, self.name
                );
                self.name.clone()
            }
        }
    }
}

/// Command to run inside a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
    pub cmd: Vec<String>,
    /// OS user inside the container, `None` for the image default
    pub user: Option<String>,
    /// Extra `KEY=VALUE` entries for the exec environment
    pub env: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

pub type OutputStream = BoxStream<'static, Result<OutputChunk, RuntimeError>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Running containers in the order the runtime lists them
    async fn list_running(&self) -> Result<Vec<ContainerDescriptor>, RuntimeError>;

    async fn inspect(&self, name: &str) -> Result<ContainerDescriptor, RuntimeError>;

    /// Start `request` inside `container` and return its output as it arrives
    async fn exec(&self, container: &str, request: ExecRequest) -> Result<OutputStream, RuntimeError>;
}

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect through the local socket or `DOCKER_HOST`
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    fn summary_name(summary: &ContainerSummary) -> Option<String> {
        summary
            .names
            .as_ref()
            .and_then(|names| names.first())
            .map(|n| n.trim_start_matches('/').to_string())
    }

    fn inspect_to_descriptor(inspect: ContainerInspectResponse) -> ContainerDescriptor {
        let name = inspect
            .name
            .as_deref()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();

        let config = inspect.config.unwrap_or_default();

        let image = config
            .image
            .or(inspect.image)
            .unwrap_or_else(|| "unknown".to_string());

        ContainerDescriptor {
            name,
            image,
            env: config.env.unwrap_or_default(),
            labels: config.labels.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running(&self) -> Result<Vec<ContainerDescriptor>, RuntimeError> {
        let options = Some(ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        });

        let summaries = self.docker.list_containers(options).await?;

        // The summary lacks the environment, so every container is inspected
        let mut descriptors = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let Some(reference) = summary.id.clone().or_else(|| Self::summary_name(&summary)) else {
                continue;
            };
            descriptors.push(self.inspect(&reference).await?);
        }

        Ok(descriptors)
    }

    async fn inspect(&self, name: &str) -> Result<ContainerDescriptor, RuntimeError> {
        match self.docker.inspect_container(name, None).await {
            Ok(inspect) => Ok(Self::inspect_to_descriptor(inspect)),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                Err(RuntimeError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exec(&self, container: &str, request: ExecRequest) -> Result<OutputStream, RuntimeError> {
        debug!(container = %container, cmd = ?request.cmd, user = ?request.user, "Executing command");

        let env = if request.env.is_empty() { None } else { Some(request.env) };
        let exec_options = CreateExecOptions {
            cmd: Some(request.cmd),
            user: request.user,
            env,
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = match self.docker.create_exec(container, exec_options).await {
            Ok(exec) => exec,
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                return Err(RuntimeError::NotFound(container.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        match self.docker.start_exec(&exec.id, None).await? {
            StartExecResults::Attached { output, .. } => {
                let stream = output.filter_map(|item| async move {
                    match item {
                        Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                            Some(Ok(OutputChunk::Stdout(message.to_vec())))
                        }
                        Ok(LogOutput::StdErr { message }) => {
                            Some(Ok(OutputChunk::Stderr(message.to_vec())))
                        }
                        Ok(LogOutput::StdIn { .. }) => None,
                        Err(e) => Some(Err(RuntimeError::from(e))),
                    }
                });
                Ok(stream.boxed())
            }
            StartExecResults::Detached => Err(RuntimeError::Detached(container.to_string())),
        }
    }
}
