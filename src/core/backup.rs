/// Backup orchestration
///
/// Ties classification, credential discovery, dump execution and header
/// verification together. Containers are processed one after another and the
/// first error ends the run; dumps already written stay on disk.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::core::classifier::{select_targets, EngineKind, RunMode, Target};
use crate::core::config::OverrideEntry;
use crate::core::credentials::{resolve_mysql_credentials, resolve_postgres_user, Credentials};
use crate::core::docker::{ContainerDescriptor, ContainerRuntime, RuntimeError};
use crate::core::dump::{DumpExecutor, DumpResult};
use crate::core::error::{BackupError, Result};
use crate::core::verify::verify;
use crate::utils::{format_bytes, mask_sensitive};

pub struct BackupManager<R: ContainerRuntime> {
    runtime: R,
    out_dir: PathBuf,
    overrides: Vec<OverrideEntry>,
}

impl<R: ContainerRuntime> BackupManager<R> {
    pub fn new(runtime: R, out_dir: impl Into<PathBuf>, overrides: Vec<OverrideEntry>) -> Self {
        Self {
            runtime,
            out_dir: out_dir.into(),
            overrides,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Back up every container selected by `mode`
    pub async fn run(&self, mode: &RunMode) -> Result<Vec<DumpResult>> {
        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(RuntimeError::from)?;

        let containers = self.runtime.list_running().await?;

        if *mode == RunMode::Sweep && !self.overrides.is_empty() {
            info!("Dumping {} override container(s) first", self.overrides.len());
        }

        let targets = select_targets(&containers, mode, &self.overrides);
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let result = match target {
                Target::Override(entry) => self.backup_override(entry).await?,
                Target::Container(container) => self.backup_one(container).await?,
            };
            results.push(result);
        }

        Ok(results)
    }

    /// Discover engine and credentials from the container's metadata, then dump
    pub async fn backup_one(&self, container: &ContainerDescriptor) -> Result<DumpResult> {
        info!("Start backing up container {}", container.name);
        let started = Instant::now();

        let label = container.working_dir_label();
        let engine = EngineKind::classify(&container.image).ok_or_else(|| BackupError::Unsupported {
            container: container.name.clone(),
            image: container.image.clone(),
        })?;

        let credentials = match engine {
            EngineKind::Postgres => Credentials::Postgres {
                user: resolve_postgres_user(&container.env),
            },
            EngineKind::MySql | EngineKind::MariaDb => {
                Credentials::MySql(resolve_mysql_credentials(&container.name, &container.env)?)
            }
        };

        let result = self
            .dump_and_verify(&container.name, &label, engine, &credentials)
            .await?;
        log_done(&container.name, &result, started);
        Ok(result)
    }

    /// Dump a container using the literal settings of its override entry
    pub async fn backup_override(&self, entry: &OverrideEntry) -> Result<DumpResult> {
        info!(
            "Start backing up override container {} ({})",
            entry.container_name, entry.engine
        );
        let started = Instant::now();

        let credentials = entry.credentials()?;
        if let Credentials::MySql(mysql) = &credentials {
            debug!(
                "Override {} connects as {} with password {}",
                entry.container_name,
                mysql.user,
                mask_sensitive(&mysql.password, 2)
            );
        }
        self.runtime
            .inspect(&entry.container_name)
            .await
            .map_err(|e| BackupError::execution(&entry.container_name, entry.engine.tag(), e))?;

        let result = self
            .dump_and_verify(
                &entry.container_name,
                &entry.working_dir_label(),
                entry.engine,
                &credentials,
            )
            .await?;
        log_done(&entry.container_name, &result, started);
        Ok(result)
    }

    async fn dump_and_verify(
        &self,
        container: &str,
        label: &str,
        engine: EngineKind,
        credentials: &Credentials,
    ) -> Result<DumpResult> {
        let executor = DumpExecutor::new(&self.runtime, &self.out_dir);

        let mut result = match credentials {
            Credentials::Postgres { user } => executor.dump_postgres(container, label, user).await?,
            Credentials::MySql(mysql) => {
                executor
                    .dump_mysql_like(container, label, engine, mysql)
                    .await?
            }
        };

        verify(container, &result.path, engine).await?;
        result.verified = true;
        Ok(result)
    }
}

fn log_done(container: &str, result: &DumpResult, started: Instant) {
    let elapsed = std::time::Duration::from_millis(started.elapsed().as_millis() as u64);
    info!(
        "Done backing up {}: {} ({}) in {}",
        container,
        result.path.display(),
        format_bytes(result.bytes_written),
        humantime::format_duration(elapsed)
    );
}
