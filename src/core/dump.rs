/// Dump execution
///
/// Runs the engine's native dump tool inside the container and streams its
/// stdout into a file under the backup root. The file name only depends on
/// the container and engine, so a rerun overwrites the previous dump.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::core::classifier::EngineKind;
use crate::core::credentials::MySqlCredentials;
use crate::core::docker::{ContainerRuntime, ExecRequest, OutputChunk, RuntimeError};
use crate::core::error::{BackupError, Result};
use crate::utils::{MYSQL_PASSWORD_ENV, POSTGRES_OS_USER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpResult {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Set once the header check passed
    pub verified: bool,
}

/// `{label}_{container}[_{user}]_{engine}.sql`
pub fn dump_file_name(label: &str, container: &str, user: Option<&str>, engine: EngineKind) -> String {
    match user {
        Some(user) => format!("{}_{}_{}_{}.sql", label, container, user, engine.tag()),
        None => format!("{}_{}_{}.sql", label, container, engine.tag()),
    }
}

pub struct DumpExecutor<'a> {
    runtime: &'a dyn ContainerRuntime,
    out_dir: &'a Path,
}

impl<'a> DumpExecutor<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, out_dir: &'a Path) -> Self {
        Self { runtime, out_dir }
    }

    /// `pg_dumpall` as the `postgres` OS user, which covers every database
    /// in the cluster plus roles
    pub async fn dump_postgres(&self, container: &str, label: &str, user: &str) -> Result<DumpResult> {
        let engine = EngineKind::Postgres;
        let path = self.out_dir.join(dump_file_name(label, container, None, engine));
        info!("Dumping {} database to {}", engine, path.display());

        let request = ExecRequest {
            cmd: vec!["pg_dumpall".into(), "--username".into(), user.into()],
            user: Some(POSTGRES_OS_USER.to_string()),
            env: vec![],
        };

        let bytes_written = self
            .stream_to_file(container, request, &path)
            .await
            .map_err(|e| BackupError::execution(container, engine.tag(), e))?;

        Ok(DumpResult {
            path,
            bytes_written,
            verified: false,
        })
    }

    /// `mysqldump` for MySQL and MariaDB. The password travels in the exec
    /// environment so it never shows up in the container's process list.
    pub async fn dump_mysql_like(
        &self,
        container: &str,
        label: &str,
        engine: EngineKind,
        credentials: &MySqlCredentials,
    ) -> Result<DumpResult> {
        let path = self.out_dir.join(dump_file_name(
            label,
            container,
            Some(&credentials.user),
            engine,
        ));
        info!("Dumping {} database to {}", engine, path.display());

        let request = ExecRequest {
            cmd: vec![
                "mysqldump".into(),
                "-u".into(),
                credentials.user.clone(),
                "--no-tablespaces".into(),
                credentials.database.clone(),
            ],
            user: None,
            env: vec![format!("{}={}", MYSQL_PASSWORD_ENV, credentials.password)],
        };

        let bytes_written = self
            .stream_to_file(container, request, &path)
            .await
            .map_err(|e| BackupError::execution(container, engine.tag(), e))?;

        Ok(DumpResult {
            path,
            bytes_written,
            verified: false,
        })
    }

    /// Write stdout chunks in arrival order until the stream ends.
    /// stderr never reaches the dump file.
    async fn stream_to_file(
        &self,
        container: &str,
        request: ExecRequest,
        path: &Path,
    ) -> std::result::Result<u64, RuntimeError> {
        let mut output = self.runtime.exec(container, request).await?;
        let mut file = File::create(path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = output.next().await {
            match chunk? {
                OutputChunk::Stdout(data) => {
                    file.write_all(&data).await?;
                    written += data.len() as u64;
                }
                OutputChunk::Stderr(data) => {
                    warn!(
                        container = %container,
                        "{}",
                        String::from_utf8_lossy(&data).trim_end()
                    );
                }
            }
        }

        file.flush().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::docker::MockContainerRuntime;
    use futures::stream;

    fn output(chunks: Vec<OutputChunk>) -> crate::core::docker::OutputStream {
        stream::iter(chunks.into_iter().map(Ok)).boxed()
    }

    #[test]
    fn test_dump_file_names() {
        assert_eq!(
            dump_file_name("_srv_app", "app_db_1", None, EngineKind::Postgres),
            "_srv_app_app_db_1_postgres.sql"
        );
        assert_eq!(
            dump_file_name("_opt_icinga", "icinga_mariadb_1", Some("root"), EngineKind::MariaDb),
            "_opt_icinga_icinga_mariadb_1_root_mariadb.sql"
        );
    }

    #[tokio::test]
    async fn test_postgres_dump_runs_pg_dumpall_as_postgres() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_exec()
            .withf(|container, request| {
                container == "app_db_1"
                    && request.cmd == ["pg_dumpall", "--username", "admin"]
                    && request.user.as_deref() == Some("postgres")
                    && request.env.is_empty()
            })
            .times(1)
            .returning(|_, _| {
                Ok(output(vec![
                    OutputChunk::Stdout(b"--\n-- PostgreSQL database ".to_vec()),
                    OutputChunk::Stderr(b"pg_dumpall: warning\n".to_vec()),
                    OutputChunk::Stdout(b"cluster dump\n--\n".to_vec()),
                ]))
            });

        let executor = DumpExecutor::new(&runtime, dir.path());
        let result = executor.dump_postgres("app_db_1", "_srv_app", "admin").await.unwrap();

        assert_eq!(result.path, dir.path().join("_srv_app_app_db_1_postgres.sql"));
        assert!(!result.verified);
        let content = std::fs::read_to_string(&result.path).unwrap();
        assert_eq!(content, "--\n-- PostgreSQL database cluster dump\n--\n");
        assert_eq!(result.bytes_written, content.len() as u64);
    }

    #[tokio::test]
    async fn test_mysql_dump_passes_password_in_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_exec()
            .withf(|_, request| {
                request.cmd == ["mysqldump", "-u", "shop", "--no-tablespaces", "orders"]
                    && request.user.is_none()
                    && request.env == ["MYSQL_PWD=s3cret"]
                    && !request.cmd.iter().any(|arg| arg.contains("s3cret"))
            })
            .times(1)
            .returning(|_, _| Ok(output(vec![OutputChunk::Stdout(b"-- MySQL dump 10.13\n".to_vec())])));

        let credentials = MySqlCredentials {
            user: "shop".into(),
            password: "s3cret".into(),
            database: "orders".into(),
        };
        let executor = DumpExecutor::new(&runtime, dir.path());
        let result = executor
            .dump_mysql_like("shop_db", "shop", EngineKind::MySql, &credentials)
            .await
            .unwrap();

        assert_eq!(result.path, dir.path().join("shop_shop_db_shop_mysql.sql"));
        assert_eq!(result.bytes_written, 20);
    }

    #[tokio::test]
    async fn test_exec_failure_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_exec()
            .returning(|container, _| Err(RuntimeError::NotFound(container.to_string())));

        let executor = DumpExecutor::new(&runtime, dir.path());
        let err = executor.dump_postgres("gone", "gone", "postgres").await.unwrap_err();

        assert!(matches!(
            err,
            BackupError::Execution { ref container, source: RuntimeError::NotFound(_), .. } if container == "gone"
        ));
        assert!(!dir.path().join("gone_gone_postgres.sql").exists());
    }

    #[tokio::test]
    async fn test_stream_error_mid_dump_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_exec().returning(|_, _| {
            Ok(stream::iter(vec![
                Ok(OutputChunk::Stdout(b"-- MariaDB dump".to_vec())),
                Err(RuntimeError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "connection reset",
                ))),
            ])
            .boxed())
        });

        let credentials = MySqlCredentials {
            user: "root".into(),
            password: "pw".into(),
            database: "icinga".into(),
        };
        let executor = DumpExecutor::new(&runtime, dir.path());
        let err = executor
            .dump_mysql_like("icinga_mariadb_1", "icinga", EngineKind::MariaDb, &credentials)
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Execution { ref engine, .. } if engine == "mariadb"));
    }
}
