/// Dump header verification
///
/// A cheap sanity check, not an integrity proof: both dump tools write a
/// fixed banner before any data, and a failed exec (wrong user, missing
/// binary, bad password) produces an error message instead.

use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::core::classifier::EngineKind;
use crate::core::error::{BackupError, Result};
use crate::utils::{HEADER_PEEK_BYTES, POSTGRES_DUMP_SIGNATURE};

/// Whether the first bytes of a dump look like output of the engine's tool
pub fn header_matches(prefix: &str, engine: EngineKind) -> bool {
    match engine {
        EngineKind::Postgres => prefix.contains(POSTGRES_DUMP_SIGNATURE),
        EngineKind::MySql | EngineKind::MariaDb => prefix
            .to_lowercase()
            .starts_with(&format!("-- {} dump", engine.tag())),
    }
}

async fn read_prefix(path: &Path) -> std::io::Result<String> {
    let file = File::open(path).await?;
    let mut buf = Vec::with_capacity(HEADER_PEEK_BYTES as usize);
    file.take(HEADER_PEEK_BYTES).read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub async fn verify(container: &str, path: &Path, engine: EngineKind) -> Result<()> {
    let prefix = read_prefix(path)
        .await
        .map_err(|e| BackupError::execution(container, engine.tag(), e))?;

    if header_matches(&prefix, engine) {
        Ok(())
    } else {
        Err(BackupError::Verification {
            container: container.to_string(),
            path: path.to_path_buf(),
            prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_signature_anywhere_in_prefix() {
        let header = "--\n-- PostgreSQL database cluster dump\n--\n\nSET default_transaction_read_only = off;";
        assert!(header_matches(header, EngineKind::Postgres));
        assert!(!header_matches("pg_dumpall: error: connection failed", EngineKind::Postgres));
    }

    #[test]
    fn test_mysql_like_header_is_case_insensitive_prefix() {
        assert!(header_matches("-- MySQL dump 10.13  Distrib 8.0.33", EngineKind::MySql));
        assert!(header_matches("-- MariaDB dump 10.19-11.1.2-MariaDB", EngineKind::MariaDb));
        assert!(!header_matches("-- MySQL dump 10.13", EngineKind::MariaDb));
        assert!(!header_matches(
            "mysqldump: Got error: 1045: Access denied\n-- MySQL dump",
            EngineKind::MySql
        ));
    }

    #[tokio::test]
    async fn test_verify_reads_only_the_head() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late_banner_postgres.sql");
        let mut content = "x".repeat(HEADER_PEEK_BYTES as usize);
        content.push_str(POSTGRES_DUMP_SIGNATURE);
        std::fs::write(&path, content).unwrap();

        let err = verify("db", &path, EngineKind::Postgres).await.unwrap_err();
        match err {
            BackupError::Verification { prefix, .. } => {
                assert_eq!(prefix.len(), HEADER_PEEK_BYTES as usize)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_verify_accepts_valid_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db_mysql.sql");
        std::fs::write(&path, "-- MySQL dump 10.13\n--\n-- Host: localhost").unwrap();

        assert!(verify("db", &path, EngineKind::MySql).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_missing_file_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify("db", &dir.path().join("missing.sql"), EngineKind::Postgres)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Execution { .. }));
    }
}
