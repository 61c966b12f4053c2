/// Manually configured containers
///
/// Some containers cannot be backed up from their metadata alone (no compose
/// labels, credentials not in the environment). An override names the
/// container and supplies everything discovery would have produced.

use serde::Deserialize;

use crate::core::classifier::EngineKind;
use crate::core::credentials::{Credentials, MySqlCredentials};
use crate::core::error::{BackupError, Result};
use crate::utils::{sanitize_label, DEFAULT_POSTGRES_USER};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverrideEntry {
    pub container_name: String,
    pub engine: EngineKind,
    /// Host directory used to namespace the dump file
    pub working_dir: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

impl OverrideEntry {
    pub fn working_dir_label(&self) -> String {
        sanitize_label(&self.working_dir)
    }

    /// Literal credentials for this entry. Postgres falls back to the default
    /// superuser; MySQL and MariaDB need all three values.
    pub fn credentials(&self) -> Result<Credentials> {
        match self.engine {
            EngineKind::Postgres => Ok(Credentials::Postgres {
                user: self
                    .user
                    .clone()
                    .unwrap_or_else(|| DEFAULT_POSTGRES_USER.to_string()),
            }),
            EngineKind::MySql | EngineKind::MariaDb => {
                match (&self.user, &self.password, &self.database) {
                    (Some(user), Some(password), Some(database)) => {
                        Ok(Credentials::MySql(MySqlCredentials {
                            user: user.clone(),
                            password: password.clone(),
                            database: database.clone(),
                        }))
                    }
                    _ => Err(BackupError::Configuration(format!(
                        "override for {} ({}) needs user, password and database",
                        self.container_name, self.engine
                    ))),
                }
            }
        }
    }
}

/// Reject overrides that could never be dumped, before any backup starts
pub fn validate_overrides(overrides: &[OverrideEntry]) -> Result<()> {
    for entry in overrides {
        entry.credentials()?;
    }
    Ok(())
}
