/// Credential discovery from a container's environment
///
/// Official database images take their bootstrap account from well-known
/// environment variables; the same values are what the dump tools need.

use std::collections::HashMap;
use tracing::warn;

use crate::core::error::{BackupError, Result};
use crate::utils::{redact_env, DEFAULT_POSTGRES_USER};

/// `KEY=VALUE` entries keyed by name, remembering where each key was last seen
#[derive(Debug, Default)]
pub struct EnvMap<'a> {
    entries: HashMap<&'a str, (usize, &'a str)>,
}

impl<'a> EnvMap<'a> {
    /// Entries without `=` are ignored; for repeated keys the later one wins
    pub fn parse(env: &'a [String]) -> Self {
        let entries = env
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                entry
                    .split_once('=')
                    .map(|(key, value)| (key, (position, value)))
            })
            .collect();
        Self { entries }
    }

    /// Non-empty value of `key`
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries
            .get(key)
            .map(|(_, value)| *value)
            .filter(|value| !value.is_empty())
    }

    /// Value of whichever of `keys` appears latest in the environment.
    /// An empty latest value hides earlier non-empty ones.
    pub fn latest_of(&self, keys: &[&str]) -> Option<&'a str> {
        keys.iter()
            .filter_map(|key| self.entries.get(key))
            .max_by_key(|(position, _)| *position)
            .map(|(_, value)| *value)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlCredentials {
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Connection parameters for one dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Postgres { user: String },
    MySql(MySqlCredentials),
}

pub fn resolve_postgres_user(env: &[String]) -> String {
    match EnvMap::parse(env).get("POSTGRES_USER") {
        Some(user) => user.to_string(),
        None => {
            warn!("env POSTGRES_USER not found. Using default '{}'", DEFAULT_POSTGRES_USER);
            DEFAULT_POSTGRES_USER.to_string()
        }
    }
}

/// MySQL and MariaDB images accept both `MYSQL_*` and `MARIADB_*` names
pub fn resolve_mysql_credentials(container: &str, env: &[String]) -> Result<MySqlCredentials> {
    let vars = EnvMap::parse(env);

    let user = vars.latest_of(&["MYSQL_USER", "MARIADB_USER"]);
    let password = vars.latest_of(&["MYSQL_PASSWORD", "MARIADB_PASSWORD"]);
    let database = vars.latest_of(&["MYSQL_DATABASE", "MARIADB_DATABASE"]);

    match (user, password, database) {
        (Some(user), Some(password), Some(database)) => Ok(MySqlCredentials {
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        }),
        _ => Err(BackupError::MissingCredentials {
            container: container.to_string(),
            env: redact_env(env),
        }),
    }
}
