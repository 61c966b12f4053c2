/// Fixed names and limits shared by the backup pipeline

/// Backup root used when neither the config file nor `--out-dir` sets one
pub const DEFAULT_OUT_DIR: &str = "/opt/db-dump-backups";

/// Directory under the user config dir holding `config.toml`
pub const CONFIG_DIR_NAME: &str = "db-dump";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Compose label carrying the project's working directory on the host
pub const COMPOSE_WORKING_DIR_LABEL: &str = "com.docker.compose.project.working_dir";

/// Number of bytes read back from a finished dump for the header check
pub const HEADER_PEEK_BYTES: u64 = 300;

/// Header line `pg_dumpall` writes at the top of every cluster dump
pub const POSTGRES_DUMP_SIGNATURE: &str = "PostgreSQL database cluster dump";

pub const DEFAULT_POSTGRES_USER: &str = "postgres";

/// OS user `pg_dumpall` runs as inside the container (peer auth)
pub const POSTGRES_OS_USER: &str = "postgres";

/// Environment variable mysqldump reads the password from
pub const MYSQL_PASSWORD_ENV: &str = "MYSQL_PWD";
