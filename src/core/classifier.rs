/// Engine detection and backup target selection

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

use crate::core::config::OverrideEntry;
use crate::core::docker::ContainerDescriptor;
use crate::core::error::{BackupError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
    MySql,
    MariaDb,
}

impl EngineKind {
    /// Match priority: an image naming both mysql and mariadb is MySQL
    pub const ALL: [EngineKind; 3] = [EngineKind::Postgres, EngineKind::MySql, EngineKind::MariaDb];

    /// Lower-case name used in image matching, dump headers and file names
    pub fn tag(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgres",
            EngineKind::MySql => "mysql",
            EngineKind::MariaDb => "mariadb",
        }
    }

    /// Case-sensitive substring match against an image reference.
    /// `None` means the image is not a supported database.
    pub fn classify(image: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| image.contains(kind.tag()))
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which containers a single invocation backs up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Containers whose name contains the substring, whatever their image
    Include(String),
    /// Every database container except the named ones
    Exclude(Vec<String>),
    /// Overrides first, then every other database container
    Sweep,
}

impl RunMode {
    /// Build the run mode from raw flags. `exclude` holds the values of each
    /// `-e` occurrence separately; each occurrence must name one container.
    /// An empty include filter counts as not given.
    pub fn from_flags(include: Option<String>, exclude: Vec<Vec<String>>) -> Result<Self> {
        let include = include.filter(|filter| !filter.is_empty());
        if exclude.iter().any(|group| group.len() != 1) {
            return Err(BackupError::Configuration(
                "Only one container for -e is allowed. Use -e container1 -e container2".to_string(),
            ));
        }

        match (include, exclude.is_empty()) {
            (Some(_), false) => Err(BackupError::Configuration(
                "--include-container and --exclude-container cannot be combined".to_string(),
            )),
            (Some(filter), true) => Ok(RunMode::Include(filter)),
            (None, false) => Ok(RunMode::Exclude(exclude.into_iter().flatten().collect())),
            (None, true) => Ok(RunMode::Sweep),
        }
    }
}

/// One unit of work for the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Override(&'a OverrideEntry),
    Container(&'a ContainerDescriptor),
}

fn is_database(container: &ContainerDescriptor) -> bool {
    EngineKind::classify(&container.image).is_some()
}

/// Order the work for `mode`, keeping the runtime's list order
pub fn select_targets<'a>(
    containers: &'a [ContainerDescriptor],
    mode: &RunMode,
    overrides: &'a [OverrideEntry],
) -> Vec<Target<'a>> {
    match mode {
        RunMode::Include(filter) => {
            info!("Only dumping containers with '{}' in the container name", filter);
            containers
                .iter()
                .filter(|c| c.name.contains(filter.as_str()))
                .map(Target::Container)
                .collect()
        }
        RunMode::Exclude(excluded) => {
            info!("Dumping containers which are not named {:?}", excluded);
            containers
                .iter()
                .filter(|c| is_database(c))
                .filter(|c| {
                    let skip = excluded.contains(&c.name);
                    if skip {
                        info!("Skipping container {}", c.name);
                    }
                    !skip
                })
                .map(Target::Container)
                .collect()
        }
        RunMode::Sweep => {
            let override_names: HashSet<&str> =
                overrides.iter().map(|o| o.container_name.as_str()).collect();

            let mut targets: Vec<Target<'a>> = overrides.iter().map(Target::Override).collect();
            for container in containers {
                if override_names.contains(container.name.as_str()) {
                    info!("Skipping override container {}", container.name);
                    continue;
                }
                if is_database(container) {
                    targets.push(Target::Container(container));
                }
            }
            targets
        }
    }
}
