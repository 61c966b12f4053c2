/// CLI argument parsing

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::error;

use crate::core::{BackupError, RunMode};

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser, Debug)]
#[command(name = "db-dump")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Only back up containers with this string in their name
    #[arg(short, long, value_name = "SUBSTR")]
    pub include_container: Option<String>,

    /// Exclude a specific container (can be used multiple times)
    #[arg(short, long, value_name = "NAME", num_args = 1.., action = ArgAction::Append)]
    pub exclude_container: Vec<String>,

    /// Config file with backup directory and override containers
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory dumps are written to
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Values of each `-e` occurrence, kept apart so `-e a b` can be rejected
    #[arg(skip)]
    pub exclude_groups: Vec<Vec<String>>,
}

impl Cli {
    /// Parse the process arguments, exiting with clap's usage error on failure
    pub fn parse_args() -> Self {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_args_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let mut cli = Self::from_arg_matches(matches)?;
        cli.exclude_groups = matches
            .get_occurrences::<String>("exclude_container")
            .map(|occurrences| {
                occurrences
                    .map(|values| values.cloned().collect())
                    .collect()
            })
            .unwrap_or_default();
        Ok(cli)
    }

    pub fn run_mode(&self) -> Result<RunMode, BackupError> {
        RunMode::from_flags(self.include_container.clone(), self.exclude_groups.clone())
    }
}

/// Process exit status for a finished run: 0 on success, 1 after logging
/// the fatal error with its full cause chain
pub fn exit_status(result: &anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:?}", e);
            1
        }
    }
}
