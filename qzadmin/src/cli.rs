//! Command-line interface definition and parsing.

use clap::{Args, Parser, Subcommand};
use qz_core::models::{DateTime, RubricKey, ScoreValue};
use qz_grader::filter::{FilterMode, FilterQuery};
use std::path::PathBuf;

/// Grade quiz submissions held in the remote store.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long, env = "QZ_CONFIG")]
    pub config: Option<PathBuf>,

    /// The admin token for the remote store.
    #[arg(short, long, env = "QZ_TOKEN", hide_env_values = true)]
    pub token: String,

    /// What to do
    #[command(subcommand)]
    pub command: Commands,
}

/// The console's operations.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List the students and submissions that match the filter.
    List {
        /// Which rows to work on
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one submission together with its grades.
    Show {
        /// Which rows to work on
        #[command(flatten)]
        filter: FilterArgs,
        /// The submission to work on
        #[command(flatten)]
        target: Target,
    },

    /// Grade one rubric criterion of a submission.
    Score {
        /// Which rows to work on
        #[command(flatten)]
        filter: FilterArgs,
        /// The submission to work on
        #[command(flatten)]
        target: Target,
        /// The criterion, e.g. `loop` or `overall`
        key: RubricKey,
        /// `1`-`3`, a label such as `proficient`, or `-` to clear
        value: ScoreValue,
    },

    /// Delete every score record in the namespace.
    ClearScores {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Selects the rows a command works on.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Case-insensitive search over "last, first id"
    #[arg(short, long, default_value = "")]
    pub search: String,

    /// Hide submissions created after this RFC 3339 instant
    #[arg(short, long, value_parser = DateTime::parse)]
    pub before: Option<DateTime>,

    /// Only offer each student's latest submission (overrides the configured mode)
    #[arg(short, long)]
    pub latest_only: bool,
}

impl FilterArgs {
    /// The query these flags describe.
    pub fn query(&self) -> FilterQuery {
        FilterQuery {
            text: self.search.clone(),
            max_date: self.before,
        }
    }

    /// The filter mode to use, given the configured one.
    pub fn mode(&self, configured: FilterMode) -> FilterMode {
        if self.latest_only {
            FilterMode::LatestOnly
        } else {
            configured
        }
    }
}

/// A row of the listing.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Index of the student in the listing
    pub student: usize,
    /// Index of the submission within the student's submissions
    pub submission: usize,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn import() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}
