use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{parse_date, AnalysisConfig, BlameHistoryMode, OutputFormat};
use crate::errors::{Error, Result};
use crate::rows::View;

pub mod setup;

#[derive(Parser, Debug)]
#[command(name = "gitauthors")]
#[command(about = "Authorship statistics from git history and blame", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse one or more repositories
    Analyze(Box<AnalyzeArgs>),

    /// Write a default configuration file to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Repositories, or directories to search for repositories
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Configuration file (defaults to the nearest .gitauthors.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory levels searched for repositories below each path
    #[arg(long, default_value = "5")]
    pub depth: usize,

    /// Output formats
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub format: Vec<OutputFormat>,

    /// JSON output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tables to print (defaults to all)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub view: Vec<View>,

    /// Blame copy/move detection level, 0-4
    #[arg(short = 'C', long)]
    pub copy_move: Option<u8>,

    /// Include whitespace changes
    #[arg(short, long)]
    pub whitespace: bool,

    /// Count comment lines
    #[arg(long)]
    pub comments: bool,

    /// Count empty lines
    #[arg(long)]
    pub empty_lines: bool,

    /// Keep every (name, email) pair as a separate author
    #[arg(long)]
    pub no_merge_aliases: bool,

    /// Author name patterns to exclude
    #[arg(long = "ex-author", value_name = "PATTERN")]
    pub ex_authors: Vec<String>,

    /// Email patterns to exclude
    #[arg(long = "ex-email", value_name = "PATTERN")]
    pub ex_emails: Vec<String>,

    /// File patterns to exclude
    #[arg(long = "ex-file", value_name = "PATTERN")]
    pub ex_files: Vec<String>,

    /// Commit id prefixes to exclude
    #[arg(long = "ex-revision", value_name = "PREFIX")]
    pub ex_revisions: Vec<String>,

    /// Commit message patterns to exclude
    #[arg(long = "ex-message", value_name = "PATTERN")]
    pub ex_messages: Vec<String>,

    /// File patterns to analyse instead of the largest files
    #[arg(short, long = "include-file", value_name = "PATTERN")]
    pub include_files: Vec<String>,

    /// Number of largest files to analyse, 0 for all
    #[arg(short, long)]
    pub n_files: Option<usize>,

    /// Only analyse files below this folder
    #[arg(long)]
    pub subfolder: Option<String>,

    /// File extensions to analyse, `*` for all
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Only count commits at or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub since: Option<String>,

    /// Analyse the repository as of this date
    #[arg(long)]
    pub until: Option<String>,

    /// Blame at historical commits
    #[arg(long, value_enum)]
    pub blame_history: Option<BlameHistoryMode>,

    /// Leave excluded lines out of blame tables
    #[arg(long)]
    pub hide_blame_exclusions: bool,

    /// Show the deletions column
    #[arg(long)]
    pub deletions: bool,

    /// Show author-count scaled percentages
    #[arg(long)]
    pub scaled_percentages: bool,

    /// Run history and blame queries on one thread
    #[arg(long)]
    pub no_parallel: bool,

    /// Worker threads per repository
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Historical blame of FILE at COMMIT, answered on demand
    #[arg(long, value_name = "FILE@COMMIT")]
    pub blame_at: Vec<String>,
}

impl AnalyzeArgs {
    /// Override `config` with every option given on the command line.
    pub fn apply_to(&self, config: &mut AnalysisConfig) -> Result<()> {
        if !self.format.is_empty() {
            config.formats = self.format.clone();
        }
        if let Some(level) = self.copy_move {
            config.copy_move = level;
        }
        config.whitespace |= self.whitespace;
        config.comments |= self.comments;
        config.empty_lines |= self.empty_lines;
        if self.no_merge_aliases {
            config.merge_aliases = false;
        }
        extend(&mut config.ex_authors, &self.ex_authors);
        extend(&mut config.ex_emails, &self.ex_emails);
        extend(&mut config.ex_files, &self.ex_files);
        extend(&mut config.ex_revisions, &self.ex_revisions);
        extend(&mut config.ex_messages, &self.ex_messages);
        extend(&mut config.include_files, &self.include_files);
        if let Some(n) = self.n_files {
            config.n_files = n;
        }
        if let Some(subfolder) = &self.subfolder {
            config.subfolder = subfolder.clone();
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        if let Some(since) = &self.since {
            config.since = Some(parse_date(since)?);
        }
        if let Some(until) = &self.until {
            config.until = Some(parse_date(until)?);
        }
        if let Some(mode) = self.blame_history {
            config.blame_history = mode;
        }
        if !self.blame_at.is_empty() && config.blame_history == BlameHistoryMode::None {
            config.blame_history = BlameHistoryMode::Dynamic;
        }
        config.hide_blame_exclusions |= self.hide_blame_exclusions;
        config.deletions |= self.deletions;
        config.scaled_percentages |= self.scaled_percentages;
        if self.no_parallel {
            config.parallel.enabled = false;
        }
        if let Some(jobs) = self.jobs {
            config.parallel.max_concurrency = Some(jobs);
        }
        Ok(())
    }

    /// Views to print, all when none were selected
    pub fn views(&self) -> Vec<View> {
        if self.view.is_empty() {
            View::ALL.to_vec()
        } else {
            self.view.clone()
        }
    }

    /// Parsed `--blame-at` requests
    pub fn blame_requests(&self) -> Result<Vec<BlameRequestArg>> {
        self.blame_at.iter().map(|s| BlameRequestArg::parse(s)).collect()
    }
}

fn extend(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

/// One `FILE@COMMIT` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameRequestArg {
    pub file: String,
    pub commit: String,
}

impl BlameRequestArg {
    pub fn parse(value: &str) -> Result<Self> {
        match value.rsplit_once('@') {
            Some((file, commit)) if !file.is_empty() && !commit.is_empty() => Ok(Self {
                file: file.to_string(),
                commit: commit.to_string(),
            }),
            _ => Err(Error::Configuration(format!(
                "--blame-at expects FILE@COMMIT, got {:?}",
                value
            ))),
        }
    }
}
