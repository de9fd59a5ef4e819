use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::parallel::ParallelConfig;
use crate::errors::{Error, Result};

/// File extensions analysed when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "c", "cc", "cif", "cpp", "glsl", "h", "hh", "hpp", "java", "js", "py", "rb", "sql",
];

/// Number of largest files analysed when no include patterns are given
pub const DEFAULT_N_FILES: usize = 5;

/// Default copy/move detection level for blame
pub const DEFAULT_COPY_MOVE: u8 = 2;

/// Highest supported copy/move detection level
pub const MAX_COPY_MOVE: u8 = 4;

/// When attribution at historical commits is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BlameHistoryMode {
    /// Blame at the analysis head only
    #[default]
    None,
    /// Precompute blame for every commit of every identity chain
    Static,
    /// Compute historical blame on request
    Dynamic,
}

/// Output sinks the analysis results are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tables printed to stdout
    Terminal,
    /// Row tables serialised as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Terminal => write!(f, "terminal"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Validated settings consumed by one repository analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Blame copy/move detection level, 0..=4
    pub copy_move: u8,
    /// Count whitespace-only changes in history and blame
    pub whitespace: bool,
    /// Count comment lines
    pub comments: bool,
    /// Count empty lines
    pub empty_lines: bool,
    /// Merge persons sharing a name or an email
    pub merge_aliases: bool,

    pub ex_authors: Vec<String>,
    pub ex_emails: Vec<String>,
    pub ex_files: Vec<String>,
    /// Prefixes of long commit ids
    pub ex_revisions: Vec<String>,
    /// Case-insensitive glob patterns over commit messages
    pub ex_messages: Vec<String>,

    /// Glob patterns selecting files; empty selects the largest files
    pub include_files: Vec<String>,
    /// Number of largest files to analyse, 0 for all
    pub n_files: usize,
    pub subfolder: String,
    /// Extensions to analyse; `*` selects every extension
    pub extensions: Vec<String>,

    #[serde(with = "date_bound")]
    pub since: Option<DateTime<Utc>>,
    #[serde(with = "date_bound")]
    pub until: Option<DateTime<Utc>>,

    pub blame_history: BlameHistoryMode,
    /// Drop excluded lines from blame tables instead of marking them
    pub hide_blame_exclusions: bool,
    /// Add the deletions column to stat tables
    pub deletions: bool,
    /// Add author-count scaled percentages to the authors table
    pub scaled_percentages: bool,

    pub formats: Vec<OutputFormat>,
    pub parallel: ParallelConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            copy_move: DEFAULT_COPY_MOVE,
            whitespace: false,
            comments: false,
            empty_lines: false,
            merge_aliases: true,
            ex_authors: Vec::new(),
            ex_emails: Vec::new(),
            ex_files: Vec::new(),
            ex_revisions: Vec::new(),
            ex_messages: Vec::new(),
            include_files: Vec::new(),
            n_files: DEFAULT_N_FILES,
            subfolder: String::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            since: None,
            until: None,
            blame_history: BlameHistoryMode::None,
            hide_blame_exclusions: false,
            deletions: false,
            scaled_percentages: false,
            formats: vec![OutputFormat::Terminal],
            parallel: ParallelConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn since_timestamp(&self) -> Option<i64> {
        self.since.map(|d| d.timestamp())
    }

    pub fn until_timestamp(&self) -> Option<i64> {
        self.until.map(|d| d.timestamp())
    }

    /// Subfolder normalised to a `/`-terminated prefix, or empty
    pub fn subfolder_prefix(&self) -> String {
        let trimmed = self.subfolder.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        }
    }

    pub fn all_extensions(&self) -> bool {
        self.extensions.iter().any(|e| e == "*")
    }
}

/// Parse a date bound given as `YYYY-MM-DD` or RFC 3339.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            Error::Configuration(format!(
                "invalid date {:?}, expected YYYY-MM-DD or RFC 3339",
                value
            ))
        })
}

/// Serde adapter accepting the same date forms as [`parse_date`]
mod date_bound {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse_date(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
