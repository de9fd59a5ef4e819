//! Error taxonomy for repository analysis

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gitauthors operations
#[derive(Debug, Error)]
pub enum Error {
    /// A commit is not part of a root file's identity chain
    #[error("Commit {commit} is not part of the history of {file}")]
    NotFound { file: String, commit: String },

    /// Malformed version-control output
    #[error("Parse error in {context}: unexpected line {line:?}")]
    Parse { context: String, line: String },

    /// Nothing left after filtering (soft)
    #[error("No statistics matching filters found in {0}")]
    EmptyResult(String),

    /// Mutually incompatible settings
    #[error("Configuration conflict: {0}")]
    ConfigConflict(String),

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Merge invariant violated while assembling blame output
    #[error("Concurrency assertion failed: {0}")]
    ConcurrencyAssertion(String),

    /// A git subprocess exited unsuccessfully
    #[error("git {command} failed: {message}")]
    GitCommand { command: String, message: String },

    /// Repository root is missing or unusable
    #[error("Repository error at {}: {message}", path.display())]
    Repository { path: PathBuf, message: String },

    /// Work abandoned after a stop request
    #[error("Analysis cancelled")]
    Cancelled,

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// libgit2 errors
    #[error(transparent)]
    Git(#[from] git2::Error),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Regex errors
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Create a parse error for an offending output line
    pub fn parse(context: impl Into<String>, line: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            line: line.into(),
        }
    }

    /// Create a not-found error for a point-in-time blame lookup
    pub fn not_found(file: impl Into<String>, commit: impl Into<String>) -> Self {
        Self::NotFound {
            file: file.into(),
            commit: commit.into(),
        }
    }

    pub fn repository(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Repository {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Soft errors are reported to the user but are not analysis failures
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::EmptyResult(_))
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
