//! Query contract between the analysis core and a version-control backend.
//!
//! The core never talks to git directly: it asks a [`VcsSource`] for commit
//! metadata, per-file numstat history, line attribution and tree listings.
//! [`GitRepository`] answers those queries with libgit2 and the git CLI; tests
//! substitute in-memory sources.

pub mod git2_provider;
pub mod numstat;
pub mod porcelain;

pub use git2_provider::GitRepository;

use crate::errors::Result;

/// One commit reachable from the analysis head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub long_id: String,
    pub short_id: String,
    /// Committer time, Unix seconds
    pub timestamp: i64,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
}

/// One numstat record of a file's rename-following history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub commit_id: String,
    pub timestamp: i64,
    pub author_name: String,
    pub author_email: String,
    pub insertions: u64,
    pub deletions: u64,
    /// Path as reported, possibly in `old => new` rename notation
    pub path_field: String,
}

/// One attributed line of a blamed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameEntry {
    pub line_text: String,
    pub commit_id: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: i64,
    pub message: String,
}

/// A blob in the tree of the analysis head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    pub path: String,
    pub size: u64,
}

/// Parameters of a file history query
#[derive(Debug, Clone, Copy)]
pub struct HistoryQuery<'a> {
    pub head: &'a str,
    pub path: &'a str,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub whitespace_insensitive: bool,
}

/// Parameters of an attribution query
#[derive(Debug, Clone, Copy)]
pub struct BlameQuery<'a> {
    pub path: &'a str,
    pub at_commit: &'a str,
    /// 0 none, 1 within file, 2 across files of the same commit,
    /// 3 across commits, 4 across all commits
    pub copy_move: u8,
    pub whitespace_insensitive: bool,
    pub since: Option<i64>,
    pub ignore_revisions: &'a [String],
}

/// Data source answering the history, blame and tree queries.
///
/// Implementations are shared between worker threads; each call must use
/// its own backend handle.
pub trait VcsSource: Send + Sync {
    /// Long id of the commit the repository head points to
    fn head(&self) -> Result<String>;

    /// Every commit reachable from `head`, in any order
    fn list_commits(&self, head: &str) -> Result<Vec<CommitMeta>>;

    /// Rename-following numstat history of one path, newest first
    fn file_history(&self, query: &HistoryQuery<'_>) -> Result<Vec<HistoryEntry>>;

    /// Line attribution of one path at one commit. A path missing at that
    /// commit yields an empty list.
    fn blame(&self, query: &BlameQuery<'_>) -> Result<Vec<BlameEntry>>;

    /// Blobs at `at_commit` under `subfolder` whose extension is listed
    fn tree_files(
        &self,
        at_commit: &str,
        subfolder: &str,
        extensions: &[String],
    ) -> Result<Vec<TreeFile>>;
}

/// Extension of a path, without the dot
pub fn file_extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(pos) => Some(&name[pos + 1..]),
    }
}

/// Whether `path` passes the subfolder and extension filters
pub fn path_selected(path: &str, subfolder: &str, extensions: &[String]) -> bool {
    if !path.starts_with(subfolder) {
        return false;
    }
    if extensions.iter().any(|e| e == "*") {
        return true;
    }
    file_extension(path).is_some_and(|ext| extensions.iter().any(|e| e == ext))
}


#[cfg(test)]
pub(crate) mod fake;
