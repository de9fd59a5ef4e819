//! In-memory [`VcsSource`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BlameEntry, BlameQuery, CommitMeta, HistoryEntry, HistoryQuery, TreeFile, VcsSource};
use crate::errors::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    head: String,
    commits: Vec<CommitMeta>,
    histories: HashMap<String, Vec<HistoryEntry>>,
    failing: HashSet<String>,
    blames: HashMap<(String, String), Vec<BlameEntry>>,
    files: Vec<TreeFile>,
    pub blame_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(head: &str) -> Self {
        Self {
            head: head.to_string(),
            ..Default::default()
        }
    }

    pub fn with_commits(mut self, commits: Vec<CommitMeta>) -> Self {
        self.commits = commits;
        self
    }

    pub fn with_history(mut self, path: &str, entries: Vec<HistoryEntry>) -> Self {
        self.histories.insert(path.to_string(), entries);
        self
    }

    pub fn with_failing_history(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub fn with_blame(mut self, path: &str, commit: &str, lines: Vec<BlameEntry>) -> Self {
        self.blames
            .insert((path.to_string(), commit.to_string()), lines);
        self
    }

    pub fn with_files(mut self, files: Vec<TreeFile>) -> Self {
        self.files = files;
        self
    }
}

impl VcsSource for FakeSource {
    fn head(&self) -> Result<String> {
        Ok(self.head.clone())
    }

    fn list_commits(&self, _head: &str) -> Result<Vec<CommitMeta>> {
        Ok(self.commits.clone())
    }

    fn file_history(&self, query: &HistoryQuery<'_>) -> Result<Vec<HistoryEntry>> {
        if self.failing.contains(query.path) {
            return Err(Error::GitCommand {
                command: format!("log -- {}", query.path),
                message: "simulated failure".into(),
            });
        }
        Ok(self
            .histories
            .get(query.path)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| query.since.is_none_or(|s| e.timestamp >= s))
                    .filter(|e| query.until.is_none_or(|u| e.timestamp <= u))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn blame(&self, query: &BlameQuery<'_>) -> Result<Vec<BlameEntry>> {
        self.blame_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .blames
            .get(&(query.path.to_string(), query.at_commit.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn tree_files(
        &self,
        _at_commit: &str,
        subfolder: &str,
        extensions: &[String],
    ) -> Result<Vec<TreeFile>> {
        Ok(self
            .files
            .iter()
            .filter(|f| super::path_selected(&f.path, subfolder, extensions))
            .cloned()
            .collect())
    }
}
