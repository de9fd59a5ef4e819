//! Git backend for the [`VcsSource`] query contract.
//!
//! Commit enumeration and tree listing go through libgit2. Rename-following
//! numstat history and porcelain blame go through the git CLI, whose
//! `--follow`, copy detection and `--ignore-rev` semantics libgit2 does not
//! provide.
//!
//! `git2::Repository` is not `Send`, so every query opens its own handle.
//! Worker threads therefore never share a repository handle.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{TimeZone, Utc};
use git2::{ObjectType, Repository, Sort, TreeWalkMode, TreeWalkResult};

use super::numstat::{check_history_output, parse_history_output, HISTORY_FORMAT};
use super::porcelain::parse_porcelain;
use super::{
    path_selected, BlameEntry, BlameQuery, CommitMeta, HistoryEntry, HistoryQuery, TreeFile,
    VcsSource,
};
use crate::errors::{Error, Result};

/// File at the repository root listing revisions blame should skip
pub const IGNORE_REVS_FILE: &str = "_git-blame-ignore-revs.txt";

/// Length of abbreviated commit ids
pub const SHORT_ID_LEN: usize = 7;

/// Git repository opened for analysis
#[derive(Debug, Clone)]
pub struct GitRepository {
    repo_path: PathBuf,
}

impl GitRepository {
    /// Open a repository, discovering the root from any subdirectory
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| {
            Error::repository(path, format!("not a git repository: {}", e.message()))
        })?;

        let repo_path = repo
            .workdir()
            .ok_or_else(|| Error::repository(path, "bare repositories are not supported"))?
            .to_path_buf();

        Ok(Self { repo_path })
    }

    /// Get the repository root path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Open a fresh Repository instance (internal helper)
    fn open_repo(&self) -> Result<Repository> {
        Ok(Repository::open(&self.repo_path)?)
    }

    // =========================================================================
    // I/O Boundary (git CLI)
    // =========================================================================

    fn run_git(&self, args: &[String]) -> Result<std::process::Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| Error::GitCommand {
                command: args.first().cloned().unwrap_or_default(),
                message: e.to_string(),
            })
    }

    fn ignore_revs_file(&self) -> Option<PathBuf> {
        let path = self.repo_path.join(IGNORE_REVS_FILE);
        path.is_file().then_some(path)
    }
}

// =============================================================================
// Pure Functions (argument construction)
// =============================================================================

/// Format a Unix timestamp the way git date options accept it
fn git_date(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|d| d.format("%Y-%m-%d %H:%M:%S +0000").to_string())
        .unwrap_or_else(|| format!("@{}", timestamp))
}

/// Blame flags for a copy/move detection level
pub fn copy_move_args(level: u8) -> &'static [&'static str] {
    match level {
        0 => &[],
        1 => &["-M"],
        2 => &["-C"],
        3 => &["-C", "-C"],
        _ => &["-C", "-C", "-C"],
    }
}

pub(crate) fn history_args(query: &HistoryQuery<'_>) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "log".into(),
        query.head.into(),
        "--follow".into(),
        "--numstat".into(),
        "--no-color".into(),
        HISTORY_FORMAT.into(),
    ];
    if let Some(since) = query.since {
        args.push(format!("--since={}", git_date(since)));
    }
    if let Some(until) = query.until {
        args.push(format!("--until={}", git_date(until)));
    }
    if query.whitespace_insensitive {
        args.push("-w".into());
    }
    args.push("--".into());
    args.push(query.path.into());
    args
}

pub(crate) fn blame_args(query: &BlameQuery<'_>, ignore_revs_file: Option<&Path>) -> Vec<String> {
    let mut args: Vec<String> = vec!["blame".into(), "--porcelain".into()];
    args.extend(copy_move_args(query.copy_move).iter().map(|s| s.to_string()));
    if query.whitespace_insensitive {
        args.push("-w".into());
    }
    if let Some(since) = query.since {
        args.push(format!("--since={}", git_date(since)));
    }
    for rev in query.ignore_revisions {
        args.push(format!("--ignore-rev={}", rev));
    }
    if let Some(file) = ignore_revs_file {
        args.push(format!("--ignore-revs-file={}", file.display()));
    }
    args.push(query.at_commit.into());
    args.push("--".into());
    args.push(query.path.into());
    args
}

fn short_id(long_id: &str) -> String {
    long_id.chars().take(SHORT_ID_LEN).collect()
}

impl VcsSource for GitRepository {
    fn head(&self) -> Result<String> {
        let repo = self.open_repo()?;
        let head = repo
            .head()
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| {
                Error::repository(&self.repo_path, format!("no commits: {}", e.message()))
            })?;
        Ok(head.id().to_string())
    }

    fn list_commits(&self, head: &str) -> Result<Vec<CommitMeta>> {
        let repo = self.open_repo()?;
        let head_oid = repo.revparse_single(head)?.peel_to_commit()?.id();

        let mut revwalk = repo.revwalk()?;
        revwalk.push(head_oid)?;
        revwalk.set_sorting(Sort::TIME | Sort::REVERSE)?; // Oldest first

        // log and blame report mailmapped identities too
        let mailmap = repo.mailmap()?;
        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            let author = commit.author_with_mailmap(&mailmap)?;
            let long_id = commit.id().to_string();
            commits.push(CommitMeta {
                short_id: short_id(&long_id),
                long_id,
                timestamp: commit.time().seconds(),
                message: commit.message().unwrap_or("").trim_end().to_string(),
                author_name: author.name().unwrap_or("").to_string(),
                author_email: author.email().unwrap_or("").to_string(),
            });
        }

        log::debug!(
            "listed {} commits from {} in {}",
            commits.len(),
            head,
            self.repo_path.display()
        );
        Ok(commits)
    }

    fn file_history(&self, query: &HistoryQuery<'_>) -> Result<Vec<HistoryEntry>> {
        let args = history_args(query);
        let output = self.run_git(&args)?;
        if !output.status.success() {
            return Err(Error::GitCommand {
                command: format!("log -- {}", query.path),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        check_history_output(query.path, &raw)?;
        Ok(parse_history_output(query.path, &raw))
    }

    fn blame(&self, query: &BlameQuery<'_>) -> Result<Vec<BlameEntry>> {
        let ignore_file = self.ignore_revs_file();
        let args = blame_args(query, ignore_file.as_deref());
        let output = self.run_git(&args)?;

        if !output.status.success() {
            log::debug!(
                "blame of {} at {} failed: {}",
                query.path,
                short_id(query.at_commit),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(Vec::new());
        }

        parse_porcelain(query.path, &String::from_utf8_lossy(&output.stdout))
    }

    fn tree_files(
        &self,
        at_commit: &str,
        subfolder: &str,
        extensions: &[String],
    ) -> Result<Vec<TreeFile>> {
        let repo = self.open_repo()?;
        let tree = repo.revparse_single(at_commit)?.peel_to_commit()?.tree()?;

        let mut blobs: Vec<(String, git2::Oid)> = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    let path = format!("{}{}", root, name);
                    if path_selected(&path, subfolder, extensions) {
                        blobs.push((path, entry.id()));
                    }
                }
            }
            TreeWalkResult::Ok
        })?;

        blobs
            .into_iter()
            .map(|(path, oid)| {
                let size = repo.find_blob(oid)?.size() as u64;
                Ok(TreeFile { path, size })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) -> anyhow::Result<()> {
        let status = Command::new("git").args(args).current_dir(dir).status()?;
        anyhow::ensure!(status.success(), "git {:?} failed", args);
        Ok(())
    }

    fn setup_test_repo() -> anyhow::Result<TempDir> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path();
        git(path, &["init", "--quiet"])?;
        git(path, &["config", "user.email", "test@example.com"])?;
        git(path, &["config", "user.name", "Test User"])?;
        git(path, &["config", "commit.gpgsign", "false"])?;
        Ok(temp_dir)
    }

    fn commit_file(dir: &Path, name: &str, content: &str, message: &str) -> anyhow::Result<()> {
        let file = dir.join(name);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file, content)?;
        git(dir, &["add", "."])?;
        git(dir, &["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    #[test]
    fn test_copy_move_args() {
        assert!(copy_move_args(0).is_empty());
        assert_eq!(copy_move_args(1), &["-M"]);
        assert_eq!(copy_move_args(2), &["-C"]);
        assert_eq!(copy_move_args(3), &["-C", "-C"]);
        assert_eq!(copy_move_args(4), &["-C", "-C", "-C"]);
    }

    #[test]
    fn test_blame_args_include_ignored_revisions() {
        let ignored = vec!["abc123".to_string(), "def456".to_string()];
        let query = BlameQuery {
            path: "src/a.py",
            at_commit: "HEAD",
            copy_move: 3,
            whitespace_insensitive: true,
            since: None,
            ignore_revisions: &ignored,
        };
        let args = blame_args(&query, None);
        assert_eq!(
            args,
            vec![
                "blame",
                "--porcelain",
                "-C",
                "-C",
                "-w",
                "--ignore-rev=abc123",
                "--ignore-rev=def456",
                "HEAD",
                "--",
                "src/a.py"
            ]
        );
    }

    #[test]
    fn test_history_args() {
        let query = HistoryQuery {
            head: "HEAD",
            path: "b.py",
            since: Some(0),
            until: None,
            whitespace_insensitive: false,
        };
        let args = history_args(&query);
        assert!(args.contains(&"--follow".to_string()));
        assert!(args.contains(&"--since=1970-01-01 00:00:00 +0000".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("b.py"));
    }

    #[test]
    fn test_open_rejects_non_repository() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let nested = dir.path().join("plain");
        fs::create_dir(&nested)?;
        // TempDir may live inside a repository on some machines
        if Repository::discover(&nested).is_err() {
            assert!(matches!(
                GitRepository::open(&nested),
                Err(Error::Repository { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn test_list_commits_and_tree_files() -> anyhow::Result<()> {
        let repo_dir = setup_test_repo()?;
        let path = repo_dir.path();
        commit_file(path, "src/a.py", "print('a')\n", "Add a")?;
        commit_file(path, "src/b.py", "print('b')\nprint('bb')\n", "Add b")?;
        commit_file(path, "README.md", "docs\n", "Add readme")?;

        let repo = GitRepository::open(path)?;
        let head = repo.head()?;
        let commits = repo.list_commits(&head)?;
        assert_eq!(commits.len(), 3);
        assert_eq!(commits.last().map(|c| c.long_id.as_str()), Some(head.as_str()));
        assert!(commits.iter().all(|c| c.short_id.len() == SHORT_ID_LEN));
        assert!(commits.iter().all(|c| c.author_name == "Test User"));

        let mut files = repo.tree_files(&head, "", &["py".to_string()])?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/a.py");
        assert_eq!(files[1].size, 23);

        assert!(repo.tree_files(&head, "lib/", &["py".to_string()])?.is_empty());
        assert_eq!(repo.tree_files(&head, "", &["*".to_string()])?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_blame_and_history_through_cli() -> anyhow::Result<()> {
        let repo_dir = setup_test_repo()?;
        let path = repo_dir.path();
        commit_file(path, "a.py", "one\ntwo\n", "Add a")?;
        commit_file(path, "a.py", "one\ntwo\nthree\n", "Extend a")?;

        let repo = GitRepository::open(path)?;
        let head = repo.head()?;

        let history = repo.file_history(&HistoryQuery {
            head: &head,
            path: "a.py",
            since: None,
            until: None,
            whitespace_insensitive: false,
        })?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].insertions, 1);
        assert_eq!(history[1].insertions, 2);

        let lines = repo.blame(&BlameQuery {
            path: "a.py",
            at_commit: &head,
            copy_move: 2,
            whitespace_insensitive: false,
            since: None,
            ignore_revisions: &[],
        })?;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].line_text, "three");
        assert_eq!(lines[2].commit_id, head);
        assert_eq!(lines[0].author_email, "test@example.com");

        let missing = repo.blame(&BlameQuery {
            path: "gone.py",
            at_commit: &head,
            copy_move: 0,
            whitespace_insensitive: false,
            since: None,
            ignore_revisions: &[],
        })?;
        assert!(missing.is_empty());
        Ok(())
    }

    #[test]
    fn test_mailmap_applies_to_commits_history_and_blame() -> anyhow::Result<()> {
        let repo_dir = setup_test_repo()?;
        let path = repo_dir.path();
        fs::write(
            path.join(".mailmap"),
            "Canonical Name <canonical@example.com> Test User <test@example.com>\n",
        )?;
        commit_file(path, "a.py", "one\n", "Add a")?;

        let repo = GitRepository::open(path)?;
        let head = repo.head()?;

        let commits = repo.list_commits(&head)?;
        assert_eq!(commits[0].author_name, "Canonical Name");
        assert_eq!(commits[0].author_email, "canonical@example.com");

        let history = repo.file_history(&HistoryQuery {
            head: &head,
            path: "a.py",
            since: None,
            until: None,
            whitespace_insensitive: true,
        })?;
        assert_eq!(history[0].author_name, commits[0].author_name);
        assert_eq!(history[0].author_email, commits[0].author_email);

        let lines = repo.blame(&BlameQuery {
            path: "a.py",
            at_commit: &head,
            copy_move: 0,
            whitespace_insensitive: true,
            since: None,
            ignore_revisions: &[],
        })?;
        assert_eq!(lines[0].author_name, commits[0].author_name);
        assert_eq!(lines[0].author_email, commits[0].author_email);
        Ok(())
    }
}
