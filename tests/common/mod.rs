// Shared fixtures for gitauthors integration tests
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;

use gitauthors::cancel::CancellationToken;
use gitauthors::config::{AnalysisConfig, ParallelConfig};
use gitauthors::RepoAnalysis;
use tempfile::TempDir;

pub const ALICE: (&str, &str) = ("Alice", "alice@example.com");
pub const BOB: (&str, &str) = ("Bob", "bob@example.com");

/// Day offsets are added to this base, 2024-01-01T12:00:00Z
const BASE_TIMESTAMP: i64 = 1_704_110_400;

/// A throwaway git repository with deterministic commit dates
pub struct GitFixture {
    pub dir: TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let fixture = Self { dir };
        fixture.git(&["init", "--quiet"]);
        fixture.git(&["config", "user.name", "Fixture"]);
        fixture.git(&["config", "user.email", "fixture@example.com"]);
        fixture.git(&["config", "commit.gpgsign", "false"]);
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self, args: &[&str]) -> String {
        self.git_with_env(args, &[])
    }

    fn git_with_env(&self, args: &[&str], env: &[(&str, String)]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .output()
            .expect("run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, contents).expect("write file");
    }

    pub fn mv(&self, from: &str, to: &str) {
        self.git(&["mv", from, to]);
    }

    /// Commit all changes as `author`, `day` days after the base date.
    /// Returns the long commit id.
    pub fn commit(&self, author: (&str, &str), day: i64, message: &str) -> String {
        self.git(&["add", "--all"]);
        let date = format!("@{} +0000", BASE_TIMESTAMP + day * 86_400);
        let env = [
            ("GIT_AUTHOR_NAME", author.0.to_string()),
            ("GIT_AUTHOR_EMAIL", author.1.to_string()),
            ("GIT_COMMITTER_NAME", author.0.to_string()),
            ("GIT_COMMITTER_EMAIL", author.1.to_string()),
            ("GIT_AUTHOR_DATE", date.clone()),
            ("GIT_COMMITTER_DATE", date),
        ];
        self.git_with_env(&["commit", "--quiet", "-m", message], &env);
        self.git(&["rev-parse", "HEAD"])
    }
}

pub fn numbered_lines(prefix: &str, count: usize) -> String {
    (1..=count)
        .map(|i| format!("{}_{} = {}\n", prefix, i, i))
        .collect()
}

/// Alice adds `a.py` with ten lines; Bob renames it to `b.py` and appends
/// five lines. Returns the fixture and both commit ids.
pub fn rename_repo() -> (GitFixture, String, String) {
    let repo = GitFixture::new();
    repo.write("a.py", &numbered_lines("alice", 10));
    let first = repo.commit(ALICE, 0, "Add a.py");

    repo.mv("a.py", "b.py");
    let mut contents = numbered_lines("alice", 10);
    contents.push_str(&numbered_lines("bob", 5));
    repo.write("b.py", &contents);
    let second = repo.commit(BOB, 1, "Move to b.py and extend");
    (repo, first, second)
}

pub fn sequential_config() -> AnalysisConfig {
    AnalysisConfig {
        parallel: ParallelConfig::sequential(),
        ..Default::default()
    }
}

pub fn analyse(repo: &GitFixture, config: AnalysisConfig) -> RepoAnalysis {
    RepoAnalysis::open(repo.path(), config, &CancellationToken::new()).expect("analysis succeeds")
}
