//! Line attribution at the analysis head and at historical commits.
//!
//! The engine turns raw attribution entries into [`BlameLine`]s: it registers
//! every (author, email) pair in the person registry, numbers the commit
//! through the commit index and classifies comment lines. The full pass
//! blames every root file at the head. Point-in-time blame first resolves
//! the path a root file had at a commit through its identity chain.

pub mod comments;
pub mod dynamic;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::commits::{CommitIndex, CommitNr};
use crate::config::AnalysisConfig;
use crate::errors::{Error, Result};
use crate::history::{FileHistories, FileHistory, FileId};
use crate::persons::{PersonId, PersonRegistry};
use crate::pool::WorkerPool;
use crate::vcs::{file_extension, BlameEntry, BlameQuery, VcsSource};

pub use comments::CommentClassifier;
pub use dynamic::{BlameTicket, DynamicBlameService};

/// One attributed source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlameLine {
    /// 1-based line number in the blamed file
    pub line_nr: u32,
    pub author: PersonId,
    pub author_name: String,
    pub email: String,
    pub timestamp: i64,
    pub message: String,
    pub commit_id: String,
    /// `None` for commits outside the indexed history
    pub commit_nr: Option<CommitNr>,
    pub is_comment: bool,
    pub text: String,
}

impl BlameLine {
    pub fn is_empty_line(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Attribution settings shared by every blame query of one analysis
#[derive(Debug, Clone, Default)]
pub struct BlameSettings {
    pub copy_move: u8,
    pub whitespace_insensitive: bool,
    pub since: Option<i64>,
    /// Long ids of excluded commits
    pub ignore_revisions: Vec<String>,
    pub batch_size: usize,
}

impl BlameSettings {
    pub fn from_config(config: &AnalysisConfig, ignore_revisions: Vec<String>) -> Self {
        Self {
            copy_move: config.copy_move,
            whitespace_insensitive: !config.whitespace,
            since: config.since_timestamp(),
            ignore_revisions,
            batch_size: config.parallel.effective_blame_batch_size(),
        }
    }
}

/// Blame results of the full pass, indexed by [`FileId`]
#[derive(Debug, Clone, Default)]
pub struct HeadBlames {
    files: Vec<Vec<BlameLine>>,
}

impl HeadBlames {
    pub fn new(files: Vec<Vec<BlameLine>>) -> Self {
        Self { files }
    }

    pub fn get(&self, id: FileId) -> &[BlameLine] {
        self.files.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &[BlameLine])> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, lines)| (FileId(i as u32), lines.as_slice()))
    }

    pub fn total_lines(&self) -> usize {
        self.files.iter().map(Vec::len).sum()
    }
}

/// Precomputed blame for every commit of every identity chain
#[derive(Debug, Clone, Default)]
pub struct StaticBlameHistory {
    blames: HashMap<(FileId, CommitNr), Arc<Vec<BlameLine>>>,
}

impl StaticBlameHistory {
    pub fn get(&self, file: FileId, commit: CommitNr) -> Option<&Arc<Vec<BlameLine>>> {
        self.blames.get(&(file, commit))
    }

    pub fn len(&self) -> usize {
        self.blames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blames.is_empty()
    }

    /// Commits with stored blame for `file`, newest first
    pub fn commits_of(&self, file: FileId) -> Vec<CommitNr> {
        let mut commits: Vec<CommitNr> = self
            .blames
            .keys()
            .filter(|(f, _)| *f == file)
            .map(|(_, c)| *c)
            .collect();
        commits.sort_by(|a, b| b.cmp(a));
        commits
    }
}

/// Attribution service for one repository. Cheap to clone; clones share
/// the source, the commit index and the person registry.
#[derive(Clone)]
pub struct BlameEngine {
    source: Arc<dyn VcsSource>,
    commits: Arc<CommitIndex>,
    persons: Arc<PersonRegistry>,
    settings: Arc<BlameSettings>,
}

impl BlameEngine {
    pub fn new(
        source: Arc<dyn VcsSource>,
        commits: Arc<CommitIndex>,
        persons: Arc<PersonRegistry>,
        settings: BlameSettings,
    ) -> Self {
        Self {
            source,
            commits,
            persons,
            settings: Arc::new(settings),
        }
    }

    pub fn commits(&self) -> &CommitIndex {
        &self.commits
    }

    /// Blame `path` at `at_commit`, classifying comments with the syntax of
    /// `comment_extension`.
    pub fn blame(
        &self,
        path: &str,
        at_commit: &str,
        comment_extension: Option<&str>,
    ) -> Result<Vec<BlameLine>> {
        let entries = self.source.blame(&BlameQuery {
            path,
            at_commit,
            copy_move: self.settings.copy_move,
            whitespace_insensitive: self.settings.whitespace_insensitive,
            since: self.settings.since,
            ignore_revisions: &self.settings.ignore_revisions,
        })?;
        Ok(self.to_lines(entries, comment_extension))
    }

    fn to_lines(&self, entries: Vec<BlameEntry>, comment_extension: Option<&str>) -> Vec<BlameLine> {
        let mut classifier = CommentClassifier::for_extension(comment_extension);
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let author = self
                    .persons
                    .add_person(&entry.author_name, &entry.author_email);
                let record = self.commits.record_of(&entry.commit_id);
                let message = record
                    .map(|r| r.message.clone())
                    .unwrap_or(entry.message);
                BlameLine {
                    line_nr: i as u32 + 1,
                    author,
                    author_name: entry.author_name,
                    email: entry.author_email,
                    timestamp: entry.timestamp,
                    message,
                    commit_nr: record.map(|r| r.nr),
                    commit_id: entry.commit_id,
                    is_comment: classifier.is_comment_line(&entry.line_text),
                    text: entry.line_text,
                }
            })
            .collect()
    }

    /// Blame every root file at the analysis head.
    ///
    /// A file whose blame fails keeps an empty line list.
    pub fn blame_head(
        &self,
        histories: &FileHistories,
        pool: &WorkerPool,
        cancel: &CancellationToken,
    ) -> Result<HeadBlames> {
        let head = self.commits.head_id()?.to_string();
        let roots: Vec<&str> = histories.roots().collect();
        let files = pool.map_chunked(&roots, self.settings.batch_size, cancel, |root| {
            self.blame(root, &head, file_extension(root))
                .unwrap_or_else(|e| {
                    tracing::warn!(file = %root, error = %e, "blame failed");
                    Vec::new()
                })
        })?;
        log::debug!(
            "blamed {} file(s), {} line(s)",
            files.len(),
            files.iter().map(Vec::len).sum::<usize>()
        );
        Ok(HeadBlames::new(files))
    }

    /// Blame the path `file` had at `commit`.
    ///
    /// Fails with [`Error::NotFound`] when the commit is not part of the
    /// file's identity chain.
    pub fn blame_at(&self, file: &FileHistory, commit: CommitNr) -> Result<Vec<BlameLine>> {
        let path = file.chain.path_at(commit);
        let record = self.commits.get(commit);
        let (Some(path), Some(record)) = (path, record) else {
            let commit_id = record
                .map(|r| r.short_id.clone())
                .unwrap_or_else(|| format!("#{}", commit.0));
            return Err(Error::not_found(&file.root, commit_id));
        };
        self.blame(path, &record.long_id, file_extension(&file.root))
    }

    /// Precompute point-in-time blame for every commit of every chain.
    ///
    /// The newest chain commit of a file whose path is unchanged reuses the
    /// head blame.
    pub fn blame_history(
        &self,
        histories: &FileHistories,
        head_blames: &HeadBlames,
        pool: &WorkerPool,
        cancel: &CancellationToken,
    ) -> Result<StaticBlameHistory> {
        let mut jobs: Vec<(FileId, CommitNr)> = Vec::new();
        let mut blames = HashMap::new();

        for (id, file) in histories.iter() {
            let chain_commits = file.chain.commits();
            for (position, commit) in chain_commits.into_iter().enumerate() {
                let reusable = position == 0 && file.chain.path_at(commit) == Some(file.root.as_str());
                if reusable {
                    blames.insert((id, commit), Arc::new(head_blames.get(id).to_vec()));
                } else {
                    jobs.push((id, commit));
                }
            }
        }

        let results = pool.map_chunked(&jobs, self.settings.batch_size, cancel, |(id, commit)| {
            let result = histories
                .get(*id)
                .ok_or_else(|| Error::not_found(format!("file #{}", id.0), format!("#{}", commit.0)))
                .and_then(|file| self.blame_at(file, *commit));
            result.unwrap_or_else(|e| {
                tracing::warn!(file = id.0, commit = commit.0, error = %e, "historical blame failed");
                Vec::new()
            })
        })?;

        for (key, lines) in jobs.into_iter().zip(results) {
            blames.insert(key, Arc::new(lines));
        }
        log::info!("precomputed {} historical blame(s)", blames.len());
        Ok(StaticBlameHistory { blames })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::commits::tests::meta;
    use crate::history::CommitGroup;
    use crate::vcs::fake::FakeSource;
    use crate::vcs::HistoryEntry;
    use std::sync::atomic::Ordering;

    pub(crate) fn blame_entry(commit: &str, author: &str, ts: i64, text: &str) -> BlameEntry {
        BlameEntry {
            line_text: text.to_string(),
            commit_id: commit.to_string(),
            author_name: author.to_string(),
            author_email: format!("{}@example.com", author.to_lowercase()),
            timestamp: ts,
            message: "summary".to_string(),
        }
    }

    fn history_entry(commit: &str, ts: i64, author: &str, ins: u64, path: &str) -> HistoryEntry {
        HistoryEntry {
            commit_id: commit.to_string(),
            timestamp: ts,
            author_name: author.to_string(),
            author_email: format!("{}@example.com", author.to_lowercase()),
            insertions: ins,
            deletions: 0,
            path_field: path.to_string(),
        }
    }

    /// Two commits: `c1` adds a.py, `c2` renames it to b.py and appends.
    pub(crate) fn rename_fixture() -> FakeSource {
        let mut at_head = vec![
            blame_entry("c1", "Alice", 100, "# header"),
            blame_entry("c1", "Alice", 100, "x = 1"),
        ];
        at_head.push(blame_entry("c2", "Bob", 200, ""));
        at_head.push(blame_entry("c2", "Bob", 200, "y = 2"));
        FakeSource::new("c2")
            .with_commits(vec![
                meta("c1", 100, "Alice", "Add a.py"),
                meta("c2", 200, "Bob", "Move to b.py"),
            ])
            .with_history(
                "b.py",
                vec![
                    history_entry("c2", 200, "Bob", 2, "a.py => b.py"),
                    history_entry("c1", 100, "Alice", 2, "a.py"),
                ],
            )
            .with_blame("b.py", "c2", at_head)
            .with_blame(
                "a.py",
                "c1",
                vec![
                    blame_entry("c1", "Alice", 100, "# header"),
                    blame_entry("c1", "Alice", 100, "x = 1"),
                ],
            )
    }

    pub(crate) fn engine_for(source: FakeSource) -> (BlameEngine, Arc<FakeSource>, Arc<PersonRegistry>) {
        let source = Arc::new(source);
        let persons = Arc::new(PersonRegistry::new(true));
        let commits = Arc::new(CommitIndex::build(source.as_ref(), &persons, None).unwrap());
        let engine = BlameEngine::new(
            source.clone(),
            commits,
            persons.clone(),
            BlameSettings {
                batch_size: 20,
                ..Default::default()
            },
        );
        (engine, source, persons)
    }

    fn histories_for(engine: &BlameEngine) -> FileHistories {
        let commits = &engine.commits;
        let alice = engine.persons.add_person("Alice", "alice@example.com");
        let bob = engine.persons.add_person("Bob", "bob@example.com");
        let group = |author, path: &str, nr| CommitGroup {
            author,
            path: path.to_string(),
            insertions: 2,
            deletions: 0,
            commits: [commits.nr_of(nr).unwrap()].into_iter().collect(),
            date_sum: 0,
        };
        FileHistories::assemble(
            vec!["b.py".into()],
            vec![vec![group(bob, "b.py", "c2"), group(alice, "a.py", "c1")]],
        )
    }

    #[test]
    fn test_blame_lines_carry_commit_numbers_and_comments() {
        let (engine, _, persons) = engine_for(rename_fixture());
        let lines = engine.blame("b.py", "c2", Some("py")).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].is_comment);
        assert!(!lines[1].is_comment);
        assert!(lines[2].is_empty_line());
        assert_eq!(lines[3].line_nr, 4);
        assert_eq!(lines[3].commit_nr, Some(CommitNr(2)));
        assert_eq!(lines[3].message, "Move to b.py");
        assert_eq!(persons.canonical(lines[3].author), lines[3].author);
    }

    #[test]
    fn test_whitespace_is_ignored_unless_included() {
        let settings = BlameSettings::from_config(&AnalysisConfig::default(), vec![]);
        assert!(settings.whitespace_insensitive);

        let config = AnalysisConfig {
            whitespace: true,
            ..Default::default()
        };
        assert!(!BlameSettings::from_config(&config, vec![]).whitespace_insensitive);
    }

    #[test]
    fn test_point_in_time_blame_follows_chain() {
        let (engine, _, _) = engine_for(rename_fixture());
        let histories = histories_for(&engine);
        let file = histories.get(FileId(0)).unwrap();

        let old = engine.blame_at(file, CommitNr(1)).unwrap();
        assert_eq!(old.len(), 2);
        assert!(old.iter().all(|l| l.author_name == "Alice"));

        let missing = engine.blame_at(file, CommitNr(7));
        assert!(matches!(missing, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_static_history_reuses_head_blame() {
        let (engine, source, _) = engine_for(rename_fixture());
        let histories = histories_for(&engine);
        let pool = WorkerPool::sequential();
        let cancel = CancellationToken::new();

        let head = engine.blame_head(&histories, &pool, &cancel).unwrap();
        assert_eq!(head.total_lines(), 4);
        assert_eq!(source.blame_calls.load(Ordering::SeqCst), 1);

        let history = engine
            .blame_history(&histories, &head, &pool, &cancel)
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(source.blame_calls.load(Ordering::SeqCst), 2);
        assert_eq!(history.commits_of(FileId(0)), vec![CommitNr(2), CommitNr(1)]);
        assert_eq!(
            history.get(FileId(0), CommitNr(2)).map(|l| l.len()),
            Some(4)
        );
        assert_eq!(
            history.get(FileId(0), CommitNr(1)).map(|l| l.len()),
            Some(2)
        );
    }

    #[test]
    fn test_missing_file_blames_empty() {
        let (engine, _, _) = engine_for(rename_fixture());
        assert!(engine.blame("deleted.py", "c2", Some("py")).unwrap().is_empty());
    }
}
