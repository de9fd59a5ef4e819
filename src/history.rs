//! Rename-aware per-file history.
//!
//! For every selected root file the resolver runs a rename-following numstat
//! query, resolves each record's path through the rename notation and
//! coalesces consecutive commits of one author on one path into
//! [`CommitGroup`]s. Because `--follow` reports a shared ancestor's history
//! once per descendant file, a whole-set pass strips identical trailing group
//! sequences before identity chains are derived from the surviving groups.

use std::collections::{BTreeMap, BTreeSet};

use glob::Pattern;
use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::commits::{CommitIndex, CommitNr, ExcludedCommits};
use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::persons::{PersonId, PersonRegistry};
use crate::pool::WorkerPool;
use crate::vcs::numstat::parse_path_field;
use crate::vcs::{HistoryEntry, HistoryQuery, VcsSource};

/// Interned root file handle; indexes [`FileHistories`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Consecutive commits of one author on one resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitGroup {
    pub author: PersonId,
    pub path: String,
    pub insertions: u64,
    pub deletions: u64,
    pub commits: BTreeSet<CommitNr>,
    /// Sum of commit timestamp times insertions
    pub date_sum: i64,
}

impl CommitGroup {
    fn start(author: PersonId, path: String, commit: CommitNr, entry: &HistoryEntry) -> Self {
        let mut group = Self {
            author,
            path,
            insertions: 0,
            deletions: 0,
            commits: BTreeSet::new(),
            date_sum: 0,
        };
        group.absorb(commit, entry);
        group
    }

    fn absorb(&mut self, commit: CommitNr, entry: &HistoryEntry) {
        self.insertions += entry.insertions;
        self.deletions += entry.deletions;
        self.date_sum += entry.timestamp * entry.insertions as i64;
        self.commits.insert(commit);
    }
}

/// Historical paths of one root file with the commits each author made there.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityChain {
    entries: Vec<ChainEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub path: String,
    pub authors: BTreeMap<PersonId, BTreeSet<CommitNr>>,
}

impl IdentityChain {
    /// Chain for `root` derived from its groups. The root path is always the
    /// first entry, even when no surviving group touches it.
    pub fn from_groups(root: &str, groups: &[CommitGroup]) -> Self {
        let mut chain = Self {
            entries: vec![ChainEntry {
                path: root.to_string(),
                authors: BTreeMap::new(),
            }],
        };
        for group in groups {
            chain.record(&group.path, group.author, &group.commits);
        }
        chain
    }

    fn record(&mut self, path: &str, author: PersonId, commits: &BTreeSet<CommitNr>) {
        let position = match self.entries.iter().position(|e| e.path == path) {
            Some(position) => position,
            None => {
                self.entries.push(ChainEntry {
                    path: path.to_string(),
                    authors: BTreeMap::new(),
                });
                self.entries.len() - 1
            }
        };
        self.entries[position]
            .authors
            .entry(author)
            .or_default()
            .extend(commits.iter().copied());
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Every path the lineage occupied, root first
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    /// Literal path of the file at `commit`
    pub fn path_at(&self, commit: CommitNr) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.authors.values().any(|set| set.contains(&commit)))
            .map(|e| e.path.as_str())
    }

    /// Every commit in the chain, newest first
    pub fn commits(&self) -> Vec<CommitNr> {
        let all: BTreeSet<CommitNr> = self
            .entries
            .iter()
            .flat_map(|e| e.authors.values().flatten().copied())
            .collect();
        all.into_iter().rev().collect()
    }
}

/// Resolved history of one root file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHistory {
    pub root: String,
    /// Newest first
    pub groups: Vec<CommitGroup>,
    pub chain: IdentityChain,
}

/// Histories of all selected root files, indexed by [`FileId`].
#[derive(Debug, Clone, Default)]
pub struct FileHistories {
    files: Vec<FileHistory>,
}

impl FileHistories {
    /// Tail-deduplicate the collected groups and derive identity chains.
    pub fn assemble(roots: Vec<String>, mut groups: Vec<Vec<CommitGroup>>) -> Self {
        dedup_shared_tails(&mut groups);
        let files = roots
            .into_iter()
            .zip(groups)
            .map(|(root, groups)| FileHistory {
                chain: IdentityChain::from_groups(&root, &groups),
                root,
                groups,
            })
            .collect();
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, id: FileId) -> Option<&FileHistory> {
        self.files.get(id.index())
    }

    pub fn id_of(&self, root: &str) -> Option<FileId> {
        self.files
            .iter()
            .position(|f| f.root == root)
            .map(|i| FileId(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &FileHistory)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId(i as u32), f))
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.root.as_str())
    }
}

// =============================================================================
// Pure Functions
// =============================================================================

/// Fold numstat records (newest first) into commit groups.
///
/// Records of excluded commits are dropped before grouping; records of
/// commits unknown to the index are logged and skipped.
pub fn build_groups(
    root: &str,
    entries: &[HistoryEntry],
    commits: &CommitIndex,
    persons: &PersonRegistry,
    excluded: &ExcludedCommits,
) -> Vec<CommitGroup> {
    let mut groups: Vec<CommitGroup> = Vec::new();

    for entry in entries {
        if excluded.contains(&entry.commit_id) {
            continue;
        }
        let Some(nr) = commits.nr_of(&entry.commit_id) else {
            log::warn!(
                "history of {}: commit {} is not reachable from the head; record skipped",
                root,
                entry.commit_id
            );
            continue;
        };
        let author = persons.add_person(&entry.author_name, &entry.author_email);
        let path = parse_path_field(&entry.path_field);

        match groups.last_mut() {
            Some(last) if last.author == author && last.path == path => last.absorb(nr, entry),
            _ => groups.push(CommitGroup::start(author, path, nr, entry)),
        }
    }

    groups
}

/// Strip trailing group sequences shared with the largest remaining file.
///
/// Files are ordered once by ascending group count. The largest file is
/// popped repeatedly; every file still waiting loses the trailing groups that
/// are identical, compared from the end, to the popped file's trailing groups.
pub fn dedup_shared_tails(groups: &mut [Vec<CommitGroup>]) {
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by_key(|&i| groups[i].len());

    while let Some(largest) = order.pop() {
        if groups[largest].is_empty() {
            continue;
        }
        let reference = std::mem::take(&mut groups[largest]);
        for &other in &order {
            let target = &mut groups[other];
            let mut matched = 0;
            while matched < reference.len()
                && target.last() == reference.get(reference.len() - 1 - matched)
            {
                target.pop();
                matched += 1;
            }
            if matched > 0 {
                log::debug!("stripped {} shared trailing group(s) from file #{}", matched, other);
            }
        }
        groups[largest] = reference;
    }
}

/// Select root files at `head`.
///
/// Include patterns select matching files; without them the `n_files`
/// largest files are taken (all when `n_files` is zero). Exclusion patterns
/// apply in both cases. Patterns match the full path or the file name.
pub fn select_files(
    source: &dyn VcsSource,
    head: &str,
    config: &AnalysisConfig,
) -> Result<Vec<String>> {
    let subfolder = config.subfolder_prefix();
    let mut candidates = source.tree_files(head, &subfolder, &config.extensions)?;

    let compile = |patterns: &[String]| -> Result<Vec<Pattern>> {
        patterns
            .iter()
            .map(|p| Pattern::new(p).map_err(Into::into))
            .collect()
    };
    let excludes = compile(&config.ex_files)?;
    let includes = compile(&config.include_files)?;
    let matches = |patterns: &[Pattern], path: &str| {
        let name = path.rsplit('/').next().unwrap_or(path);
        patterns.iter().any(|p| p.matches(path) || p.matches(name))
    };

    candidates.retain(|f| !matches(&excludes, &f.path));

    let selected: Vec<String> = if includes.is_empty() {
        candidates.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        let take = if config.n_files == 0 {
            candidates.len()
        } else {
            config.n_files
        };
        candidates.into_iter().take(take).map(|f| f.path).collect()
    } else {
        let mut paths: Vec<String> = candidates
            .into_iter()
            .filter(|f| matches(&includes, &f.path))
            .map(|f| f.path)
            .collect();
        paths.sort();
        paths
    };

    log::info!("selected {} file(s) for analysis", selected.len());
    Ok(selected)
}

// =============================================================================
// Resolver (I/O)
// =============================================================================

/// Runs history queries for root files against one repository.
pub struct FileHistoryResolver<'a> {
    pub source: &'a dyn VcsSource,
    pub commits: &'a CommitIndex,
    pub persons: &'a PersonRegistry,
    pub excluded: &'a ExcludedCommits,
    pub config: &'a AnalysisConfig,
}

impl FileHistoryResolver<'_> {
    /// Commit groups of one root file, before tail deduplication.
    pub fn resolve(&self, root: &str) -> Result<Vec<CommitGroup>> {
        let head = self.commits.head_id()?;
        let entries = self.source.file_history(&HistoryQuery {
            head,
            path: root,
            since: self.config.since_timestamp(),
            until: self.config.until_timestamp(),
            whitespace_insensitive: !self.config.whitespace,
        })?;
        Ok(build_groups(
            root,
            &entries,
            self.commits,
            self.persons,
            self.excluded,
        ))
    }

    /// Resolve every root file on the pool, then deduplicate shared tails.
    ///
    /// A file whose query fails keeps an empty history.
    pub fn resolve_all(
        &self,
        roots: Vec<String>,
        pool: &WorkerPool,
        cancel: &CancellationToken,
    ) -> Result<FileHistories> {
        let batch = self.config.parallel.effective_history_batch_size();
        let groups = pool.map_chunked(&roots, batch, cancel, |root| {
            self.resolve(root).unwrap_or_else(|e| {
                tracing::warn!(file = %root, error = %e, "history query failed");
                Vec::new()
            })
        })?;
        Ok(FileHistories::assemble(roots, groups))
    }
}
