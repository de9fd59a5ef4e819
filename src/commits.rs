//! Total commit ordering for one repository.
//!
//! Sequence numbers run over the full history reachable from the head,
//! independent of any `since`/`until` or exclusion filter, so blame output can
//! always reference the commit that last touched a line.

use std::collections::{HashMap, HashSet};

use glob::{MatchOptions, Pattern};
use serde::Serialize;

use crate::errors::{Error, Result};
use crate::persons::{PersonId, PersonRegistry};
use crate::vcs::{CommitMeta, VcsSource};

/// Dense 1-based commit sequence number, 1 being the oldest commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CommitNr(pub u32);

/// One indexed commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub nr: CommitNr,
    pub long_id: String,
    pub short_id: String,
    pub author: PersonId,
    /// Committer time, Unix seconds
    pub timestamp: i64,
    pub message: String,
}

/// Commits in ascending date order with id and number lookups.
#[derive(Debug, Default)]
pub struct CommitIndex {
    records: Vec<CommitRecord>,
    by_long: HashMap<String, CommitNr>,
    by_short: HashMap<String, CommitNr>,
    head: Option<CommitNr>,
}

impl CommitIndex {
    /// Index every commit reachable from the repository head and register
    /// commit authors. With `until`, the effective head is the newest commit
    /// not later than the bound.
    pub fn build(
        source: &dyn VcsSource,
        persons: &PersonRegistry,
        until: Option<i64>,
    ) -> Result<Self> {
        let head = source.head()?;
        let commits = source.list_commits(&head)?;
        let mut index = Self::from_commits(commits, persons);

        let effective = match until {
            Some(bound) => index
                .records
                .iter()
                .rev()
                .find(|r| r.timestamp <= bound)
                .map(|r| r.nr),
            None => index.by_long.get(&head).copied(),
        };
        index.head = effective;
        log::debug!(
            "indexed {} commits, effective head {:?}",
            index.len(),
            index.head_record().map(|r| r.short_id.as_str())
        );
        Ok(index)
    }

    /// Number commits by ascending timestamp. Commits sharing a timestamp keep
    /// the order in which the source listed them.
    pub fn from_commits(mut commits: Vec<CommitMeta>, persons: &PersonRegistry) -> Self {
        commits.sort_by_key(|c| c.timestamp);

        let mut index = Self::default();
        for (position, meta) in commits.into_iter().enumerate() {
            let nr = CommitNr(position as u32 + 1);
            let author = persons.add_person(&meta.author_name, &meta.author_email);
            index.by_long.insert(meta.long_id.clone(), nr);
            index.by_short.insert(meta.short_id.clone(), nr);
            index.records.push(CommitRecord {
                nr,
                long_id: meta.long_id,
                short_id: meta.short_id,
                author,
                timestamp: meta.timestamp,
                message: meta.message,
            });
        }
        index.head = index.records.last().map(|r| r.nr);
        index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    pub fn get(&self, nr: CommitNr) -> Option<&CommitRecord> {
        (nr.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.records.get(i))
    }

    /// Sequence number of a long or abbreviated commit id
    pub fn nr_of(&self, id: &str) -> Option<CommitNr> {
        self.by_long
            .get(id)
            .or_else(|| self.by_short.get(id))
            .copied()
            .or_else(|| {
                // abbreviations longer than the indexed short ids
                if id.len() < 4 {
                    return None;
                }
                let mut matches = self.records.iter().filter(|r| r.long_id.starts_with(id));
                match (matches.next(), matches.next()) {
                    (Some(only), None) => Some(only.nr),
                    _ => None,
                }
            })
    }

    pub fn record_of(&self, id: &str) -> Option<&CommitRecord> {
        self.nr_of(id).and_then(|nr| self.get(nr))
    }

    pub fn long_id(&self, short_id: &str) -> Option<&str> {
        self.record_of(short_id).map(|r| r.long_id.as_str())
    }

    pub fn short_id(&self, long_id: &str) -> Option<&str> {
        self.record_of(long_id).map(|r| r.short_id.as_str())
    }

    /// Commit analysed as the head
    pub fn head_record(&self) -> Option<&CommitRecord> {
        self.head.and_then(|nr| self.get(nr))
    }

    pub fn head_id(&self) -> Result<&str> {
        self.head_record()
            .map(|r| r.long_id.as_str())
            .ok_or_else(|| Error::Configuration("no commit at or before the until bound".into()))
    }
}

/// Commits dropped from statistics and ignored by blame.
#[derive(Debug, Clone, Default)]
pub struct ExcludedCommits {
    long_ids: HashSet<String>,
}

const MESSAGE_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl ExcludedCommits {
    /// Select commits whose long id starts with one of `revision_prefixes` or
    /// whose message matches one of `message_patterns`.
    pub fn select(
        index: &CommitIndex,
        revision_prefixes: &[String],
        message_patterns: &[String],
    ) -> Result<Self> {
        let patterns = message_patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let long_ids: HashSet<String> = index
            .records()
            .iter()
            .filter(|record| {
                revision_prefixes
                    .iter()
                    .any(|prefix| record.long_id.starts_with(prefix.as_str()))
                    || patterns
                        .iter()
                        .any(|p| p.matches_with(record.message.trim(), MESSAGE_MATCH))
            })
            .map(|record| record.long_id.clone())
            .collect();

        if !long_ids.is_empty() {
            log::info!("excluding {} commit(s) from statistics", long_ids.len());
        }
        Ok(Self { long_ids })
    }

    pub fn contains(&self, long_id: &str) -> bool {
        self.long_ids.contains(long_id)
    }

    pub fn len(&self) -> usize {
        self.long_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.long_ids.is_empty()
    }

    /// Long ids in a stable order, for passing to blame
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.long_ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}
