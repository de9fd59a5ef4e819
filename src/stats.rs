//! Author and file statistics.
//!
//! Line counts come from the head blame, insertions, deletions and commits
//! from the commit groups. Grand totals are taken over every author, while
//! the per-author and per-file tables only carry authors no exclusion pattern
//! matched.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::blame::{BlameLine, HeadBlames};
use crate::commits::CommitNr;
use crate::config::AnalysisConfig;
use crate::errors::{Error, Result};
use crate::history::{CommitGroup, FileHistories, FileId};
use crate::persons::{PersonId, PersonTable};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Aggregated counts for one author, file or author-file pair
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stat {
    pub lines: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub commits: BTreeSet<CommitNr>,
    /// Sum of commit timestamp times insertions
    pub date_sum: i64,
    pub percent_lines: Option<f64>,
    pub percent_insertions: Option<f64>,
}

impl Stat {
    pub fn add_group(&mut self, group: &CommitGroup) {
        self.insertions += group.insertions;
        self.deletions += group.deletions;
        self.date_sum += group.date_sum;
        self.commits.extend(group.commits.iter().copied());
    }

    pub fn add_stat(&mut self, other: &Stat) {
        self.lines += other.lines;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
        self.date_sum += other.date_sum;
        self.commits.extend(other.commits.iter().copied());
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0 && self.insertions == 0 && self.deletions == 0 && self.commits.is_empty()
    }

    /// Surviving lines per changed line, in percent, at most 100
    pub fn stability(&self) -> Option<u32> {
        let churn = self.insertions + self.deletions;
        if churn == 0 {
            return None;
        }
        let ratio = (self.lines as f64 / churn as f64 * 100.0).round();
        Some(ratio.min(100.0) as u32)
    }

    /// Seconds between `now` and the insertion-weighted mean commit time
    pub fn age_seconds(&self, now: i64) -> Option<i64> {
        if self.insertions == 0 {
            return None;
        }
        let mean = self.date_sum / self.insertions as i64;
        Some((now - mean).max(0))
    }

    pub fn age(&self, now: i64) -> String {
        self.age_seconds(now).map(format_age).unwrap_or_default()
    }

    fn set_percentages(&mut self, total: &Stat) {
        self.percent_lines = divide_to_percentage(self.lines, total.lines);
        self.percent_insertions = divide_to_percentage(self.insertions, total.insertions);
    }
}

/// Rounded percentage, `None` when either operand is zero
pub fn divide_to_percentage(dividend: u64, divisor: u64) -> Option<f64> {
    if dividend == 0 || divisor == 0 {
        return None;
    }
    Some((dividend as f64 / divisor as f64 * 100.0).round())
}

/// Format a duration as `Y:MM:DD` with 365-day years and 30-day months.
pub fn format_age(seconds: i64) -> String {
    let days = seconds as f64 / SECONDS_PER_DAY;
    let years = (days / 365.0).floor();
    let rest = days - years * 365.0;
    let months = (rest / 30.0).floor();
    let rest_days = (rest - months * 30.0).round();
    format!("{}:{:02}:{:02}", years as i64, months as i64, rest_days as i64)
}

/// Whether a blame line counts toward line totals under `config`
pub fn counts_line(line: &BlameLine, config: &AnalysisConfig) -> bool {
    (config.comments || !line.is_comment) && (config.empty_lines || !line.is_empty_line())
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorStat {
    pub person: PersonId,
    pub stat: Stat,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStat {
    pub file: FileId,
    pub root: String,
    /// Every path of the identity chain, root first
    pub paths: Vec<String>,
    pub stat: Stat,
}

/// Statistics of one repository
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatTables {
    /// Totals over every author, the `*` entry
    pub totals: Stat,
    /// Included authors, most lines first
    pub authors: Vec<AuthorStat>,
    /// Files with the contribution of included authors, most lines first
    pub files: Vec<FileStat>,
    /// Included author by file
    pub author_files: BTreeMap<(PersonId, FileId), Stat>,
    /// Persons matched by an exclusion pattern that have statistics
    pub excluded_authors: Vec<PersonId>,
}

impl StatTables {
    /// Position of an included author in [`StatTables::authors`], 1-based
    pub fn author_rank(&self, person: PersonId) -> Option<usize> {
        self.authors
            .iter()
            .position(|a| a.person == person)
            .map(|i| i + 1)
    }

    pub fn author_stat(&self, person: PersonId) -> Option<&Stat> {
        self.authors
            .iter()
            .find(|a| a.person == person)
            .map(|a| &a.stat)
    }

    pub fn file_stat(&self, file: FileId) -> Option<&Stat> {
        self.files.iter().find(|f| f.file == file).map(|f| &f.stat)
    }

    /// Included authors of `file`, most lines first
    pub fn authors_of(&self, file: FileId) -> Vec<(PersonId, &Stat)> {
        let mut authors: Vec<(PersonId, &Stat)> = self
            .author_files
            .iter()
            .filter(|((_, f), _)| *f == file)
            .map(|((p, _), stat)| (*p, stat))
            .collect();
        authors.sort_by(|a, b| b.1.lines.cmp(&a.1.lines).then(a.0.cmp(&b.0)));
        authors
    }

    /// Files of an included author in file table order
    pub fn files_of(&self, person: PersonId) -> Vec<(FileId, &Stat)> {
        self.files
            .iter()
            .filter_map(|f| {
                self.author_files
                    .get(&(person, f.file))
                    .map(|stat| (f.file, stat))
            })
            .collect()
    }
}

/// Combines histories and head blame into [`StatTables`].
pub struct StatsAggregator<'a> {
    pub histories: &'a FileHistories,
    pub blames: &'a HeadBlames,
    pub persons: &'a PersonTable,
    pub config: &'a AnalysisConfig,
}

impl StatsAggregator<'_> {
    /// Fails with [`Error::EmptyResult`] when no included author has
    /// statistics.
    pub fn aggregate(&self) -> Result<StatTables> {
        // every author, keyed by canonical person and file
        let mut raw: BTreeMap<(PersonId, FileId), Stat> = BTreeMap::new();

        for (file, history) in self.histories.iter() {
            for group in &history.groups {
                let person = self.persons.resolve(group.author);
                raw.entry((person, file)).or_default().add_group(group);
            }
            for line in self.blames.get(file) {
                if counts_line(line, self.config) {
                    let person = self.persons.resolve(line.author);
                    raw.entry((person, file)).or_default().lines += 1;
                }
            }
        }

        let mut totals = Stat::default();
        for stat in raw.values() {
            totals.add_stat(stat);
        }

        let mut excluded = BTreeSet::new();
        let mut author_files = BTreeMap::new();
        let mut by_author: BTreeMap<PersonId, Stat> = BTreeMap::new();
        let mut by_file: BTreeMap<FileId, Stat> = BTreeMap::new();
        for ((person, file), mut stat) in raw {
            if self.persons.is_excluded(person) {
                excluded.insert(person);
                continue;
            }
            by_author.entry(person).or_default().add_stat(&stat);
            by_file.entry(file).or_default().add_stat(&stat);
            stat.set_percentages(&totals);
            author_files.insert((person, file), stat);
        }

        if by_author.is_empty() {
            return Err(Error::EmptyResult(
                "no statistics matching filters found".to_string(),
            ));
        }

        let mut authors: Vec<AuthorStat> = by_author
            .into_iter()
            .map(|(person, mut stat)| {
                stat.set_percentages(&totals);
                AuthorStat { person, stat }
            })
            .collect();
        authors.sort_by(|a, b| b.stat.lines.cmp(&a.stat.lines).then(a.person.cmp(&b.person)));

        let mut files: Vec<FileStat> = by_file
            .into_iter()
            .filter_map(|(file, mut stat)| {
                let history = self.histories.get(file)?;
                stat.set_percentages(&totals);
                Some(FileStat {
                    file,
                    root: history.root.clone(),
                    paths: history.chain.paths().map(str::to_string).collect(),
                    stat,
                })
            })
            .collect();
        files.sort_by(|a, b| b.stat.lines.cmp(&a.stat.lines).then(a.file.cmp(&b.file)));

        totals.percent_lines = divide_to_percentage(totals.lines, totals.lines);
        totals.percent_insertions = divide_to_percentage(totals.insertions, totals.insertions);

        log::debug!(
            "aggregated {} author(s) over {} file(s), {} excluded",
            authors.len(),
            files.len(),
            excluded.len()
        );
        Ok(StatTables {
            totals,
            authors,
            files,
            author_files,
            excluded_authors: excluded.into_iter().collect(),
        })
    }
}
