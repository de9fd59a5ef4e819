//! Header-labelled row tables handed to the output layer.
//!
//! Each view has a typed row struct; rows become [`Cell`]s only when a
//! [`RowTable`] is assembled. The `ID` column carries 0 for totals and
//! excluded entries and 1..N for included authors or files in table order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::blame::{BlameLine, HeadBlames};
use crate::config::AnalysisConfig;
use crate::history::{FileHistories, FileId};
use crate::persons::{PersonId, PersonTable};
use crate::stats::{counts_line, Stat, StatTables};

/// Reserved name of the totals row
pub const TOTALS_KEY: &str = "*";

const SHORT_SHA_LEN: usize = 7;

/// One table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(i64),
    Text(String),
    Percentage(Option<f64>),
    Empty,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Integer(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Percentage(Some(p)) => write!(f, "{:.0}", p),
            Cell::Percentage(None) | Cell::Empty => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Integer(n as i64)
    }
}

impl From<u64> for Cell {
    fn from(n: u64) -> Self {
        Cell::Integer(n as i64)
    }
}

impl From<u32> for Cell {
    fn from(n: u32) -> Self {
        Cell::Integer(n as i64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Ordered rows with their header labels
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RowTable {
    fn new<R: ToCells>(header: Vec<String>, rows: &[R]) -> Self {
        Self {
            header,
            rows: rows.iter().map(ToCells::to_cells).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell under `label` in row `row`
    pub fn cell(&self, row: usize, label: &str) -> Option<&Cell> {
        let column = self.header.iter().position(|h| h == label)?;
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Table selectable for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Authors,
    AuthorsFiles,
    FilesAuthors,
    Files,
    Blame,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Authors,
        View::AuthorsFiles,
        View::FilesAuthors,
        View::Files,
        View::Blame,
    ];
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Authors => "authors",
            View::AuthorsFiles => "authors-files",
            View::FilesAuthors => "files-authors",
            View::Files => "files",
            View::Blame => "blame",
        };
        f.write_str(name)
    }
}

trait ToCells {
    fn to_cells(&self) -> Vec<Cell>;
}

/// Stat columns shared by the four statistics views
#[derive(Debug, Clone, PartialEq)]
pub struct StatValues {
    pub percent_lines: Option<f64>,
    pub percent_insertions: Option<f64>,
    /// Present when scaled percentages are shown
    pub scaled: Option<(Option<f64>, Option<f64>)>,
    pub lines: u64,
    pub insertions: u64,
    pub stability: Option<u32>,
    pub commits: usize,
    /// Present when the deletions column is shown
    pub deletions: Option<u64>,
    pub age: String,
}

impl StatValues {
    fn push_cells(&self, cells: &mut Vec<Cell>) {
        cells.push(Cell::Percentage(self.percent_lines));
        cells.push(Cell::Percentage(self.percent_insertions));
        if let Some((lines, insertions)) = self.scaled {
            cells.push(Cell::Percentage(lines));
            cells.push(Cell::Percentage(insertions));
        }
        cells.push(self.lines.into());
        cells.push(self.insertions.into());
        cells.push(self.stability.into());
        cells.push(self.commits.into());
        if let Some(deletions) = self.deletions {
            cells.push(deletions.into());
        }
        cells.push(self.age.clone().into());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorRow {
    pub id: usize,
    pub author: String,
    pub email: String,
    pub values: StatValues,
}

impl ToCells for AuthorRow {
    fn to_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = vec![
            self.id.into(),
            self.author.as_str().into(),
            self.email.as_str().into(),
        ];
        self.values.push_cells(&mut cells);
        cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorFileRow {
    pub id: usize,
    pub author: String,
    pub file: String,
    pub values: StatValues,
}

impl ToCells for AuthorFileRow {
    fn to_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = vec![
            self.id.into(),
            self.author.as_str().into(),
            self.file.as_str().into(),
        ];
        self.values.push_cells(&mut cells);
        cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileAuthorRow {
    pub id: usize,
    pub file: String,
    pub author: String,
    pub values: StatValues,
}

impl ToCells for FileAuthorRow {
    fn to_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = vec![
            self.id.into(),
            self.file.as_str().into(),
            self.author.as_str().into(),
        ];
        self.values.push_cells(&mut cells);
        cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileRow {
    pub id: usize,
    pub file: String,
    pub values: StatValues,
}

impl ToCells for FileRow {
    fn to_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = vec![
            self.id.into(),
            self.file.as_str().into(),
        ];
        self.values.push_cells(&mut cells);
        cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlameRow {
    /// Author position in the authors table, 0 when excluded
    pub id: usize,
    pub author: String,
    pub date: String,
    pub message: String,
    pub sha: String,
    pub commit_nr: Option<u32>,
    pub line: u32,
    pub code: String,
}

impl ToCells for BlameRow {
    fn to_cells(&self) -> Vec<Cell> {
        vec![
            self.id.into(),
            self.author.as_str().into(),
            self.date.as_str().into(),
            self.message.as_str().into(),
            self.sha.as_str().into(),
            self.commit_nr.into(),
            self.line.into(),
            self.code.as_str().into(),
        ]
    }
}

fn stat_header(deletions: bool) -> Vec<&'static str> {
    let mut header = vec!["% Lines", "% Insertions", "Lines", "Insertions", "Stability", "Commits"];
    if deletions {
        header.push("Deletions");
    }
    header.push("Age Y:M:D");
    header
}

fn labels(prefix: &[&str], rest: Vec<&str>) -> Vec<String> {
    prefix
        .iter()
        .copied()
        .chain(rest)
        .map(str::to_string)
        .collect()
}

pub fn header_authors(deletions: bool, scaled: bool) -> Vec<String> {
    let mut stat = stat_header(deletions);
    if scaled {
        stat.insert(2, "% Scaled Insertions");
        stat.insert(2, "% Scaled Lines");
    }
    labels(&["ID", "Author", "Email"], stat)
}

pub fn header_authors_files(deletions: bool) -> Vec<String> {
    labels(&["ID", "Author", "File"], stat_header(deletions))
}

pub fn header_files_authors(deletions: bool) -> Vec<String> {
    labels(&["ID", "File", "Author"], stat_header(deletions))
}

pub fn header_files(deletions: bool) -> Vec<String> {
    labels(&["ID", "File"], stat_header(deletions))
}

pub fn header_blame() -> Vec<String> {
    labels(
        &["ID", "Author", "Date", "Message", "SHA", "Commit number", "Line", "Code"],
        Vec::new(),
    )
}

/// Every table of one repository, blame keyed by file name
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoTables {
    pub authors: RowTable,
    pub authors_files: RowTable,
    pub files_authors: RowTable,
    pub files: RowTable,
    pub blame: BTreeMap<String, RowTable>,
    /// Static blame history: file name, then short commit id
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub blame_history: BTreeMap<String, BTreeMap<String, RowTable>>,
}

/// Flattens statistics and blame into [`RowTable`]s.
pub struct RowTableBuilder<'a> {
    pub stats: &'a StatTables,
    pub persons: &'a PersonTable,
    pub histories: &'a FileHistories,
    pub config: &'a AnalysisConfig,
    /// Reference time for ages, Unix seconds
    pub now: i64,
}

impl RowTableBuilder<'_> {
    fn values(&self, stat: &Stat, scale: Option<usize>) -> StatValues {
        StatValues {
            percent_lines: stat.percent_lines,
            percent_insertions: stat.percent_insertions,
            scaled: scale.map(|n| {
                (
                    stat.percent_lines.map(|p| p * n as f64),
                    stat.percent_insertions.map(|p| p * n as f64),
                )
            }),
            lines: stat.lines,
            insertions: stat.insertions,
            stability: stat.stability(),
            commits: stat.commit_count(),
            deletions: self.config.deletions.then_some(stat.deletions),
            age: stat.age(self.now),
        }
    }

    fn author_name(&self, person: PersonId) -> String {
        self.persons
            .person(person)
            .map(|p| p.names_str())
            .unwrap_or_default()
    }

    /// File name relative to the configured subfolder
    pub fn file_name(&self, file: FileId) -> String {
        let prefix = self.config.subfolder_prefix();
        self.histories
            .get(file)
            .map(|h| h.root.strip_prefix(&prefix).unwrap_or(&h.root).to_string())
            .unwrap_or_default()
    }

    pub fn author_rows(&self) -> Vec<AuthorRow> {
        let scale = self
            .config
            .scaled_percentages
            .then_some(self.stats.authors.len());
        let totals = AuthorRow {
            id: 0,
            author: TOTALS_KEY.to_string(),
            email: String::new(),
            values: self.values(&self.stats.totals, scale.map(|_| 1)),
        };
        std::iter::once(totals)
            .chain(self.stats.authors.iter().enumerate().map(|(i, a)| AuthorRow {
                id: i + 1,
                author: self.author_name(a.person),
                email: self
                    .persons
                    .person(a.person)
                    .map(|p| p.emails_str())
                    .unwrap_or_default(),
                values: self.values(&a.stat, scale),
            }))
            .collect()
    }

    pub fn author_file_rows(&self) -> Vec<AuthorFileRow> {
        let mut rows = Vec::new();
        for (i, author) in self.stats.authors.iter().enumerate() {
            let name = self.author_name(author.person);
            for (file, stat) in self.stats.files_of(author.person) {
                rows.push(AuthorFileRow {
                    id: i + 1,
                    author: name.clone(),
                    file: self.file_name(file),
                    values: self.values(stat, None),
                });
            }
        }
        rows
    }

    pub fn file_author_rows(&self) -> Vec<FileAuthorRow> {
        let mut rows = Vec::new();
        for (i, file) in self.stats.files.iter().enumerate() {
            let name = self.file_name(file.file);
            for (person, stat) in self.stats.authors_of(file.file) {
                rows.push(FileAuthorRow {
                    id: i + 1,
                    file: name.clone(),
                    author: self.author_name(person),
                    values: self.values(stat, None),
                });
            }
        }
        rows
    }

    pub fn file_rows(&self) -> Vec<FileRow> {
        let totals = FileRow {
            id: 0,
            file: TOTALS_KEY.to_string(),
            values: self.values(&self.stats.totals, None),
        };
        std::iter::once(totals)
            .chain(self.stats.files.iter().enumerate().map(|(i, f)| FileRow {
                id: i + 1,
                file: self.file_name(f.file),
                values: self.values(&f.stat, None),
            }))
            .collect()
    }

    /// Blame rows in line order. Excluded authors, and comment or empty
    /// lines not counted, get ID 0 and are dropped when exclusions are
    /// hidden.
    pub fn blame_rows(&self, lines: &[BlameLine]) -> Vec<BlameRow> {
        lines
            .iter()
            .filter_map(|line| {
                let person = self.persons.resolve(line.author);
                let id = if counts_line(line, self.config) {
                    self.stats.author_rank(person).unwrap_or(0)
                } else {
                    0
                };
                if id == 0 && self.config.hide_blame_exclusions {
                    return None;
                }
                Some(BlameRow {
                    id,
                    author: self
                        .persons
                        .person(person)
                        .map(|p| p.names_str())
                        .unwrap_or_else(|| line.author_name.clone()),
                    date: format_date(line.timestamp),
                    message: line.message.clone(),
                    sha: line.commit_id.chars().take(SHORT_SHA_LEN).collect(),
                    commit_nr: line.commit_nr.map(|nr| nr.0),
                    line: line.line_nr,
                    code: line.text.clone(),
                })
            })
            .collect()
    }

    pub fn authors(&self) -> RowTable {
        RowTable::new(
            header_authors(self.config.deletions, self.config.scaled_percentages),
            &self.author_rows(),
        )
    }

    pub fn authors_files(&self) -> RowTable {
        RowTable::new(header_authors_files(self.config.deletions), &self.author_file_rows())
    }

    pub fn files_authors(&self) -> RowTable {
        RowTable::new(header_files_authors(self.config.deletions), &self.file_author_rows())
    }

    pub fn files(&self) -> RowTable {
        RowTable::new(header_files(self.config.deletions), &self.file_rows())
    }

    pub fn blame(&self, lines: &[BlameLine]) -> RowTable {
        RowTable::new(header_blame(), &self.blame_rows(lines))
    }

    /// Tables for `views`; blame tables for every file with head blame.
    pub fn build(&self, views: &[View], blames: &HeadBlames) -> RepoTables {
        let mut tables = RepoTables::default();
        for view in views {
            match view {
                View::Authors => tables.authors = self.authors(),
                View::AuthorsFiles => tables.authors_files = self.authors_files(),
                View::FilesAuthors => tables.files_authors = self.files_authors(),
                View::Files => tables.files = self.files(),
                View::Blame => {
                    for (file, lines) in blames.iter() {
                        if !lines.is_empty() {
                            tables.blame.insert(self.file_name(file), self.blame(lines));
                        }
                    }
                }
            }
        }
        tables
    }
}

/// `YYYY-MM-DD` of a Unix timestamp, UTC
pub fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
