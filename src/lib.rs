//! Authorship statistics for git repositories.
//!
//! The pipeline runs in phases: commits are indexed and numbered, file
//! histories are traced through renames, files are blamed at the head commit
//! (and optionally at historical commits), and the results are aggregated
//! into per-author and per-file statistics that [`rows`] turns into tables.

pub mod analysis;
pub mod blame;
pub mod cancel;
pub mod cli;
pub mod commands;
pub mod commits;
pub mod config;
pub mod errors;
pub mod history;
pub mod output;
pub mod persons;
pub mod pool;
pub mod progress;
pub mod repos;
pub mod rows;
pub mod stats;
pub mod vcs;

pub use crate::analysis::{analyze_repositories, RepoAnalysis, RepoOutcome};
pub use crate::blame::{
    BlameEngine, BlameLine, DynamicBlameService, HeadBlames, StaticBlameHistory,
};
pub use crate::cancel::CancellationToken;
pub use crate::commits::{CommitIndex, CommitNr};
pub use crate::config::{AnalysisConfig, BlameHistoryMode, OutputFormat};
pub use crate::errors::{Error, Result};
pub use crate::history::{FileHistories, FileHistory, FileHistoryResolver, FileId};
pub use crate::persons::{Person, PersonId, PersonRegistry, PersonTable};
pub use crate::rows::{Cell, RepoTables, RowTable, RowTableBuilder, View};
pub use crate::stats::{Stat, StatTables, StatsAggregator};
pub use crate::vcs::{GitRepository, VcsSource};
