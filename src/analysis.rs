//! Per-repository analysis context.
//!
//! [`RepoAnalysis::run`] executes the pipeline in three phases separated by
//! barriers:
//!
//! 1. discovery: commit index, file selection, rename-following history
//!    and head blame, all registering persons;
//! 2. identity freeze: the person registry is snapshotted and exclusion
//!    patterns are evaluated against the final canonical persons;
//! 3. aggregation: statistics over the frozen identities, plus static blame
//!    history when requested.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, info_span};

use crate::blame::{
    BlameEngine, BlameSettings, DynamicBlameService, HeadBlames, StaticBlameHistory,
};
use crate::cancel::CancellationToken;
use crate::commits::{CommitIndex, ExcludedCommits};
use crate::config::{AnalysisConfig, BlameHistoryMode};
use crate::errors::{Error, Result};
use crate::history::{select_files, FileHistories, FileHistoryResolver};
use crate::persons::{ExclusionPatterns, PersonRegistry, PersonTable};
use crate::pool::WorkerPool;
use crate::repos::repository_name;
use crate::rows::{RepoTables, RowTableBuilder, View};
use crate::stats::{StatTables, StatsAggregator};
use crate::vcs::{GitRepository, VcsSource};

/// Wall time spent per phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseTimings {
    pub commits: Duration,
    pub history: Duration,
    pub blame: Duration,
    pub stats: Duration,
    pub blame_history: Duration,
}

/// Everything computed for one repository.
pub struct RepoAnalysis {
    pub name: String,
    pub config: AnalysisConfig,
    pub persons: PersonTable,
    pub commits: Arc<CommitIndex>,
    pub excluded: ExcludedCommits,
    pub histories: Arc<FileHistories>,
    pub head_blames: HeadBlames,
    pub stats: StatTables,
    pub blame_history: Option<StaticBlameHistory>,
    pub timings: PhaseTimings,
    /// Reference time for ages, Unix seconds
    pub analysed_at: i64,
    registry: Arc<PersonRegistry>,
    engine: BlameEngine,
}

impl RepoAnalysis {
    /// Analyse the git repository at `path`.
    pub fn open(path: &Path, config: AnalysisConfig, cancel: &CancellationToken) -> Result<Self> {
        let repo = GitRepository::open(path)?;
        let name = repository_name(repo.repo_path());
        Self::run(name, Arc::new(repo), config, cancel)
    }

    pub fn run(
        name: String,
        source: Arc<dyn VcsSource>,
        config: AnalysisConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let span = info_span!("repository", repo = %name);
        let _guard = span.enter();

        config.validate()?;
        let exclusions = ExclusionPatterns::new(&config.ex_authors, &config.ex_emails)?;
        let pool = WorkerPool::new(&config.parallel)?;
        let registry = Arc::new(PersonRegistry::new(config.merge_aliases));
        let mut timings = PhaseTimings::default();

        // Phase 1: discovery
        let start = Instant::now();
        let (commits, excluded) = {
            let _span = info_span!("commits").entered();
            let commits =
                CommitIndex::build(source.as_ref(), &registry, config.until_timestamp())?;
            let excluded =
                ExcludedCommits::select(&commits, &config.ex_revisions, &config.ex_messages)?;
            info!(commits = commits.len(), excluded = excluded.len(), "Indexed commits");
            (Arc::new(commits), excluded)
        };
        timings.commits = start.elapsed();
        cancel.check()?;

        let start = Instant::now();
        let histories = {
            let _span = info_span!("history").entered();
            let roots = select_files(source.as_ref(), commits.head_id()?, &config)?;
            let resolver = FileHistoryResolver {
                source: source.as_ref(),
                commits: &commits,
                persons: &registry,
                excluded: &excluded,
                config: &config,
            };
            Arc::new(resolver.resolve_all(roots, &pool, cancel)?)
        };
        timings.history = start.elapsed();

        let engine = BlameEngine::new(
            Arc::clone(&source),
            Arc::clone(&commits),
            Arc::clone(&registry),
            BlameSettings::from_config(&config, excluded.sorted_ids()),
        );
        let start = Instant::now();
        let head_blames = {
            let _span = info_span!("blame").entered();
            let blames = engine.blame_head(&histories, &pool, cancel)?;
            info!(files = histories.len(), lines = blames.total_lines(), "Blamed head");
            blames
        };
        timings.blame = start.elapsed();

        // Phase 2: no alias is registered after this point by the full pass
        let persons = registry.snapshot(&exclusions);
        log::debug!(
            "{} canonical person(s) from {} alias(es)",
            persons.len(),
            registry.alias_count()
        );

        // Phase 3: aggregation
        let start = Instant::now();
        let stats = {
            let _span = info_span!("stats").entered();
            StatsAggregator {
                histories: &histories,
                blames: &head_blames,
                persons: &persons,
                config: &config,
            }
            .aggregate()?
        };
        timings.stats = start.elapsed();

        let start = Instant::now();
        let blame_history = if config.blame_history == BlameHistoryMode::Static {
            let _span = info_span!("blame_history").entered();
            Some(engine.blame_history(&histories, &head_blames, &pool, cancel)?)
        } else {
            None
        };
        timings.blame_history = start.elapsed();

        Ok(Self {
            name,
            config,
            persons,
            commits,
            excluded,
            histories,
            head_blames,
            stats,
            blame_history,
            timings,
            analysed_at: Utc::now().timestamp(),
            registry,
            engine,
        })
    }

    pub fn row_builder(&self) -> RowTableBuilder<'_> {
        RowTableBuilder {
            stats: &self.stats,
            persons: &self.persons,
            histories: &self.histories,
            config: &self.config,
            now: self.analysed_at,
        }
    }

    /// Row tables for `views`, including static blame history when computed.
    pub fn tables(&self, views: &[View]) -> RepoTables {
        let builder = self.row_builder();
        let mut tables = builder.build(views, &self.head_blames);
        if let Some(history) = &self.blame_history {
            for (file, _) in self.histories.iter() {
                let per_commit: BTreeMap<String, _> = history
                    .commits_of(file)
                    .into_iter()
                    .filter_map(|nr| {
                        let record = self.commits.get(nr)?;
                        let lines = history.get(file, nr)?;
                        Some((record.short_id.clone(), builder.blame(lines)))
                    })
                    .collect();
                if !per_commit.is_empty() {
                    tables.blame_history.insert(builder.file_name(file), per_commit);
                }
            }
        }
        tables
    }

    /// Start on-demand historical blame for this repository.
    ///
    /// Persons first seen by on-demand blame resolve to themselves in the
    /// frozen person table.
    pub fn dynamic_blame(&self, cancel: CancellationToken) -> Result<DynamicBlameService> {
        DynamicBlameService::start(
            self.engine.clone(),
            Arc::clone(&self.histories),
            self.config.parallel.effective_concurrency(),
            cancel,
        )
    }

    pub fn engine(&self) -> &BlameEngine {
        &self.engine
    }

    /// Alias count of the registry, including aliases found after the freeze
    pub fn alias_count(&self) -> usize {
        self.registry.alias_count()
    }
}

/// Result of one repository of a batch
pub struct RepoOutcome {
    pub path: PathBuf,
    pub result: Result<RepoAnalysis>,
}

impl RepoOutcome {
    /// True for an analysis that found nothing matching the filters
    pub fn is_empty(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_soft())
    }
}

/// Analyse every repository in `paths`. A failing repository does not stop
/// the others; cancellation stops the remaining ones.
pub fn analyze_repositories<F>(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    cancel: &CancellationToken,
    mut on_done: F,
) -> Vec<RepoOutcome>
where
    F: FnMut(&RepoOutcome),
{
    let mut outcomes = Vec::with_capacity(paths.len());
    for path in paths {
        let result = if cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            RepoAnalysis::open(path, config.clone(), cancel)
        };
        match &result {
            Err(e) if e.is_soft() => log::info!("{}: {}", path.display(), e),
            Err(e) => tracing::error!(repo = %path.display(), error = %e, "analysis failed"),
            Ok(_) => {}
        }
        let outcome = RepoOutcome {
            path: path.clone(),
            result,
        };
        on_done(&outcome);
        outcomes.push(outcome);
    }
    outcomes
}
