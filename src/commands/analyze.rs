use anyhow::{Context, Result};

use crate::analysis::{analyze_repositories, RepoAnalysis};
use crate::cancel::CancellationToken;
use crate::cli::{AnalyzeArgs, BlameRequestArg};
use crate::config::{load_config, AnalysisConfig, OutputFormat};
use crate::output::{output_json, render_repository, render_table, RepoReport};
use crate::progress::{ProgressManager, TEMPLATE_REPOSITORIES};
use crate::repos::discover_all;

/// Run the `analyze` subcommand.
pub fn handle_analyze(args: &AnalyzeArgs, progress: &ProgressManager) -> Result<()> {
    let config = build_config(args)?;
    let requests = args.blame_requests()?;
    let views = args.views();

    let repositories = discover_all(&args.paths, args.depth)?;
    if repositories.is_empty() {
        anyhow::bail!("no git repositories found");
    }

    let cancel = CancellationToken::new();
    let bar = progress.create_bar(repositories.len() as u64, TEMPLATE_REPOSITORIES);
    bar.set_message("Analysing");
    let outcomes = analyze_repositories(&repositories, &config, &cancel, |outcome| {
        bar.set_message(outcome.path.display().to_string());
        bar.inc(1);
    });
    bar.finish_and_clear();

    let terminal = config.formats.contains(&OutputFormat::Terminal);
    let json = config.formats.contains(&OutputFormat::Json);
    let mut reports = Vec::new();
    let mut failures = 0;

    for outcome in outcomes {
        let analysis = match outcome.result {
            Ok(analysis) => analysis,
            Err(e) if e.is_soft() => {
                eprintln!("{}: {}", outcome.path.display(), e);
                continue;
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", outcome.path.display(), e);
                continue;
            }
        };
        let tables = analysis.tables(&views);
        if terminal {
            print!("{}", render_repository(&analysis.name, &tables, &views));
            answer_blame_requests(&analysis, &requests, &cancel)?;
        }
        if json {
            reports.push(RepoReport {
                name: analysis.name.clone(),
                path: outcome.path.display().to_string(),
                commits: analysis.commits.len(),
                tables,
            });
        }
    }

    if json {
        output_json(&reports, args.output.as_deref())?;
    }
    if failures == repositories.len() {
        anyhow::bail!("analysis failed for every repository");
    }
    Ok(())
}

fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = load_config(args.config.as_deref()).map_err(anyhow::Error::msg)?;
    args.apply_to(&mut config)
        .context("invalid command-line option")?;
    Ok(config)
}

/// Print point-in-time blame for every request addressed to this repository.
fn answer_blame_requests(
    analysis: &RepoAnalysis,
    requests: &[BlameRequestArg],
    cancel: &CancellationToken,
) -> Result<()> {
    if requests.is_empty() {
        return Ok(());
    }
    let mut service = analysis.dynamic_blame(cancel.clone())?;
    let prefix = analysis.config.subfolder_prefix();
    let builder = analysis.row_builder();
    let tickets: Vec<_> = requests
        .iter()
        .map(|request| {
            let root = if analysis.histories.id_of(&request.file).is_some() {
                request.file.clone()
            } else {
                format!("{}{}", prefix, request.file)
            };
            (request, service.request_named(&root, &request.commit, analysis.engine()))
        })
        .collect();

    for (request, ticket) in tickets {
        match ticket.and_then(|t| t.wait()) {
            Ok(lines) => {
                let title = format!("Blame {}@{}", request.file, request.commit);
                print!("{}", render_table(&title, &builder.blame(&lines)));
            }
            Err(e) => eprintln!("{}@{}: {}", request.file, request.commit, e),
        }
    }
    service.shutdown();
    Ok(())
}
