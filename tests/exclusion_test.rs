mod common;

use common::{analyse, rename_repo, sequential_config, GitFixture, ALICE, BOB};
use gitauthors::cancel::CancellationToken;
use gitauthors::config::AnalysisConfig;
use gitauthors::rows::{Cell, View};
use gitauthors::{Error, RepoAnalysis};
use pretty_assertions::assert_eq;

fn without_bob() -> AnalysisConfig {
    AnalysisConfig {
        ex_authors: vec!["Bob*".to_string()],
        ..sequential_config()
    }
}

#[test]
fn test_excluded_author_counts_in_totals_only() {
    let (repo, _, _) = rename_repo();
    let analysis = analyse(&repo, without_bob());
    let stats = &analysis.stats;

    assert_eq!(stats.totals.lines, 15);
    assert_eq!(stats.authors.len(), 1);
    assert_eq!(stats.authors[0].stat.lines, 10);
    assert_eq!(stats.excluded_authors.len(), 1);

    let excluded: Vec<String> = analysis
        .persons
        .authors_excluded()
        .map(|p| p.names_str())
        .collect();
    assert_eq!(excluded, vec![BOB.0]);
}

#[test]
fn test_excluded_lines_get_id_zero_in_blame() {
    let (repo, _, _) = rename_repo();
    let analysis = analyse(&repo, without_bob());
    let tables = analysis.tables(&[View::Blame]);

    let blame = &tables.blame["b.py"];
    assert_eq!(blame.len(), 15);
    assert_eq!(blame.cell(0, "ID"), Some(&Cell::Integer(1)));
    assert_eq!(blame.cell(10, "ID"), Some(&Cell::Integer(0)));
    assert_eq!(blame.cell(10, "Author"), Some(&Cell::from(BOB.0)));
}

#[test]
fn test_hidden_exclusions_keep_line_numbers() {
    let repo = GitFixture::new();
    repo.write("m.py", &common::numbered_lines("alice", 3));
    repo.commit(ALICE, 0, "Start");
    let mut contents = common::numbered_lines("bob", 2);
    contents.push_str(&common::numbered_lines("alice", 3));
    repo.write("m.py", &contents);
    repo.commit(BOB, 1, "Prepend");

    let config = AnalysisConfig {
        hide_blame_exclusions: true,
        ..without_bob()
    };
    let analysis = analyse(&repo, config);
    let blame = &analysis.tables(&[View::Blame]).blame["m.py"];

    assert_eq!(blame.len(), 3);
    let lines: Vec<Option<&Cell>> = (0..3).map(|row| blame.cell(row, "Line")).collect();
    assert_eq!(
        lines,
        vec![
            Some(&Cell::Integer(3)),
            Some(&Cell::Integer(4)),
            Some(&Cell::Integer(5))
        ]
    );
}

#[test]
fn test_excluding_every_author_is_an_empty_result() {
    let (repo, _, _) = rename_repo();
    let config = AnalysisConfig {
        ex_emails: vec!["*@example.com".to_string()],
        ..sequential_config()
    };
    let result = RepoAnalysis::open(repo.path(), config, &CancellationToken::new());
    match result {
        Err(e @ Error::EmptyResult(_)) => assert!(e.is_soft()),
        other => panic!("expected an empty result, got {:?}", other.map(|a| a.name)),
    }
}

#[test]
fn test_excluded_revision_is_not_counted() {
    let (repo, _, second) = rename_repo();
    let config = AnalysisConfig {
        ex_revisions: vec![second[..7].to_string()],
        ..sequential_config()
    };
    let analysis = analyse(&repo, config);

    assert_eq!(analysis.excluded.len(), 1);
    let bob = analysis
        .stats
        .authors
        .iter()
        .find(|a| analysis.persons.person(a.person).unwrap().names_str() == BOB.0);
    assert!(bob.map_or(true, |b| b.stat.insertions == 0));
}

fn lines_by(analysis: &RepoAnalysis, name: &str) -> u64 {
    analysis
        .stats
        .authors
        .iter()
        .filter(|a| {
            analysis
                .persons
                .person(a.person)
                .is_some_and(|p| p.names_str() == name)
        })
        .map(|a| a.stat.lines)
        .sum()
}

#[test]
fn test_whitespace_only_changes_are_ignored_by_default() {
    let repo = GitFixture::new();
    repo.write("w.py", &common::numbered_lines("alice", 10));
    repo.commit(ALICE, 0, "Start");
    let padded: String = common::numbered_lines("alice", 10)
        .lines()
        .map(|l| format!("{}   \n", l.replace(" = ", "  =  ")))
        .collect();
    repo.write("w.py", &padded);
    repo.commit(BOB, 1, "Reformat");

    let analysis = analyse(&repo, sequential_config());
    assert_eq!(lines_by(&analysis, ALICE.0), 10);
    assert_eq!(lines_by(&analysis, BOB.0), 0);

    let config = AnalysisConfig {
        whitespace: true,
        ..sequential_config()
    };
    let analysis = analyse(&repo, config);
    assert_eq!(lines_by(&analysis, BOB.0), 10);
}
