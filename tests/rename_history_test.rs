mod common;

use common::{analyse, rename_repo, sequential_config, GitFixture, ALICE, BOB};
use gitauthors::commits::CommitNr;
use gitauthors::config::AnalysisConfig;
use gitauthors::rows::{Cell, View, TOTALS_KEY};
use gitauthors::FileId;
use pretty_assertions::assert_eq;

#[test]
fn test_rename_is_followed_into_one_root_file() {
    let (repo, _, _) = rename_repo();
    let analysis = analyse(&repo, sequential_config());

    assert_eq!(analysis.histories.len(), 1);
    let history = analysis.histories.get(FileId(0)).unwrap();
    assert_eq!(history.root, "b.py");
    let paths: Vec<&str> = history.chain.paths().collect();
    assert_eq!(paths, vec!["b.py", "a.py"]);
    assert_eq!(history.chain.path_at(CommitNr(1)), Some("a.py"));
    assert_eq!(history.chain.path_at(CommitNr(2)), Some("b.py"));
    assert_eq!(history.chain.commits(), vec![CommitNr(2), CommitNr(1)]);
}

#[test]
fn test_commit_numbers_follow_dates() {
    let (repo, first, second) = rename_repo();
    let analysis = analyse(&repo, sequential_config());

    assert_eq!(analysis.commits.len(), 2);
    assert_eq!(analysis.commits.nr_of(&first), Some(CommitNr(1)));
    assert_eq!(analysis.commits.nr_of(&second), Some(CommitNr(2)));
    assert_eq!(analysis.commits.nr_of(&second[..7]), Some(CommitNr(2)));
    assert_eq!(analysis.commits.head_id().unwrap(), second);
}

#[test]
fn test_file_and_author_statistics() {
    let (repo, _, _) = rename_repo();
    let analysis = analyse(&repo, sequential_config());
    let stats = &analysis.stats;

    assert_eq!(stats.totals.lines, 15);
    assert_eq!(stats.totals.insertions, 15);
    assert_eq!(stats.totals.commit_count(), 2);

    let file = stats.file_stat(FileId(0)).unwrap();
    assert_eq!(file.lines, 15);
    assert_eq!(file.commit_count(), 2);

    let names: Vec<String> = stats
        .authors
        .iter()
        .map(|a| analysis.persons.person(a.person).unwrap().names_str())
        .collect();
    assert_eq!(names, vec![ALICE.0, BOB.0]);
    assert_eq!(stats.authors[0].stat.lines, 10);
    assert_eq!(stats.authors[1].stat.lines, 5);
    assert_eq!(stats.authors[1].stat.insertions, 5);
}

#[test]
fn test_rows_for_every_view() {
    let (repo, _, _) = rename_repo();
    let analysis = analyse(&repo, sequential_config());
    let tables = analysis.tables(&View::ALL);

    let authors = &tables.authors;
    assert_eq!(authors.len(), 3);
    assert_eq!(authors.cell(0, "ID"), Some(&Cell::Integer(0)));
    assert_eq!(authors.cell(0, "Author"), Some(&Cell::from(TOTALS_KEY)));
    assert_eq!(authors.cell(0, "Lines"), Some(&Cell::Integer(15)));
    assert_eq!(authors.cell(1, "Author"), Some(&Cell::from("Alice")));
    assert_eq!(authors.cell(1, "Email"), Some(&Cell::from("alice@example.com")));
    assert_eq!(authors.cell(2, "ID"), Some(&Cell::Integer(2)));

    let files = &tables.files;
    assert_eq!(files.cell(1, "File"), Some(&Cell::from("b.py")));
    assert_eq!(files.cell(1, "Commits"), Some(&Cell::Integer(2)));
    assert_eq!(files.cell(1, "Lines"), Some(&Cell::Integer(15)));

    assert_eq!(tables.authors_files.len(), 2);
    assert_eq!(tables.files_authors.len(), 2);

    let blame = &tables.blame["b.py"];
    assert_eq!(blame.len(), 15);
    assert_eq!(blame.cell(0, "Author"), Some(&Cell::from("Alice")));
    assert_eq!(blame.cell(0, "Commit number"), Some(&Cell::Integer(1)));
    assert_eq!(blame.cell(0, "Date"), Some(&Cell::from("2024-01-01")));
    assert_eq!(blame.cell(14, "Author"), Some(&Cell::from("Bob")));
    assert_eq!(blame.cell(14, "Line"), Some(&Cell::Integer(15)));
    assert_eq!(blame.cell(14, "Code"), Some(&Cell::from("bob_5 = 5")));
}

#[test]
fn test_until_analyses_an_earlier_head() {
    let (repo, first, _) = rename_repo();
    let config = AnalysisConfig {
        until: Some(chrono::DateTime::from_timestamp(1_704_110_400 + 3_600, 0).unwrap()),
        ..sequential_config()
    };
    let analysis = analyse(&repo, config);

    assert_eq!(analysis.commits.head_id().unwrap(), first);
    assert_eq!(analysis.histories.get(FileId(0)).unwrap().root, "a.py");
    assert_eq!(analysis.stats.totals.lines, 10);
}

#[test]
fn test_n_files_picks_the_largest() {
    let repo = GitFixture::new();
    repo.write("small.py", "x = 1\n");
    repo.write("large.py", &common::numbered_lines("v", 20));
    repo.write("notes.txt", &common::numbered_lines("t", 50));
    repo.commit(ALICE, 0, "Initial files");

    let config = AnalysisConfig {
        n_files: 1,
        ..sequential_config()
    };
    let analysis = analyse(&repo, config);
    let roots: Vec<&str> = analysis.histories.roots().collect();
    assert_eq!(roots, vec!["large.py"]);
}
