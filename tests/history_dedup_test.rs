mod common;

use std::collections::BTreeSet;

use common::{analyse, sequential_config, GitFixture, ALICE, BOB};
use gitauthors::commits::CommitNr;
use gitauthors::config::AnalysisConfig;
use gitauthors::history::{dedup_shared_tails, CommitGroup};
use gitauthors::persons::PersonRegistry;
use pretty_assertions::assert_eq;

fn group(registry: &PersonRegistry, name: &str, path: &str, commit: u32) -> CommitGroup {
    CommitGroup {
        author: registry.add_person(name, &format!("{}@example.com", name.to_lowercase())),
        path: path.to_string(),
        insertions: 3,
        deletions: 0,
        commits: BTreeSet::from([CommitNr(commit)]),
        date_sum: 0,
    }
}

#[test]
fn test_shared_tail_stays_with_the_longest_history() {
    let registry = PersonRegistry::new(true);
    let base = group(&registry, "Alice", "base.py", 1);
    let split = group(&registry, "Bob", "base.py", 2);

    let longest = vec![
        group(&registry, "Alice", "long.py", 4),
        group(&registry, "Bob", "long.py", 3),
        split.clone(),
        base.clone(),
    ];
    let shorter = vec![group(&registry, "Bob", "short.py", 5), split, base];
    let unrelated = vec![group(&registry, "Alice", "other.py", 6)];

    let mut groups = vec![shorter, longest.clone(), unrelated.clone()];
    dedup_shared_tails(&mut groups);

    assert_eq!(groups[1], longest);
    assert_eq!(groups[0].len(), 1);
    assert_eq!(groups[0][0].path, "short.py");
    assert_eq!(groups[2], unrelated);
}

#[test]
fn test_split_file_keeps_shared_history_under_one_root() {
    let repo = GitFixture::new();
    repo.write("a.py", &common::numbered_lines("core", 40));
    repo.commit(ALICE, 0, "Add a.py");

    std::fs::remove_file(repo.path().join("a.py")).unwrap();
    let mut first = common::numbered_lines("core", 40);
    first.push_str(&common::numbered_lines("first", 2));
    repo.write("b.py", &first);
    let mut second = common::numbered_lines("core", 40);
    second.push_str(&common::numbered_lines("second", 3));
    repo.write("c.py", &second);
    repo.commit(BOB, 1, "Split a.py");

    let config = AnalysisConfig {
        n_files: 0,
        ..sequential_config()
    };
    let analysis = analyse(&repo, config);

    let roots_with_a: Vec<&str> = analysis
        .histories
        .iter()
        .filter(|(_, history)| history.groups.iter().any(|g| g.path == "a.py"))
        .map(|(_, history)| history.root.as_str())
        .collect();
    assert_eq!(roots_with_a.len(), 1);

    let a_insertions: u64 = analysis
        .histories
        .iter()
        .flat_map(|(_, history)| history.groups.iter())
        .filter(|g| g.path == "a.py")
        .map(|g| g.insertions)
        .sum();
    assert_eq!(a_insertions, 40);

    let insertions: u64 = analysis
        .histories
        .iter()
        .flat_map(|(_, history)| history.groups.iter())
        .map(|g| g.insertions)
        .sum();
    assert_eq!(analysis.stats.totals.insertions, insertions);
}
