//! Repository discovery below the paths given on the command line.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::{Error, Result};

/// Whether `path` is the root of a git work tree
pub fn is_work_tree(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Repositories to analyse for `path`.
///
/// A work tree root is returned as is. Otherwise directories up to `depth`
/// levels below `path` are searched; the search does not descend into a
/// repository once found.
pub fn discover_repositories(path: &Path, depth: usize) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Err(Error::repository(path, "not a directory"));
    }
    if is_work_tree(path) {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut found = Vec::new();
    let mut walker = WalkDir::new(path)
        .min_depth(1)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry below {}: {}", path.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_dir() || entry.file_name() == ".git" {
            continue;
        }
        if is_work_tree(entry.path()) {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }
    log::debug!("found {} repositories below {}", found.len(), path.display());
    Ok(found)
}

/// Discover repositories for every input path, in input order, without
/// duplicates.
pub fn discover_all(paths: &[PathBuf], depth: usize) -> Result<Vec<PathBuf>> {
    let mut repositories: Vec<PathBuf> = Vec::new();
    for path in paths {
        for repo in discover_repositories(path, depth)? {
            if !repositories.contains(&repo) {
                repositories.push(repo);
            }
        }
    }
    Ok(repositories)
}

/// Display name of a repository: its directory name
pub fn repository_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
