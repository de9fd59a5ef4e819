//! Parser for `git blame --porcelain` output.
//!
//! Porcelain output is organised in groups: the first header of a group
//! carries the number of lines it covers, and the commit metadata block is
//! emitted only the first time a commit appears anywhere in the output.
//!
//! ```text
//! <40-char-hash> <orig-line> <final-line> <num-lines>
//! author <author-name>
//! author-mail <<author-email>>
//! author-time <unix-timestamp>
//! committer-time <unix-timestamp>
//! summary <first-line-of-commit-message>
//! filename <filename>
//! \t<actual-line-content>
//! <40-char-hash> <orig-line> <final-line>
//! \t<actual-line-content>
//! ```

use std::collections::HashMap;

use super::BlameEntry;
use crate::errors::{Error, Result};

#[derive(Debug, Default, Clone)]
struct CommitMetadata {
    author: String,
    email: String,
    author_time: Option<i64>,
    committer_time: Option<i64>,
    summary: String,
}

impl CommitMetadata {
    fn timestamp(&self) -> i64 {
        self.committer_time.or(self.author_time).unwrap_or_default()
    }
}

/// Parsed commit header line
struct GroupHeader<'a> {
    commit: &'a str,
    num_lines: Option<usize>,
}

/// Check if a line is a commit header (starts with 40 hex characters)
fn is_commit_header(line: &str) -> bool {
    line.len() >= 40 && line.chars().take(40).all(|c| c.is_ascii_hexdigit())
}

/// Format: `<hash> <orig_line> <final_line> [<num_lines>]`
fn parse_group_header(line: &str) -> Option<GroupHeader<'_>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }
    parts[1].parse::<usize>().ok()?;
    parts[2].parse::<usize>().ok()?;
    let num_lines = match parts.get(3) {
        Some(n) => Some(n.parse::<usize>().ok()?),
        None => None,
    };
    Some(GroupHeader {
        commit: parts[0],
        num_lines,
    })
}

fn strip_mail(raw: &str) -> &str {
    raw.trim()
        .strip_prefix('<')
        .and_then(|m| m.strip_suffix('>'))
        .unwrap_or(raw.trim())
}

/// Parse porcelain output for `path` into one entry per line of the file.
///
/// Malformed lines are logged and skipped. A header that contradicts the
/// group it falls into is a merge invariant violation and fails the whole
/// file.
pub fn parse_porcelain(path: &str, output: &str) -> Result<Vec<BlameEntry>> {
    let mut metadata: HashMap<String, CommitMetadata> = HashMap::new();
    let mut entries = Vec::new();
    let mut current: Option<String> = None;
    let mut remaining = 0usize;
    let mut pending_line = false;

    for line in output.lines() {
        if let Some(text) = line.strip_prefix('\t') {
            let Some(commit) = current.as_ref().filter(|_| pending_line) else {
                log::warn!(
                    "{}; record skipped",
                    Error::parse(format!("blame of {}", path), line)
                );
                continue;
            };
            let meta = metadata.get(commit).cloned().unwrap_or_default();
            entries.push(BlameEntry {
                line_text: text.to_string(),
                commit_id: commit.clone(),
                author_name: meta.author.clone(),
                author_email: meta.email.clone(),
                timestamp: meta.timestamp(),
                message: meta.summary.clone(),
            });
            pending_line = false;
            remaining = remaining.saturating_sub(1);
            continue;
        }

        if is_commit_header(line) {
            let Some(header) = parse_group_header(line) else {
                log::warn!(
                    "{}; record skipped",
                    Error::parse(format!("blame of {}", path), line)
                );
                continue;
            };
            match header.num_lines {
                Some(n) => {
                    if remaining > 0 {
                        return Err(Error::ConcurrencyAssertion(format!(
                            "blame of {}: group for {} opened with {} line(s) of {} outstanding",
                            path,
                            header.commit,
                            remaining,
                            current.as_deref().unwrap_or_default()
                        )));
                    }
                    remaining = n;
                }
                None => {
                    if remaining == 0 || current.as_deref() != Some(header.commit) {
                        return Err(Error::ConcurrencyAssertion(format!(
                            "blame of {}: line of {} continues a group of {}",
                            path,
                            header.commit,
                            current.as_deref().unwrap_or("nothing")
                        )));
                    }
                }
            }
            metadata.entry(header.commit.to_string()).or_default();
            current = Some(header.commit.to_string());
            pending_line = true;
            continue;
        }

        let Some(commit) = current.as_ref() else {
            continue;
        };
        let Some(meta) = metadata.get_mut(commit) else {
            continue;
        };
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        match key {
            "author" => meta.author = value.to_string(),
            "author-mail" => meta.email = strip_mail(value).to_string(),
            "author-time" => meta.author_time = value.trim().parse().ok(),
            "committer-time" => meta.committer_time = value.trim().parse().ok(),
            "summary" => meta.summary = value.to_string(),
            _ => {}
        }
    }

    Ok(entries)
}
