//! Parsing of `git log --follow --numstat` output.
//!
//! All functions here are pure: they take raw text and return records, so the
//! rename notation handling is testable without a repository.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use super::HistoryEntry;
use crate::errors::{Error, Result};

/// Pretty format used for history queries; each commit header line starts
/// with the `:::` marker.
pub const HISTORY_FORMAT: &str = "--format=:::%H:::%ct:::%aN:::%aE";

static BRACE_RENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>.*)\{(?P<old>[^{}]*) => (?P<new>[^{}]*)\}(?P<suffix>.*)$")
        .unwrap_or_else(|e| unreachable!("static rename pattern: {}", e))
});

/// True when the path field carries rename or copy notation
pub fn is_rename(path_field: &str) -> bool {
    path_field.contains(" => ")
}

/// Resolve a numstat path field to the path the file has after the commit.
///
/// * `prefix{old => new}suffix` becomes `prefix` + `new` + `suffix`, with
///   doubled separators collapsed
/// * `old => new` becomes `new`
/// * C-quoted paths are unquoted
pub fn parse_path_field(path_field: &str) -> String {
    let field = path_field.trim();

    if let Some(caps) = BRACE_RENAME.captures(field) {
        let joined = format!("{}{}{}", &caps["prefix"], &caps["new"], &caps["suffix"]);
        return collapse_separators(&joined);
    }

    // renames with quoted paths are printed as `"old" => "new"`, no braces
    let new = field.split_once(" => ").map_or(field, |(_, new)| new);
    unquote(new).into_owned()
}

/// Undo git's C-style path quoting; `\NNN` octal escapes are raw bytes.
fn unquote(field: &str) -> Cow<'_, str> {
    let Some(inner) = field.strip_prefix('"').and_then(|f| f.strip_suffix('"')) else {
        return Cow::Borrowed(field);
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut rest = inner.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        rest = tail;
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match rest {
            [d0 @ b'0'..=b'3', d1 @ b'0'..=b'7', d2 @ b'0'..=b'7', tail @ ..] => {
                bytes.push((d0 - b'0') * 64 + (d1 - b'0') * 8 + (d2 - b'0'));
                rest = tail;
            }
            [c, tail @ ..] => {
                bytes.push(match c {
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'v' => 0x0b,
                    other => *other,
                });
                rest = tail;
            }
            [] => bytes.push(b'\\'),
        }
    }
    Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
}

fn collapse_separators(path: &str) -> String {
    let mut collapsed = path.to_string();
    while collapsed.contains("//") {
        collapsed = collapsed.replace("//", "/");
    }
    collapsed.trim_start_matches('/').to_string()
}

struct CommitHeader {
    commit_id: String,
    timestamp: i64,
    author_name: String,
    author_email: String,
}

fn parse_header(line: &str) -> Option<CommitHeader> {
    let parts: Vec<&str> = line.splitn(5, ":::").collect();
    if parts.len() < 5 {
        return None;
    }
    Some(CommitHeader {
        commit_id: parts[1].to_string(),
        timestamp: parts[2].trim().parse().ok()?,
        author_name: parts[3].to_string(),
        author_email: parts[4].to_string(),
    })
}

/// Parse one numstat line: `insertions<TAB>deletions<TAB>path`.
///
/// Binary files report `-` for both counts and are counted as zero.
pub fn parse_numstat_line(line: &str) -> Option<(u64, u64, String)> {
    let mut parts = line.splitn(3, '\t');
    let insertions = parts.next()?;
    let deletions = parts.next()?;
    let path = parts.next()?;
    let count = |field: &str| -> Option<u64> {
        if field == "-" {
            Some(0)
        } else {
            field.parse().ok()
        }
    };
    Some((count(insertions)?, count(deletions)?, path.to_string()))
}

/// Parse the history of `path` into numstat records, newest first.
///
/// Commits without a numstat line (merges, empty commits) produce no record.
/// Malformed lines are logged and skipped.
pub fn parse_history_output(path: &str, raw: &str) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    let mut current: Option<CommitHeader> = None;

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(":::") {
            current = parse_header(line);
            if current.is_none() {
                log_skipped(path, line);
            }
            continue;
        }

        let record = match (&current, parse_numstat_line(line)) {
            (Some(header), Some((insertions, deletions, path_field))) => HistoryEntry {
                commit_id: header.commit_id.clone(),
                timestamp: header.timestamp,
                author_name: header.author_name.clone(),
                author_email: header.author_email.clone(),
                insertions,
                deletions,
                path_field,
            },
            _ => {
                log_skipped(path, line);
                continue;
            }
        };
        entries.push(record);
    }

    entries
}

fn log_skipped(path: &str, line: &str) {
    let err: Error = Error::parse(format!("history of {}", path), line);
    log::warn!("{}; record skipped", err);
}

/// Ensure the raw output carries at least one commit header
pub fn check_history_output(path: &str, raw: &str) -> Result<()> {
    if raw.trim().is_empty() || raw.lines().any(|l| l.starts_with(":::")) {
        Ok(())
    } else {
        Err(Error::parse(
            format!("history of {}", path),
            raw.lines().next().unwrap_or_default(),
        ))
    }
}
