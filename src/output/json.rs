use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::rows::RepoTables;

/// JSON document entry for one analysed repository
#[derive(Debug, Serialize)]
pub struct RepoReport {
    pub name: String,
    pub path: String,
    pub commits: usize,
    pub tables: RepoTables,
}

pub fn render_json(reports: &[RepoReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

/// Write `reports` to `output_file`, or stdout when none is given.
pub fn output_json(reports: &[RepoReport], output_file: Option<&Path>) -> Result<()> {
    let json = render_json(reports)?;
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{Cell, RowTable};
    use tempfile::TempDir;

    fn report() -> RepoReport {
        let mut tables = RepoTables::default();
        tables.files = RowTable {
            header: vec!["ID".into(), "File".into()],
            rows: vec![vec![Cell::Integer(1), Cell::Text("a.py".into())]],
        };
        RepoReport {
            name: "demo".into(),
            path: "/tmp/demo".into(),
            commits: 2,
            tables,
        }
    }

    #[test]
    fn test_json_shape() {
        let json = render_json(&[report()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "demo");
        assert_eq!(value[0]["tables"]["files"]["rows"][0][1], "a.py");
        assert!(value[0]["tables"].get("blame_history").is_none());
    }

    #[test]
    fn test_output_json_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("out.json");
        output_json(&[report()], Some(&nested)).unwrap();
        let content = fs::read_to_string(&nested).unwrap();
        assert!(content.contains("\"demo\""));
    }
}
