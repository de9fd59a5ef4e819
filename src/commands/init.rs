use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{AnalysisConfig, CONFIG_FILE_NAME};

/// Write the default configuration to `dir`.
pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    let body = toml::to_string_pretty(&AnalysisConfig::default())
        .context("serialising default configuration")?;
    let contents = format!("# gitauthors configuration\n\n{}", body);
    fs::write(&config_path, contents)
        .with_context(|| format!("writing {}", config_path.display()))?;
    println!("Created {} configuration file", CONFIG_FILE_NAME);
    Ok(())
}
