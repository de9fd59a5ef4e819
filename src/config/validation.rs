//! Pre-flight checks run before any repository query is issued.

use super::core::{AnalysisConfig, BlameHistoryMode, OutputFormat, MAX_COPY_MOVE};
use crate::errors::{Error, Result};

impl AnalysisConfig {
    /// See [`validate_config`].
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }
}

/// Validate settings, rejecting mutually incompatible combinations.
pub fn validate_config(config: &AnalysisConfig) -> Result<()> {
    if config.copy_move > MAX_COPY_MOVE {
        return Err(Error::Configuration(format!(
            "copy-move level {} is out of range 0..={}",
            config.copy_move, MAX_COPY_MOVE
        )));
    }

    check_blame_history_formats(config.blame_history, &config.formats)?;

    if let (Some(since), Some(until)) = (config.since, config.until) {
        if since > until {
            return Err(Error::ConfigConflict(format!(
                "since ({}) is later than until ({})",
                since.format("%Y-%m-%d"),
                until.format("%Y-%m-%d")
            )));
        }
    }

    let pattern_lists = [
        ("ex-authors", &config.ex_authors),
        ("ex-emails", &config.ex_emails),
        ("ex-files", &config.ex_files),
        ("ex-messages", &config.ex_messages),
        ("include-files", &config.include_files),
    ];
    for (option, patterns) in pattern_lists {
        for pattern in patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::Configuration(format!("invalid {} pattern {:?}: {}", option, pattern, e))
            })?;
        }
    }

    if let Some(bad) = config
        .ex_revisions
        .iter()
        .find(|rev| rev.is_empty() || !rev.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(Error::Configuration(format!(
            "ex-revisions entry {:?} is not a hexadecimal commit prefix",
            bad
        )));
    }

    Ok(())
}

fn check_blame_history_formats(mode: BlameHistoryMode, formats: &[OutputFormat]) -> Result<()> {
    match mode {
        BlameHistoryMode::None => Ok(()),
        BlameHistoryMode::Static => match formats.iter().find(|f| **f != OutputFormat::Json) {
            Some(other) => Err(Error::ConfigConflict(format!(
                "static blame history can only be stored in json output, not {}",
                other
            ))),
            None => Ok(()),
        },
        BlameHistoryMode::Dynamic => {
            if formats.contains(&OutputFormat::Json) {
                Err(Error::ConfigConflict(
                    "dynamic blame history is computed on request and cannot be written to json output"
                        .to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_date;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AnalysisConfig::default()).is_ok());
    }

    #[test]
    fn test_static_blame_history_requires_json() {
        let mut config = AnalysisConfig {
            blame_history: BlameHistoryMode::Static,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigConflict(_))
        ));

        config.formats = vec![OutputFormat::Json];
        assert!(validate_config(&config).is_ok());

        config.formats.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_dynamic_blame_history_rejects_json() {
        let mut config = AnalysisConfig {
            blame_history: BlameHistoryMode::Dynamic,
            formats: vec![OutputFormat::Terminal, OutputFormat::Json],
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigConflict(_))
        ));

        config.formats = vec![OutputFormat::Terminal];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_since_after_until_conflicts() {
        let config = AnalysisConfig {
            since: Some(parse_date("2024-05-01").unwrap()),
            until: Some(parse_date("2024-01-01").unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigConflict(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        let config = AnalysisConfig {
            copy_move: 5,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(Error::Configuration(_))
        ));

        let config = AnalysisConfig {
            ex_authors: vec!["[unclosed".into()],
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(Error::Configuration(_))
        ));

        let config = AnalysisConfig {
            ex_revisions: vec!["not-hex".into()],
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(Error::Configuration(_))
        ));
    }
}
