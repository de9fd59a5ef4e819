//! Parallelism configuration for per-file history and blame queries.
//!
//! Blame and log queries each hold an open repository handle and a child
//! process, so the worker pool is bounded well below the core count and work
//! is submitted in chunks.

use serde::{Deserialize, Serialize};

/// Default value for parallel processing enabled
fn default_enabled() -> bool {
    true
}

/// Default worker count for history and blame queries
fn default_max_concurrency() -> usize {
    6
}

/// Default chunk size for history queries
fn default_history_batch_size() -> usize {
    100
}

/// Default chunk size for blame queries
fn default_blame_batch_size() -> usize {
    20
}

/// Configuration for parallel processing within one repository.
///
/// # Example
///
/// ```rust
/// use gitauthors::config::ParallelConfig;
///
/// let config = ParallelConfig {
///     enabled: true,
///     max_concurrency: Some(4),
///     history_batch_size: Some(50),
///     blame_batch_size: None,
/// };
/// assert_eq!(config.effective_concurrency(), 4);
/// assert_eq!(config.effective_blame_batch_size(), 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    /// Enable parallel processing (default: true)
    ///
    /// When disabled, files are processed sequentially on the calling thread.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum concurrent VCS queries (default: 6)
    #[serde(default = "default_max_concurrency_option")]
    pub max_concurrency: Option<usize>,

    /// Files per submitted history chunk (default: 100)
    #[serde(default)]
    pub history_batch_size: Option<usize>,

    /// Files per submitted blame chunk (default: 20)
    #[serde(default)]
    pub blame_batch_size: Option<usize>,
}

fn default_max_concurrency_option() -> Option<usize> {
    Some(default_max_concurrency())
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_concurrency: Some(default_max_concurrency()),
            history_batch_size: None,
            blame_batch_size: None,
        }
    }
}

impl ParallelConfig {
    /// Create a config with parallel processing disabled.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Get the effective concurrency level.
    ///
    /// Falls back to the available CPU cores, capped at the default bound.
    pub fn effective_concurrency(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        self.max_concurrency
            .unwrap_or_else(|| num_cpus().min(default_max_concurrency()))
            .max(1)
    }

    pub fn effective_history_batch_size(&self) -> usize {
        self.history_batch_size
            .unwrap_or_else(default_history_batch_size)
            .max(1)
    }

    pub fn effective_blame_batch_size(&self) -> usize {
        self.blame_batch_size
            .unwrap_or_else(default_blame_batch_size)
            .max(1)
    }
}

/// Returns the number of available CPU cores.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParallelConfig::default();
        assert!(config.enabled);
        assert_eq!(config.effective_concurrency(), 6);
        assert_eq!(config.effective_history_batch_size(), 100);
        assert_eq!(config.effective_blame_batch_size(), 20);
    }

    #[test]
    fn test_sequential_config() {
        let config = ParallelConfig::sequential();
        assert!(!config.enabled);
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = ParallelConfig {
            enabled: true,
            max_concurrency: Some(0),
            history_batch_size: Some(0),
            blame_batch_size: Some(0),
        };
        assert_eq!(config.effective_concurrency(), 1);
        assert_eq!(config.effective_history_batch_size(), 1);
        assert_eq!(config.effective_blame_batch_size(), 1);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: ParallelConfig = toml::from_str("max_concurrency = 3").unwrap();
        assert!(config.enabled);
        assert_eq!(config.effective_concurrency(), 3);
        assert_eq!(config.effective_history_batch_size(), 100);
    }
}
