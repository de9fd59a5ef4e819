mod core;
mod loader;
mod parallel;
pub mod validation;

pub use core::{
    parse_date, AnalysisConfig, BlameHistoryMode, OutputFormat, DEFAULT_COPY_MOVE,
    DEFAULT_EXTENSIONS, DEFAULT_N_FILES, MAX_COPY_MOVE,
};
pub use loader::{load_config, parse_config, CONFIG_FILE_NAME};
pub use parallel::ParallelConfig;
pub use validation::validate_config;
