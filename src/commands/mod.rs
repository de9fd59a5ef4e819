//! Command implementations behind the `gitauthors` subcommands.
//!
//! - **analyze**: analyse repositories and print or store their tables
//! - **init**: write a default `.gitauthors.toml`

pub mod analyze;
pub mod init;

pub use analyze::handle_analyze;
pub use init::init_config;
