//! Rendering of row tables for the terminal and JSON sinks.

pub mod json;
pub mod terminal;

pub use json::{output_json, render_json, RepoReport};
pub use terminal::{render_repository, render_table};
