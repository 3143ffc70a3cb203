//! Command-line surface: `run`, `steps`, `config`.

pub mod app;
pub mod commands;
pub mod config;
pub mod env;
pub mod run;
pub mod steps;

pub use app::run;
pub use env::CliArgs;
