//! formpilot library
//!
//! Configuration, logging and run wiring behind the `formpilot` binary,
//! exposed for integration testing.

pub mod cli;
pub mod config;
pub mod logging;
pub mod runner;

pub use config::AppConfig;
pub use runner::{browser_config, build_sequencer, load_catalog, otp_chain, run_user};
