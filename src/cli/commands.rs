use clap::Subcommand;

use super::config::ConfigArgs;
use super::run::RunArgs;
use super::steps::StepsArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Drive the wizard for one user
    Run(RunArgs),

    /// Print the declared step plan
    Steps(StepsArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}
