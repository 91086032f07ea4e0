use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "grainsim - granular contact force probe with EPSD2 rolling resistance and an SPH time-step monitor.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate contact forces and time-step stability for a frozen particle snapshot.
    Run(RunArgs),
    /// List the contact model styles known to this build.
    Styles,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Inputs ---
    /// Path to the simulation configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path to the particle table (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub particles: PathBuf,

    /// Path to the material property table (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub materials: PathBuf,

    /// Write per-particle forces and torques to this CSV file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    // --- Overrides ---
    /// Override the number of workers from the config file.
    #[arg(short, long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Override the number of steps from the config file.
    #[arg(short, long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Enable the stability monitor with raw command arguments,
    /// replacing `[check-timestep].args`. Example: --check-timestep 10 0.1 warn no
    #[arg(long, value_name = "ARG", num_args(2..=4), allow_hyphen_values = true)]
    pub check_timestep: Option<Vec<String>>,
}
