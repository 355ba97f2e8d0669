//! CLI argument structures

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Monthly portfolio allocation with a risk gate and human sign-off
#[derive(Parser, Debug)]
#[command(name = "stratify")]
#[command(about = "stratify - Monthly equities/bonds allocation pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run consecutive periods from the start of the market data
    #[command(name = "run")]
    Run {
        /// Number of periods to run (defaults to all available)
        #[arg(short = 'n', long)]
        periods: Option<usize>,

        /// Market data file (overrides configuration)
        #[arg(short = 'd', long)]
        data: Option<PathBuf>,

        /// Where human approvals come from
        #[arg(long, value_enum, default_value_t = DecisionMode::Console)]
        decisions: DecisionMode,

        /// Write the run summary as JSON
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },

    /// Run a single period
    #[command(name = "period")]
    Period {
        /// Period label such as "March 2023" (defaults to the first period)
        month: Option<String>,

        /// Market data file (overrides configuration)
        #[arg(short = 'd', long)]
        data: Option<PathBuf>,

        /// Where human approvals come from
        #[arg(long, value_enum, default_value_t = DecisionMode::Console)]
        decisions: DecisionMode,
    },

    /// Print the validated pipeline topology
    #[command(name = "graph")]
    Graph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionMode {
    /// Prompt on the terminal
    Console,
    /// Approve every proposal that reaches the human step
    Approve,
    /// Reject every proposal that reaches the human step
    Reject,
}
