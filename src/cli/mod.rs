//! CLI command handlers
//!
//! - `run`: consecutive periods from the start of the market data
//! - `period`: one period
//! - `graph`: the validated topology

pub mod args;
pub mod router;

pub use args::{Cli, Commands, DecisionMode};
pub use router::execute_command;

/// Log filter for a verbosity count
pub fn get_log_level(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        2 => "trace".to_string(),
        _ => "trace,hyper=debug,reqwest=debug".to_string(),
    }
}
