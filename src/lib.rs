//! # Stratify
//!
//! Monthly equities/bonds allocation through a small graph of analyst steps,
//! a risk gate and human sign-off.
//!
//! ## Usage
//!
//! ```bash
//! stratify run [-n periods] [--decisions console|approve|reject] [--out summary.json]
//! stratify period ["March 2023"]
//! stratify graph
//! ```
//!
//! ## Modules
//!
//! - `abstractions` - Reasoning engine, web search and price data boundaries
//! - `cli` - Command-line surface
//! - `config` - Layered configuration: defaults, TOML file, environment
//! - `decision` - Human-decision channels (console, automatic, queue)
//! - `driver` - Month-by-month driver and rollover policy
//! - `engine` - Step contract and the superstep execution engine
//! - `error` - Error taxonomy with stable codes
//! - `graph` - Orchestration graph, validation and verdict routing
//! - `pipeline` - Wiring of the allocation graph from concrete steps
//! - `state` - Shared state, reports and market data
//! - `steps` - Analyst, Quant, CIO, Risk, Human and Execution steps
//! - `testing` - Scripted collaborators and fixtures
pub mod abstractions;
pub mod cli;
pub mod config;
pub mod decision;
pub mod driver;
pub mod engine;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod state;
pub mod steps;

pub mod testing;

pub use error::{PipelineError, Result};
