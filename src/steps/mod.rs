//! Concrete pipeline steps
//!
//! Analyst and Quant run concurrently from START, the CIO joins them, and the
//! Risk step gates the proposal before Human and Execution. Each step reads
//! the shared state and returns only the fields it owns.

mod analyst;
mod cio;
mod execution;
mod human;
pub mod prompts;
mod quant;
pub mod rates;
pub mod replies;
mod risk;

pub use analyst::AnalystStep;
pub use cio::CioStep;
pub use execution::ExecutionStep;
pub use human::HumanStep;
pub use quant::QuantStep;
pub use rates::{extract_rate_decision, RateChange, RateDecision};
pub use replies::{parse_allocation_reply, parse_risk_reply};
pub use risk::RiskStep;
