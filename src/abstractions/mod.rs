//! Abstraction layers for external collaborators
//!
//! Reasoning engines, web search and price data sit behind traits so steps
//! can be exercised with scripted stand-ins from [`crate::testing`].

pub mod prices;
pub mod reasoning;
pub mod search;

pub use prices::{summarize, PriceSource, TickerSummary, YahooPrices};
pub use reasoning::{extract_json, OpenAiEngine, ReasoningEngine, ReasoningRequest, Role};
pub use search::{SerperSearch, WebSearch, NO_RESULTS};
