//! Testing utilities and scripted collaborators
//!
//! Stand-ins for every external boundary so passes can run without the
//! network or a person at the keyboard. Each one records what it was asked.

use crate::abstractions::{PriceSource, ReasoningEngine, ReasoningRequest, Role, WebSearch};
use crate::decision::{channel_closed, parse_token, ApprovalRequest, DecisionChannel};
use crate::engine::Step;
use crate::error::{PipelineError, Result};
use crate::state::{HumanApproval, Period, SharedState, StateUpdate};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// JSON reply carrying an allocation report
pub fn allocation_reply(equities: f64, bonds: f64, justification: &str) -> String {
    json!({
        "equities": equities,
        "bonds": bonds,
        "justification": justification,
    })
    .to_string()
}

/// JSON reply carrying a risk verdict
pub fn risk_reply(verdict: &str, reason: &str) -> String {
    json!({ "verdict": verdict, "reason": reason }).to_string()
}

/// JSON reply carrying the CIO's follow-up questions
pub fn questions_reply(quant: &str, analyst: &str) -> String {
    json!({ "quant_question": quant, "analyst_question": analyst }).to_string()
}

/// Step that returns the same update every time
pub struct FixedStep {
    update: StateUpdate,
    delay: Option<Duration>,
    awaits_decision: bool,
    seen: Mutex<Vec<SharedState>>,
}

impl FixedStep {
    pub fn new(update: StateUpdate) -> Self {
        Self {
            update,
            delay: None,
            awaits_decision: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn awaiting_decision(mut self) -> Self {
        self.awaits_decision = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Snapshot of the state as each call received it
    pub fn seen(&self) -> Vec<SharedState> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Step for FixedStep {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate> {
        self.seen.lock().unwrap().push(state.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.update.clone())
    }

    fn awaits_decision(&self) -> bool {
        self.awaits_decision
    }
}

/// Step that always fails with an external-service error
pub struct FailingStep {
    service: String,
    message: String,
}

impl FailingStep {
    pub fn external(service: &str, message: &str) -> Self {
        Self {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Step for FailingStep {
    async fn run(&self, _state: &SharedState) -> Result<StateUpdate> {
        Err(PipelineError::external(&self.service, &self.message))
    }
}

/// Reasoning engine answering from per-role queues
#[derive(Default)]
pub struct ScriptedReasoning {
    replies: Mutex<HashMap<Role, VecDeque<String>>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, role: Role, reply: impl Into<String>) -> Self {
        self.push_reply(role, reply);
        self
    }

    pub fn push_reply(&self, role: Role, reply: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push_back(reply.into());
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, role: Role) -> Vec<ReasoningRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.role == role)
            .collect()
    }

    /// Replies still queued for `role`
    pub fn remaining(&self, role: Role) -> usize {
        self.replies
            .lock()
            .unwrap()
            .get(&role)
            .map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedReasoning {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .get_mut(&request.role)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                PipelineError::external("reasoning", format!("no scripted reply for {}", request.role))
            })
    }
}

/// Decision channel fed from a list of raw tokens.
///
/// Invalid tokens are consumed and re-prompted like a console would; running
/// out of tokens closes the channel.
#[derive(Default)]
pub struct ScriptedDecisions {
    tokens: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ApprovalRequest>>,
    prompts: Mutex<usize>,
}

impl ScriptedDecisions {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: Mutex::new(tokens.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ApprovalRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of tokens read, valid or not
    pub fn prompts(&self) -> usize {
        *self.prompts.lock().unwrap()
    }
}

#[async_trait]
impl DecisionChannel for ScriptedDecisions {
    async fn decide(&self, request: &ApprovalRequest) -> Result<HumanApproval> {
        self.requests.lock().unwrap().push(request.clone());
        loop {
            let token = self.tokens.lock().unwrap().pop_front();
            let Some(token) = token else {
                return Err(channel_closed("scripted decisions", "no decisions left"));
            };
            *self.prompts.lock().unwrap() += 1;
            if let Ok(approval) = parse_token(&token) {
                return Ok(approval);
            }
        }
    }
}

/// Search returning one fixed snippet
pub struct StaticSearch {
    snippet: String,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(snippet: &str) -> Self {
        Self {
            snippet: snippet.to_string(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for StaticSearch {
    async fn search(&self, query: &str) -> Result<String> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.snippet.clone())
    }
}

/// Price source with fixed closes per symbol; unknown symbols have no data
#[derive(Default)]
pub struct StaticPrices {
    closes: HashMap<String, Vec<f64>>,
    requested: Mutex<Vec<(String, String)>>,
}

impl StaticPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.closes.insert(symbol.to_string(), closes.to_vec());
        self
    }

    /// `(symbol, period label)` pairs in request order
    pub fn requested(&self) -> Vec<(String, String)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn monthly_closes(&self, symbol: &str, period: &Period) -> Result<Vec<f64>> {
        self.requested
            .lock()
            .unwrap()
            .push((symbol.to_string(), period.label.clone()));
        Ok(self.closes.get(symbol).cloned().unwrap_or_default())
    }
}
