//! Decisions delivered through a channel, for front ends that are not a terminal

use super::{channel_closed, parse_token, ApprovalRequest, DecisionChannel};
use crate::error::Result;
use crate::state::HumanApproval;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// A request waiting for an answer from the front end
#[derive(Debug)]
pub struct PendingDecision {
    pub request: ApprovalRequest,
    reply: oneshot::Sender<String>,
}

impl PendingDecision {
    /// Answer with a raw token; an invalid token causes the request to be
    /// re-sent
    pub fn respond(self, token: impl Into<String>) -> bool {
        self.reply.send(token.into()).is_ok()
    }
}

/// Receiving side handed to the front end
#[derive(Debug)]
pub struct DecisionInbox {
    rx: mpsc::Receiver<PendingDecision>,
}

impl DecisionInbox {
    /// Next request, or `None` once the pipeline side is gone
    pub async fn recv(&mut self) -> Option<PendingDecision> {
        self.rx.recv().await
    }
}

pub struct QueueDecisions {
    tx: mpsc::Sender<PendingDecision>,
}

impl QueueDecisions {
    pub fn channel(capacity: usize) -> (Self, DecisionInbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, DecisionInbox { rx })
    }

    async fn ask(&self, request: &ApprovalRequest) -> Result<String> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(PendingDecision {
                request: request.clone(),
                reply,
            })
            .await
            .map_err(|_| channel_closed("decision-queue", "no front end is listening"))?;
        answer
            .await
            .map_err(|_| channel_closed("decision-queue", "request dropped without an answer"))
    }
}

#[async_trait]
impl DecisionChannel for QueueDecisions {
    async fn decide(&self, request: &ApprovalRequest) -> Result<HumanApproval> {
        loop {
            let token = self.ask(request).await?;
            match parse_token(&token) {
                Ok(decision) => {
                    info!(decision = %decision, "decision received from queue");
                    return Ok(decision);
                }
                Err(err) => warn!(error = %err, "invalid decision token, asking again"),
            }
        }
    }
}
