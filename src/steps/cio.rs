use super::prompts::{
    cio_decision_prompt, cio_questions_prompt, question_prompt, Exchange, ANALYST_SYSTEM,
    CIO_SYSTEM, QUANT_SYSTEM,
};
use super::replies::{parse_allocation_reply, parse_questions_reply};
use crate::abstractions::{ReasoningEngine, ReasoningRequest, Role};
use crate::engine::Step;
use crate::error::{PipelineError, Result};
use crate::state::{SharedState, StateField, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Joins the analyst and quant reports into the proposal.
///
/// With questioning on, the CIO first asks each analyst one follow-up
/// question (both asked concurrently), then decides with the answers in
/// context. There is exactly one round.
pub struct CioStep {
    reasoning: Arc<dyn ReasoningEngine>,
    question_reports: bool,
}

impl CioStep {
    pub fn new(reasoning: Arc<dyn ReasoningEngine>, question_reports: bool) -> Self {
        Self {
            reasoning,
            question_reports,
        }
    }
}

#[async_trait]
impl Step for CioStep {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate> {
        let analyst = state
            .analyst_report()
            .ok_or_else(|| PipelineError::missing_field(StateField::AnalystReport.name()))?;
        let quant = state
            .quant_report()
            .ok_or_else(|| PipelineError::missing_field(StateField::QuantReport.name()))?;

        let mut questions = None;
        let mut answers = (String::new(), String::new());
        if self.question_reports {
            let request = ReasoningRequest::structured(
                Role::Cio,
                CIO_SYSTEM,
                cio_questions_prompt(quant, analyst),
            );
            let asked = parse_questions_reply(&self.reasoning.complete(&request).await?)?;
            info!(quant = %asked.quant, analyst = %asked.analyst, "CIO questioning analysts");

            let to_quant = ReasoningRequest::text(
                Role::Quant,
                QUANT_SYSTEM,
                question_prompt(&asked.quant, quant),
            );
            let to_analyst = ReasoningRequest::text(
                Role::Analyst,
                ANALYST_SYSTEM,
                question_prompt(&asked.analyst, analyst),
            );
            answers = tokio::try_join!(
                self.reasoning.complete(&to_quant),
                self.reasoning.complete(&to_analyst)
            )?;
            debug!(quant = %answers.0, analyst = %answers.1, "answers to CIO");
            questions = Some(asked);
        }

        let exchanges = match &questions {
            Some(asked) => vec![
                Exchange {
                    role: "Quant",
                    question: &asked.quant,
                    answer: &answers.0,
                },
                Exchange {
                    role: "Analyst",
                    question: &asked.analyst,
                    answer: &answers.1,
                },
            ],
            None => Vec::new(),
        };

        let request = ReasoningRequest::structured(
            Role::Cio,
            CIO_SYSTEM,
            cio_decision_prompt(state, quant, analyst, &exchanges),
        );
        let report = parse_allocation_reply(&self.reasoning.complete(&request).await?)?;

        info!(allocation = %report.allocation(), "CIO proposal ready");
        debug!(justification = report.justification(), "CIO justification");
        Ok(StateUpdate::cio_report(report))
    }
}
