//! Wiring of the allocation graph
//!
//! ```text
//! START -> AnalystStep ---\
//!                          CIOStep -> RiskStep -?-> ExecutionStep -> END
//! START -> QuantStep -----/                  \-?-> HumanStep -> ExecutionStep
//! ```

use crate::abstractions::{
    OpenAiEngine, PriceSource, ReasoningEngine, SerperSearch, WebSearch, YahooPrices,
};
use crate::config::StratifyConfig;
use crate::decision::DecisionChannel;
use crate::engine::{ExecutionEngine, Step};
use crate::error::{PipelineError, Result};
use crate::graph::{route_risk_verdict, GraphBuilder, NodeId, PipelineGraph};
use crate::state::{SharedState, StateUpdate};
use crate::steps::{AnalystStep, CioStep, ExecutionStep, HumanStep, QuantStep, RiskStep};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// External collaborators the steps call into
#[derive(Clone)]
pub struct Collaborators {
    pub reasoning: Arc<dyn ReasoningEngine>,
    pub search: Option<Arc<dyn WebSearch>>,
    pub prices: Arc<dyn PriceSource>,
    pub decisions: Arc<dyn DecisionChannel>,
}

impl Collaborators {
    /// HTTP-backed collaborators. Search is optional and skipped without a key.
    pub fn from_config(
        config: &StratifyConfig,
        decisions: Arc<dyn DecisionChannel>,
    ) -> Result<Self> {
        let reasoning: Arc<dyn ReasoningEngine> =
            Arc::new(OpenAiEngine::new(config.reasoning.clone())?);
        let search: Option<Arc<dyn WebSearch>> = match config.search.api_key {
            Some(_) => Some(Arc::new(SerperSearch::new(&config.search)?)),
            None => {
                warn!("No search API key configured, web search disabled");
                None
            }
        };
        let prices: Arc<dyn PriceSource> = Arc::new(YahooPrices::new(&config.prices)?);

        Ok(Self {
            reasoning,
            search,
            prices,
            decisions,
        })
    }
}

/// One step per node of the allocation graph
pub struct AllocationSteps {
    pub analyst: Arc<dyn Step>,
    pub quant: Arc<dyn Step>,
    pub cio: Arc<dyn Step>,
    pub risk: Arc<dyn Step>,
    pub human: Arc<dyn Step>,
    pub execution: Arc<dyn Step>,
}

impl AllocationSteps {
    pub fn from_collaborators(collaborators: &Collaborators, config: &StratifyConfig) -> Self {
        let mut analyst = AnalystStep::new(collaborators.reasoning.clone());
        let mut risk = RiskStep::new(collaborators.reasoning.clone());
        if let Some(search) = &collaborators.search {
            analyst = analyst.with_search(search.clone());
            risk = risk.with_search(search.clone());
        }

        Self {
            analyst: Arc::new(analyst),
            quant: Arc::new(QuantStep::new(
                collaborators.reasoning.clone(),
                collaborators.prices.clone(),
                config.quant.symbols.clone(),
            )),
            cio: Arc::new(CioStep::new(
                collaborators.reasoning.clone(),
                config.cio.question_reports,
            )),
            risk: Arc::new(risk),
            human: Arc::new(HumanStep::new(collaborators.decisions.clone())),
            execution: Arc::new(ExecutionStep::new()),
        }
    }

    fn unwired() -> Self {
        Self {
            analyst: Arc::new(Unwired(NodeId::Analyst)),
            quant: Arc::new(Unwired(NodeId::Quant)),
            cio: Arc::new(Unwired(NodeId::Cio)),
            risk: Arc::new(Unwired(NodeId::Risk)),
            human: Arc::new(Unwired(NodeId::Human)),
            execution: Arc::new(Unwired(NodeId::Execution)),
        }
    }
}

/// Build and validate the allocation topology over `steps`
pub fn allocation_graph(steps: AllocationSteps) -> Result<PipelineGraph> {
    GraphBuilder::new()
        .add_node(NodeId::Analyst, steps.analyst)
        .add_node(NodeId::Quant, steps.quant)
        .add_node(NodeId::Cio, steps.cio)
        .add_node(NodeId::Risk, steps.risk)
        .add_node(NodeId::Human, steps.human)
        .add_node(NodeId::Execution, steps.execution)
        .add_edge(NodeId::Start, NodeId::Analyst)
        .add_edge(NodeId::Start, NodeId::Quant)
        .add_edge(NodeId::Analyst, NodeId::Cio)
        .add_edge(NodeId::Quant, NodeId::Cio)
        .add_edge(NodeId::Cio, NodeId::Risk)
        .add_conditional_edges(
            NodeId::Risk,
            &[NodeId::Execution, NodeId::Human],
            route_risk_verdict,
        )
        .add_edge(NodeId::Human, NodeId::Execution)
        .add_edge(NodeId::Execution, NodeId::End)
        .build()
}

/// Engine over the allocation graph with the configured collaborators
pub fn allocation_engine(
    collaborators: &Collaborators,
    config: &StratifyConfig,
) -> Result<ExecutionEngine> {
    let steps = AllocationSteps::from_collaborators(collaborators, config);
    Ok(ExecutionEngine::new(
        allocation_graph(steps)?,
        config.engine.clone(),
    ))
}

/// Validated topology as text, without any collaborators
pub fn describe_topology() -> Result<String> {
    Ok(allocation_graph(AllocationSteps::unwired())?.describe())
}

/// Placeholder for inspecting topology; never meant to run
struct Unwired(NodeId);

#[async_trait]
impl Step for Unwired {
    async fn run(&self, _state: &SharedState) -> Result<StateUpdate> {
        Err(PipelineError::unsupported(format!(
            "{} is not wired to a collaborator",
            self.0
        )))
    }
}
