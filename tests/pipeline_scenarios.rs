//! One pass over the full allocation graph with scripted collaborators

mod common;

use common::{config, first_state, Harness};
use stratify::abstractions::Role;
use stratify::engine::TryAgainPolicy;
use stratify::error::ErrorCode;
use stratify::graph::NodeId;
use stratify::state::{Allocation, ExecutionOutcome, HumanApproval, RiskVerdict};
use stratify::testing::{allocation_reply, questions_reply, risk_reply};

#[tokio::test]
async fn test_pass_verdict_executes_without_human() {
    let (harness, decisions) = Harness::with_tokens(&[]);
    harness.script_period(0.7, 0.5, 0.65, "Pass");
    let mut state = first_state();

    let trace = harness.engine(&config()).run_pass(&mut state).await.unwrap();

    assert_eq!(trace.routed_to, Some(NodeId::Execution));
    assert!(!trace.ran(NodeId::Human));
    assert!(decisions.requests().is_empty());
    assert_eq!(state.human_approval(), Some(HumanApproval::Approve));

    let record = state.execution().unwrap();
    assert_eq!(record.outcome, ExecutionOutcome::Rebalanced);
    assert_eq!(record.realized, Allocation::new(0.65, 0.35));
}

#[tokio::test]
async fn test_warn_then_reject_keeps_previous_split() {
    let (harness, decisions) = Harness::with_tokens(&["0"]);
    harness.script_period(0.7, 0.5, 0.8, "Warn");
    let mut state = first_state();

    let trace = harness.engine(&config()).run_pass(&mut state).await.unwrap();

    assert_eq!(trace.routed_to, Some(NodeId::Human));
    assert_eq!(
        &trace.order()[3..],
        &[NodeId::Risk, NodeId::Human, NodeId::Execution]
    );
    assert_eq!(decisions.requests()[0].verdict, RiskVerdict::Warn);
    assert_eq!(state.human_approval(), Some(HumanApproval::Reject));

    let record = state.execution().unwrap();
    assert_eq!(record.outcome, ExecutionOutcome::Rejected);
    assert!(!record.outcome.rebalanced());
    assert_eq!(record.realized, Allocation::new(0.6, 0.4));
}

#[tokio::test]
async fn test_block_then_try_again_ends_without_loop() {
    let (harness, _) = Harness::with_tokens(&["X"]);
    harness.script_period(0.2, 0.5, 0.1, "Block");
    let mut state = first_state();

    let trace = harness.engine(&config()).run_pass(&mut state).await.unwrap();

    assert_eq!(trace.order().last(), Some(&NodeId::Execution));
    assert_eq!(harness.reasoning.requests_for(Role::Analyst).len(), 1);
    assert_eq!(harness.reasoning.requests_for(Role::Cio).len(), 1);
    assert_eq!(
        state.execution().map(|r| r.outcome),
        Some(ExecutionOutcome::RetryUnsupported)
    );
}

#[tokio::test]
async fn test_try_again_can_be_made_fatal() {
    let (harness, _) = Harness::with_tokens(&["X"]);
    harness.script_period(0.2, 0.5, 0.1, "Block");
    let mut config = config();
    config.engine.on_try_again = TryAgainPolicy::Fail;
    let mut state = first_state();

    let err = harness.engine(&config).run_pass(&mut state).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::UNSUPPORTED_RETRY);
    assert_eq!(err.failed_step(), Some(NodeId::Human));
    assert!(state.execution().is_none());
}

#[tokio::test]
async fn test_unknown_verdict_is_a_routing_failure() {
    let (harness, decisions) = Harness::with_tokens(&["1"]);
    harness.script_period(0.6, 0.6, 0.6, "Escalate");
    let mut state = first_state();

    let err = harness.engine(&config()).run_pass(&mut state).await.unwrap_err();

    assert!(err.is_routing());
    assert_eq!(err.failed_step(), Some(NodeId::Risk));
    assert!(err.to_string().contains("Escalate"));
    assert!(decisions.requests().is_empty());
    assert_eq!(state.human_approval(), None);
    assert!(state.execution().is_none());
}

#[tokio::test]
async fn test_cio_sees_both_reports() {
    let (harness, _) = Harness::with_tokens(&[]);
    harness.script_period(0.7, 0.4, 0.55, "Pass");
    let mut state = first_state();

    let trace = harness.engine(&config()).run_pass(&mut state).await.unwrap();

    assert_eq!(trace.superstep_of(NodeId::Analyst), Some(0));
    assert_eq!(trace.superstep_of(NodeId::Quant), Some(0));
    assert_eq!(trace.superstep_of(NodeId::Cio), Some(1));

    let cio_prompt = &harness.reasoning.requests_for(Role::Cio)[0].prompt;
    assert!(cio_prompt.contains("equities=0.7 bonds=0.3 justification=news flow"));
    assert!(cio_prompt.contains("equities=0.4 bonds=0.6 justification=indicators"));
}

#[tokio::test]
async fn test_cio_questioning_round() {
    let (harness, _) = Harness::with_tokens(&[]);
    let reasoning = &harness.reasoning;
    reasoning.push_reply(Role::Analyst, allocation_reply(0.7, 0.3, "news flow"));
    reasoning.push_reply(Role::Quant, allocation_reply(0.5, 0.5, "indicators"));
    reasoning.push_reply(Role::Cio, questions_reply("How sticky is CPI?", "Which names?"));
    reasoning.push_reply(Role::Quant, "Core services remain elevated.");
    reasoning.push_reply(Role::Analyst, "Mega-cap tech.");
    reasoning.push_reply(Role::Cio, allocation_reply(0.6, 0.4, "balanced after review"));
    reasoning.push_reply(Role::Risk, risk_reply("Pass", "modest change"));

    let mut config = config();
    config.cio.question_reports = true;
    let mut state = first_state();

    harness.engine(&config).run_pass(&mut state).await.unwrap();

    assert_eq!(state.cio_report().unwrap().justification(), "balanced after review");
    assert_eq!(harness.reasoning.requests().len(), 7);
    let risk_prompt = &harness.reasoning.requests_for(Role::Risk)[0].prompt;
    assert!(risk_prompt.contains("The reason is balanced after review."));
}

#[tokio::test]
async fn test_reports_are_rounded_before_merge() {
    let (harness, _) = Harness::with_tokens(&[]);
    let reasoning = &harness.reasoning;
    reasoning.push_reply(Role::Analyst, allocation_reply(0.6666, 0.3334, "tilt"));
    reasoning.push_reply(Role::Quant, allocation_reply(0.5, 0.5, "neutral"));
    reasoning.push_reply(Role::Cio, allocation_reply(0.604, 0.396, "blend"));
    reasoning.push_reply(Role::Risk, risk_reply("Pass", "fine"));
    let mut state = first_state();

    harness.engine(&config()).run_pass(&mut state).await.unwrap();

    let analyst = state.analyst_report().unwrap();
    assert_eq!((analyst.equities(), analyst.bonds()), (0.67, 0.33));
    assert_eq!(state.cio_report().unwrap().allocation(), Allocation::new(0.6, 0.4));
}

#[tokio::test]
async fn test_split_not_summing_to_one_fails_the_step() {
    let (harness, _) = Harness::with_tokens(&[]);
    let reasoning = &harness.reasoning;
    reasoning.push_reply(Role::Analyst, allocation_reply(0.6, 0.4, "a"));
    reasoning.push_reply(Role::Quant, allocation_reply(0.5, 0.5, "b"));
    reasoning.push_reply(Role::Cio, allocation_reply(0.7, 0.4, "over-allocated"));
    let mut state = first_state();

    let err = harness.engine(&config()).run_pass(&mut state).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::VALIDATION_SUM);
    assert_eq!(err.failed_step(), Some(NodeId::Cio));
    assert!(state.cio_report().is_none());
    assert!(state.risk_report().is_none());
}

#[tokio::test]
async fn test_invalid_tokens_are_reprompted() {
    let (harness, decisions) = Harness::with_tokens(&["y", "", "approve", "1"]);
    harness.script_period(0.6, 0.6, 0.75, "Warn");
    let mut state = first_state();

    harness.engine(&config()).run_pass(&mut state).await.unwrap();

    assert_eq!(decisions.prompts(), 4);
    assert_eq!(decisions.requests().len(), 1);
    assert_eq!(state.human_approval(), Some(HumanApproval::Approve));
    assert_eq!(
        state.execution().map(|r| r.realized),
        Some(Allocation::new(0.75, 0.25))
    );
}

#[tokio::test]
async fn test_risk_report_carries_search_evidence() {
    let (harness, _) = Harness::with_tokens(&[]);
    harness.script_period(0.6, 0.6, 0.6, "Pass");
    let mut state = first_state();

    harness.engine(&config()).run_pass(&mut state).await.unwrap();

    let risk = state.risk_report().unwrap();
    assert_eq!(risk.external_evidence.as_deref(), Some("Markets steady on the month"));
    assert!(harness.search.queries().contains(&"weighted view".to_string()));
}

#[tokio::test]
async fn test_verdict_must_match_exactly() {
    let (harness, decisions) = Harness::with_tokens(&["1"]);
    harness.script_period(0.6, 0.6, 0.7, "pass");
    let mut state = first_state();

    let err = harness.engine(&config()).run_pass(&mut state).await.unwrap_err();

    assert!(err.is_routing());
    assert_eq!(err.failed_step(), Some(NodeId::Risk));
    assert!(decisions.requests().is_empty());
    assert!(state.execution().is_none());
}
