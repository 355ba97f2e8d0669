//! Month-by-month runs over the bundled sample data

mod common;

use common::{config, sample_periods, Harness};
use std::sync::Arc;
use stratify::decision::QueueDecisions;
use stratify::driver::{MonthlyDriver, RolloverPolicy};
use stratify::error::ErrorCode;
use stratify::state::{Allocation, ExecutionOutcome, HumanApproval, RiskVerdict};

fn driver(harness: &Harness, policy: RolloverPolicy) -> MonthlyDriver {
    MonthlyDriver::new(
        harness.engine(&config()),
        sample_periods(),
        1000.0,
        Allocation::new(0.6, 0.4),
        policy,
    )
    .unwrap()
}

#[tokio::test]
async fn test_three_months_carry_each_proposal_forward() {
    let (harness, _) = Harness::with_tokens(&["0"]);
    harness.script_period(0.7, 0.6, 0.7, "Pass");
    harness.script_period(0.5, 0.5, 0.55, "Warn");
    harness.script_period(0.6, 0.7, 0.65, "Pass");
    let mut driver = driver(&harness, RolloverPolicy::Proposed);

    let summary = driver.run_periods(3).await.unwrap();

    let labels: Vec<&str> = summary.periods.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, ["January 2023", "February 2023", "March 2023"]);
    let previous: Vec<f64> = summary.periods.iter().map(|p| p.previous.equities).collect();
    assert_eq!(previous, [0.6, 0.7, 0.55]);
    assert_eq!(summary.periods[1].outcome, ExecutionOutcome::Rejected);
    assert_eq!(summary.rebalanced(), 2);
    assert_eq!(summary.final_allocation, Allocation::new(0.65, 0.35));
    assert_eq!(driver.remaining(), 0);
}

#[tokio::test]
async fn test_quant_sees_each_month_rate_decision() {
    let (harness, _) = Harness::with_tokens(&[]);
    harness.script_period(0.6, 0.6, 0.6, "Pass");
    harness.script_period(0.6, 0.6, 0.6, "Pass");
    let mut driver = driver(&harness, RolloverPolicy::Proposed);

    driver.run_periods(2).await.unwrap();

    let quant = harness.reasoning.requests_for(stratify::abstractions::Role::Quant);
    assert_eq!(quant.len(), 2);
    assert!(quant[0].prompt.contains("change: hold"));
    assert!(quant[1].prompt.contains("change: increase, 25 basis points"));
    assert!(quant[1].prompt.contains("4.5% to 4.75%"));
}

#[tokio::test]
async fn test_queue_front_end_answers_the_human_step() {
    let (decisions, mut inbox) = QueueDecisions::channel(1);
    let harness = Harness::new(Arc::new(decisions));
    harness.script_period(0.7, 0.6, 0.8, "Block");
    harness.script_period(0.6, 0.6, 0.7, "Pass");
    let mut driver = driver(&harness, RolloverPolicy::Realized);

    let run = tokio::spawn(async move { driver.run_periods(2).await });

    let pending = inbox.recv().await.unwrap();
    assert_eq!(pending.request.period_label, "January 2023");
    assert_eq!(pending.request.verdict, RiskVerdict::Block);
    assert_eq!(pending.request.proposed, Allocation::new(0.8, 0.2));
    assert!(pending.respond("sure"));

    let pending = inbox.recv().await.unwrap();
    assert_eq!(pending.request.period_label, "January 2023");
    assert!(pending.respond("0"));

    let summary = run.await.unwrap().unwrap();
    assert_eq!(summary.periods[0].approval, HumanApproval::Reject);
    assert_eq!(summary.periods[0].carried, Allocation::new(0.6, 0.4));
    assert_eq!(summary.periods[1].previous, Allocation::new(0.6, 0.4));
    assert_eq!(summary.periods[1].approval, HumanApproval::Approve);
    assert_eq!(summary.final_allocation, Allocation::new(0.7, 0.3));
}

#[tokio::test]
async fn test_dropped_front_end_fails_the_period() {
    let (decisions, inbox) = QueueDecisions::channel(1);
    drop(inbox);
    let harness = Harness::new(Arc::new(decisions));
    harness.script_period(0.6, 0.6, 0.9, "Warn");
    let mut driver = driver(&harness, RolloverPolicy::Proposed);

    let err = driver.run_period().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::EXTERNAL_CHANNEL_CLOSED);
    assert!(err.is_external());
    assert!(err.to_string().starts_with("period January 2023 failed"));
    assert!(driver.outcomes().is_empty());
}

#[tokio::test]
async fn test_summary_serializes_for_the_report_file() {
    let (harness, _) = Harness::with_tokens(&[]);
    harness.script_period(0.7, 0.6, 0.65, "Pass");
    let mut driver = driver(&harness, RolloverPolicy::Proposed);

    let summary = driver.run_periods(1).await.unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["policy"], "proposed");
    assert_eq!(json["periods"][0]["label"], "January 2023");
    assert_eq!(json["periods"][0]["verdict"], "Pass");
    assert_eq!(json["periods"][0]["approval"], "approve");
    assert_eq!(json["periods"][0]["outcome"], "rebalanced");
    assert_eq!(json["final_allocation"]["equities"], 0.65);
}
