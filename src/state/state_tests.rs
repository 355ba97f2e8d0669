use super::*;
use crate::error::ErrorCode;

fn period(label: &str) -> MarketData {
    MarketData {
        month: label.to_string(),
        ..MarketData::default()
    }
}

fn report(equities: f64, bonds: f64) -> AllocationReport {
    AllocationReport::new(equities, bonds, "test").unwrap()
}

fn initial() -> SharedState {
    SharedState::new(1000.0, period("January 2023"), Allocation::new(0.6, 0.4)).unwrap()
}

#[test]
fn test_new_state_derives_period_fields() {
    let state = initial();
    assert_eq!(state.current_period_label, "January 2023");
    assert_eq!(state.year, 2023);
    assert_eq!(state.month, 1);
    assert_eq!(state.previous_allocation(), Allocation::new(0.6, 0.4));
    assert!(state.outputs.is_empty());
}

#[test]
fn test_new_state_rejects_bad_previous_allocation() {
    let err = SharedState::new(1000.0, period("January 2023"), Allocation::new(0.9, 0.4))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VALIDATION_SUM);

    let err = SharedState::new(1000.0, period("January 2023"), Allocation::new(1.4, -0.4))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VALIDATION_OUT_OF_RANGE);
}

#[test]
fn test_new_state_rejects_negative_capital() {
    assert!(SharedState::new(-1.0, period("January 2023"), Allocation::new(0.6, 0.4)).is_err());
}

#[test]
fn test_apply_replaces_only_named_fields() {
    let mut state = initial();
    state
        .apply(StateUpdate::analyst_report(report(0.7, 0.3)))
        .unwrap();

    assert_eq!(state.analyst_report(), Some(&report(0.7, 0.3)));
    assert!(state.quant_report().is_none());
    assert_eq!(state.prev_equity_allocation, 0.6);
}

#[test]
fn test_apply_rejects_second_write_in_same_pass() {
    let mut state = initial();
    state.apply(StateUpdate::cio_report(report(0.7, 0.3))).unwrap();

    let err = state
        .apply(StateUpdate::cio_report(report(0.5, 0.5)))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VALIDATION_ALREADY_SET);
    assert_eq!(state.cio_report(), Some(&report(0.7, 0.3)));
}

#[test]
fn test_rejected_apply_writes_nothing() {
    let mut state = initial();
    state
        .apply(StateUpdate::human_approval(HumanApproval::Approve))
        .unwrap();

    let update = StateUpdate {
        risk_report: Some(RiskReport::new("Pass", "fine")),
        human_approval: Some(HumanApproval::Reject),
        ..StateUpdate::default()
    };
    assert!(state.apply(update).is_err());
    assert!(state.risk_report().is_none());
    assert_eq!(state.human_approval(), Some(HumanApproval::Approve));
}

#[test]
fn test_combine_detects_conflicting_writes() {
    let left = StateUpdate::analyst_report(report(0.6, 0.4));
    let right = StateUpdate::quant_report(report(0.5, 0.5));
    let merged = left.clone().combine(right).unwrap();
    assert_eq!(
        merged.fields(),
        vec![StateField::AnalystReport, StateField::QuantReport]
    );

    let err = left
        .combine(StateUpdate::analyst_report(report(0.1, 0.9)))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::GRAPH_CONFLICTING_WRITE);
}

#[test]
fn test_rollover_resets_every_pass_output() {
    let mut state = initial();
    state
        .apply(StateUpdate {
            analyst_report: Some(report(0.7, 0.3)),
            quant_report: Some(report(0.6, 0.4)),
            cio_report: Some(report(0.7, 0.3)),
            risk_report: Some(RiskReport::new("Pass", "ok")),
            human_approval: Some(HumanApproval::Approve),
            execution: Some(ExecutionRecord {
                outcome: ExecutionOutcome::Rebalanced,
                realized: Allocation::new(0.7, 0.3),
            }),
        })
        .unwrap();

    state
        .rollover(period("February 2023"), Allocation::new(0.7, 0.3), Some(0.01))
        .unwrap();

    assert!(state.analyst_report().is_none());
    assert!(state.quant_report().is_none());
    assert!(state.risk_report().is_none());
    assert!(state.cio_report().is_none());
    assert!(state.human_approval().is_none());
    assert!(state.execution().is_none());
    assert_eq!(state.current_period_label, "February 2023");
    assert_eq!(state.month, 2);
    assert_eq!(state.prev_equity_allocation, 0.7);
    assert_eq!(state.prev_bond_allocation, 0.3);
    assert_eq!(state.capital, 1000.0);
}

#[test]
fn test_rollover_rejects_unparseable_label() {
    let mut state = initial();
    assert!(state
        .rollover(period("not a month"), Allocation::new(0.6, 0.4), Some(0.01))
        .is_err());
    assert_eq!(state.current_period_label, "January 2023");
}

#[test]
fn test_rollover_sum_check_follows_tolerance() {
    let mut state = initial();
    let err = state
        .rollover(period("February 2023"), Allocation::new(0.7, 0.7), Some(0.01))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VALIDATION_SUM);
    assert_eq!(state.current_period_label, "January 2023");

    state
        .rollover(period("February 2023"), Allocation::new(0.7, 0.7), None)
        .unwrap();
    assert_eq!(state.previous_allocation(), Allocation::new(0.7, 0.7));

    let err = state
        .rollover(period("March 2023"), Allocation::new(1.2, 0.0), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VALIDATION_OUT_OF_RANGE);
}

#[test]
fn test_require_accessors_report_missing_field() {
    let state = initial();
    let err = state.require_cio_report().unwrap_err();
    assert_eq!(err.code(), ErrorCode::VALIDATION_MISSING_FIELD);
    assert!(err.to_string().contains("cio_report"));
}

#[test]
fn test_state_serializes_flat() {
    let mut state = initial();
    state
        .apply(StateUpdate::human_approval(HumanApproval::Reject))
        .unwrap();
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["human_approval"], "reject");
    assert_eq!(json["current_period_label"], "January 2023");
    assert!(json["cio_report"].is_null());
}
