use super::*;
use std::time::Duration;

#[test]
fn test_error_construction_codes() {
    let err = PipelineError::out_of_range("cio_report.equities", 1.2);
    assert!(err.is_validation());
    assert_eq!(err.code(), ErrorCode::VALIDATION_OUT_OF_RANGE);

    let err = PipelineError::routing(NodeId::Risk, "Escalate");
    assert!(err.is_routing());
    assert_eq!(err.code(), ErrorCode::ROUTING_UNKNOWN_VERDICT);

    let err = PipelineError::timeout(NodeId::Quant, Duration::from_secs(5));
    assert!(err.is_external());
    assert_eq!(err.code(), ErrorCode::EXTERNAL_TIMEOUT);
    assert!(err.to_string().contains("timed out"));
}

#[test]
fn test_error_display_includes_code() {
    let err = PipelineError::routing(NodeId::Risk, "Escalate");
    let msg = err.to_string();
    assert!(msg.starts_with("[E5001]"));
    assert!(msg.contains("Escalate"));
}

#[test]
fn test_step_attribution_is_not_nested_twice() {
    let err = PipelineError::missing_field("human_approval")
        .in_step(NodeId::Execution)
        .in_step(NodeId::Risk);

    assert_eq!(err.failed_step(), Some(NodeId::Execution));
    assert_eq!(err.code(), ErrorCode::VALIDATION_MISSING_FIELD);
}

#[test]
fn test_period_attribution_keeps_step() {
    let err = PipelineError::external("reasoning", "503")
        .in_step(NodeId::Analyst)
        .in_period("March 2023");

    assert_eq!(err.failed_step(), Some(NodeId::Analyst));
    assert!(err.is_external());
    let msg = err.to_string();
    assert!(msg.contains("March 2023"));
    assert!(msg.contains("AnalystStep"));
}

#[test]
fn test_only_input_errors_are_recoverable() {
    assert!(PipelineError::input("bad token").is_recoverable());
    assert!(!PipelineError::routing(NodeId::Risk, "?").is_recoverable());
    assert!(!PipelineError::external("search", "down").is_recoverable());
}

#[test]
fn test_with_source_sets_external_source() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
    let err = PipelineError::external("prices", "request failed").with_source(io);
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_describe_error_code() {
    assert_eq!(
        describe_error_code(ErrorCode::ROUTING_UNKNOWN_VERDICT),
        "Risk verdict does not match any branch"
    );
    assert_eq!(describe_error_code(1), "Unknown error code");
}
