use thiserror::Error;

use crate::graph::NodeId;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// Convenience alias used across the pipeline
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for a pipeline run
///
/// Everything except [`PipelineError::Input`] is fatal to the pass that raised
/// it and bubbles up to the monthly driver, which stops the simulation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[E{code:04}] Validation error: {field}: {message}")]
    Validation {
        code: u16,
        field: String,
        message: String,
    },

    #[error("[E{code:04}] Routing error: unrecognized verdict '{verdict}' from {node}")]
    Routing {
        code: u16,
        node: NodeId,
        verdict: String,
    },

    #[error("[E{code:04}] External service error ({service}): {message}")]
    ExternalService {
        code: u16,
        service: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Invalid input: {message}")]
    Input { code: u16, message: String },

    #[error("[E{code:04}] Graph error: {message}")]
    Graph { code: u16, message: String },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Market data error: {message}")]
    Data {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Unsupported: {message}")]
    Unsupported { code: u16, message: String },

    #[error("{step} failed: {source}")]
    Step {
        step: NodeId,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("period {label} failed: {source}")]
    Period {
        label: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::VALIDATION_GENERIC,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Out-of-range allocation value
    pub fn out_of_range(field: impl Into<String>, value: f64) -> Self {
        Self::Validation {
            code: ErrorCode::VALIDATION_OUT_OF_RANGE,
            field: field.into(),
            message: format!("allocation must be between 0 and 1, got {value}"),
        }
    }

    /// A field the next step depends on was never written
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::VALIDATION_MISSING_FIELD,
            field: field.into(),
            message: "required field is absent".to_string(),
        }
    }

    pub fn routing(node: NodeId, verdict: impl Into<String>) -> Self {
        Self::Routing {
            code: ErrorCode::ROUTING_UNKNOWN_VERDICT,
            node,
            verdict: verdict.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            code: ErrorCode::EXTERNAL_GENERIC,
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Collaborator returned something that does not parse into the expected shape
    pub fn malformed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            code: ErrorCode::EXTERNAL_MALFORMED,
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn timeout(step: NodeId, after: std::time::Duration) -> Self {
        Self::ExternalService {
            code: ErrorCode::EXTERNAL_TIMEOUT,
            service: step.to_string(),
            message: format!("timed out after {after:?}"),
            source: None,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            code: ErrorCode::INPUT_INVALID_TOKEN,
            message: message.into(),
        }
    }

    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph {
            code: ErrorCode::GRAPH_GENERIC,
            message: message.into(),
        }
    }

    pub fn graph_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Graph {
            code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            code: ErrorCode::DATA_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            code: ErrorCode::UNSUPPORTED_RETRY,
            message: message.into(),
        }
    }

    /// Attribute an error to the node that raised it
    pub fn in_step(self, step: NodeId) -> Self {
        match self {
            already @ Self::Step { .. } => already,
            other => Self::Step {
                step,
                source: Box::new(other),
            },
        }
    }

    /// Attribute an error to the period whose pass raised it
    pub fn in_period(self, label: impl Into<String>) -> Self {
        Self::Period {
            label: label.into(),
            source: Box::new(self),
        }
    }

    /// Attach a source error
    pub fn with_source(mut self, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        match &mut self {
            Self::ExternalService { source, .. }
            | Self::Config { source, .. }
            | Self::Data { source, .. } => *source = Some(err.into()),
            _ => {}
        }
        self
    }

    /// Numeric code of the innermost error
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation { code, .. }
            | Self::Routing { code, .. }
            | Self::ExternalService { code, .. }
            | Self::Input { code, .. }
            | Self::Graph { code, .. }
            | Self::Config { code, .. }
            | Self::Data { code, .. }
            | Self::Unsupported { code, .. } => *code,
            Self::Step { source, .. } | Self::Period { source, .. } => source.code(),
        }
    }

    /// Strip step/period attribution
    pub fn root(&self) -> &PipelineError {
        match self {
            Self::Step { source, .. } | Self::Period { source, .. } => source.root(),
            other => other,
        }
    }

    /// Node that failed, if the error was raised inside a step
    pub fn failed_step(&self) -> Option<NodeId> {
        match self {
            Self::Step { step, .. } => Some(*step),
            Self::Period { source, .. } => source.failed_step(),
            _ => None,
        }
    }

    pub fn is_routing(&self) -> bool {
        matches!(self.root(), Self::Routing { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root(), Self::Validation { .. })
    }

    pub fn is_external(&self) -> bool {
        matches!(self.root(), Self::ExternalService { .. })
    }

    /// Only invalid human input is recoverable; it is re-prompted locally
    pub fn is_recoverable(&self) -> bool {
        matches!(self.root(), Self::Input { .. })
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Data {
            code: ErrorCode::DATA_PARSE,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Data {
            code: ErrorCode::DATA_IO,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests;
