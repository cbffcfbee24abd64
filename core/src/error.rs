//! Error types for the relay pipeline.
//!
//! Each stage owns its error enum; the orchestrator folds them into
//! [`OrchestratorError`], which is all the HTTP layer ever sees.

use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Failures raised by a [`crate::gateway::ModelGateway`] implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build upstream request: {0}")]
    Request(String),

    #[error("upstream API error: {0}")]
    Api(String),

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream reply contained no choices")]
    EmptyReply,

    #[error("upstream call timed out after {0}s")]
    Timeout(u64),
}

/// Failures while turning a model reply into a result.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("tool '{tool}' returned arguments that are not valid JSON: {source}")]
    MalformedToolArguments {
        tool: String,
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The classified failure of a single request.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("input could not be canonicalized: {0}")]
    InvalidInputShape(String),

    #[error(transparent)]
    MalformedToolArguments(#[from] ExtractError),

    #[error("upstream failure: {0}")]
    UpstreamFailure(#[from] GatewayError),
}
