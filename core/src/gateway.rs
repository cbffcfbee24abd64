//! The boundary between the pipeline and the hosted model.
//!
//! The core only ever talks to a `dyn ModelGateway`; the vendor client in
//! [`crate::llm`] is one implementation, the `testing` feature's
//! `ScriptedGateway` is another.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GatewayError};
use crate::registry::ToolSchema;

/// How strongly the model is pushed towards the offered tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide; the extractor handles a declined call.
    /// Default on purpose: GLM's OpenAI-compatible endpoint only accepts `auto`.
    #[default]
    Auto,
    /// Name the tool explicitly in the request.
    Forced,
}

impl std::str::FromStr for ToolChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(ToolChoice::Auto),
            "forced" => Ok(ToolChoice::Forced),
            other => Err(ConfigError::Invalid {
                var: "RELAY_TOOL_CHOICE",
                reason: format!("unknown tool choice '{other}' (expected auto or forced)"),
            }),
        }
    }
}

/// One single-shot completion call.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_message: Option<String>,
    pub user_message: String,
    /// Offered tools; empty for free-text completions.
    pub tools: Vec<ToolSchema>,
    pub tool_choice: ToolChoice,
}

/// A function call the model made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

/// What came back from the model, independent of vendor reply fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    pub tool_calls: Vec<ToolInvocation>,
    pub content: Option<String>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tool_calls: Vec::new(),
            content: Some(content.into()),
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            tool_calls: vec![ToolInvocation {
                name: name.into(),
                arguments: arguments.into(),
            }],
            content: None,
        }
    }
}

/// A chat-completion backend.
///
/// Implementations make exactly one upstream attempt per call and surface
/// transport/auth/rate-limit failures as [`GatewayError`] instead of
/// swallowing them.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_choice_parses_config_values() {
        assert_eq!("auto".parse::<ToolChoice>().unwrap(), ToolChoice::Auto);
        assert_eq!(" forced ".parse::<ToolChoice>().unwrap(), ToolChoice::Forced);
        assert!("required".parse::<ToolChoice>().is_err());
    }
}
