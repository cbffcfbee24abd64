//! Turning a [`ModelReply`] into what the caller gets back.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ExtractError;
use crate::gateway::ModelReply;
use crate::registry::ToolSchema;

pub const UNEXPECTED_OUTPUT_PREFIX: &str = "unexpected output: ";

/// The reply reduced to the three things extraction cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallResult {
    pub tool_invoked: bool,
    pub tool_name: Option<String>,
    pub raw_arguments: Option<String>,
    pub free_text: Option<String>,
}

impl From<ModelReply> for ToolCallResult {
    fn from(reply: ModelReply) -> Self {
        // Only the first invocation counts.
        let first = reply.tool_calls.into_iter().next();
        Self {
            tool_invoked: first.is_some(),
            tool_name: first.as_ref().map(|c| c.name.clone()),
            raw_arguments: first.map(|c| c.arguments),
            free_text: reply.content,
        }
    }
}

/// The final value of a successful request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredResult {
    /// Tool arguments, parsed.
    Parsed(Value),
    /// A `{"message": ...}` object explaining why there is no structured data.
    Diagnostic { message: String },
    /// Trimmed completion text of a free-text relay.
    PlainText(String),
}

impl StructuredResult {
    pub fn diagnostic(message: impl Into<String>) -> Self {
        StructuredResult::Diagnostic {
            message: message.into(),
        }
    }
}

pub struct ResponseExtractor;

impl ResponseExtractor {
    /// Extracts the result for a variant. `expected` is the tool that was
    /// offered; `None` means a free-text completion.
    pub fn extract(
        reply: ModelReply,
        expected: Option<&ToolSchema>,
    ) -> Result<StructuredResult, ExtractError> {
        let Some(expected) = expected else {
            let text = reply.content.unwrap_or_default();
            return Ok(StructuredResult::PlainText(text.trim().to_string()));
        };

        let call = ToolCallResult::from(reply);
        match (call.tool_invoked, call.raw_arguments) {
            (true, Some(raw)) => {
                let tool = call.tool_name.unwrap_or_default();
                if tool != expected.name {
                    warn!(expected = %expected.name, called = %tool, "Model called an unexpected tool name");
                }
                let value = serde_json::from_str::<Value>(&raw).map_err(|source| {
                    ExtractError::MalformedToolArguments { tool, raw, source }
                })?;
                Ok(StructuredResult::Parsed(value))
            }
            _ => {
                let text = call.free_text.unwrap_or_default();
                warn!(tool = %expected.name, "Model declined to call the tool");
                Ok(StructuredResult::diagnostic(format!(
                    "{UNEXPECTED_OUTPUT_PREFIX}{text}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ToolInvocation;
    use crate::registry::{Registry, SchemaVariant};
    use serde_json::json;

    fn schedule_tool() -> &'static ToolSchema {
        Registry::tool_for(SchemaVariant::ScheduleExtraction).unwrap()
    }

    #[test]
    fn parses_first_tool_call_arguments() {
        let args = json!({"schedule_list": [{"title": "a", "translated_title": "甲", "timestamp": 1}]});
        let reply = ModelReply {
            tool_calls: vec![
                ToolInvocation {
                    name: "extract_schedule".into(),
                    arguments: args.to_string(),
                },
                ToolInvocation {
                    name: "extract_schedule".into(),
                    arguments: "not json".into(),
                },
            ],
            content: Some("ignored".into()),
        };

        let result = ResponseExtractor::extract(reply, Some(schedule_tool())).unwrap();
        assert_eq!(result, StructuredResult::Parsed(args));
    }

    #[test]
    fn declined_tool_becomes_diagnostic() {
        let reply = ModelReply::text("I cannot find any schedule.");
        let result = ResponseExtractor::extract(reply, Some(schedule_tool())).unwrap();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"message": "unexpected output: I cannot find any schedule."})
        );
    }

    #[test]
    fn declined_tool_without_text_still_succeeds() {
        let result = ResponseExtractor::extract(ModelReply::default(), Some(schedule_tool())).unwrap();
        assert_eq!(result, StructuredResult::diagnostic("unexpected output: "));
    }

    #[test]
    fn malformed_arguments_are_a_hard_error() {
        let reply = ModelReply::tool_call("extract_schedule", "{\"schedule_list\": [");
        match ResponseExtractor::extract(reply, Some(schedule_tool())) {
            Err(ExtractError::MalformedToolArguments { tool, raw, .. }) => {
                assert_eq!(tool, "extract_schedule");
                assert_eq!(raw, "{\"schedule_list\": [");
            }
            other => panic!("expected malformed arguments, got {other:?}"),
        }
    }

    #[test]
    fn free_text_is_trimmed() {
        let result = ResponseExtractor::extract(ModelReply::text("\n  你好！ \n"), None).unwrap();
        assert_eq!(result, StructuredResult::PlainText("你好！".into()));
    }

    #[test]
    fn reply_normalization_flags_invocation() {
        let call = ToolCallResult::from(ModelReply::tool_call("tag_content", "{}"));
        assert!(call.tool_invoked);
        assert_eq!(call.raw_arguments.as_deref(), Some("{}"));
        assert_eq!(call.free_text, None);

        let call = ToolCallResult::from(ModelReply::text("hi"));
        assert!(!call.tool_invoked);
        assert_eq!(call.raw_arguments, None);
    }
}
