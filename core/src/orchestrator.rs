//! The per-request pipeline: canonicalize, prompt, call, extract.

use std::io;
use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::RelayConfig;
use crate::error::{ExtractError, GatewayError, OrchestratorError};
use crate::extract::{ResponseExtractor, StructuredResult};
use crate::gateway::{ModelGateway, ModelRequest};
use crate::prompt::PromptBuilder;
use crate::registry::Registry;

pub const EMPTY_INPUT_MESSAGE: &str = "input must not be empty";

/// What the caller posted.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Text(String),
    Json(Value),
}

impl From<Value> for RawInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RawInput::Text(s),
            other => RawInput::Json(other),
        }
    }
}

impl From<String> for RawInput {
    fn from(s: String) -> Self {
        RawInput::Text(s)
    }
}

impl From<&str> for RawInput {
    fn from(s: &str) -> Self {
        RawInput::Text(s.to_string())
    }
}

impl RawInput {
    /// The single string that goes into the prompt slot.
    ///
    /// Strings pass through untouched. Anything else becomes JSON text with
    /// `", "` / `": "` separators and non-ASCII left as-is, so `{"a":1}` and
    /// the string `{"a": 1}` prompt identically.
    pub fn canonicalize(&self) -> Result<String, OrchestratorError> {
        match self {
            RawInput::Text(s) => Ok(s.clone()),
            RawInput::Json(value) => {
                let mut buf = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
                value
                    .serialize(&mut ser)
                    .map_err(|e| OrchestratorError::InvalidInputShape(e.to_string()))?;
                String::from_utf8(buf)
                    .map_err(|e| OrchestratorError::InvalidInputShape(e.to_string()))
            }
        }
    }
}

/// Compact JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Runs one request end to end. Holds only immutable, shared state.
#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn ModelGateway>,
    config: Arc<RelayConfig>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, config: Arc<RelayConfig>) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub async fn handle(&self, raw: RawInput) -> Result<StructuredResult, OrchestratorError> {
        let variant = self.config.variant;

        // 1. Canonicalize
        let input = raw.canonicalize()?;
        info!(%variant, input_len = input.len(), "Request received");

        // 2. Empty input never reaches the model
        if input.trim().is_empty() {
            info!("Empty input, skipping model call");
            return Ok(StructuredResult::diagnostic(EMPTY_INPUT_MESSAGE));
        }

        // 3. Prompt + tool
        let prompt = PromptBuilder::build(&input, variant);
        let tool = Registry::tool_for(variant);
        debug!(
            system_len = prompt.system_message.as_ref().map_or(0, String::len),
            user_len = prompt.user_message.len(),
            tool = tool.map(|t| t.name.as_str()),
            "Prompt built"
        );

        let request = ModelRequest {
            system_message: prompt.system_message,
            user_message: prompt.user_message,
            tools: tool.cloned().into_iter().collect(),
            tool_choice: self.config.tool_choice,
        };

        // 4. Single upstream attempt
        let reply = match self.config.upstream_timeout {
            Some(limit) => tokio::time::timeout(limit, self.gateway.complete(request))
                .await
                .unwrap_or(Err(GatewayError::Timeout(limit.as_secs()))),
            None => self.gateway.complete(request).await,
        };
        let reply = reply.map_err(|e| {
            error!(error = %e, "Upstream call failed");
            OrchestratorError::UpstreamFailure(e)
        })?;

        // 5. Extract
        ResponseExtractor::extract(reply, tool).map_err(|e| {
            let ExtractError::MalformedToolArguments { tool, raw, source } = &e;
            error!(%tool, raw_arguments = %raw, error = %source, "Model returned malformed tool arguments");
            OrchestratorError::MalformedToolArguments(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use crate::gateway::ModelReply;
    use serde_json::json;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut out) = self.0.lock() {
                out.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            self.0
                .lock()
                .map(|out| String::from_utf8_lossy(&out).into_owned())
                .unwrap_or_default()
        }
    }

    fn config(variant: &str) -> Arc<RelayConfig> {
        let variant = variant.to_string();
        Arc::new(
            RelayConfig::from_lookup(move |key| match key {
                "ZHIPUAI_API_KEY" => Some("test-key".into()),
                "RELAY_VARIANT" => Some(variant.clone()),
                _ => None,
            })
            .unwrap(),
        )
    }

    #[test]
    fn strings_canonicalize_verbatim() {
        let raw = RawInput::from("  hello\n");
        assert_eq!(raw.canonicalize().unwrap(), "  hello\n");
    }

    #[test]
    fn json_canonicalizes_with_spaced_separators() {
        let raw = RawInput::from(json!({"a": 1}));
        assert_eq!(raw.canonicalize().unwrap(), "{\"a\": 1}");

        let raw = RawInput::from(json!({"list": [{"type": "text", "data": "求推荐"}, 2]}));
        assert_eq!(
            raw.canonicalize().unwrap(),
            "{\"list\": [{\"type\": \"text\", \"data\": \"求推荐\"}, 2]}"
        );
    }

    #[test]
    fn json_string_values_are_text() {
        assert_eq!(RawInput::from(json!("x")), RawInput::Text("x".into()));
    }

    #[tokio::test]
    async fn whitespace_input_short_circuits() {
        let gateway = Arc::new(ScriptedGateway::replying(ModelReply::text("unused")));
        let orchestrator = Orchestrator::new(gateway.clone(), config("schedule_extraction"));

        for input in ["", "   ", "\n\t "] {
            let result = orchestrator.handle(RawInput::from(input)).await.unwrap();
            assert_eq!(result, StructuredResult::diagnostic(EMPTY_INPUT_MESSAGE));
        }
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn offers_the_variant_tool() {
        let gateway = Arc::new(ScriptedGateway::replying(ModelReply::tool_call(
            "tag_content",
            r#"{"通用": [], "高风险": [], "中风险": ["广告嫌疑"], "低风险": []}"#,
        )));
        let orchestrator = Orchestrator::new(gateway.clone(), config("moderation_tagging"));

        let result = orchestrator.handle(RawInput::from("买课加我")).await.unwrap();
        assert_eq!(
            result,
            StructuredResult::Parsed(json!({"通用": [], "高风险": [], "中风险": ["广告嫌疑"], "低风险": []}))
        );

        let request = gateway.last_request().unwrap();
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].name, "tag_content");
        assert!(request.user_message.ends_with("买课加我"));
    }

    #[tokio::test]
    async fn free_text_sends_no_tools() {
        let gateway = Arc::new(ScriptedGateway::replying(ModelReply::text(" 你好 ")));
        let orchestrator = Orchestrator::new(gateway.clone(), config("free_text"));

        let result = orchestrator.handle(RawInput::from("hi")).await.unwrap();
        assert_eq!(result, StructuredResult::PlainText("你好".into()));

        let request = gateway.last_request().unwrap();
        assert!(request.tools.is_empty());
        assert_eq!(request.system_message, None);
        assert_eq!(request.user_message, "hi");
    }

    #[tokio::test]
    async fn gateway_errors_become_upstream_failures() {
        let gateway = Arc::new(ScriptedGateway::failing(|| {
            GatewayError::Api("invalid api key sk-123".into())
        }));
        let orchestrator = Orchestrator::new(gateway, config("schedule_extraction"));

        let err = orchestrator.handle(RawInput::from("x")).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::UpstreamFailure(GatewayError::Api(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out() {
        let gateway = Arc::new(
            ScriptedGateway::replying(ModelReply::text("late"))
                .with_delay(std::time::Duration::from_secs(120)),
        );
        let orchestrator = Orchestrator::new(gateway, config("free_text"));

        let err = orchestrator.handle(RawInput::from("x")).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::UpstreamFailure(GatewayError::Timeout(60))
        ));
    }

    #[tokio::test]
    async fn malformed_arguments_are_logged_with_raw_text() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let gateway = Arc::new(ScriptedGateway::replying(ModelReply::tool_call(
            "extract_schedule",
            "{\"schedule_list\": [RAW-MARKER",
        )));
        let orchestrator = Orchestrator::new(gateway, config("schedule_extraction"));

        let err = orchestrator.handle(RawInput::from("x")).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::MalformedToolArguments(_)));

        let output = logs.contents();
        assert!(output.contains("RAW-MARKER"), "log output: {output}");
        assert!(output.contains("malformed tool arguments"));
    }
}
