//! Structured-extraction relay in front of a hosted chat-completion model.
//!
//! One request flows `RawInput -> PromptBuilder -> ModelGateway ->
//! ResponseExtractor` inside an [`Orchestrator`]. The process serves exactly
//! one [`SchemaVariant`], fixed in [`RelayConfig`] at startup.

pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::RelayConfig;
pub use error::{ConfigError, ExtractError, GatewayError, OrchestratorError};
pub use extract::{ResponseExtractor, StructuredResult, ToolCallResult};
pub use gateway::{ModelGateway, ModelReply, ModelRequest, ToolChoice, ToolInvocation};
pub use llm::ZhipuGateway;
pub use orchestrator::{Orchestrator, RawInput, EMPTY_INPUT_MESSAGE};
pub use prompt::{PromptBuilder, PromptPair};
pub use registry::{Registry, SchemaVariant, ToolSchema};
