use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionNamedToolChoice, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolChoiceOption,
        ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionName,
        FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::RelayConfig;
use crate::error::GatewayError;
use crate::gateway::{ModelGateway, ModelReply, ModelRequest, ToolChoice, ToolInvocation};

/// Zhipu's chat-completions endpoint, reached through its OpenAI-compatible API.
pub struct ZhipuGateway {
    client: Client<OpenAIConfig>,
    model: String,
}

impl ZhipuGateway {
    pub fn new(config: &RelayConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key())
            .with_api_base(&config.api_base);
        let client = Client::with_config(openai_config);

        info!("Upstream client ready. Model: {} ({})", config.model, config.api_base);
        Self {
            client,
            model: config.model.clone(),
        }
    }

    fn build_request(
        &self,
        request: ModelRequest,
    ) -> Result<async_openai::types::CreateChatCompletionRequest, OpenAIError> {
        // 1. Messages: optional system persona, then the assembled user prompt
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_message {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?,
            ));
        }
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_message)
                .build()?,
        ));

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);

        // 2. Tools: our schemas pass straight through as function parameters
        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(|t| -> Result<ChatCompletionTool, OpenAIError> {
                    Ok(ChatCompletionToolArgs::default()
                        .r#type(ChatCompletionToolType::Function)
                        .function(
                            FunctionObjectArgs::default()
                                .name(&t.name)
                                .description(&t.description)
                                .parameters(t.parameters.clone())
                                .build()?,
                        )
                        .build()?)
                })
                .collect::<Result<Vec<_>, _>>()?;

            let choice = match (request.tool_choice, tools.first()) {
                (ToolChoice::Forced, Some(first)) => {
                    ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionName {
                            name: first.function.name.clone(),
                        },
                    })
                }
                _ => ChatCompletionToolChoiceOption::Auto,
            };
            builder.tools(tools).tool_choice(choice);
        }

        builder.build()
    }
}

#[async_trait]
impl ModelGateway for ZhipuGateway {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, GatewayError> {
        let request = self.build_request(request).map_err(map_openai_error)?;

        debug!(model = %self.model, "Sending chat completion");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(GatewayError::EmptyReply)?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolInvocation {
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(ModelReply {
            tool_calls,
            content: choice.message.content,
        })
    }
}

fn map_openai_error(err: OpenAIError) -> GatewayError {
    match err {
        OpenAIError::ApiError(api) => GatewayError::Api(api.to_string()),
        OpenAIError::InvalidArgument(msg) => GatewayError::Request(msg),
        OpenAIError::Reqwest(e) => GatewayError::Transport(e.to_string()),
        other => GatewayError::Transport(other.to_string()),
    }
}
