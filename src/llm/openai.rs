//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（DeepSeek、OpenAI、自建代理）。
//! ResponseFormat::Json 时开启 json_object 模式；每次请求带超时，超时映射为 LlmError::Timeout。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat as ApiResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{ChatResponse, LlmClient, LlmError, Message, ResponseFormat, Role, Usage};

/// 累计用量；多个 Solver 并发调用同一客户端
#[derive(Debug, Default)]
struct UsageMeter {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl UsageMeter {
    fn record(&self, usage: Usage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }

    fn total(&self) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }
}

fn api_message(m: &Message) -> Result<ChatCompletionRequestMessage, LlmError> {
    let built = match m.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(m.content.clone())
            .build()
            .map(ChatCompletionRequestMessage::System),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(m.content.clone())
            .build()
            .map(ChatCompletionRequestMessage::User),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(m.content.clone())
            .build()
            .map(ChatCompletionRequestMessage::Assistant),
    };
    built.map_err(|e| LlmError::Api(format!("invalid message: {e}")))
}

/// OpenAI 兼容客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    meter: UsageMeter,
}

impl OpenAiClient {
    /// base_url 为 None 时使用 OpenAI 官方端点
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str, timeout_secs: u64) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            meter: UsageMeter::default(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn total_usage(&self) -> Usage {
        self.meter.total()
    }

    async fn chat(&self, messages: &[Message], format: ResponseFormat) -> Result<ChatResponse, LlmError> {
        let api_messages = messages.iter().map(api_message).collect::<Result<Vec<_>, _>>()?;
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.as_str()).messages(api_messages);
        if format == ResponseFormat::Json {
            args.response_format(ApiResponseFormat::JsonObject);
        }
        let request = args.build().map_err(|e| LlmError::Api(e.to_string()))?;
        tracing::debug!(model = %self.model, ?format, messages = messages.len(), "chat request");

        let outcome = tokio::time::timeout(self.timeout, self.client.chat().create(request)).await;
        let response = match outcome {
            Err(_) => return Err(LlmError::Timeout(self.timeout.as_secs())),
            Ok(r) => r.map_err(|e| LlmError::Api(e.to_string()))?,
        };

        let usage = response.usage.as_ref().map(|u| Usage {
            prompt_tokens: u64::from(u.prompt_tokens),
            completion_tokens: u64::from(u.completion_tokens),
        });
        if let Some(u) = usage {
            self.meter.record(u);
        }

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;
        Ok(ChatResponse { content, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_roles() {
        let converted = api_message(&Message::system("rules")).unwrap();
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
        let converted = api_message(&Message::assistant("ok")).unwrap();
        assert!(matches!(converted, ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_usage_meter_accumulates() {
        let meter = UsageMeter::default();
        meter.record(Usage { prompt_tokens: 10, completion_tokens: 5 });
        meter.record(Usage { prompt_tokens: 1, completion_tokens: 1 });
        assert_eq!(meter.total(), Usage { prompt_tokens: 11, completion_tokens: 6 });
    }
}
