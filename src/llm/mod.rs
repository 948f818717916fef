//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock / Scripted）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::{MockLlmClient, ScriptedLlmClient, ScriptedReply};
pub use openai::OpenAiClient;
pub use traits::{ChatResponse, LlmClient, LlmError, Message, ResponseFormat, Role, Usage};

use crate::config::AppConfig;

/// DeepSeek 的 OpenAI 兼容端点
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// 后端所需的 API Key：deepseek 优先 DEEPSEEK_API_KEY，再退到 OPENAI_API_KEY
fn api_key_for(provider: &str) -> Option<String> {
    let env = |name: &str| std::env::var(name).ok().filter(|k| !k.trim().is_empty());
    match provider {
        "deepseek" => env("DEEPSEEK_API_KEY").or_else(|| env("OPENAI_API_KEY")),
        "openai" => env("OPENAI_API_KEY"),
        _ => None,
    }
}

/// 根据配置与环境变量选择 LLM 后端；没有可用 Key 时回退到 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM");
        return Arc::new(MockLlmClient);
    }
    let Some(api_key) = api_key_for(&provider) else {
        tracing::warn!(provider = %provider, "No API key set or provider unknown, using Mock LLM");
        return Arc::new(MockLlmClient);
    };
    let base_url = match (cfg.llm.base_url.as_deref(), provider.as_str()) {
        (Some(url), _) => Some(url),
        (None, "deepseek") => Some(DEEPSEEK_BASE_URL),
        (None, _) => None,
    };
    tracing::info!(provider = %provider, model = %cfg.llm.model, "Using OpenAI-compatible LLM");
    Arc::new(OpenAiClient::new(
        base_url,
        &cfg.llm.model,
        &api_key,
        cfg.llm.timeouts.request,
    ))
}

/// 从 LLM 输出中取出 JSON 对象文本：优先 ```json 代码块，否则取第一个 { 到最后一个 }
pub fn extract_json_object(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
        _ => None,
    }
}

/// 截断长文本用于日志与错误信息
pub fn preview(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}
