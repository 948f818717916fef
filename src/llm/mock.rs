//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! - MockLlmClient：JSON 模式下总是回复 finish 决策，文本模式回复一段占位代码
//! - ScriptedLlmClient：按脚本依次回复，脚本耗尽后重复最后一条；记录收到的全部 prompt

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ChatResponse, LlmClient, LlmError, Message, ResponseFormat};

/// Mock 客户端：不调用任何外部服务
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat(&self, _messages: &[Message], format: ResponseFormat) -> Result<ChatResponse, LlmError> {
        let content = match format {
            ResponseFormat::Json => {
                r#"{"tool_name": "finish", "parameters": {"reason": "Mock LLM has nothing to do"}}"#
            }
            ResponseFormat::Text => "```cpp\nint main() { return 0; }\n```",
        };
        Ok(ChatResponse::text(content))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// 单条脚本回复：成功文本或调用错误
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Error(LlmError),
}

/// 脚本化客户端：依次弹出回复，最后一条会被重复使用
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    last: Mutex<Option<ScriptedReply>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_replies(replies.into_iter().map(|s| ScriptedReply::Text(s.into())))
    }

    pub fn from_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的调用次数
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// 已收到的全部对话（按调用顺序）
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn chat(&self, messages: &[Message], _format: ResponseFormat) -> Result<ChatResponse, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(messages.to_vec());
        }
        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        let reply = match next {
            Some(r) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = Some(r.clone());
                }
                r
            }
            None => self
                .last
                .lock()
                .ok()
                .and_then(|l| l.clone())
                .ok_or(LlmError::EmptyResponse)?,
        };
        match reply {
            ScriptedReply::Text(t) => Ok(ChatResponse::text(t)),
            ScriptedReply::Error(e) => Err(e),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
