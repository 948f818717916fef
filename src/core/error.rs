//! Agent 错误类型
//!
//! 按影响范围分层：整场比赛致命（契约违反）、单题致命（抓取失败）、
//! 循环内可恢复（JSON 解析、幻觉工具、工具执行失败 / 超时，只记入决策历史）。
//! 抓取与 LLM 调用各有自己的错误类型（FetchError / LlmError），在调用处就地转为失败消息或历史行。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 消息信封不满足不变式（failure 无 error 等）
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),
}
