//! 组件间统一消息信封
//!
//! 所有工具、流水线与 Agent 的结果都以 AgentMessage 返回：status / source / message_type / payload / error。
//! 不变式：error 存在当且仅当 status = Failure；source 与 message_type 非空。构造后不可变。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;

/// 消息状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Success,
    Failure,
    InProgress,
}

/// 统一消息信封；字段私有，只能经校验后的构造函数创建
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAgentMessage")]
pub struct AgentMessage {
    status: MessageStatus,
    source: String,
    message_type: String,
    payload: Value,
    error: Option<String>,
}

/// 反序列化中间形态，转换时走 try_new 校验
#[derive(Deserialize)]
struct RawAgentMessage {
    #[serde(default)]
    status: MessageStatus,
    source: String,
    message_type: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<RawAgentMessage> for AgentMessage {
    type Error = AgentError;

    fn try_from(raw: RawAgentMessage) -> Result<Self, Self::Error> {
        AgentMessage::try_new(raw.status, raw.source, raw.message_type, raw.payload, raw.error)
    }
}

impl AgentMessage {
    /// 完整构造：校验 source / message_type 非空，以及 error 与 Failure 的对应关系
    pub fn try_new(
        status: MessageStatus,
        source: impl Into<String>,
        message_type: impl Into<String>,
        payload: Value,
        error: Option<String>,
    ) -> Result<Self, AgentError> {
        let source = source.into();
        let message_type = message_type.into();
        if source.trim().is_empty() {
            return Err(AgentError::InvalidMessage("source must not be empty".into()));
        }
        if message_type.trim().is_empty() {
            return Err(AgentError::InvalidMessage(
                "message_type must not be empty".into(),
            ));
        }
        let has_error = error.as_deref().is_some_and(|e| !e.trim().is_empty());
        match (status, has_error) {
            (MessageStatus::Failure, false) => {
                return Err(AgentError::InvalidMessage(format!(
                    "failure message from '{source}' has no error text"
                )))
            }
            (MessageStatus::Success | MessageStatus::InProgress, true) => {
                return Err(AgentError::InvalidMessage(format!(
                    "non-failure message from '{source}' carries an error"
                )))
            }
            _ => {}
        }
        Ok(Self {
            status,
            source,
            message_type,
            payload,
            error: if has_error { error } else { None },
        })
    }

    pub fn success(source: impl Into<String>, message_type: impl Into<String>, payload: Value) -> Self {
        Self::build(MessageStatus::Success, source.into(), message_type.into(), payload, None)
    }

    pub fn in_progress(
        source: impl Into<String>,
        message_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::build(MessageStatus::InProgress, source.into(), message_type.into(), payload, None)
    }

    /// 失败消息；error 为空属于调用方编程错误，直接 panic
    pub fn failure(
        source: impl Into<String>,
        message_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::failure_with_payload(source, message_type, error, Value::Null)
    }

    /// 带诊断 payload 的失败消息（如达到最大步数时附带历史）
    pub fn failure_with_payload(
        source: impl Into<String>,
        message_type: impl Into<String>,
        error: impl Into<String>,
        payload: Value,
    ) -> Self {
        let error = error.into();
        assert!(
            !error.trim().is_empty(),
            "AgentMessage::failure requires a non-empty error"
        );
        Self::build(
            MessageStatus::Failure,
            source.into(),
            message_type.into(),
            payload,
            Some(error),
        )
    }

    fn build(
        status: MessageStatus,
        source: String,
        message_type: String,
        payload: Value,
        error: Option<String>,
    ) -> Self {
        assert!(!source.trim().is_empty(), "AgentMessage requires a source");
        assert!(
            !message_type.trim().is_empty(),
            "AgentMessage requires a message_type"
        );
        Self {
            status,
            source,
            message_type,
            payload,
            error,
        }
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == MessageStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == MessageStatus::Failure
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 规范文本形式（缩进 JSON），用于写入决策历史与最终报告
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_carries_error() {
        let msg = AgentMessage::failure("parse_problem_page", "error", "Failed to access page");
        assert!(msg.is_failure());
        assert_eq!(msg.error(), Some("Failed to access page"));

        let ok = AgentMessage::success("parse_problem_page", "tool_result", json!({"summary": "ok"}));
        assert!(ok.is_success());
        assert!(ok.error().is_none());
    }

    #[test]
    fn test_try_new_rejects_inconsistent_error() {
        let missing = AgentMessage::try_new(MessageStatus::Failure, "x", "error", Value::Null, None);
        assert!(matches!(missing, Err(AgentError::InvalidMessage(_))));

        let blank = AgentMessage::try_new(
            MessageStatus::Failure,
            "x",
            "error",
            Value::Null,
            Some("   ".into()),
        );
        assert!(blank.is_err());

        let extra = AgentMessage::try_new(
            MessageStatus::Success,
            "x",
            "tool_result",
            Value::Null,
            Some("boom".into()),
        );
        assert!(extra.is_err());

        let no_source = AgentMessage::try_new(MessageStatus::Success, "", "tool_result", Value::Null, None);
        assert!(no_source.is_err());
    }

    #[test]
    #[should_panic(expected = "non-empty error")]
    fn test_failure_without_error_panics() {
        let _ = AgentMessage::failure("solver", "error", "");
    }

    #[test]
    fn test_canonical_json_shape() {
        let msg = AgentMessage::in_progress("Solver-abc363_a", "step", json!({"step": 2}));
        let text = msg.to_json();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["status"], "in_progress");
        assert_eq!(v["source"], "Solver-abc363_a");
        assert_eq!(v["payload"]["step"], 2);
        assert!(v["error"].is_null());
    }

    #[test]
    fn test_deserialize_validates_invariant() {
        let bad = r#"{"status":"failure","source":"a","message_type":"error"}"#;
        assert!(serde_json::from_str::<AgentMessage>(bad).is_err());

        let good = r#"{"status":"failure","source":"a","message_type":"error","error":"boom"}"#;
        let msg: AgentMessage = serde_json::from_str(good).unwrap();
        assert_eq!(msg.error(), Some("boom"));
        assert!(msg.payload().is_null());
    }
}
