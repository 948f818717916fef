//! 工具执行器
//!
//! 持有只读的 ToolRegistry 与全局超时；execute 在超时内调用能力，
//! 超时或工具异常时转为 AgentError（ToolTimeout / ToolExecutionFailed）；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::{AgentError, AgentMessage};
use crate::llm::preview;
use crate::tools::{Capability, ToolArgs, ToolRegistry};

/// 工具执行器：多个 Solver 共享（Arc），运行期间不修改注册表
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry: Arc::new(registry),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn get_tool(&self, name: &str) -> Option<&Capability> {
        self.registry.get(name)
    }

    /// 执行能力；超时返回 ToolTimeout，工具返回 Err 则转为 ToolExecutionFailed；输出 JSON 审计日志
    pub async fn execute(&self, capability: &Capability, args: ToolArgs) -> Result<AgentMessage, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, capability.invoke(args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(msg)) if msg.is_failure() => (false, "failure"),
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": capability.name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e)),
            Err(_) => Err(AgentError::ToolTimeout(capability.name.clone())),
        }
    }
}

fn args_preview(args: &ToolArgs) -> String {
    preview(&serde_json::Value::Object(args.clone()).to_string(), 200)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[tokio::test]
    async fn test_timeout_maps_to_tool_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("slow", "sleeps", &[], |_| {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(AgentMessage::success("slow", "tool_result", serde_json::Value::Null))
            }
            .boxed()
        });
        let executor = ToolExecutor {
            registry: Arc::new(registry),
            timeout: Duration::from_millis(20),
        };
        let cap = executor.get_tool("slow").unwrap().clone();
        let res = executor.execute(&cap, ToolArgs::new()).await;
        assert!(matches!(res, Err(AgentError::ToolTimeout(name)) if name == "slow"));
    }

    #[tokio::test]
    async fn test_error_maps_to_execution_failed() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("broken", "fails", &[], |_| {
            async { Err("disk full".to_string()) }.boxed()
        });
        let executor = ToolExecutor::new(registry, 5);
        let cap = executor.get_tool("broken").unwrap().clone();
        let res = executor.execute(&cap, ToolArgs::new()).await;
        assert!(matches!(res, Err(AgentError::ToolExecutionFailed(e)) if e == "disk full"));
    }
}
