//! 扇出：启动 N 个独立任务，全部等待完成，逐个收集结果
//!
//! 解析流水线（逐题抓取）与编排器（逐题求解）共用此实现。任务在当前执行上下文中协作式并发，
//! 不 spawn 线程；单个任务 panic 被捕获并转换为该任务的失败消息，不影响兄弟任务，也不提前返回。

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::future::join_all;
use futures_util::FutureExt;

use crate::core::AgentMessage;

/// 并发运行所有 (label, future)，按输入顺序返回每个任务的 AgentMessage
pub async fn join_isolated<I, F>(source: &str, tasks: I) -> Vec<AgentMessage>
where
    I: IntoIterator<Item = (String, F)>,
    F: Future<Output = AgentMessage>,
{
    let guarded = tasks.into_iter().map(|(label, task)| async move {
        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(msg) => msg,
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                tracing::error!(task = %label, reason = %reason, "fan-out task aborted");
                AgentMessage::failure(
                    source,
                    "error",
                    format!("Task '{label}' aborted unexpectedly: {reason}"),
                )
            }
        }
    });
    join_all(guarded).await
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    async fn explode() -> AgentMessage {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panic_does_not_abort_siblings() {
        let tasks: Vec<(String, std::pin::Pin<Box<dyn Future<Output = AgentMessage> + Send>>)> = vec![
            (
                "a".to_string(),
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    AgentMessage::success("t", "tool_result", json!({"id": "a"}))
                }),
            ),
            ("b".to_string(), Box::pin(explode())),
            (
                "c".to_string(),
                Box::pin(async { AgentMessage::failure("t", "error", "fetch timed out") }),
            ),
        ];

        let results = join_isolated("pipeline", tasks).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(results[0].payload()["id"], "a");
        assert!(results[1].is_failure());
        assert!(results[1].error().unwrap().contains("boom"));
        assert_eq!(results[1].source(), "pipeline");
        assert_eq!(results[2].error(), Some("fetch timed out"));
    }

    #[tokio::test]
    async fn test_empty_fan_out() {
        let tasks: Vec<(String, std::future::Ready<AgentMessage>)> = Vec::new();
        assert!(join_isolated("orchestrator", tasks).await.is_empty());
    }
}
