//! 求解能力的公共辅助：取注入的题目目录、读题面、读写 JSON 产物、JSON 模式问答

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::llm::{extract_json_object, preview, LlmClient, Message, ResponseFormat};
use crate::store::{read_artifact, write_artifact};
use crate::tools::{ToolArgs, PROBLEM_DIR_PARAM};

pub const STATEMENT_FILE: &str = "problem.md";
pub const ANALYSIS_FILE: &str = "analysis.json";
pub const PLAN_FILE: &str = "plan.json";

/// 取循环注入的 problem_dir；缺失说明调用方违约，作为工具异常返回
pub fn problem_dir(args: &ToolArgs) -> Result<PathBuf, String> {
    args.get(PROBLEM_DIR_PARAM)
        .and_then(|v| v.as_str())
        .map(|s| PathBuf::from(s.trim_end_matches('/')))
        .ok_or_else(|| format!("Missing required parameter: {PROBLEM_DIR_PARAM}"))
}

pub async fn read_statement(dir: &Path) -> Result<String, String> {
    let path = dir.join(STATEMENT_FILE);
    read_artifact(&path)
        .await
        .map_err(|e| format!("Could not find problem file at {}: {e}", path.display()))
}

/// 参数中的结构化值（对象或 JSON 字符串）；缺失时回退到题目目录下的持久化产物
pub async fn structured_arg(args: &ToolArgs, key: &str, dir: &Path, fallback_file: &str) -> Option<Value> {
    match args.get(key) {
        Some(Value::String(s)) => {
            Some(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())))
        }
        Some(Value::Null) | None => {
            let text = read_artifact(&dir.join(fallback_file)).await.ok()?;
            serde_json::from_str(&text).ok()
        }
        Some(v) => Some(v.clone()),
    }
}

/// 持久化 JSON 产物；失败只记日志
pub async fn persist_json(dir: &Path, file: &str, value: &Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    if let Err(e) = write_artifact(&dir.join(file), Some(&text)).await {
        tracing::warn!(dir = %dir.display(), file, error = %e, "failed to persist artifact");
    }
}

/// system + user 两条消息，JSON 模式，返回解析后的对象；错误为可读原因
pub async fn ask_json(llm: &dyn LlmClient, system: &str, user: String) -> Result<Value, String> {
    let messages = [Message::system(system), Message::user(user)];
    let response = llm
        .chat(&messages, ResponseFormat::Json)
        .await
        .map_err(|e| e.to_string())?;
    let json_str = extract_json_object(&response.content)
        .ok_or_else(|| format!("no JSON object in reply: {}", preview(&response.content, 120)))?;
    let value: Value = serde_json::from_str(json_str).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err(format!("expected a JSON object, got: {}", preview(json_str, 120)));
    }
    Ok(value)
}

/// 以缩进 JSON 文本嵌入 prompt
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
