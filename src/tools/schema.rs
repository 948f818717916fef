//! 决策 JSON Schema 生成（schemars 自动生成）
//!
//! 将「合法决策」的 JSON 结构注入 Solver prompt，减少 LLM 输出格式错误。

use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

/// 决策格式：与 Solver 解析的 `{"tool_name": "...", "parameters": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct DecisionFormat {
    /// 工具名，取自工具目录；完成时为 finish
    pub tool_name: String,
    /// 工具参数，依工具不同而不同；problem_dir 无需提供
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// 返回决策的 JSON Schema 字符串，可拼入 prompt
pub fn decision_schema_json() -> String {
    let schema = schema_for!(DecisionFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_both_keys() {
        let schema = decision_schema_json();
        assert!(schema.contains("tool_name"));
        assert!(schema.contains("parameters"));
    }
}
