//! 思考类能力：题目分析（analyze_problem）与解题规划（plan_solution_strategy）
//!
//! 二者都只产出结构化 JSON，结果同时落盘（analysis.json / plan.json），供后续能力在 LLM 未回传参数时读取。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::AgentMessage;
use crate::llm::LlmClient;
use crate::prompt::{analyze_prompt, plan_prompt, ANALYZE_SYSTEM, PLAN_SYSTEM};
use crate::tools::support::{
    ask_json, persist_json, pretty, problem_dir, read_statement, structured_arg, ANALYSIS_FILE, PLAN_FILE,
};
use crate::tools::{Tool, ToolArgs, PROBLEM_DIR_PARAM};

pub const ANALYZE_PROBLEM: &str = "analyze_problem";
pub const PLAN_SOLUTION_STRATEGY: &str = "plan_solution_strategy";

/// 读题并抽取题型、输入输出格式与约束
pub struct AnalyzeProblemTool {
    llm: Arc<dyn LlmClient>,
}

impl AnalyzeProblemTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn description() -> &'static str {
        r#"Read the problem statement and extract its key information (problem type, input format, output format, constraints) as structured JSON. Saves analysis.json.
Parameters: {}"#
    }
}

#[async_trait]
impl Tool for AnalyzeProblemTool {
    fn parameters(&self) -> &[&'static str] {
        &[PROBLEM_DIR_PARAM]
    }

    async fn execute(&self, args: ToolArgs) -> Result<AgentMessage, String> {
        let dir = problem_dir(&args)?;
        tracing::info!(tool = ANALYZE_PROBLEM, dir = %dir.display(), "analyzing problem");

        let description = match read_statement(&dir).await {
            Ok(d) => d,
            Err(e) => return Ok(AgentMessage::failure(ANALYZE_PROBLEM, "error", e)),
        };

        let analysis = match ask_json(self.llm.as_ref(), ANALYZE_SYSTEM, analyze_prompt(&description)).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(AgentMessage::failure(
                    ANALYZE_PROBLEM,
                    "error",
                    format!("Failed to analyze problem due to LLM or JSON parsing error: {e}"),
                ))
            }
        };
        persist_json(&dir, ANALYSIS_FILE, &analysis).await;

        Ok(AgentMessage::success(
            ANALYZE_PROBLEM,
            "tool_result",
            json!({
                "summary": "Successfully analyzed the problem and extracted key information.",
                "analysis": analysis,
            }),
        ))
    }
}

/// 基于分析结果制定解题计划
pub struct PlanStrategyTool {
    llm: Arc<dyn LlmClient>,
}

impl PlanStrategyTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn description() -> &'static str {
        r#"Devise a high-level solution plan (algorithm, data structures, step-by-step plan, edge cases) from the problem analysis. Saves plan.json.
Parameters: {"analysis": <optional object; defaults to the saved result of analyze_problem>}"#
    }
}

#[async_trait]
impl Tool for PlanStrategyTool {
    fn parameters(&self) -> &[&'static str] {
        &[PROBLEM_DIR_PARAM, "analysis"]
    }

    async fn execute(&self, args: ToolArgs) -> Result<AgentMessage, String> {
        let dir = problem_dir(&args)?;
        tracing::info!(tool = PLAN_SOLUTION_STRATEGY, dir = %dir.display(), "devising strategy");

        let Some(analysis) = structured_arg(&args, "analysis", &dir, ANALYSIS_FILE).await else {
            return Ok(AgentMessage::failure(
                PLAN_SOLUTION_STRATEGY,
                "error",
                format!("No analysis available for '{}'. Call {ANALYZE_PROBLEM} first.", dir.display()),
            ));
        };
        let description = match read_statement(&dir).await {
            Ok(d) => d,
            Err(e) => return Ok(AgentMessage::failure(PLAN_SOLUTION_STRATEGY, "error", e)),
        };

        let prompt = plan_prompt(&pretty(&analysis), &description);
        let plan = match ask_json(self.llm.as_ref(), PLAN_SYSTEM, prompt).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(AgentMessage::failure(
                    PLAN_SOLUTION_STRATEGY,
                    "error",
                    format!("Failed to create a plan due to LLM or JSON parsing error: {e}"),
                ))
            }
        };
        persist_json(&dir, PLAN_FILE, &plan).await;

        let algorithm = plan.get("algorithm").and_then(|a| a.as_str()).unwrap_or("N/A");
        Ok(AgentMessage::success(
            PLAN_SOLUTION_STRATEGY,
            "tool_result",
            json!({
                "summary": format!("Successfully created a solution plan. Chosen algorithm: {algorithm}"),
                "plan": plan,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::store::write_artifact;
    use std::path::Path;

    fn args_for(dir: &Path) -> ToolArgs {
        let mut args = ToolArgs::new();
        args.insert(PROBLEM_DIR_PARAM.into(), json!(dir.to_string_lossy()));
        args
    }

    #[tokio::test]
    async fn test_analyze_persists_analysis() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(&dir.path().join("problem.md"), Some("# A\n\nPrint A+B."))
            .await
            .unwrap();
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"problem_type": "Math", "constraints": "1 <= A, B <= 100"}"#]));
        let tool = AnalyzeProblemTool::new(llm.clone());

        let msg = tool.execute(args_for(dir.path())).await.unwrap();
        assert!(msg.is_success());
        assert_eq!(msg.payload()["analysis"]["problem_type"], "Math");
        assert!(dir.path().join(ANALYSIS_FILE).exists());
        assert!(llm.prompts()[0][1].content.contains("Print A+B."));
    }

    #[tokio::test]
    async fn test_analyze_without_statement_fails() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedLlmClient::new(["{}"]));
        let msg = AnalyzeProblemTool::new(llm.clone())
            .execute(args_for(dir.path()))
            .await
            .unwrap();
        assert!(msg.is_failure());
        assert!(msg.error().unwrap().contains("problem.md"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_bad_json_is_failure_message() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(&dir.path().join("problem.md"), Some("# A")).await.unwrap();
        let llm = Arc::new(ScriptedLlmClient::new(["I think it is a graph problem"]));
        let msg = AnalyzeProblemTool::new(llm).execute(args_for(dir.path())).await.unwrap();
        assert!(msg.is_failure());
        assert!(!dir.path().join(ANALYSIS_FILE).exists());
    }

    #[tokio::test]
    async fn test_plan_uses_saved_analysis() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(&dir.path().join("problem.md"), Some("# A")).await.unwrap();
        persist_json(dir.path(), ANALYSIS_FILE, &json!({"problem_type": "Graph Theory"})).await;
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"algorithm": "BFS", "edge_cases_to_consider": ["N=1"]}"#]));

        let msg = PlanStrategyTool::new(llm.clone())
            .execute(args_for(dir.path()))
            .await
            .unwrap();
        assert!(msg.is_success());
        assert!(msg.payload()["summary"].as_str().unwrap().ends_with("BFS"));
        assert!(llm.prompts()[0][1].content.contains("Graph Theory"));
        assert!(dir.path().join(PLAN_FILE).exists());
    }

    #[tokio::test]
    async fn test_plan_without_analysis_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(&dir.path().join("problem.md"), Some("# A")).await.unwrap();
        let llm = Arc::new(ScriptedLlmClient::new(["{}"]));
        let msg = PlanStrategyTool::new(llm).execute(args_for(dir.path())).await.unwrap();
        assert!(msg.is_failure());
        assert!(msg.error().unwrap().contains(ANALYZE_PROBLEM));
    }
}
