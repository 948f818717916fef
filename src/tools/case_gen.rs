//! 测试用例生成能力（generate_test_cases）
//!
//! 两步：先让 LLM 判断额外用例是否值得生成（交互题、答案不唯一等应跳过），
//! 再按计划中的边界情况生成用例，写入 sol_{i}.in / ans_{i}.out（i 从 101 开始，与官方样例区分）。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::core::AgentMessage;
use crate::llm::LlmClient;
use crate::prompt::{case_decision_prompt, case_generation_prompt, CASE_DECISION_SYSTEM, CASE_GENERATION_SYSTEM};
use crate::store::{case_file_names, write_batch};
use crate::tools::support::{ask_json, pretty, problem_dir, read_statement, structured_arg, PLAN_FILE};
use crate::tools::{Tool, ToolArgs, PROBLEM_DIR_PARAM};

pub const GENERATE_TEST_CASES: &str = "generate_test_cases";

/// 生成用例的起始编号
pub const GENERATED_CASE_START: usize = 101;

#[derive(Debug, Deserialize)]
struct GenerateDecision {
    #[serde(default)]
    should_generate: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedCase {
    #[serde(default)]
    input: String,
    #[serde(default)]
    output: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedCases {
    #[serde(default)]
    test_cases: Vec<GeneratedCase>,
}

pub struct GenerateTestCasesTool {
    llm: Arc<dyn LlmClient>,
    default_cases: usize,
}

impl GenerateTestCasesTool {
    pub fn new(llm: Arc<dyn LlmClient>, default_cases: usize) -> Self {
        Self {
            llm,
            default_cases: default_cases.max(1),
        }
    }

    pub fn description() -> &'static str {
        r#"Decide whether extra edge-case tests are worthwhile for this problem and, if so, generate them as sol_101.in/ans_101.out, sol_102.in/ans_102.out, ...
Parameters: {"plan": <optional object; defaults to the saved result of plan_solution_strategy>, "num_cases": <optional integer>}"#
    }

    fn failure(error: impl Into<String>) -> AgentMessage {
        AgentMessage::failure(GENERATE_TEST_CASES, "error", error)
    }
}

#[async_trait]
impl Tool for GenerateTestCasesTool {
    fn parameters(&self) -> &[&'static str] {
        &[PROBLEM_DIR_PARAM, "plan", "num_cases"]
    }

    async fn execute(&self, args: ToolArgs) -> Result<AgentMessage, String> {
        let dir = problem_dir(&args)?;
        let num_cases = args
            .get("num_cases")
            .and_then(|n| n.as_u64())
            .map(|n| n.clamp(1, 20) as usize)
            .unwrap_or(self.default_cases);
        let plan = structured_arg(&args, "plan", &dir, PLAN_FILE).await.unwrap_or_else(|| json!({}));
        tracing::info!(tool = GENERATE_TEST_CASES, dir = %dir.display(), "evaluating plan");

        let decision = match ask_json(self.llm.as_ref(), CASE_DECISION_SYSTEM, case_decision_prompt(&pretty(&plan))).await {
            Ok(v) => serde_json::from_value::<GenerateDecision>(v).map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };
        let decision = match decision {
            Ok(d) => d,
            Err(e) => return Ok(Self::failure(format!("Failed during decision step: {e}"))),
        };
        let reason = decision.reason.unwrap_or_else(|| "No reason provided.".to_string());
        tracing::info!(should_generate = decision.should_generate, reason = %reason, "test case decision");
        if !decision.should_generate {
            return Ok(AgentMessage::success(
                GENERATE_TEST_CASES,
                "tool_result",
                json!({ "summary": format!("Skipped test case generation. Reason: {reason}") }),
            ));
        }

        let description = match read_statement(&dir).await {
            Ok(d) => d,
            Err(e) => return Ok(Self::failure(e)),
        };
        let edge_cases = plan
            .get("edge_cases_to_consider")
            .map(pretty)
            .unwrap_or_else(|| "No specific edge cases listed.".to_string());
        let prompt = case_generation_prompt(&description, &edge_cases, num_cases);
        let generated = match ask_json(self.llm.as_ref(), CASE_GENERATION_SYSTEM, prompt).await {
            Ok(v) => serde_json::from_value::<GeneratedCases>(v).map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };
        let cases = match generated {
            Ok(g) if !g.test_cases.is_empty() => g.test_cases,
            Ok(_) => return Ok(Self::failure("LLM failed to generate any test cases.")),
            Err(e) => return Ok(Self::failure(format!("Failed during generation step: {e}"))),
        };

        let mut files = Vec::with_capacity(cases.len() * 2);
        for (offset, case) in cases.iter().enumerate() {
            let (input_name, output_name) = case_file_names(GENERATED_CASE_START + offset);
            files.push((dir.join(input_name), Some(case.input.clone())));
            files.push((dir.join(output_name), Some(case.output.clone())));
        }
        let failed = write_batch(files).await;
        if !failed.is_empty() {
            return Ok(Self::failure(format!(
                "Failed to write {} test case files in '{}'",
                failed.len(),
                dir.display()
            )));
        }

        let summary = format!(
            "Successfully decided to generate and created {} new test cases in '{}'.",
            cases.len(),
            dir.display()
        );
        tracing::info!("{summary}");
        Ok(AgentMessage::success(
            GENERATE_TEST_CASES,
            "tool_result",
            json!({ "summary": summary, "generated_count": cases.len() }),
        ))
    }
}
