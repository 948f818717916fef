//! 代码生成能力（generate_code）：按计划写出完整解答，保存为 main.{ext}

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use crate::core::AgentMessage;
use crate::llm::{LlmClient, Message, ResponseFormat};
use crate::prompt::{code_prompt, code_system};
use crate::store::write_artifact;
use crate::tools::support::{pretty, problem_dir, read_statement, structured_arg, PLAN_FILE};
use crate::tools::{Tool, ToolArgs, PROBLEM_DIR_PARAM};

pub const GENERATE_CODE: &str = "generate_code";

/// 语言名 -> 源文件扩展名
pub fn source_extension(language: &str) -> &str {
    match language {
        "cpp" | "c++" => "cpp",
        "python" | "python3" => "py",
        "rust" => "rs",
        "java" => "java",
        other => other,
    }
}

/// 同一语言在代码块标记里的常见写法
fn fence_tags(language: &str) -> Vec<&str> {
    match source_extension(language) {
        "cpp" => vec!["cpp", "c++"],
        "py" => vec!["python", "python3", "py"],
        "rs" => vec!["rust", "rs"],
        _ => vec![language],
    }
}

/// 取回复中第一个标记为该语言（含别名）的代码块内容
pub fn extract_code_block(reply: &str, language: &str) -> Option<String> {
    let tags: Vec<String> = fence_tags(language).into_iter().map(regex::escape).collect();
    let pattern = format!(r"(?s)```(?:{})[ \t]*\r?\n(.*?)\n\s*```", tags.join("|"));
    let re = Regex::new(&pattern).ok()?;
    re.captures(reply).map(|c| c[1].to_string())
}

pub struct GenerateCodeTool {
    llm: Arc<dyn LlmClient>,
    language: String,
}

impl GenerateCodeTool {
    pub fn new(llm: Arc<dyn LlmClient>, language: impl Into<String>) -> Self {
        Self {
            llm,
            language: language.into(),
        }
    }

    pub fn description(language: &str) -> String {
        format!(
            r#"Write a complete {language} solution following the solution plan and save it as main.{ext}.
Parameters: {{"plan": <optional object; defaults to the saved result of plan_solution_strategy>}}"#,
            ext = source_extension(language)
        )
    }

    fn failure(error: impl Into<String>) -> AgentMessage {
        AgentMessage::failure(GENERATE_CODE, "error", error)
    }

    async fn write_solution(&self, dir: &Path, code: &str) -> AgentMessage {
        let path = dir.join(format!("main.{}", source_extension(&self.language)));
        if let Err(e) = write_artifact(&path, Some(code)).await {
            return Self::failure(format!("Failed to write '{}': {e}", path.display()));
        }
        let summary = format!(
            "Successfully generated {} code and saved to '{}'.",
            self.language,
            path.display()
        );
        tracing::info!("{summary}");
        AgentMessage::success(
            GENERATE_CODE,
            "tool_result",
            json!({ "summary": summary, "code_path": path.to_string_lossy() }),
        )
    }
}

#[async_trait]
impl Tool for GenerateCodeTool {
    fn parameters(&self) -> &[&'static str] {
        &[PROBLEM_DIR_PARAM, "plan"]
    }

    async fn execute(&self, args: ToolArgs) -> Result<AgentMessage, String> {
        let dir = problem_dir(&args)?;
        tracing::info!(tool = GENERATE_CODE, dir = %dir.display(), "generating code");

        let description = match read_statement(&dir).await {
            Ok(d) => d,
            Err(e) => return Ok(Self::failure(e)),
        };
        let plan = structured_arg(&args, "plan", &dir, PLAN_FILE)
            .await
            .map(|p| pretty(&p))
            .unwrap_or_else(|| "No plan available; derive one from the statement.".to_string());

        let messages = [
            Message::system(code_system(&self.language)),
            Message::user(code_prompt(&description, &plan, &self.language)),
        ];
        let reply = match self.llm.chat(&messages, ResponseFormat::Text).await {
            Ok(r) => r.content,
            Err(e) => return Ok(Self::failure(format!("Failed to generate code due to an error: {e}"))),
        };

        let code = extract_code_block(&reply, &self.language).unwrap_or_else(|| {
            tracing::warn!(
                language = %self.language,
                "no fenced code block in reply, using the whole reply as code"
            );
            reply.clone()
        });
        if code.trim().is_empty() {
            return Ok(Self::failure("LLM returned empty code."));
        }

        Ok(self.write_solution(&dir, &code).await)
    }
}
