//! 单题求解 Agent：有界的「思考-行动」循环
//!
//! 状态机：Thinking -> Acting -> (Thinking | Finished | MaxStepsExhausted)，另有 FatalError（无 LLM 句柄）。
//! 每个 Thinking 消耗一步（共 max_steps 步），无论该步是否成功调用了工具。
//! LLM 输出无法解析、工具名不存在、工具异常或超时都只记入决策历史，循环继续；
//! 每步恰好追加一行历史。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::agent::{Agent, AgentBase};
use crate::core::{AgentError, AgentMessage};
use crate::llm::{extract_json_object, preview, LlmClient, Message, ResponseFormat};
use crate::prompt::{solve_prompt, MISSING_STATEMENT};
use crate::store::read_artifact;
use crate::tools::{decision_schema_json, ToolArgs, ToolExecutor, PROBLEM_DIR_PARAM};

/// 终止工具名（循环内置，不经过注册表）
pub const FINISH_TOOL: &str = "finish";

/// LLM 的单步决策
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Decision {
    pub tool_name: String,
    /// 缺省或 null 均视为空参数
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: ToolArgs,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ToolArgs, D::Error> {
    Ok(Option::<ToolArgs>::deserialize(deserializer)?.unwrap_or_default())
}

/// 循环状态；后三者为终态
#[derive(Debug, Clone, PartialEq)]
pub enum SolverState {
    Thinking,
    Acting(Decision),
    Finished(String),
    MaxStepsExhausted,
    FatalError(String),
}

/// 单题最终结果
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Finished { summary: String, steps: usize },
    MaxStepsExhausted { steps: usize },
    FatalError(String),
}

/// 从 LLM 输出中提取并解析决策：支持 ```json 代码块或夹杂文字的裸 JSON
pub fn parse_decision(output: &str) -> Result<Decision, AgentError> {
    let json_str = extract_json_object(output).ok_or_else(|| {
        AgentError::JsonParseError(format!("no JSON object found in: {}", preview(output.trim(), 120)))
    })?;

    let decision: Decision = serde_json::from_str(json_str)
        .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, preview(json_str, 120))))?;
    if decision.tool_name.trim().is_empty() {
        return Err(AgentError::JsonParseError("empty tool_name".to_string()));
    }
    Ok(decision)
}

/// 单题求解 Agent：绑定一个题目目录与共享的工具执行器
pub struct ProblemSolverAgent {
    base: AgentBase,
    problem_dir: PathBuf,
    executor: Arc<ToolExecutor>,
    max_steps: usize,
    outcome: Option<SolveOutcome>,
}

impl ProblemSolverAgent {
    pub fn new(
        problem_dir: impl Into<PathBuf>,
        executor: Arc<ToolExecutor>,
        llm: Option<Arc<dyn LlmClient>>,
        max_steps: usize,
    ) -> Self {
        let problem_dir = problem_dir.into();
        let name = format!("Solver-{}", problem_id(&problem_dir));
        Self {
            base: AgentBase::new(name, llm),
            problem_dir,
            executor,
            max_steps,
            outcome: None,
        }
    }

    pub fn problem_dir(&self) -> &Path {
        &self.problem_dir
    }

    /// 最近一次 run 的结果
    pub fn outcome(&self) -> Option<&SolveOutcome> {
        self.outcome.as_ref()
    }

    async fn build_prompt(&self, goal: &str) -> String {
        let statement = read_artifact(&self.problem_dir.join("problem.md"))
            .await
            .unwrap_or_else(|_| MISSING_STATEMENT.to_string());
        solve_prompt(
            goal,
            &self.problem_dir,
            &statement,
            &self.base.history.render(),
            &self.executor.registry().render_catalog(),
            &decision_schema_json(),
        )
    }

    /// Thinking：拼 prompt、问 LLM、解析决策
    async fn think(&mut self, llm: &dyn LlmClient, goal: &str, step: usize) -> SolverState {
        tracing::info!(agent = %self.base.name, step, "thinking");
        let prompt = self.build_prompt(goal).await;
        let reply = match llm.chat(&[Message::user(prompt)], ResponseFormat::Json).await {
            Ok(r) => r.content,
            Err(e) => {
                tracing::warn!(agent = %self.base.name, step, error = %e, "oracle call failed");
                self.base
                    .history
                    .push(format!("Step {step}: Failed to consult LLM. Error: {e}"));
                return SolverState::Thinking;
            }
        };
        match parse_decision(&reply) {
            Ok(decision) => SolverState::Acting(decision),
            Err(e) => {
                tracing::warn!(agent = %self.base.name, step, error = %e, "unparsable decision");
                self.base
                    .history
                    .push(format!("Step {step}: Failed to parse LLM response. Error: {e}"));
                SolverState::Thinking
            }
        }
    }

    /// Acting：finish 直接终止；否则查注册表、注入 problem_dir、执行并记录结果
    async fn act(&mut self, decision: Decision, step: usize) -> SolverState {
        let Decision {
            tool_name,
            mut parameters,
        } = decision;
        let decided = format!(
            "Step {step}: Decided to use tool '{tool_name}' with parameters: {}",
            Value::Object(parameters.clone())
        );

        if tool_name == FINISH_TOOL {
            let reason = parameters.get("reason").and_then(Value::as_str).unwrap_or("");
            let summary = format!(
                "Problem in '{}' considered complete. Reason: {reason}",
                problem_id(&self.problem_dir)
            );
            self.base.history.push(decided);
            tracing::info!(agent = %self.base.name, step, "{summary}");
            return SolverState::Finished(summary);
        }

        let Some(capability) = self.executor.get_tool(&tool_name).cloned() else {
            tracing::warn!(agent = %self.base.name, step, tool = %tool_name, "hallucinated tool");
            let err = AgentError::HallucinatedTool(tool_name.clone());
            self.base.history.push(format!(
                "{decided}. Result: Error, tool '{tool_name}' does not exist ({err})."
            ));
            return SolverState::Thinking;
        };

        if capability.declares(PROBLEM_DIR_PARAM) {
            parameters.insert(
                PROBLEM_DIR_PARAM.to_string(),
                Value::String(self.problem_dir.to_string_lossy().into_owned()),
            );
        }

        let line = match self.executor.execute(&capability, parameters).await {
            Ok(msg) => format!("{decided}. Result from {tool_name}: {}", msg.to_json()),
            Err(e) => {
                tracing::warn!(agent = %self.base.name, step, tool = %tool_name, error = %e, "tool failed");
                format!("{decided}. Result: Error executing tool '{tool_name}': {e}")
            }
        };
        self.base.history.push(line);
        SolverState::Thinking
    }

    fn report(&self, outcome: &SolveOutcome) -> AgentMessage {
        let id = problem_id(&self.problem_dir);
        let history = self.base.history.entries();
        match outcome {
            SolveOutcome::Finished { summary, steps } => AgentMessage::success(
                self.base.name.as_str(),
                "final_summary",
                json!({ "summary": summary, "steps": steps, "history": history }),
            ),
            SolveOutcome::MaxStepsExhausted { steps } => AgentMessage::failure_with_payload(
                self.base.name.as_str(),
                "max_steps_reached",
                format!("Reached max steps ({steps}) for problem '{id}'"),
                json!({
                    "summary": format!("Reached max steps for problem '{id}'. See history for details."),
                    "history": history,
                }),
            ),
            SolveOutcome::FatalError(reason) => AgentMessage::failure_with_payload(
                self.base.name.as_str(),
                "error",
                reason.clone(),
                json!({ "history": history }),
            ),
        }
    }
}

#[async_trait]
impl Agent for ProblemSolverAgent {
    type Context = String;
    type Outcome = AgentMessage;

    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    /// 跑完整个循环；context 为总体目标
    async fn run(&mut self, goal: String) -> AgentMessage {
        tracing::info!(agent = %self.base.name, goal = %goal, "activating solver");
        let Some(llm) = self.base.llm.clone() else {
            let outcome = SolveOutcome::FatalError("LLM is not provided to the agent".to_string());
            let msg = self.report(&outcome);
            self.outcome = Some(outcome);
            return msg;
        };

        let mut step = 0;
        let mut state = SolverState::Thinking;
        let terminal = loop {
            state = match state {
                SolverState::Thinking if step >= self.max_steps => SolverState::MaxStepsExhausted,
                SolverState::Thinking => {
                    step += 1;
                    self.think(llm.as_ref(), &goal, step).await
                }
                SolverState::Acting(decision) => self.act(decision, step).await,
                terminal => break terminal,
            };
        };

        let outcome = match terminal {
            SolverState::Finished(summary) => SolveOutcome::Finished { summary, steps: step },
            SolverState::FatalError(reason) => SolveOutcome::FatalError(reason),
            _ => {
                tracing::warn!(agent = %self.base.name, steps = step, "reached max steps");
                SolveOutcome::MaxStepsExhausted { steps: step }
            }
        };
        let msg = self.report(&outcome);
        self.outcome = Some(outcome);
        msg
    }
}

/// 题目 ID：目录名（如 abc363_a）
fn problem_id(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
