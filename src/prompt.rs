//! Prompt 模板与哨兵文本

use std::path::Path;

/// 默认总体目标
pub const OVERALL_GOAL: &str = "Produce a correct and efficient solution for the problem, \
validated against the official samples and any additional edge-case tests.";

/// 决策历史为空时的提示
pub const FIRST_STEP: &str =
    "This is the first step. Analyze the problem and decide what to do next.";

/// problem.md 缺失或不可读时的占位
pub const MISSING_STATEMENT: &str = "Error: problem.md not found.";

/// 空注册表渲染结果
pub const NO_TOOLS: &str = "No tools available.";

/// 工具目录头部；finish 是循环内置的终止工具，不在注册表中
pub const CATALOG_HEADER: &str = "## Available Tools
Call exactly one tool per step. The `problem_dir` parameter is filled in for you; never supply it.
When the problem is solved or nothing useful remains to do, call `finish` with parameters {\"reason\": \"...\"}.

";

/// 拼接 Solver 单步 prompt
pub fn solve_prompt(
    goal: &str,
    problem_dir: &Path,
    statement: &str,
    history: &str,
    catalog: &str,
    decision_schema: &str,
) -> String {
    format!(
        r#"You are an expert competitive programming problem-solving agent. Your goal is: "{goal}" for the problem located in the directory '{dir}'.

### Problem Statement
{statement}

### History of your actions for THIS problem:
---
{history}
---

{catalog}
Based on the problem statement and history, what is the next single tool to use to solve this problem?
Your response MUST be a single JSON object with "tool_name" and "parameters", matching this schema:
{decision_schema}
If you believe the problem is solved or no further action is needed, use the "finish" tool."#,
        dir = problem_dir.display(),
    )
}

pub const ANALYZE_SYSTEM: &str = "You are a meticulous assistant for a competitive programming AI. \
Your task is to carefully read the following problem description and extract key information into a structured JSON format.";

pub fn analyze_prompt(description: &str) -> String {
    format!(
        r#"### Problem Description
{description}

### Instructions
Extract the following information and provide it in a single JSON object with the specified keys:
1.  "problem_type": A brief classification of the problem (e.g., "Graph Theory", "Dynamic Programming", "Math").
2.  "input_format": A concise description of how the input is given from Standard Input.
3.  "output_format": A concise description of what the program should print to Standard Output.
4.  "constraints": A summary of all constraints on the input variables.

Your response MUST be only the JSON object."#
    )
}

pub const PLAN_SYSTEM: &str = "You are a world-class competitive programmer and algorithm expert. \
Your task is to devise a high-level plan to solve the given problem.";

pub fn plan_prompt(analysis: &str, description: &str) -> String {
    format!(
        r#"### Structured Analysis of the Problem
{analysis}

### Full Problem Description
{description}

### Instructions
Create a step-by-step plan to solve the problem. Your plan should include:
1.  "algorithm": The main algorithm or data structure to be used.
2.  "data_structures": Any necessary data structures.
3.  "step_by_step_plan": A concise natural language plan from reading input to printing the output.
4.  "edge_cases_to_consider": A list of potential edge cases to be careful about.

Respond with a single JSON object containing these keys. Your response MUST be only the JSON object."#
    )
}

pub const CASE_DECISION_SYSTEM: &str = "You are a strategic assistant. Your task is to decide if generating \
additional test cases is a valuable and feasible action for the given problem, based on its plan. \
If the implementation is too complicated or impossible, you should decide not to generate.";

pub fn case_decision_prompt(plan: &str) -> String {
    format!(
        r#"### Problem Solving Plan
{plan}

### Key Considerations
- High Value: problems with tricky edge cases (graph connectivity, number theory properties, max/min constraints).
- Low Value/Infeasible: interactive problems, output-only problems, or problems whose output is not uniquely determined by the input.

Respond with a single JSON object: {{"should_generate": boolean, "reason": "your brief reasoning"}}.
Your response MUST be only the JSON object."#
    )
}

pub const CASE_GENERATION_SYSTEM: &str = "You are an expert test case creator in competitive programming.";

pub fn case_generation_prompt(description: &str, edge_cases: &str, num_cases: usize) -> String {
    format!(
        r#"### Full Problem Description
{description}

### Edge Cases to Focus On
{edge_cases}

### Instructions
- Create {num_cases} distinct test cases that specifically target the edge cases mentioned above.
- Provide the output in a valid JSON format: {{"test_cases": [{{"input": "...", "output": "..."}}]}}.
- Do not repeat the official sample cases.
- Your response MUST be only the JSON object."#
    )
}

pub fn code_system(language: &str) -> String {
    format!(
        "You are a world-class competitive programmer, an expert in writing clean, efficient, and correct {language} code."
    )
}

pub fn code_prompt(description: &str, plan: &str, language: &str) -> String {
    format!(
        r#"Write a complete and correct {language} solution for the following problem.

### Full Problem Description
{description}

### Your Detailed Plan
{plan}

### Instructions
1.  Write a complete program that solves the problem.
2.  Read all input from standard input and write all output to standard output.
3.  Your response MUST contain ONLY the code, enclosed in a ```{language} ... ``` markdown block."#
    )
}
