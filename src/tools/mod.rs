//! 工具箱：能力注册表、执行器、决策 Schema，以及求解用的四个能力

pub mod case_gen;
pub mod code_gen;
pub mod executor;
pub mod registry;
pub mod schema;
pub mod support;
pub mod think;

use std::sync::Arc;

pub use case_gen::{GenerateTestCasesTool, GENERATE_TEST_CASES};
pub use code_gen::{GenerateCodeTool, GENERATE_CODE};
pub use executor::ToolExecutor;
pub use registry::{Capability, FnTool, Tool, ToolArgs, ToolRegistry, PROBLEM_DIR_PARAM};
pub use schema::decision_schema_json;
pub use think::{AnalyzeProblemTool, PlanStrategyTool, ANALYZE_PROBLEM, PLAN_SOLUTION_STRATEGY};

use crate::llm::LlmClient;

/// 求解能力全集，按推荐调用顺序注册
pub fn solver_registry(llm: Arc<dyn LlmClient>, language: &str, num_test_cases: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ANALYZE_PROBLEM,
        AnalyzeProblemTool::description(),
        AnalyzeProblemTool::new(llm.clone()),
    );
    registry.register(
        PLAN_SOLUTION_STRATEGY,
        PlanStrategyTool::description(),
        PlanStrategyTool::new(llm.clone()),
    );
    registry.register(
        GENERATE_TEST_CASES,
        GenerateTestCasesTool::description(),
        GenerateTestCasesTool::new(llm.clone(), num_test_cases),
    );
    registry.register(
        GENERATE_CODE,
        GenerateCodeTool::description(language),
        GenerateCodeTool::new(llm, language),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[test]
    fn test_solver_registry_catalog() {
        let registry = solver_registry(Arc::new(MockLlmClient), "cpp", 3);
        assert_eq!(
            registry.tool_names(),
            vec![ANALYZE_PROBLEM, PLAN_SOLUTION_STRATEGY, GENERATE_TEST_CASES, GENERATE_CODE]
        );
        for name in registry.tool_names() {
            assert!(registry.get(&name).unwrap().declares(PROBLEM_DIR_PARAM));
        }
        assert!(registry.render_catalog().contains("main.cpp"));
    }
}
