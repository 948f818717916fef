//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CPBEE__*` 覆盖（双下划线表示嵌套，如 `CPBEE__SOLVER__MAX_STEPS=8`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::prompt::OVERALL_GOAL;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub solver: SolverSection,
    pub tools: ToolsSection,
    pub fetch: FetchSection,
}

/// [app] 段：比赛目录的根
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 比赛目录建在此目录下（{output_root}/{contest}/{problem}）
    pub output_root: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [solver] 段：思考-行动循环
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    /// 每题最大步数（含解析失败、幻觉工具等无效步）
    pub max_steps: usize,
    pub goal: String,
    /// 解答语言，决定 main.{ext} 与代码块标记
    pub language: String,
    /// generate_test_cases 未指定 num_cases 时的默认数量
    pub num_test_cases: usize,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            max_steps: 5,
            goal: OVERALL_GOAL.to_string(),
            language: "cpp".to_string(),
            num_test_cases: 3,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒），工具内部可能有多次 LLM 调用
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 120,
        }
    }
}

/// [fetch] 段：题目页面抓取
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// 随仓库发布的默认配置：从工作目录或其上一级（在 target/ 下运行时）查找
fn bundled_defaults() -> Option<PathBuf> {
    ["config/default.toml", "../config/default.toml", "default.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

impl AppConfig {
    /// 求解循环与执行器无法在这些取值下工作
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.solver.max_steps == 0 {
            return Err(config::ConfigError::Message("solver.max_steps must be at least 1".into()));
        }
        if self.solver.language.trim().is_empty() {
            return Err(config::ConfigError::Message("solver.language must not be empty".into()));
        }
        if self.tools.tool_timeout_secs == 0 {
            return Err(config::ConfigError::Message("tools.tool_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// 加载配置：内置默认文件 < `--config` 指定文件 < 环境变量 `CPBEE__*`
///
/// 显式指定的文件必须存在；默认文件找不到时退回各段的 Default。
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(defaults) = bundled_defaults() {
        tracing::debug!(path = %defaults.display(), "using bundled defaults");
        builder = builder.add_source(config::File::from(defaults));
    }
    if let Some(path) = config_path {
        if !path.is_file() {
            return Err(config::ConfigError::NotFound(path.display().to_string()));
        }
        builder = builder.add_source(config::File::from(path));
    }
    let cfg: AppConfig = builder
        .add_source(
            config::Environment::with_prefix("CPBEE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.solver.max_steps, 5);
        assert_eq!(cfg.solver.language, "cpp");
        assert_eq!(cfg.fetch.timeout_secs, 15);
        assert_eq!(cfg.llm.provider, "deepseek");
        assert_eq!(cfg.app.output_root, PathBuf::from("."));
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[solver]\nmax_steps = 8\nlanguage = \"py\"\n\n[app]\noutput_root = \"contests\"\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.solver.max_steps, 8);
        assert_eq!(cfg.solver.language, "py");
        assert_eq!(cfg.solver.num_test_cases, 3);
        assert_eq!(cfg.app.output_root, PathBuf::from("contests"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = load_config(Some(dir.path().join("nope.toml")));
        assert!(matches!(res, Err(config::ConfigError::NotFound(_))));
    }

    #[test]
    fn test_zero_step_budget_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        std::fs::write(&path, "[solver]\nmax_steps = 0\n").unwrap();
        let err = load_config(Some(path)).unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }
}
