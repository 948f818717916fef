//! 工具注册表
//!
//! 每个能力（Capability）= 名称 + 面向 LLM 的描述 + 实现 Tool trait 的调用体。
//! 工具显式声明参数名，循环据此决定是否注入 problem_dir，而不是运行时反射签名。
//! 注册表在编排器构建时填充，运行期间只读，可在多个 Solver 之间共享。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use crate::core::AgentMessage;
use crate::prompt::{CATALOG_HEADER, NO_TOOLS};

/// 由 Solver 循环注入、LLM 不需要提供的参数
pub const PROBLEM_DIR_PARAM: &str = "problem_dir";

/// 工具参数：字符串键到任意 JSON 值
pub type ToolArgs = Map<String, Value>;

/// 工具 trait：声明参数名 + 异步执行
///
/// Ok(AgentMessage) 是工具观察到的结果（可以是 failure 状态）；
/// Err(String) 表示工具内部异常，由循环记入历史后继续。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 声明的参数名（含 PROBLEM_DIR_PARAM 时由循环注入）
    fn parameters(&self) -> &[&'static str];

    async fn execute(&self, args: ToolArgs) -> Result<AgentMessage, String>;
}

type ToolFn = dyn Fn(ToolArgs) -> BoxFuture<'static, Result<AgentMessage, String>> + Send + Sync;

/// 闭包适配器：把异步闭包包装为 Tool
pub struct FnTool {
    params: Vec<&'static str>,
    f: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(params: &[&'static str], f: F) -> Self
    where
        F: Fn(ToolArgs) -> BoxFuture<'static, Result<AgentMessage, String>> + Send + Sync + 'static,
    {
        Self {
            params: params.to_vec(),
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn parameters(&self) -> &[&'static str] {
        &self.params
    }

    async fn execute(&self, args: ToolArgs) -> Result<AgentMessage, String> {
        (self.f)(args).await
    }
}

/// 注册表条目
#[derive(Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    tool: Arc<dyn Tool>,
}

impl Capability {
    pub fn parameters(&self) -> &[&'static str] {
        self.tool.parameters()
    }

    /// 是否声明了某参数
    pub fn declares(&self, param: &str) -> bool {
        self.parameters().contains(&param)
    }

    pub async fn invoke(&self, args: ToolArgs) -> Result<AgentMessage, String> {
        self.tool.execute(args).await
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("parameters", &self.parameters())
            .finish()
    }
}

/// 工具注册表：保持注册顺序；同名注册原位覆盖
#[derive(Default, Clone)]
pub struct ToolRegistry {
    entries: Vec<Capability>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        tool: impl Tool + 'static,
    ) {
        let capability = Capability {
            name: name.into(),
            description: description.into(),
            tool: Arc::new(tool),
        };
        tracing::debug!(tool = %capability.name, "tool registered");
        match self.index.get(&capability.name) {
            Some(&i) => self.entries[i] = capability,
            None => {
                self.index.insert(capability.name.clone(), self.entries.len());
                self.entries.push(capability);
            }
        }
    }

    /// 注册异步闭包
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[&'static str],
        f: F,
    ) where
        F: Fn(ToolArgs) -> BoxFuture<'static, Result<AgentMessage, String>> + Send + Sync + 'static,
    {
        self.register(name, description, FnTool::new(params, f));
    }

    /// 按名查找；不存在是正常情况
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 面向 LLM 的工具目录，按注册顺序；空注册表返回 NO_TOOLS
    pub fn render_catalog(&self) -> String {
        if self.entries.is_empty() {
            return NO_TOOLS.to_string();
        }
        let mut out = String::from(CATALOG_HEADER);
        for c in &self.entries {
            out.push_str(&format!("### Tool: {}\n- Description: {}\n\n", c.name, c.description));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use serde_json::json;

    fn tagged(tag: &'static str) -> FnTool {
        FnTool::new(&[], move |_| {
            async move { Ok(AgentMessage::success(tag, "tool_result", Value::Null)) }.boxed()
        })
    }

    #[tokio::test]
    async fn test_register_then_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register("generate_code", "Writes main.cpp", tagged("v1"));

        let cap = registry.get("generate_code").unwrap();
        assert_eq!(cap.description, "Writes main.cpp");
        let msg = cap.invoke(ToolArgs::new()).await.unwrap();
        assert_eq!(msg.source(), "v1");
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_reregister_overwrites_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register("a", "first a", tagged("a1"));
        registry.register("b", "b", tagged("b"));
        registry.register("a", "second a", tagged("a2"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.tool_names(), vec!["a", "b"]);
        let catalog = registry.render_catalog();
        assert_eq!(catalog.matches("### Tool: a").count(), 1);
        assert!(catalog.contains("second a"));
        assert!(!catalog.contains("first a"));
        let msg = registry.get("a").unwrap().invoke(ToolArgs::new()).await.unwrap();
        assert_eq!(msg.source(), "a2");
    }

    #[test]
    fn test_catalog_order_and_idempotence() {
        let mut registry = ToolRegistry::new();
        registry.register("zeta", "z", tagged("z"));
        registry.register("alpha", "a", tagged("a"));

        let first = registry.render_catalog();
        assert_eq!(first, registry.render_catalog());
        assert!(first.find("zeta").unwrap() < first.find("alpha").unwrap());
    }

    #[test]
    fn test_empty_catalog_sentinel() {
        assert_eq!(ToolRegistry::new().render_catalog(), NO_TOOLS);
    }

    #[tokio::test]
    async fn test_declared_parameters() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("echo_dir", "echo", &[PROBLEM_DIR_PARAM, "num_cases"], |args| {
            async move {
                Ok(AgentMessage::success(
                    "echo_dir",
                    "tool_result",
                    json!({ "dir": args.get(PROBLEM_DIR_PARAM).cloned() }),
                ))
            }
            .boxed()
        });
        let cap = registry.get("echo_dir").unwrap();
        assert!(cap.declares(PROBLEM_DIR_PARAM));
        assert!(!cap.declares("plan"));
    }
}
