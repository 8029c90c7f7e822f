//! Built-in external formatter definitions.
//!
//! Users can add their own tools (or override these) under `[tools.<id>]`
//! in `.fencefmt.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// How to invoke an external formatter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ToolDefinition {
    /// Command to run (first element is the binary, rest are arguments)
    pub command: Vec<String>,

    /// Whether the tool reads from stdin (default: true)
    #[serde(default = "default_true")]
    pub stdin: bool,

    /// Whether the tool writes to stdout (default: true)
    #[serde(default = "default_true")]
    pub stdout: bool,

    /// Extra arguments appended to the command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ToolDefinition {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            stdin: true,
            stdout: true,
            args: Vec::new(),
        }
    }
}

/// Lookup of tool definitions by id, user tools first.
pub struct ToolRegistry {
    user_tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new(user_tools: BTreeMap<String, ToolDefinition>) -> Self {
        Self { user_tools }
    }

    /// Get a tool definition by ID.
    ///
    /// Checks user tools first, then falls back to built-in tools.
    pub fn get(&self, tool_id: &str) -> Option<&ToolDefinition> {
        self.user_tools.get(tool_id).or_else(|| BUILTIN_TOOLS.get(tool_id))
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.get(tool_id).is_some()
    }

    /// All known tool IDs, sorted.
    pub fn list_tools(&self) -> Vec<&str> {
        let mut tools: Vec<&str> = self.user_tools.keys().map(|s| s.as_str()).collect();
        for key in BUILTIN_TOOLS.keys() {
            if !self.user_tools.contains_key(*key) {
                tools.push(key);
            }
        }
        tools.sort_unstable();
        tools
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

fn shfmt(dialect: Option<&str>) -> ToolDefinition {
    let mut command = vec!["shfmt".to_string(), "-i".to_string(), "{indent}".to_string()];
    if let Some(dialect) = dialect {
        command.push("-ln".to_string());
        command.push(dialect.to_string());
    }
    ToolDefinition {
        command,
        ..Default::default()
    }
}

static BUILTIN_TOOLS: LazyLock<BTreeMap<&'static str, ToolDefinition>> = LazyLock::new(|| {
    let mut m = BTreeMap::new();
    m.insert("shfmt", shfmt(None));
    m.insert("shfmt:bash", shfmt(Some("bash")));
    m.insert("shfmt:posix", shfmt(Some("posix")));
    m
});
