use super::executor::ToolExecutor;
use super::registry::ToolDefinition;
use super::{FormatError, FormatOptions, Formatter};

/// Formats blocks by piping them through an external tool.
pub struct CommandFormatter {
    id: String,
    tool: ToolDefinition,
    executor: ToolExecutor,
}

impl CommandFormatter {
    pub fn new(id: impl Into<String>, tool: ToolDefinition, timeout_ms: u64) -> Self {
        Self {
            id: id.into(),
            tool,
            executor: ToolExecutor::new(timeout_ms),
        }
    }
}

impl Formatter for CommandFormatter {
    fn name(&self) -> &str {
        &self.id
    }

    fn format(&self, body: &str, options: &FormatOptions) -> Result<String, FormatError> {
        Ok(self.executor.format(&self.tool, body, options.indent_size)?)
    }
}
