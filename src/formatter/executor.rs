//! Runs external formatters over stdin/stdout.
//!
//! The body is written to the child's stdin and stdout and stderr are drained,
//! each on its own thread, so the timeout covers the whole run. The child is
//! killed and reaped if it outlives the timeout. Tool availability is checked lazily and cached.

use super::registry::ToolDefinition;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Placeholder in tool arguments replaced by the indentation width.
pub const INDENT_PLACEHOLDER: &str = "{indent}";

/// Captured result of one tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Error while running a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Tool binary not found in PATH.
    ToolNotFound { tool: String },
    /// Tool ran but reported failure.
    ExecutionFailed { tool: String, message: String },
    /// Tool did not finish in time.
    Timeout { tool: String, timeout_ms: u64 },
    /// Spawning or talking to the process failed.
    IoError { message: String },
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolNotFound { tool } => {
                write!(f, "Tool '{tool}' not found in PATH")
            }
            Self::ExecutionFailed { tool, message } => {
                write!(f, "Tool '{tool}' failed: {message}")
            }
            Self::Timeout { tool, timeout_ms } => {
                write!(f, "Tool '{tool}' timed out after {timeout_ms}ms")
            }
            Self::IoError { message } => {
                write!(f, "I/O error: {message}")
            }
        }
    }
}

impl std::error::Error for ExecutorError {}

pub struct ToolExecutor {
    /// tool name -> available
    tool_cache: Mutex<HashMap<String, bool>>,
    timeout_ms: u64,
}

impl ToolExecutor {
    /// Create an executor; a timeout of zero waits forever.
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            tool_cache: Mutex::new(HashMap::new()),
            timeout_ms,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Check if a tool is available (lazy, cached).
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        if let Ok(cache) = self.tool_cache.lock()
            && let Some(&available) = cache.get(tool_name)
        {
            return available;
        }

        let available = check_tool_exists(tool_name);

        if let Ok(mut cache) = self.tool_cache.lock() {
            cache.insert(tool_name.to_string(), available);
        }

        available
    }

    /// Run `tool_def` with `input` on stdin.
    pub fn execute(&self, tool_def: &ToolDefinition, input: &str, indent_size: usize) -> Result<ToolOutput, ExecutorError> {
        let Some(tool_name) = tool_def.command.first() else {
            return Err(ExecutorError::ExecutionFailed {
                tool: "unknown".to_string(),
                message: "Empty command".to_string(),
            });
        };

        if !self.is_tool_available(tool_name) {
            return Err(ExecutorError::ToolNotFound {
                tool: tool_name.clone(),
            });
        }

        let indent = indent_size.to_string();
        let args = tool_def.command[1..]
            .iter()
            .chain(&tool_def.args)
            .map(|arg| arg.replace(INDENT_PLACEHOLDER, &indent));

        let mut cmd = Command::new(tool_name);
        cmd.args(args);
        cmd.stdin(if tool_def.stdin { Stdio::piped() } else { Stdio::null() });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        log::debug!("Running formatter: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| ExecutorError::IoError {
            message: format!("Failed to spawn '{tool_name}': {e}"),
        })?;

        let stdin_handle = if tool_def.stdin {
            child.stdin.take().map(|mut stdin| {
                let input = input.to_string();
                // stdin is dropped when the thread ends so the tool sees EOF
                thread::spawn(move || stdin.write_all(input.as_bytes()))
            })
        } else {
            None
        };
        let mut running = RunningTool {
            stdin: stdin_handle,
            stdout: child
                .stdout
                .take()
                .map(|stdout| thread::spawn(move || read_pipe_to_string(stdout))),
            stderr: child
                .stderr
                .take()
                .map(|stderr| thread::spawn(move || read_pipe_to_string(stderr))),
            child,
        };

        let status = match self.wait(&mut running.child, tool_name) {
            Ok(Some(status)) => status,
            Ok(None) => {
                running.abort();
                return Err(ExecutorError::Timeout {
                    tool: tool_name.clone(),
                    timeout_ms: self.timeout_ms,
                });
            }
            Err(e) => {
                running.abort();
                return Err(e);
            }
        };

        let written = join_writer(running.stdin.take());
        let stdout = join_reader(running.stdout.take()).map_err(|e| ExecutorError::IoError { message: e })?;
        let stderr = join_reader(running.stderr.take()).map_err(|e| ExecutorError::IoError { message: e })?;
        // A tool may exit without reading all of its input
        if let Err(e) = written
            && e.kind() != io::ErrorKind::BrokenPipe
        {
            return Err(ExecutorError::IoError {
                message: format!("Failed to write to stdin: {e}"),
            });
        }

        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
            success: status.success(),
        })
    }

    /// Wait for `child` to exit. `Ok(None)` means the timeout elapsed first.
    fn wait(&self, child: &mut Child, tool_name: &str) -> Result<Option<ExitStatus>, ExecutorError> {
        let timeout = Duration::from_millis(self.timeout_ms);
        if timeout.is_zero() {
            return child.wait().map(Some).map_err(|e| ExecutorError::IoError {
                message: format!("Failed to wait for '{tool_name}': {e}"),
            });
        }

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(|e| ExecutorError::IoError {
                message: format!("Failed to poll '{tool_name}': {e}"),
            })? {
                return Ok(Some(status));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Run a formatter and return its stdout.
    pub fn format(&self, tool_def: &ToolDefinition, input: &str, indent_size: usize) -> Result<String, ExecutorError> {
        let output = self.execute(tool_def, input, indent_size)?;
        let tool = tool_def.command.first().cloned().unwrap_or_default();

        if !output.success {
            let exit_code = output.exit_code;
            let stderr = output.stderr.trim();
            return Err(ExecutorError::ExecutionFailed {
                tool,
                message: format!("Exit code {exit_code}: {stderr}"),
            });
        }
        if !tool_def.stdout {
            return Err(ExecutorError::ExecutionFailed {
                tool,
                message: "Formatter doesn't output to stdout".to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(30_000)
    }
}

fn check_tool_exists(tool_name: &str) -> bool {
    #[cfg(unix)]
    let finder = "which";
    #[cfg(windows)]
    let finder = "where";

    Command::new(finder)
        .arg(tool_name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// A spawned tool and the threads feeding and draining its pipes.
struct RunningTool {
    child: Child,
    stdin: Option<thread::JoinHandle<io::Result<()>>>,
    stdout: Option<thread::JoinHandle<io::Result<String>>>,
    stderr: Option<thread::JoinHandle<io::Result<String>>>,
}

impl RunningTool {
    /// Kill the tool and reap it along with its pipe threads.
    fn abort(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = join_writer(self.stdin.take());
        let _ = join_reader(self.stdout.take());
        let _ = join_reader(self.stderr.take());
    }
}

fn join_writer(handle: Option<thread::JoinHandle<io::Result<()>>>) -> io::Result<()> {
    match handle {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer thread panicked"))),
        None => Ok(()),
    }
}

fn read_pipe_to_string<R: Read>(mut pipe: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).to_string())
}

fn join_reader(handle: Option<thread::JoinHandle<std::io::Result<String>>>) -> Result<String, String> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(res) => res.map_err(|e| format!("Failed to read output: {e}")),
            Err(_) => Err("Output reader thread panicked".to_string()),
        },
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(command: &[&str]) -> ToolDefinition {
        ToolDefinition {
            command: command.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_executor_creation() {
        let executor = ToolExecutor::new(10_000);
        assert_eq!(executor.timeout_ms(), 10_000);
        assert_eq!(ToolExecutor::default().timeout_ms(), 30_000);
    }

    #[test]
    fn test_tool_not_found() {
        let executor = ToolExecutor::default();
        let result = executor.execute(&tool(&["nonexistent-tool-xyz123"]), "test", 2);
        assert!(matches!(result, Err(ExecutorError::ToolNotFound { .. })));
    }

    #[test]
    fn test_empty_command() {
        let executor = ToolExecutor::default();
        let result = executor.execute(&tool(&[]), "test", 2);
        assert!(matches!(result, Err(ExecutorError::ExecutionFailed { .. })));
    }

    #[test]
    fn test_error_messages() {
        let err = ExecutorError::Timeout {
            tool: "shfmt".to_string(),
            timeout_ms: 5,
        };
        assert_eq!(err.to_string(), "Tool 'shfmt' timed out after 5ms");

        let err = ExecutorError::ToolNotFound {
            tool: "shfmt".to_string(),
        };
        assert_eq!(err.to_string(), "Tool 'shfmt' not found in PATH");
    }

    #[test]
    #[cfg(unix)]
    #[ignore = "requires 'cat' to be available"]
    fn test_format_with_cat() {
        let executor = ToolExecutor::default();
        let output = executor.format(&tool(&["cat"]), "echo  hi\n", 2).expect("cat should succeed");
        assert_eq!(output, "echo  hi\n");
    }

    #[test]
    #[cfg(unix)]
    #[ignore = "requires 'echo' to be available"]
    fn test_indent_placeholder_substituted() {
        let executor = ToolExecutor::default();
        let mut def = tool(&["echo", "-n", "width={indent}"]);
        def.stdin = false;
        let output = executor.format(&def, "", 4).expect("echo should succeed");
        assert_eq!(output, "width=4");
    }

    #[test]
    #[cfg(unix)]
    #[ignore = "requires 'sleep' to be available"]
    fn test_timeout() {
        let executor = ToolExecutor::new(5);
        let mut def = tool(&["sleep", "1"]);
        def.stdin = false;
        let result = executor.execute(&def, "", 2);
        assert!(matches!(result, Err(ExecutorError::Timeout { .. })));
    }

    #[test]
    #[cfg(unix)]
    #[ignore = "requires 'sleep' to be available"]
    fn test_timeout_when_tool_never_reads_stdin() {
        let executor = ToolExecutor::new(100);
        let body = "x".repeat(1024 * 1024);
        let start = Instant::now();
        let result = executor.execute(&tool(&["sleep", "3"]), &body, 2);

        assert!(matches!(result, Err(ExecutorError::Timeout { .. })), "got {result:?}");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    #[cfg(unix)]
    #[ignore = "requires 'true' to be available"]
    fn test_tool_exiting_without_reading_input() {
        let executor = ToolExecutor::default();
        let body = "x".repeat(1024 * 1024);
        let output = executor.execute(&tool(&["true"]), &body, 2).expect("true should succeed");
        assert!(output.success);
    }
}
