//! Formatters applied to the body of each recognized fence.
//!
//! Two implementations ship with fencefmt:
//! - [`BuiltinFormatter`]: an in-process shell re-indenter (default)
//! - [`CommandFormatter`]: runs an external tool such as `shfmt` over stdin/stdout
//!
//! Both receive the same [`FormatOptions`]. The indentation width is fixed at
//! [`DEFAULT_INDENT_SIZE`].

pub mod builtin;
pub mod command;
pub mod executor;
pub mod registry;

pub use builtin::BuiltinFormatter;
pub use command::CommandFormatter;
pub use executor::{ExecutorError, ToolExecutor, ToolOutput};
pub use registry::{ToolDefinition, ToolRegistry};

/// Indentation width handed to every formatter.
pub const DEFAULT_INDENT_SIZE: usize = 2;

/// Options passed to a formatter for every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Spaces per indentation level.
    pub indent_size: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_size: DEFAULT_INDENT_SIZE,
        }
    }
}

/// Why a formatter could not process a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// A closing keyword with no matching opener.
    #[error("unexpected '{token}' at line {line}")]
    UnexpectedCloser { token: String, line: usize },

    /// A block that is still open at the end of the input.
    #[error("'{opener}' at line {line} is never closed")]
    Unclosed { opener: String, line: usize },

    /// A quoted string or substitution still open at the end of the input.
    #[error("unterminated {kind} starting at line {line}")]
    UnterminatedQuote { kind: &'static str, line: usize },

    /// A here-document whose delimiter never appears.
    #[error("here-document '{delimiter}' at line {line} is never terminated")]
    UnterminatedHeredoc { delimiter: String, line: usize },

    /// The formatter rejected the input for another reason.
    #[error("{message}")]
    Rejected { message: String },

    /// The external tool could not be run or exited with an error.
    #[error(transparent)]
    Tool(#[from] ExecutorError),
}

/// A fallible text-to-text transform over one fence body.
pub trait Formatter {
    /// Short identifier used in logs and notices.
    fn name(&self) -> &str;

    /// Format `body`, or explain why it cannot be formatted.
    fn format(&self, body: &str, options: &FormatOptions) -> Result<String, FormatError>;
}
