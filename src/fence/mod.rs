//! Fenced code block scanning and rewriting.
//!
//! This is the pure core of fencefmt: it takes a document and a formatter
//! and returns the rewritten document. Reading, writing and notifying are
//! left to the caller (see [`crate::action`]).
//!
//! # Example
//!
//! ```
//! use fencefmt::fence::{RECOGNIZED_TAGS, rewrite};
//!
//! let result = rewrite("```sh\nls  -la\n```", RECOGNIZED_TAGS, |body| Ok(body.to_string()));
//! assert!(result.changed);
//! assert_eq!(result.text, "```sh\nls  -la\n```");
//! ```

pub mod rewriter;
pub mod scanner;

pub use rewriter::{BlockFailure, RewriteResult, rewrite, rewrite_with};
pub use scanner::{FENCE_MARKER, FenceMatch, FenceScanner, find_fences};

/// Language tags whose fences are formatted. Both are treated as shell.
pub const RECOGNIZED_TAGS: &[&str] = &["bash", "sh"];
