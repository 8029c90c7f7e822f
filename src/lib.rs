//! Format fenced shell code blocks in Markdown documents.
//!
//! The core is [`fence::rewrite`], a pure pass over a document that hands the
//! body of every ```` ```sh ```` / ```` ```bash ```` fence to a formatter and
//! reassembles the text. [`action::FormatCodeBlocks`] wraps it with document
//! I/O and user notices; the `fencefmt` binary drives that action from the
//! command line.

pub mod action;
pub mod config;
pub mod discovery;
pub mod document;
pub mod exit_codes;
pub mod fence;
pub mod formatter;
pub mod notify;

pub use action::{FormatCodeBlocks, Outcome};
pub use fence::{RECOGNIZED_TAGS, RewriteResult, rewrite};
pub use formatter::{FormatError, FormatOptions, Formatter};
