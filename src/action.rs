//! The `format-code-blocks` action.
//!
//! Reads the active document, rewrites its shell fences, writes it back when
//! something was formatted, and reports every outcome as a notice.

use crate::document::{DocumentError, DocumentStore};
use crate::fence::{RECOGNIZED_TAGS, RewriteResult, rewrite_with};
use crate::formatter::{FormatOptions, Formatter};
use crate::notify::{Notice, Notifier};
use std::path::Path;

pub const ACTION_ID: &str = "format-code-blocks";

pub const MSG_NO_ACTIVE_DOCUMENT: &str = "No active file open.";
pub const MSG_FORMATTED: &str = "Code blocks formatted successfully!";
pub const MSG_WOULD_FORMAT: &str = "Code blocks would be reformatted.";
pub const MSG_NOTHING_FORMATTED: &str = "No code blocks were formatted.";
pub const MSG_ALREADY_FORMATTED: &str = "Code blocks are already formatted.";

/// What one invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Invoked without a document; nothing was scanned.
    NoActiveDocument,
    /// No recognized fences in the document.
    NoMatches,
    /// Fences were found but every one of them failed to format.
    Unchanged { failures: usize },
    /// At least one fence was formatted.
    Formatted {
        blocks: usize,
        failures: usize,
        /// Whether the text differs from what was read.
        modified: bool,
        /// Whether the document was written back.
        written: bool,
    },
}

impl Outcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Formatted { .. })
    }

    pub fn failures(&self) -> usize {
        match self {
            Self::Unchanged { failures } | Self::Formatted { failures, .. } => *failures,
            Self::NoActiveDocument | Self::NoMatches => 0,
        }
    }
}

/// The action, bound to a formatter.
pub struct FormatCodeBlocks<'a> {
    formatter: &'a dyn Formatter,
    options: FormatOptions,
    check_only: bool,
}

impl<'a> FormatCodeBlocks<'a> {
    pub fn new(formatter: &'a dyn Formatter) -> Self {
        Self {
            formatter,
            options: FormatOptions::default(),
            check_only: false,
        }
    }

    /// Report what would change without writing anything.
    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    /// Rewrite `text` without any I/O.
    pub fn format_text(&self, text: &str) -> RewriteResult {
        rewrite_with(text, RECOGNIZED_TAGS, self.formatter, &self.options)
    }

    /// Run the action against `active` in `store`.
    ///
    /// Read and write failures are notified and returned as errors. Per-block
    /// formatting failures are notified and do not stop the run.
    pub fn run(
        &self,
        store: &mut dyn DocumentStore,
        active: Option<&Path>,
        notifier: &mut dyn Notifier,
    ) -> Result<Outcome, DocumentError> {
        let Some(path) = active else {
            notifier.notify(Notice::error(None, MSG_NO_ACTIVE_DOCUMENT));
            return Ok(Outcome::NoActiveDocument);
        };
        let doc = Some(path.to_path_buf());

        let content = store.read(path).inspect_err(|e| {
            notifier.notify(Notice::error(doc.clone(), e.to_string()));
        })?;

        log::debug!(
            "{ACTION_ID}: formatting code blocks in {} with '{}'",
            path.display(),
            self.formatter.name()
        );
        let result = self.format_text(&content);

        for failure in &result.failures {
            notifier.notify(Notice::error(
                doc.clone(),
                format!("Formatting failed for {}: {}", failure.tag, failure.message),
            ));
        }

        if !result.changed {
            notifier.notify(Notice::info(doc, MSG_NOTHING_FORMATTED));
            return Ok(if result.matched == 0 {
                Outcome::NoMatches
            } else {
                Outcome::Unchanged {
                    failures: result.failures.len(),
                }
            });
        }

        let modified = result.text != content;
        let written = if self.check_only {
            let message = if modified { MSG_WOULD_FORMAT } else { MSG_ALREADY_FORMATTED };
            notifier.notify(Notice::info(doc, message));
            false
        } else {
            store.write(path, &result.text).inspect_err(|e| {
                notifier.notify(Notice::error(doc.clone(), e.to_string()));
            })?;
            notifier.notify(Notice::success(doc, MSG_FORMATTED));
            true
        };

        Ok(Outcome::Formatted {
            blocks: result.formatted,
            failures: result.failures.len(),
            modified,
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryStore;
    use crate::formatter::{BuiltinFormatter, FormatError};
    use crate::notify::{NoticeLevel, RecordingNotifier};
    use std::path::PathBuf;

    /// Upper-cases bodies, fails on any body containing "bad".
    struct Shouty;

    impl Formatter for Shouty {
        fn name(&self) -> &str {
            "shouty"
        }

        fn format(&self, body: &str, _options: &FormatOptions) -> Result<String, FormatError> {
            if body.contains("bad") {
                Err(FormatError::Rejected {
                    message: "cannot shout".to_string(),
                })
            } else {
                Ok(body.to_uppercase())
            }
        }
    }

    fn store_with(text: &str) -> (MemoryStore, PathBuf) {
        let mut store = MemoryStore::new();
        let path = PathBuf::from("notes.md");
        store.insert(path.clone(), text);
        (store, path)
    }

    #[test]
    fn test_no_active_document() {
        let mut store = MemoryStore::new();
        let mut notifier = RecordingNotifier::new();
        let outcome = FormatCodeBlocks::new(&Shouty)
            .run(&mut store, None, &mut notifier)
            .unwrap();

        assert_eq!(outcome, Outcome::NoActiveDocument);
        assert_eq!(notifier.messages(), vec![MSG_NO_ACTIVE_DOCUMENT]);
        assert_eq!(notifier.notices[0].level, NoticeLevel::Error);
    }

    #[test]
    fn test_formats_and_writes() {
        let (mut store, path) = store_with("# T\n```sh\nls\n```\n");
        let mut notifier = RecordingNotifier::new();
        let outcome = FormatCodeBlocks::new(&Shouty)
            .run(&mut store, Some(&path), &mut notifier)
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Formatted {
                blocks: 1,
                failures: 0,
                modified: true,
                written: true
            }
        );
        assert_eq!(store.get(&path), Some("# T\n```sh\nLS\n```\n"));
        assert_eq!(notifier.messages(), vec![MSG_FORMATTED]);
    }

    #[test]
    fn test_no_matches_not_written() {
        let (mut store, path) = store_with("```python\nx\n```\n");
        let mut notifier = RecordingNotifier::new();
        let outcome = FormatCodeBlocks::new(&Shouty)
            .run(&mut store, Some(&path), &mut notifier)
            .unwrap();

        assert_eq!(outcome, Outcome::NoMatches);
        assert_eq!(store.writes(), 0);
        assert_eq!(notifier.messages(), vec![MSG_NOTHING_FORMATTED]);
        assert_eq!(notifier.notices[0].level, NoticeLevel::Info);
    }

    #[test]
    fn test_failure_notified_and_others_formatted() {
        let (mut store, path) = store_with("```bash\nbad\n```\n```sh\ngood\n```\n");
        let mut notifier = RecordingNotifier::new();
        let outcome = FormatCodeBlocks::new(&Shouty)
            .run(&mut store, Some(&path), &mut notifier)
            .unwrap();

        assert_eq!(outcome.failures(), 1);
        assert!(outcome.changed());
        assert_eq!(store.get(&path), Some("```bash\nbad\n```\n```sh\nGOOD\n```\n"));
        assert_eq!(
            notifier.messages(),
            vec!["Formatting failed for bash: cannot shout", MSG_FORMATTED]
        );
    }

    #[test]
    fn test_all_failures_is_unchanged() {
        let (mut store, path) = store_with("```bash\nbad\n```\n");
        let mut notifier = RecordingNotifier::new();
        let outcome = FormatCodeBlocks::new(&Shouty)
            .run(&mut store, Some(&path), &mut notifier)
            .unwrap();

        assert_eq!(outcome, Outcome::Unchanged { failures: 1 });
        assert_eq!(store.writes(), 0);
        assert_eq!(notifier.messages().last(), Some(&MSG_NOTHING_FORMATTED));
    }

    #[test]
    fn test_check_only_does_not_write() {
        let (mut store, path) = store_with("```sh\nif a; then\nb\nfi\n```\n");
        let mut notifier = RecordingNotifier::new();
        let outcome = FormatCodeBlocks::new(&BuiltinFormatter)
            .check_only(true)
            .run(&mut store, Some(&path), &mut notifier)
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Formatted {
                modified: true,
                written: false,
                ..
            }
        ));
        assert_eq!(store.writes(), 0);
        assert_eq!(notifier.messages(), vec![MSG_WOULD_FORMAT]);
    }

    #[test]
    fn test_check_only_already_formatted_still_notifies() {
        let (mut store, path) = store_with("```sh
ls
```
");
        let mut notifier = RecordingNotifier::new();
        let outcome = FormatCodeBlocks::new(&BuiltinFormatter)
            .check_only(true)
            .run(&mut store, Some(&path), &mut notifier)
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Formatted {
                blocks: 1,
                failures: 0,
                modified: false,
                written: false
            }
        );
        assert_eq!(store.writes(), 0);
        assert_eq!(notifier.messages(), vec![MSG_ALREADY_FORMATTED]);
        assert_eq!(notifier.notices[0].level, NoticeLevel::Info);
    }

    #[test]
    fn test_read_failure_is_error() {
        let mut store = MemoryStore::new();
        let mut notifier = RecordingNotifier::new();
        let result = FormatCodeBlocks::new(&Shouty).run(&mut store, Some(Path::new("gone.md")), &mut notifier);

        assert!(matches!(result, Err(DocumentError::NotFound { .. })));
        assert_eq!(notifier.notices[0].level, NoticeLevel::Error);
    }
}
