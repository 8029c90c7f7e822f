//! Rewrites the recognized fences of a document with formatted bodies.

use super::scanner::{FENCE_MARKER, FenceScanner};
use crate::formatter::{FormatError, FormatOptions, Formatter};

/// A block whose formatter call failed; the block was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFailure {
    /// Tag of the failing block.
    pub tag: String,
    /// 1-indexed line of the opening marker.
    pub line: usize,
    /// Byte offset of the opening marker.
    pub offset: usize,
    /// Message reported by the formatter.
    pub message: String,
}

/// Outcome of one rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewriteResult {
    /// The reassembled document.
    pub text: String,
    /// True iff at least one block was formatted successfully.
    pub changed: bool,
    /// Number of recognized blocks found.
    pub matched: usize,
    /// Number of blocks formatted successfully.
    pub formatted: usize,
    /// Failures in document order.
    pub failures: Vec<BlockFailure>,
}

/// Rewrite every fence tagged with one of `tags`, in document order.
///
/// Text outside the matched regions is copied unchanged. A successful call to
/// `format` replaces the region with the opening marker, the tag, the trimmed
/// formatted body and the closing marker. A failed call keeps the region
/// byte-for-byte and is recorded in [`RewriteResult::failures`]; scanning
/// carries on with the next block.
pub fn rewrite<F>(source: &str, tags: &[&str], mut format: F) -> RewriteResult
where
    F: FnMut(&str) -> Result<String, FormatError>,
{
    let mut result = RewriteResult {
        text: String::with_capacity(source.len()),
        ..Default::default()
    };
    let mut last_end = 0;

    for fence in FenceScanner::new(source, tags) {
        result.matched += 1;
        result.text.push_str(&source[last_end..fence.start]);

        match format(fence.body) {
            Ok(formatted) => {
                result.text.push_str(FENCE_MARKER);
                result.text.push_str(fence.tag);
                result.text.push('\n');
                result.text.push_str(formatted.trim());
                result.text.push('\n');
                result.text.push_str(FENCE_MARKER);
                result.changed = true;
                result.formatted += 1;
            }
            Err(e) => {
                let line = fence.line_number(source);
                log::warn!("Formatting '{}' block at line {line} failed: {e}", fence.tag);
                result.text.push_str(fence.raw);
                result.failures.push(BlockFailure {
                    tag: fence.tag.to_string(),
                    line,
                    offset: fence.start,
                    message: e.to_string(),
                });
            }
        }

        last_end = fence.end;
    }

    result.text.push_str(&source[last_end..]);

    log::debug!(
        "Rewrite pass: {} matched, {} formatted, {} failed",
        result.matched,
        result.formatted,
        result.failures.len()
    );

    result
}

/// Rewrite with a [`Formatter`] and the given options.
pub fn rewrite_with(source: &str, tags: &[&str], formatter: &dyn Formatter, options: &FormatOptions) -> RewriteResult {
    rewrite(source, tags, |body| formatter.format(body, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fence::RECOGNIZED_TAGS;
    use pretty_assertions::assert_eq;

    fn identity(body: &str) -> Result<String, FormatError> {
        Ok(body.to_string())
    }

    fn failing(body: &str) -> Result<String, FormatError> {
        Err(FormatError::Rejected {
            message: format!("cannot parse {} bytes", body.len()),
        })
    }

    #[test]
    fn test_identity_marks_changed() {
        let source = "```sh\nls  -la\n```";
        let result = rewrite(source, RECOGNIZED_TAGS, identity);

        assert_eq!(result.text, "```sh\nls  -la\n```");
        assert!(result.changed);
        assert_eq!(result.formatted, 1);
    }

    #[test]
    fn test_no_matches_is_identity() {
        let source = "# Doc\n\n```python\nprint('x')\n```\n";
        let result = rewrite(source, RECOGNIZED_TAGS, |_| panic!("formatter must not be called"));

        assert_eq!(result.text, source);
        assert!(!result.changed);
        assert_eq!(result.matched, 0);
    }

    #[test]
    fn test_unterminated_passthrough() {
        let source = "intro\n```sh\nls -la\n";
        let result = rewrite(source, RECOGNIZED_TAGS, identity);

        assert_eq!(result.text, source);
        assert!(!result.changed);
    }

    #[test]
    fn test_formatted_body_is_trimmed() {
        let source = "before\n```bash\n  echo hi\n```\nafter\n";
        let result = rewrite(source, RECOGNIZED_TAGS, |_| Ok("\n\necho hi  \n\n".to_string()));

        assert_eq!(result.text, "before\n```bash\necho hi\n```\nafter\n");
    }

    #[test]
    fn test_failure_keeps_block_and_continues() {
        let source = "```bash\nbroken\n```\n\n```sh\nfine\n```\n";
        let result = rewrite(source, RECOGNIZED_TAGS, |body| {
            if body.contains("broken") {
                failing(body)
            } else {
                Ok("FINE".to_string())
            }
        });

        assert_eq!(result.text, "```bash\nbroken\n```\n\n```sh\nFINE\n```\n");
        assert!(result.changed);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].tag, "bash");
        assert_eq!(result.failures[0].line, 1);
        assert_eq!(result.failures[0].message, "cannot parse 7 bytes");
    }

    #[test]
    fn test_single_failure_is_not_changed() {
        let source = "text\n```bash\nif\n```\n";
        let result = rewrite(source, RECOGNIZED_TAGS, failing);

        assert_eq!(result.text, source);
        assert!(!result.changed);
        assert_eq!(result.failures[0].line, 2);
    }

    #[test]
    fn test_untrimmed_passthrough_on_failure() {
        let source = "```sh\n\n   spaced   \n\n```";
        let result = rewrite(source, RECOGNIZED_TAGS, failing);
        assert_eq!(result.text, source);
    }

    #[test]
    fn test_blocks_formatted_in_document_order() {
        let source = "```sh\na\n```\n```bash\nb\n```\n```sh\nc\n```";
        let mut seen = Vec::new();
        rewrite(source, RECOGNIZED_TAGS, |body| {
            seen.push(body.trim().to_string());
            Ok(body.to_string())
        });
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rewrite_with_formatter() {
        let source = "```sh\nif true; then\necho yes\nfi\n```\n";
        let formatter = crate::formatter::BuiltinFormatter;
        let result = rewrite_with(source, RECOGNIZED_TAGS, &formatter, &FormatOptions::default());

        assert_eq!(result.text, "```sh\nif true; then\n  echo yes\nfi\n```\n");
    }
}
