//! Locates fenced code blocks tagged with a recognized language.
//!
//! The scanner walks the document once with two states. Outside a fence it
//! looks at each line start for an opening marker followed by a recognized
//! tag and a newline. Inside a fence it looks for the first closing marker,
//! wherever it appears, so a body that contains a marker-like sequence ends
//! there.

/// Marker that opens and closes a fenced block.
pub const FENCE_MARKER: &str = "```";

/// A fenced region found in the source, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceMatch<'a> {
    /// Language tag following the opening marker.
    pub tag: &'a str,
    /// Text between the opening line and the closing marker.
    pub body: &'a str,
    /// Byte offset of the opening marker.
    pub start: usize,
    /// Byte offset just past the closing marker.
    pub end: usize,
    /// The full matched region, markers included.
    pub raw: &'a str,
}

impl FenceMatch<'_> {
    /// 1-indexed line of the opening marker within `source`.
    pub fn line_number(&self, source: &str) -> usize {
        source[..self.start].bytes().filter(|&b| b == b'\n').count() + 1
    }
}

#[derive(Debug, Clone, Copy)]
enum ScanState<'a> {
    Outside,
    Inside {
        tag: &'a str,
        open: usize,
        body_start: usize,
    },
}

/// Iterator over the recognized fences of a document, in source order.
pub struct FenceScanner<'a, 't> {
    source: &'a str,
    tags: &'t [&'t str],
    pos: usize,
    state: ScanState<'a>,
}

impl<'a, 't> FenceScanner<'a, 't> {
    pub fn new(source: &'a str, tags: &'t [&'t str]) -> Self {
        Self {
            source,
            tags,
            pos: 0,
            state: ScanState::Outside,
        }
    }

    /// Checks whether an opening line starts at `line_start`, returning the tag
    /// and the offset where the body begins.
    fn opening_at(&self, line_start: usize) -> Option<(&'a str, usize)> {
        let rest = self.source[line_start..].strip_prefix(FENCE_MARKER)?;
        let tag_start = line_start + FENCE_MARKER.len();

        self.tags.iter().find_map(|&tag| {
            let after = rest.strip_prefix(tag)?;
            if after.starts_with('\n') {
                let tag_end = tag_start + tag.len();
                Some((&self.source[tag_start..tag_end], tag_end + 1))
            } else {
                None
            }
        })
    }
}

impl<'a> Iterator for FenceScanner<'a, '_> {
    type Item = FenceMatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ScanState::Outside => {
                    if self.pos >= self.source.len() {
                        return None;
                    }
                    let at_line_start = self.pos == 0 || self.source.as_bytes()[self.pos - 1] == b'\n';
                    if at_line_start && let Some((tag, body_start)) = self.opening_at(self.pos) {
                        self.state = ScanState::Inside {
                            tag,
                            open: self.pos,
                            body_start,
                        };
                        continue;
                    }
                    // Jump to the next line start
                    match self.source[self.pos..].find('\n') {
                        Some(i) => self.pos += i + 1,
                        None => {
                            self.pos = self.source.len();
                            return None;
                        }
                    }
                }
                ScanState::Inside { tag, open, body_start } => {
                    self.state = ScanState::Outside;
                    match self.source[body_start..].find(FENCE_MARKER) {
                        Some(i) => {
                            let body_end = body_start + i;
                            let end = body_end + FENCE_MARKER.len();
                            self.pos = end;
                            return Some(FenceMatch {
                                tag,
                                body: &self.source[body_start..body_end],
                                start: open,
                                end,
                                raw: &self.source[open..end],
                            });
                        }
                        None => {
                            // Unterminated: nothing after this point can close either
                            log::debug!("Unterminated '{tag}' fence at byte {open}");
                            self.pos = self.source.len();
                            return None;
                        }
                    }
                }
            }
        }
    }
}

/// Collect all recognized fences in `source`.
pub fn find_fences<'a>(source: &'a str, tags: &[&str]) -> Vec<FenceMatch<'a>> {
    FenceScanner::new(source, tags).collect()
}
