//! In-process shell re-indenter.
//!
//! Re-indents shell code by its block structure and leaves everything else
//! alone: words, internal spacing, quoted strings and here-document bodies are
//! copied as written. Only keywords in command position are considered, so
//! `echo done` does not close a loop.
//!
//! Structure tracked:
//! - `then` ... `fi` (with `else` / `elif` dedenting their own line)
//! - `do` ... `done`
//! - `{` ... `}`
//! - `case` ... `esac`, with one more level for each `pattern)` arm up to `;;`

use super::{FormatError, FormatOptions, Formatter};
use std::collections::VecDeque;

/// The default formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormatter;

impl Formatter for BuiltinFormatter {
    fn name(&self) -> &str {
        "builtin"
    }

    fn format(&self, body: &str, options: &FormatOptions) -> Result<String, FormatError> {
        ShellIndenter::new(options.indent_size).run(body)
    }
}

/// Words after which the next word is again in command position.
const COMMAND_PREFIXES: &[&str] = &["if", "then", "else", "elif", "do", "while", "until", "{", "!", "time"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    Loop,
    Brace,
    Case,
    Arm,
}

impl BlockKind {
    fn opener(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Loop => "do",
            Self::Brace => "{",
            Self::Case => "case",
            Self::Arm => "case arm",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: BlockKind,
    line: usize,
}

/// A construct that spans past the end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Single,
    Double,
    Backtick,
    /// `$(` nesting depth, and the quote open inside the substitution if any.
    Subst { depth: usize, quote: Option<char> },
}

impl Open {
    fn describe(self) -> &'static str {
        match self {
            Self::Single => "single quote",
            Self::Double => "double quote",
            Self::Backtick => "backtick substitution",
            Self::Subst { .. } => "command substitution",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word { text: String, command_pos: bool },
    CaseEnd,
}

#[derive(Debug, Clone)]
struct Heredoc {
    delimiter: String,
    strip_tabs: bool,
    line: usize,
}

#[derive(Debug, Default)]
struct LineLex {
    tokens: Vec<Token>,
    open: Option<Open>,
    continued: bool,
    heredocs: Vec<(String, bool)>,
}

/// Splits one line into words, starting from `open` if a previous line left a
/// quote or substitution unfinished.
struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    current: String,
    command_pos: bool,
    pending_heredoc: Option<bool>,
    function_name_next: bool,
    out: LineLex,
}

impl<'a> Lexer<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            chars: line.chars().peekable(),
            current: String::new(),
            command_pos: true,
            pending_heredoc: None,
            function_name_next: false,
            out: LineLex::default(),
        }
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.current);
        if let Some(strip_tabs) = self.pending_heredoc.take() {
            let delimiter: String = text.chars().filter(|c| !matches!(c, '\'' | '"' | '\\')).collect();
            if !delimiter.is_empty() {
                self.out.heredocs.push((delimiter, strip_tabs));
            }
            self.command_pos = false;
            return;
        }
        // `name()` and `function name` put the body's `{` in command position
        let next_command_pos =
            COMMAND_PREFIXES.contains(&text.as_str()) || text.ends_with(')') || self.function_name_next;
        self.function_name_next = self.command_pos && text == "function";
        self.out.tokens.push(Token::Word {
            text,
            command_pos: self.command_pos,
        });
        self.command_pos = next_command_pos;
    }

    fn separator(&mut self) {
        self.flush();
        self.command_pos = true;
    }

    /// Advance a `$(...)` past `c`. Parentheses only count outside quotes.
    fn subst_step(&mut self, depth: usize, quote: Option<char>, c: char) -> Option<Open> {
        let quote = match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => None,
            (Some('"') | None, '\\') => {
                if let Some(escaped) = self.chars.next() {
                    self.current.push(escaped);
                }
                quote
            }
            (Some(q), _) => Some(q),
            (None, '\'' | '"') => Some(c),
            (None, '(') => return Some(Open::Subst { depth: depth + 1, quote: None }),
            (None, ')') if depth == 1 => return None,
            (None, ')') => return Some(Open::Subst { depth: depth - 1, quote: None }),
            (None, _) => None,
        };
        Some(Open::Subst { depth, quote })
    }

    fn lex(mut self, start: Option<Open>) -> LineLex {
        let mut open = start;

        while let Some(c) = self.chars.next() {
            if let Some(state) = open {
                self.current.push(c);
                open = match (state, c) {
                    (Open::Single, '\'') => None,
                    (Open::Double, '"') | (Open::Backtick, '`') => None,
                    (Open::Double | Open::Backtick, '\\') => {
                        if let Some(escaped) = self.chars.next() {
                            self.current.push(escaped);
                        }
                        Some(state)
                    }
                    (Open::Subst { depth, quote }, c) => self.subst_step(depth, quote, c),
                    _ => Some(state),
                };
                continue;
            }

            match c {
                c if c.is_whitespace() => self.flush(),
                '#' if self.current.is_empty() => break,
                '\\' => match self.chars.next() {
                    Some(escaped) => {
                        self.current.push('\\');
                        self.current.push(escaped);
                    }
                    None => self.out.continued = true,
                },
                '\'' => {
                    self.current.push(c);
                    open = Some(Open::Single);
                }
                '"' => {
                    self.current.push(c);
                    open = Some(Open::Double);
                }
                '`' => {
                    self.current.push(c);
                    open = Some(Open::Backtick);
                }
                '$' if self.chars.peek() == Some(&'(') => {
                    self.chars.next();
                    self.current.push_str("$(");
                    open = Some(Open::Subst { depth: 1, quote: None });
                }
                ';' => {
                    if self.chars.peek() == Some(&';') {
                        self.chars.next();
                        self.flush();
                        self.out.tokens.push(Token::CaseEnd);
                        if self.chars.peek() == Some(&'&') {
                            self.chars.next();
                        }
                        self.command_pos = true;
                    } else {
                        if self.chars.peek() == Some(&'&') {
                            self.chars.next();
                            self.flush();
                            self.out.tokens.push(Token::CaseEnd);
                        }
                        self.separator();
                    }
                }
                '&' if self.current.ends_with(['>', '<']) || self.chars.peek() == Some(&'>') => {
                    self.current.push(c);
                }
                '&' | '|' => {
                    if self.chars.peek() == Some(&c) {
                        self.chars.next();
                    }
                    self.separator();
                }
                '(' if self.current.is_empty() => self.separator(),
                '<' if self.chars.peek() == Some(&'<') => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'<') {
                        self.chars.next();
                        self.current.push_str("<<<");
                    } else {
                        self.flush();
                        let strip_tabs = self.chars.peek() == Some(&'-');
                        if strip_tabs {
                            self.chars.next();
                        }
                        self.pending_heredoc = Some(strip_tabs);
                        while self.chars.peek().is_some_and(|c| *c == ' ' || *c == '\t') {
                            self.chars.next();
                        }
                    }
                }
                _ => self.current.push(c),
            }
        }

        if open.is_none() {
            self.flush();
        }
        self.out.open = open;
        self.out
    }
}

struct ShellIndenter {
    indent_size: usize,
    stack: Vec<Frame>,
    heredocs: VecDeque<Heredoc>,
    open: Option<(Open, usize)>,
    continued: bool,
}

impl ShellIndenter {
    fn new(indent_size: usize) -> Self {
        Self {
            indent_size,
            stack: Vec::new(),
            heredocs: VecDeque::new(),
            open: None,
            continued: false,
        }
    }

    fn pop(&mut self, kind: BlockKind, token: &str, line: usize) -> Result<(), FormatError> {
        match self.stack.last() {
            Some(frame) if frame.kind == kind => {
                self.stack.pop();
                Ok(())
            }
            _ => Err(FormatError::UnexpectedCloser {
                token: token.to_string(),
                line,
            }),
        }
    }

    fn top_is(&self, kind: BlockKind) -> bool {
        self.stack.last().is_some_and(|f| f.kind == kind)
    }

    /// Apply the tokens of one line to the block stack and return the depth the
    /// line itself is printed at.
    fn apply(&mut self, tokens: &[Token], line: usize) -> Result<usize, FormatError> {
        let mut print_depth = None;

        for token in tokens {
            let depth_before = self.stack.len();
            let leading = print_depth.is_none();

            match token {
                Token::CaseEnd => {
                    if leading {
                        print_depth = Some(depth_before);
                    }
                    if self.top_is(BlockKind::Arm) {
                        self.stack.pop();
                    }
                }
                Token::Word { text, command_pos } => {
                    let word = text.as_str();
                    match word {
                        "fi" if *command_pos => self.pop(BlockKind::If, word, line)?,
                        "done" if *command_pos => self.pop(BlockKind::Loop, word, line)?,
                        "}" if *command_pos => self.pop(BlockKind::Brace, word, line)?,
                        "esac" if *command_pos => {
                            if self.top_is(BlockKind::Arm) {
                                self.stack.pop();
                            }
                            self.pop(BlockKind::Case, word, line)?;
                        }
                        "else" | "elif" if *command_pos => {
                            self.pop(BlockKind::If, word, line)?;
                            if leading {
                                print_depth = Some(self.stack.len());
                            }
                            if word == "else" {
                                self.stack.push(Frame {
                                    kind: BlockKind::If,
                                    line,
                                });
                            }
                        }
                        _ => {
                            if leading {
                                print_depth = Some(depth_before);
                            }
                            let kind = match word {
                                "then" if *command_pos => Some(BlockKind::If),
                                "do" if *command_pos => Some(BlockKind::Loop),
                                "case" if *command_pos => Some(BlockKind::Case),
                                "{" if *command_pos => Some(BlockKind::Brace),
                                _ if *command_pos && word.ends_with(')') && self.top_is(BlockKind::Case) => {
                                    Some(BlockKind::Arm)
                                }
                                _ => None,
                            };
                            if let Some(kind) = kind {
                                self.stack.push(Frame { kind, line });
                            }
                        }
                    }
                }
            }
        }

        Ok(print_depth.unwrap_or(self.stack.len()))
    }

    fn indent(&self, depth: usize) -> String {
        " ".repeat(depth * self.indent_size)
    }

    fn run(mut self, body: &str) -> Result<String, FormatError> {
        let mut out: Vec<String> = Vec::new();

        for (idx, raw) in body.lines().enumerate() {
            let line = idx + 1;

            if let Some(heredoc) = self.heredocs.front() {
                let candidate = if heredoc.strip_tabs {
                    raw.trim_start_matches('\t')
                } else {
                    raw
                };
                if candidate == heredoc.delimiter {
                    self.heredocs.pop_front();
                }
                out.push(raw.to_string());
                continue;
            }

            if let Some((state, opened_at)) = self.open {
                // Still inside a multi-line string: keep the line as written
                let lex = Lexer::new(raw).lex(Some(state));
                self.apply(&lex.tokens, line)?;
                self.open = lex.open.map(|s| (s, opened_at));
                self.queue_heredocs(lex.heredocs, line);
                self.continued = lex.continued;
                out.push(raw.to_string());
                continue;
            }

            let trimmed = raw.trim();
            if trimmed.is_empty() {
                out.push(String::new());
                self.continued = false;
                continue;
            }

            let lex = Lexer::new(trimmed).lex(None);
            let depth = self.apply(&lex.tokens, line)?;
            let depth = if self.continued { depth + 1 } else { depth };

            let text = if lex.open.is_some() { raw.trim_start() } else { trimmed };
            out.push(format!("{}{text}", self.indent(depth)));

            self.open = lex.open.map(|s| (s, line));
            self.queue_heredocs(lex.heredocs, line);
            self.continued = lex.continued;
        }

        if let Some(heredoc) = self.heredocs.front() {
            return Err(FormatError::UnterminatedHeredoc {
                delimiter: heredoc.delimiter.clone(),
                line: heredoc.line,
            });
        }
        if let Some((state, line)) = self.open {
            return Err(FormatError::UnterminatedQuote {
                kind: state.describe(),
                line,
            });
        }
        if let Some(frame) = self.stack.last() {
            return Err(FormatError::Unclosed {
                opener: frame.kind.opener().to_string(),
                line: frame.line,
            });
        }

        let mut result = out.join("\n");
        if body.ends_with('\n') {
            result.push('\n');
        }
        Ok(result)
    }

    fn queue_heredocs(&mut self, found: Vec<(String, bool)>, line: usize) {
        self.heredocs
            .extend(found.into_iter().map(|(delimiter, strip_tabs)| Heredoc {
                delimiter,
                strip_tabs,
                line,
            }));
    }
}
