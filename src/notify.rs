//! User-facing notices.

use colored::*;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// One message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    /// Document the notice is about, if any.
    pub document: Option<PathBuf>,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, document: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            level,
            document,
            message: message.into(),
        }
    }

    pub fn info(document: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, document, message)
    }

    pub fn success(document: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, document, message)
    }

    pub fn error(document: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, document, message)
    }
}

/// Fire-and-forget notification channel.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Prints notices to stderr. In quiet mode only errors are shown.
pub struct TerminalNotifier {
    quiet: bool,
}

impl TerminalNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// The line printed for `notice`.
    pub fn render(notice: &Notice) -> String {
        let label = match notice.level {
            NoticeLevel::Info => "Info:".cyan().bold(),
            NoticeLevel::Success => "Success:".green().bold(),
            NoticeLevel::Error => "Error:".red().bold(),
        };
        match &notice.document {
            Some(path) => format!("{label} {}: {}", path.display().to_string().blue(), notice.message),
            None => format!("{label} {}", notice.message),
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&mut self, notice: Notice) {
        if self.quiet && notice.level != NoticeLevel::Error {
            return;
        }
        let _ = writeln!(std::io::stderr(), "{}", Self::render(&notice));
    }
}

/// Keeps every notice, for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub notices: Vec<Notice>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.notices.iter().map(|n| n.message.as_str()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
