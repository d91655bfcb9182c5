//! Leveled console logging
//!
//! A `Logger` is a plain value: the dispatcher builds one per run from the
//! configured level and hands clones to the driver. Lines are tagged and
//! colored on stdout, or collected in memory for tests.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use colored::{Color, ColoredString, Colorize};

/// Log verbosity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Suppresses every line
    Silent,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    /// Whether a message of level `message` passes this threshold
    pub fn allows(self, message: LogLevel) -> bool {
        self != LogLevel::Silent && message >= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            _ => Err(format!("invalid log level: {}", s)),
        }
    }
}

/// Kind of a build-process line (`[start]`, `[remind]`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    Start,
    Remind,
    Error,
}

impl ProcessKind {
    fn label(&self) -> &'static str {
        match self {
            ProcessKind::Start => "start",
            ProcessKind::Remind => "remind",
            ProcessKind::Error => "error",
        }
    }

    fn level(&self) -> LogLevel {
        match self {
            ProcessKind::Error => LogLevel::Error,
            ProcessKind::Start | ProcessKind::Remind => LogLevel::Info,
        }
    }

    fn paint(&self, text: &str) -> ColoredString {
        match self {
            ProcessKind::Start => text.cyan(),
            ProcessKind::Remind => text.green(),
            ProcessKind::Error => text.red(),
        }
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Memory(Arc<Mutex<Vec<String>>>),
}

/// Handle on lines recorded by a capturing logger
#[derive(Debug, Clone)]
pub struct LogCapture(Arc<Mutex<Vec<String>>>);

impl LogCapture {
    /// All recorded lines, uncolored
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any recorded line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
    sink: Sink,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            sink: Sink::Stdout,
        }
    }

    /// Build from a configured level name; unknown names fall back to info.
    pub fn from_config(level: Option<&str>) -> Self {
        match level.map(str::parse::<LogLevel>) {
            None => Self::default(),
            Some(Ok(level)) => Self::new(level),
            Some(Err(e)) => {
                let logger = Self::default();
                logger.warn(format!("{}, falling back to 'info'", e));
                logger
            }
        }
    }

    /// A logger that records lines in memory instead of printing them
    pub fn capture(level: LogLevel) -> (Self, LogCapture) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = Self {
            level,
            sink: Sink::Memory(Arc::clone(&lines)),
        };
        (logger, LogCapture(lines))
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.tagged(LogLevel::Info, "[INFO]", Color::Cyan, message);
    }

    /// A top-level task announcement
    pub fn task(&self, message: impl fmt::Display) {
        self.tagged(LogLevel::Info, "[TASK]", Color::Magenta, message);
    }

    pub fn success(&self, message: impl fmt::Display) {
        self.tagged(LogLevel::Info, "[SUCCESS]", Color::Green, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.tagged(LogLevel::Warn, "[WARN]", Color::Yellow, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.tagged(LogLevel::Error, "[ERROR]", Color::Red, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.tagged(LogLevel::Debug, "[DEBUG]", Color::BrightBlack, message);
    }

    /// A build-process line, colored as a whole by its kind
    pub fn process(&self, kind: ProcessKind, message: impl fmt::Display) {
        if !self.level.allows(kind.level()) {
            return;
        }
        let line = format!("[{}] {}", kind.label(), message);
        match &self.sink {
            Sink::Stdout => println!("{}", kind.paint(&line)),
            Sink::Memory(lines) => record(lines, line),
        }
    }

    /// Verbatim output such as a terminal QR code; only `silent` hides it.
    pub fn print(&self, text: &str) {
        if self.level == LogLevel::Silent {
            return;
        }
        match &self.sink {
            Sink::Stdout => println!("{}", text),
            Sink::Memory(lines) => record(lines, text.to_string()),
        }
    }

    /// A separator line
    pub fn line(&self) {
        self.print(&"-".repeat(80));
    }

    fn tagged(&self, level: LogLevel, tag: &str, color: Color, message: impl fmt::Display) {
        if !self.level.allows(level) {
            return;
        }
        match &self.sink {
            Sink::Stdout => println!("{} {}", tag.color(color), message),
            Sink::Memory(lines) => record(lines, format!("{} {}", tag, message)),
        }
    }
}

fn record(lines: &Mutex<Vec<String>>, line: String) {
    let mut lines = lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    lines.push(line);
}
