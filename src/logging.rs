/// Structured logging for the hotspot monitoring service
///
/// Provides context-rich logging with component tags and optional
/// polygon/source identifiers, timestamps, and severity levels. Supports
/// both console output and file-based logging for scheduled runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Components
// ---------------------------------------------------------------------------

/// Which stage of the pipeline a log line belongs to. Rendered as the
/// bracketed tag in every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Firms,
    Polygons,
    Match,
    Alert,
    Ledger,
    Telegram,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Firms => write!(f, "FIRMS"),
            Component::Polygons => write!(f, "POLY"),
            Component::Match => write!(f, "MATCH"),
            Component::Alert => write!(f, "ALERT"),
            Component::Ledger => write!(f, "LEDGER"),
            Component::Telegram => write!(f, "TG"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - a feed may be temporarily empty or in maintenance
    Expected,
    /// Unexpected failure - indicates service degradation or a format change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>) {
        let logger = Logger {
            min_level,
            log_file,
        };

        *LOGGER.lock().unwrap() = Some(logger);
    }

    fn log(&self, level: LogLevel, component: &Component, id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let id_part = id.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} [{}]{} {}",
            timestamp, level, component, id_part, message
        );

        match level {
            LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
            LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    Logger::init(min_level, log_file.map(String::from));
}

/// Log a general informational message
pub fn info(component: Component, id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, &component, id, message);
    }
}

/// Log a warning message
pub fn warn(component: Component, id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, &component, id, message);
    }
}

/// Log an error message
pub fn error(component: Component, id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, &component, id, message);
    }
}

/// Log a debug message
pub fn debug(component: Component, id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, &component, id, message);
    }
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a FIRMS feed failure based on the error message.
pub fn classify_feed_failure(_source: &str, error_message: &str) -> FailureType {
    // Empty CSVs are normal outside fire season
    if error_message.contains("empty CSV") || error_message.contains("no data rows") {
        FailureType::Expected
    }
    // HTTP errors might indicate service issues
    else if error_message.contains("HTTP") {
        FailureType::Unexpected
    }
    // Header changes suggest an upstream format change
    else if error_message.contains("missing column") || error_message.contains("header") {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Log a FIRMS feed failure with automatic classification.
pub fn log_feed_failure(source: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_feed_failure(source, &error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(Component::Firms, Some(source), &message),
        FailureType::Unexpected => error(Component::Firms, Some(source), &message),
        FailureType::Unknown => warn(Component::Firms, Some(source), &message),
    }
}
