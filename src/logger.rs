//! Structured logging for the stub and builder
//!
//! `ASML_SFX_LOG_LEVEL` selects a plain level (`debug`) or JSON-lines mode
//! (`json:debug`); `ASML_SFX_LOG_PATH` redirects log output to a file.
//! Logging defaults to off so a bare stub run emits nothing but its error
//! diagnostic.

use chrono::{Local, Utc};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;

/// Environment variable selecting the log level (diagnostics only)
pub const LOG_LEVEL_ENV: &str = "ASML_SFX_LOG_LEVEL";

/// Environment variable redirecting log output to a file
pub const LOG_PATH_ENV: &str = "ASML_SFX_LOG_PATH";

/// JSON-lines logger implementation
#[derive(Debug)]
pub struct JsonLogger {
    level: Level,
    target_file: Mutex<Option<std::fs::File>>,
}

impl JsonLogger {
    fn new(level: Level, log_path: Option<String>) -> Self {
        let target_file = if let Some(path) = log_path {
            OpenOptions::new().create(true).append(true).open(path).ok()
        } else {
            None
        };

        JsonLogger {
            level,
            target_file: Mutex::new(target_file),
        }
    }
}

/// Initialize logging from `ASML_SFX_LOG_LEVEL`, defaulting to off
pub fn init() {
    let level = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "off".to_string());
    init_with_level(&level);
}

/// Initialize logging with an explicit level string
///
/// Accepts plain levels (`trace` through `error`, `off`) or `json:<level>`
/// for JSON-lines output.
pub fn init_with_level(level_str: &str) {
    let (use_json, actual_level) = if let Some(stripped) = level_str.strip_prefix("json:") {
        (true, stripped)
    } else if level_str == "json" {
        (true, "info")
    } else {
        (false, level_str)
    };

    if !use_json {
        let level_filter = match actual_level {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Off,
        };

        let _ = env_logger::Builder::new()
            .filter_level(level_filter)
            .format(|buf, record| {
                write!(
                    buf,
                    "[{} {} {}] ",
                    Local::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.target()
                )?;
                writeln!(buf, "{}", record.args())
            })
            .try_init();
        return;
    }

    let level = match actual_level {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warn,
        "error" => Level::Error,
        _ => Level::Info,
    };

    let log_path = env::var(LOG_PATH_ENV).ok();
    let logger = Box::new(JsonLogger::new(level, log_path));

    // A second init (e.g. from tests) keeps the first logger.
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level.to_level_filter());
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let log_entry = json!({
            "@timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            "@level": record.level().to_string().to_lowercase(),
            "@message": record.args().to_string(),
            "@module": record.target(),
            "@pid": std::process::id(),
            "@file": record.file().unwrap_or("unknown"),
            "@line": record.line().unwrap_or(0),
        });

        let json_string = format!(
            "{}\n",
            serde_json::to_string(&log_entry).unwrap_or_default()
        );

        if let Ok(mut file_guard) = self.target_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let _ = file.write_all(json_string.as_bytes());
                let _ = file.flush();
            } else {
                let _ = io::stderr().write_all(json_string.as_bytes());
                let _ = io::stderr().flush();
            }
        } else {
            let _ = io::stderr().write_all(json_string.as_bytes());
            let _ = io::stderr().flush();
        }
    }

    fn flush(&self) {
        if let Ok(mut file_guard) = self.target_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let _ = file.flush();
            }
        }
        let _ = io::stderr().flush();
    }
}
