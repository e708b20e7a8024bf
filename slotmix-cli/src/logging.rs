//! Process logger that keeps the most recent lines in memory for `--show-log`.

use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};

const LOG_CAPACITY: usize = 500;

pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

struct SharedLogger {
    level: LevelFilter,
    buffer: LogBuffer,
    echo_stderr: bool,
}

impl Log for SharedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!("[{}] {}", record.level(), record.args());
        if self.echo_stderr {
            eprintln!("{}", line);
        }

        push_line(&self.buffer, line);
    }

    fn flush(&self) {}
}

static LOG_BUFFER: OnceLock<LogBuffer> = OnceLock::new();
static LOGGER: OnceLock<SharedLogger> = OnceLock::new();

/// Install the process logger and return the buffer it records into.
///
/// Level comes from `RUST_LOG` (default info); lines are echoed to stderr
/// when `SLOTMIX_LOG_STDERR` is set to anything but `0`.
pub fn init() -> LogBuffer {
    let buffer = LOG_BUFFER
        .get_or_init(|| Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY))))
        .clone();

    let level = std::env::var("RUST_LOG")
        .map(|level| parse_level(&level))
        .unwrap_or(LevelFilter::Info);

    let echo_stderr = std::env::var("SLOTMIX_LOG_STDERR")
        .map(|value| value != "0")
        .unwrap_or(false);

    let logger = SharedLogger {
        level,
        buffer: buffer.clone(),
        echo_stderr,
    };

    let logger_ref = LOGGER.get_or_init(|| logger);
    if log::set_logger(logger_ref).is_ok() {
        log::set_max_level(level);
    }

    buffer
}

pub fn snapshot(buffer: &LogBuffer) -> Vec<String> {
    buffer.lock().unwrap().iter().cloned().collect()
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn push_line(buffer: &LogBuffer, line: String) {
    let mut buffer = buffer.lock().unwrap();
    if buffer.len() >= LOG_CAPACITY {
        buffer.pop_front();
    }
    buffer.push_back(line);
}
