use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::CONFIG;

pub const LOGS_DIR: &str = "logs";
pub const APP_LOG: &str = "enhancer.log";
pub const TIMING_LOG: &str = "timing.log";
const APP_JSON_LOG: &str = "enhancer.jsonl";
const TIMING_JSON_LOG: &str = "timing.jsonl";
const TIMING_TARGET: &str = "bot.timing";

const QUIET_TARGETS: [&str; 6] = [
    "hyper",
    "hyper_util",
    "reqwest",
    "rustls",
    "teloxide",
    "teloxide_core",
];

/// Keeps the non-blocking writers flushing until dropped at shutdown.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

#[derive(Debug, Clone)]
pub struct LogTail {
    pub path: PathBuf,
    pub lines: Vec<String>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn general_targets(level: LevelFilter) -> Targets {
    QUIET_TARGETS.iter().fold(
        Targets::new()
            .with_default(level)
            .with_target(TIMING_TARGET, LevelFilter::OFF),
        |targets, target| targets.with_target(*target, LevelFilter::WARN),
    )
}

fn timing_targets() -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO)
}

fn daily_writer(file_name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let appender = tracing_appender::rolling::daily(LOGS_DIR, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);
    writer
}

/// Installs the global subscriber: stdout plus daily rolling text and JSON
/// files, with timing events split into their own pair of files.
pub fn init_logging() -> LoggingGuards {
    if let Err(err) = fs::create_dir_all(LOGS_DIR) {
        eprintln!("Failed to create logs directory: {err}");
    }

    let mut guards = Vec::with_capacity(4);
    let general = general_targets(parse_log_level(&CONFIG.log_level));
    let timing = timing_targets();

    let app_layer = tracing_subscriber::fmt::layer()
        .with_writer(daily_writer(APP_LOG, &mut guards))
        .with_ansi(false)
        .with_filter(general.clone());
    let app_json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(daily_writer(APP_JSON_LOG, &mut guards))
        .with_filter(general.clone());
    let timing_layer = tracing_subscriber::fmt::layer()
        .with_writer(daily_writer(TIMING_LOG, &mut guards))
        .with_ansi(false)
        .with_filter(timing.clone());
    let timing_json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(daily_writer(TIMING_JSON_LOG, &mut guards))
        .with_filter(timing);
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(general);

    tracing_subscriber::registry()
        .with(app_layer)
        .with(app_json_layer)
        .with(timing_layer)
        .with(timing_json_layer)
        .with(stdout_layer)
        .init();

    LoggingGuards { _guards: guards }
}

/// Last `max_lines` lines of the newest file in the logs directory whose
/// name starts with `base_name`. Rolled files carry a date suffix.
pub fn read_recent_log_lines(base_name: &str, max_lines: usize) -> io::Result<Option<LogTail>> {
    if max_lines == 0 {
        return Ok(None);
    }
    let Some(path) = newest_matching_file(Path::new(LOGS_DIR), base_name)? else {
        return Ok(None);
    };
    let lines = tail_file_lines(&path, max_lines)?;
    Ok(Some(LogTail { path, lines }))
}

fn newest_matching_file(dir: &Path, base_name: &str) -> io::Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path.is_file()
            && entry.file_name().to_string_lossy().starts_with(base_name);
        if !matches {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((modified, path));
    }

    Ok(candidates
        .into_iter()
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path))
}

fn tail_file_lines(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut window = VecDeque::with_capacity(max_lines);
    for line in reader.lines() {
        if window.len() == max_lines {
            window.pop_front();
        }
        window.push_back(line?);
    }
    Ok(window.into())
}
