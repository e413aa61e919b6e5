use crate::config::{LoggingConfig, Section};
use crate::paths::resolve_under;
use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";

/// `off`/`none` disable a sink; anything unrecognized means `info`.
fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Target equals `prefix` or lives in a `prefix::` submodule.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/* ---------- rotating file sinks ---------- */

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

fn open_rotating(path: &Path, section: &Section) -> io::Result<RotWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(100).saturating_mul(1024 * 1024);
    let rot = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(section.max_backups.unwrap_or(3))),
        ContentLimit::BytesSurpassed(usize::try_from(max_bytes).unwrap_or(usize::MAX)),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

/// Writer that drops records with no configured file.
struct Routed(Option<RotWriter>);

impl Write for Routed {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Sends each record to the file of the longest matching target prefix, falling
/// back to the default section's file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .filter(|(p, _)| matches_prefix(target, p))
            .max_by_key(|(p, _)| p.len())
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = Routed;

    fn make_writer(&'a self) -> Self::Writer {
        Routed(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        Routed(self.resolve(meta.target()))
    }
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter::default();
    for (name, section) in cfg {
        if section.file.trim().is_empty() {
            continue;
        }
        let path = resolve_under(base_dir, section.file.trim());
        match open_rotating(&path, section) {
            Ok(w) if name == DEFAULT_SECTION => router.default = Some(w),
            Ok(w) => router.by_prefix.push((name.clone(), w)),
            Err(e) => eprintln!("failed to open log file '{}' for '{name}': {e}", path.display()),
        }
    }
    router
}

/* ---------- per-sink target filters ---------- */

fn targets(cfg: &LoggingConfig, level_of: impl Fn(&Section) -> Option<LevelFilter>) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .and_then(&level_of)
        .unwrap_or(LevelFilter::OFF);
    cfg.iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .fold(Targets::new().with_default(default), |t, (name, section)| {
            t.with_target(name.clone(), level_of(section).unwrap_or(LevelFilter::OFF))
        })
}

fn console_targets(cfg: &LoggingConfig) -> Targets {
    targets(cfg, |s| Some(parse_level(&s.console_level)))
}

fn file_targets(cfg: &LoggingConfig) -> Targets {
    targets(cfg, |s| {
        (!s.file.trim().is_empty()).then(|| parse_level(&s.file_level))
    })
}

/* ---------- public init ---------- */

/// Install the global subscriber.
///
/// `base_dir` resolves relative log file paths (normally `server.home_dir`). An
/// empty config installs a plain console subscriber.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // bridge `log` records before the subscriber goes in
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let console = fmt::layer()
        .with_ansi(io::stdout().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg));

    let router = build_file_router(cfg, base_dir);
    if router.is_empty() {
        let _ = Registry::default().with(console).try_init();
        return;
    }

    let file = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(router)
        .with_filter(file_targets(cfg));

    let _ = Registry::default().with(console).with(file).try_init();
}

/// Console-only sections from a `target → level` list; handy for tests and tools.
pub fn console_only(levels: &[(&str, &str)]) -> LoggingConfig {
    levels
        .iter()
        .map(|(target, level)| {
            (
                target.to_string(),
                Section {
                    console_level: level.to_string(),
                    file: String::new(),
                    file_level: String::new(),
                    max_backups: None,
                    max_size_mb: None,
                },
            )
        })
        .collect::<HashMap<_, _>>()
}
