/*!
A super simple logger that works with the `log` crate.

Nothing fancy: basic log levels and printing to stderr. Applications
embedding this crate are free to install whatever logger they like, since
everything here goes through the `log` facade. This one exists for tests,
examples and small tools that just want to see what's going on.
*/

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use log::Log;

/// The simplest possible logger that logs to stderr.
///
/// This logger does no filtering. Instead, it relies on the `log` crates
/// filtering via its global max_level setting.
#[derive(Debug)]
pub struct Logger(());

impl Logger {
    /// Create a new logger that logs to stderr and initialize it as the
    /// global logger. If there was a problem setting the logger, then an
    /// error is returned.
    pub fn init() -> Result<&'static Logger, log::SetLoggerError> {
        static LOGGER: Logger = Logger(());
        log::set_logger(&LOGGER)?;
        Ok(&LOGGER)
    }
}

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        // We set the log level via log::set_max_level, so we don't need to
        // implement filtering here.
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        // We avoid anything that might consult the time zone database here,
        // since that can emit log messages of its own. Timestamps are always
        // printed in UTC.
        let now = jiff::Timestamp::now();
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => {
                eprintln!(
                    "{}|{}|{}:{}: {}",
                    now,
                    record.level(),
                    relative(file),
                    line,
                    record.args()
                );
            }
            (Some(file), None) => {
                eprintln!(
                    "{}|{}|{}: {}",
                    now,
                    record.level(),
                    relative(file),
                    record.args()
                );
            }
            _ => {
                eprintln!("{}|{}: {}", now, record.level(), record.args());
            }
        }
    }

    fn flush(&self) {
        // We use eprintln! which is flushed on every call.
    }
}

/// Installs [`Logger`] as the global logger with its level taken from the
/// `OCCUR_LOG` environment variable.
///
/// Recognized levels are `off` (the default when unset), `error`, `warn`,
/// `info`, `debug` and `trace`. An error is returned for any other value or
/// when a global logger has already been installed.
pub fn init_from_env() -> anyhow::Result<()> {
    let level = read_env_occur_log()?;
    Logger::init()?;
    log::set_max_level(level);
    Ok(())
}

fn read_env_occur_log() -> anyhow::Result<log::LevelFilter> {
    let rustlog = std::env::var("OCCUR_LOG").unwrap_or_else(|_| String::new());
    parse_level(&rustlog)
}

fn parse_level(name: &str) -> anyhow::Result<log::LevelFilter> {
    let level = match name {
        "" | "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        unk => anyhow::bail!("unrecognized log level '{}'", unk),
    };
    Ok(level)
}

fn relative<'p>(path: &'p str) -> &'p str {
    let Some(cwd) = cwd() else { return path };
    let Ok(relative) = Path::new(path).strip_prefix(cwd) else { return path };
    let Some(relative) = relative.to_str() else { return path };
    relative
}

fn cwd() -> Option<&'static Path> {
    static CWD: LazyLock<Option<PathBuf>> =
        LazyLock::new(|| std::env::current_dir().ok());
    CWD.as_deref()
}
