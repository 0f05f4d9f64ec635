//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use super::utils::{EVENT_TIME, HEADER_TIME, log_file_path, menu_environment, strip_ansi, utc_now};

/// Target used for section headers.
pub(super) const STAGE_TARGET: &str = "xdgmenu::stage";

/// Fields the menu code attaches to its events.
///
/// `menu` is a menu path such as `Applications/Games`, `file` a menu
/// document or desktop record.
#[derive(Default)]
struct EventFields {
    message: String,
    menu: Option<String>,
    file: Option<String>,
}

impl EventFields {
    fn from_event(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    /// `menu=.. file=..` for the fields that are present.
    fn context(&self) -> String {
        let mut out = String::new();
        for (key, value) in [("menu", &self.menu), ("file", &self.file)] {
            if let Some(value) = value {
                let _ = write!(out, " {key}={value}");
            }
        }
        out
    }

    fn set(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = value,
            "menu" => self.menu = Some(value),
            "file" => self.file = Some(value),
            _ => {}
        }
    }
}

impl tracing::field::Visit for EventFields {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.set(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.set(field.name(), value.to_string());
    }
}

/// A [`tracing_subscriber::Layer`] that appends all events to the persistent
/// log file with timestamps, event fields and ANSI codes stripped.
///
/// Always captures events at `DEBUG` level and above regardless of the
/// console verbosity setting.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open (or truncate) the log file for `command` and write a run header
    /// naming the menu environment.
    ///
    /// Returns `None` if the cache directory cannot be created or the file
    /// cannot be opened.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("XDGMENU_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "# xdgmenu {version} {command} {}\n# {}\n",
            utc_now(HEADER_TIME),
            menu_environment(|key| std::env::var(key).ok()),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let fields = EventFields::from_event(event);
        let msg = strip_ansi(&fields.message);
        let context = fields.context();
        let ts = utc_now(EVENT_TIME);

        let line = match (*metadata.level(), metadata.target()) {
            (tracing::Level::INFO, STAGE_TARGET) => format!("[{ts}] ==> {msg}"),
            (tracing::Level::ERROR, _) => format!("[{ts}]     [error] {msg}{context}"),
            (tracing::Level::WARN, _) => format!("[{ts}]     [warn] {msg}{context}"),
            (tracing::Level::DEBUG | tracing::Level::TRACE, _) => {
                format!("[{ts}]     [debug] {msg}{context}")
            }
            _ => format!("[{ts}]     {msg}{context}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits compact coloured
/// console output; the `file` field of a warning or error is shown below it.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let fields = EventFields::from_event(event);
        let msg = &fields.message;

        match *metadata.level() {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}")?,
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}")?,
            tracing::Level::INFO if metadata.target() == STAGE_TARGET => {
                return writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m");
            }
            tracing::Level::INFO => return writeln!(writer, "  {msg}"),
            _ => return writeln!(writer, "  \x1b[2m{msg}{}\x1b[0m", fields.context()),
        }
        match &fields.file {
            Some(file) => writeln!(writer, "      \x1b[2min {file}\x1b[0m"),
            None => Ok(()),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Sets up a console subscriber with [`ConsoleFormatter`] and a file
/// subscriber that writes all events (including `debug`) to
/// `$XDG_CACHE_HOME/xdgmenu/<command>.log`.
/// With `quiet` the console only shows warnings and errors, keeping stdout
/// free for command output; `verbose` still enables debug output.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool, quiet: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
