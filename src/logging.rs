use std::ffi::CString;
use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::{filter_fn, LevelFilter};
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding filter directives
pub const ENV_VAR: &str = "RDATE_LOG";

/// Where log output goes
#[derive(Debug, Clone)]
pub struct Output {
    /// Prefix of every line, normally the program's name
    pub program: String,
    /// Send `INFO` events (the time reports) to stdout
    pub print: bool,
    /// Mirror events to syslog
    pub syslog: bool,
    /// Number of `-v` flags
    pub verbose: u8,
}

/// Installs the global subscriber
///
/// `INFO` goes to stdout in print mode only; every other level goes to
/// stderr.
pub fn init(output: &Output) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(output.verbose)));

    let stderr = tracing_subscriber::fmt::layer()
        .event_format(RdateFormatter::new(&output.program))
        .with_writer(std::io::stderr)
        .with_filter(filter_fn(|meta| *meta.level() != Level::INFO));

    let stdout = output.print.then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(RdateFormatter::new(&output.program))
            .with_writer(std::io::stdout)
            .with_filter(filter_fn(|meta| *meta.level() == Level::INFO))
    });

    let syslog = if output.syslog {
        Some(SyslogLayer::open(&output.program)?.with_filter(LevelFilter::INFO))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(stdout)
        .with(syslog)
        .try_init()?;
    Ok(())
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Writes `program: message` lines
pub struct RdateFormatter {
    program: String,
}

impl RdateFormatter {
    pub fn new(program: &str) -> Self {
        RdateFormatter {
            program: program.to_string(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for RdateFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(writer, "{}: ", self.program)?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Layer forwarding events to the system logger
///
/// The log is opened with the `LOG_CRON` facility and the process id in
/// every record, and closed when the layer is dropped.
pub struct SyslogLayer {
    // openlog keeps the pointer, so the ident must outlive the connection
    _ident: CString,
}

impl SyslogLayer {
    pub fn open(program: &str) -> anyhow::Result<Self> {
        let ident = CString::new(program)?;
        // SAFETY: ident is NUL-terminated and owned by the layer until closelog
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_CRON) };
        Ok(SyslogLayer { _ident: ident })
    }
}

impl Drop for SyslogLayer {
    fn drop(&mut self) {
        // SAFETY: closelog has no preconditions
        unsafe { libc::closelog() };
    }
}

impl<S: Subscriber> Layer<S> for SyslogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(priority) = syslog_priority(event.metadata().level()) else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        // Interior NULs cannot be passed to syslog; drop them
        let message = visitor.message.replace('\0', "");
        if let Ok(message) = CString::new(message) {
            // SAFETY: both strings are NUL-terminated; "%s" keeps the message
            // from being read as a format string
            unsafe { libc::syslog(priority, c"%s".as_ptr(), message.as_ptr()) };
        }
    }
}

fn syslog_priority(level: &Level) -> Option<libc::c_int> {
    match *level {
        Level::ERROR | Level::WARN => Some(libc::LOG_WARNING),
        Level::INFO => Some(libc::LOG_INFO),
        Level::DEBUG | Level::TRACE => None,
    }
}

/// Collects the `message` field of an event
#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        }
    }
}
