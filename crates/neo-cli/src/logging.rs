use std::fmt::Debug;

use time::OffsetDateTime;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// Field that promotes an `error!` event to CRITICAL.
const CRITICAL_FIELD: &str = "critical";

/// Installs the stderr subscriber. `RUST_LOG` narrows or widens the default
/// `info` filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing::subscriber::set_global_default(subscriber(filter, std::io::stderr));
}

pub(crate) fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .event_format(LineFormat)
        .finish()
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub timestamp: String,
    pub level: Level,
    pub fields: Vec<(String, String)>,
}

impl LogLine {
    pub fn level_label(&self) -> &'static str {
        let critical = self
            .fields
            .iter()
            .any(|(name, value)| name == CRITICAL_FIELD && value == "true");
        match self.level {
            Level::ERROR if critical => "CRITICAL",
            Level::ERROR => "ERROR",
            Level::WARN => "WARNING",
            Level::INFO => "INFO",
            Level::DEBUG => "DEBUG",
            _ => "TRACE",
        }
    }

    pub fn render(&self) -> String {
        let message = self
            .fields
            .iter()
            .find(|(name, _)| name == "message")
            .map(|(_, value)| value.as_str())
            .unwrap_or("");
        let mut extras: Vec<String> = self
            .fields
            .iter()
            .filter(|(name, _)| name != "message" && name != CRITICAL_FIELD)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        extras.sort();
        if extras.is_empty() {
            format!("{} - {} - {}", self.timestamp, self.level_label(), message)
        } else {
            format!(
                "{} - {} - {} | {}",
                self.timestamp,
                self.level_label(),
                message,
                extras.join(" ")
            )
        }
    }
}

struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = LogVisitor::default();
        event.record(&mut visitor);
        let line = LogLine {
            timestamp: format_timestamp(local_now()),
            level: *event.metadata().level(),
            fields: visitor.fields,
        };
        writeln!(writer, "{}", line.render())
    }
}

#[derive(Default)]
struct LogVisitor {
    fields: Vec<(String, String)>,
}

impl LogVisitor {
    fn push(&mut self, field: &tracing::field::Field, value: String) {
        self.fields.push((field.name().to_string(), value));
    }
}

impl tracing::field::Visit for LogVisitor {
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        self.push(field, format!("{value:?}"));
    }
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
        .ok()
        .and_then(|format| timestamp.format(&format).ok())
        .unwrap_or_else(|| timestamp.unix_timestamp().to_string())
}
