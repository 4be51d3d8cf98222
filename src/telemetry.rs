//! Tracing setup and remote log delivery.
//!
//! Besides the usual console output, a [`RemoteLogLayer`] copies every
//! record that passes the process filter into a channel. The relay task
//! forwards matching records to ops subscribed through the log bot, as
//! private messages from the bot.
//!
//! Records are ranked on the numeric scale the filters use: 40 error,
//! 30 warn, 20 info, 10 debug, 5 trace, and 1 for the data-sent channel
//! (the `nmdcd::sent` target). That channel is also where the loop guard
//! watches: a data-sent record containing a private message from the log
//! bot itself is never relayed, as that would echo forever.

use std::fmt::Write as _;
use std::sync::Arc;

use nmdc_proto::escape;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::bots::logbot::LOG_BOT_NICK;
use crate::config::{Config, LogFormat};
use crate::state::Hub;

/// Target of the frame-level "data sent" records, pinned to numeric
/// level 1.
pub const DATA_SENT_TARGET: &str = "nmdcd::sent";

/// One formatted record on its way to remote subscribers.
#[derive(Debug)]
pub struct RemoteLogRecord {
    pub numeric: u8,
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Numeric rank for a record, Python-logging style.
fn numeric_level(level: &Level, target: &str) -> u8 {
    if target == DATA_SENT_TARGET {
        return 1;
    }
    match *level {
        Level::ERROR => 40,
        Level::WARN => 30,
        Level::INFO => 20,
        Level::DEBUG => 10,
        Level::TRACE => 5,
    }
}

/// Layer that copies formatted records into the relay channel.
pub struct RemoteLogLayer {
    tx: mpsc::UnboundedSender<RemoteLogRecord>,
}

impl RemoteLogLayer {
    /// Create the layer and the receiving end for the relay task.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RemoteLogRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<S: Subscriber> Layer<S> for RemoteLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = RenderVisitor::default();
        event.record(&mut visitor);
        let record = RemoteLogRecord {
            numeric: numeric_level(meta.level(), meta.target()),
            level: *meta.level(),
            target: meta.target().to_string(),
            message: visitor.rendered,
        };
        let _ = self.tx.send(record);
    }
}

/// Renders `message` first, then the remaining fields as `name=value`.
#[derive(Default)]
struct RenderVisitor {
    rendered: String,
}

impl Visit for RenderVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            let _ = write!(self.rendered, "{} ", value);
        } else {
            let _ = write!(self.rendered, "{}={} ", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.rendered, "{:?} ", value);
        } else {
            let _ = write!(self.rendered, "{}={:?} ", field.name(), value);
        }
    }
}

/// Install the global subscriber: env-filtered console output in the
/// configured format, plus the remote layer.
pub fn init(config: &Config, remote: RemoteLogLayer) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true).json())
                .with(remote)
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true))
                .with(remote)
                .init();
        }
    }
}

/// Forward records to subscribed ops until shutdown.
pub fn spawn_remote_log_relay(hub: Arc<Hub>, mut rx: mpsc::UnboundedReceiver<RemoteLogRecord>) {
    tokio::spawn(async move {
        let mut shutdown = hub.shutdown.subscribe();
        loop {
            tokio::select! {
                record = rx.recv() => {
                    let Some(record) = record else { break };
                    relay(&hub, &record);
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}

fn relay(hub: &Hub, record: &RemoteLogRecord) {
    if hub.log_handlers.is_empty() {
        return;
    }
    // The loop guard: never relay our own relayed messages.
    let own_pm = format!("From: {} $<{}>", LOG_BOT_NICK, LOG_BOT_NICK);
    if record.numeric == 1 && record.message.contains(&own_pm) {
        return;
    }
    let body = escape(&format!(
        "{}: {} [{}]",
        record.level,
        record.message.trim_end(),
        record.target
    ));
    for entry in hub.log_handlers.iter() {
        if record.numeric >= entry.value().level {
            let frame = format!(
                "$To: {} From: {} $<{}> {}",
                entry.key(),
                LOG_BOT_NICK,
                LOG_BOT_NICK,
                body
            );
            let _ = entry.value().tx.send(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_levels_follow_the_scale() {
        assert_eq!(numeric_level(&Level::ERROR, "nmdcd"), 40);
        assert_eq!(numeric_level(&Level::INFO, "nmdcd::loading"), 20);
        assert_eq!(numeric_level(&Level::TRACE, "nmdcd"), 5);
        // The data-sent channel is pinned below everything else.
        assert_eq!(numeric_level(&Level::TRACE, DATA_SENT_TARGET), 1);
    }
}
